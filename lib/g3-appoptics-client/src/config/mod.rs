/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::collections::BTreeSet;
use std::time::Duration;

use thiserror::Error;

use crate::encode::DEFAULT_BATCH_SIZE;
use crate::quantile::EngineFactory;

#[cfg(feature = "yaml")]
mod yaml;

const DEFAULT_PERIOD: Duration = Duration::from_secs(60);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("period should not be zero")]
    ZeroPeriod,
    #[error("batch size should not be zero")]
    ZeroBatchSize,
    #[error("duplicated default label {0}")]
    DuplicatedLabel(String),
}

/// Retry policy applied to each batch independently.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetryConfig {
    /// Extra attempts after the first one.
    pub max: usize,
    /// Fixed wait between two attempts.
    pub delay: Duration,
    /// Stop retrying once another batch of the same cycle has failed.
    pub stop_on_group_failure: bool,
}

#[derive(Clone, Debug)]
pub struct AppopticsClientConfig {
    pub(crate) label_values: Vec<(String, String)>,
    pub(crate) period: Duration,
    pub(crate) batch_size: usize,
    pub(crate) retry: RetryConfig,
    pub(crate) request_timeout: Duration,
    pub(crate) engine: EngineFactory,
}

impl Default for AppopticsClientConfig {
    fn default() -> Self {
        AppopticsClientConfig {
            label_values: Vec::new(),
            period: DEFAULT_PERIOD,
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetryConfig::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            engine: EngineFactory::default(),
        }
    }
}

impl AppopticsClientConfig {
    /// Label values added to every metric, before the metric's own labels.
    pub fn with_label_values<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.label_values = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_retry(mut self, max: usize, delay: Duration) -> Self {
        self.retry.max = max;
        self.retry.delay = delay;
        self
    }

    pub fn with_stop_on_group_failure(mut self, enable: bool) -> Self {
        self.retry.stop_on_group_failure = enable;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_engine_factory(mut self, engine: EngineFactory) -> Self {
        self.engine = engine;
        self
    }

    #[inline]
    pub fn period(&self) -> Duration {
        self.period
    }

    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[inline]
    pub fn retry(&self) -> RetryConfig {
        self.retry
    }

    #[inline]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[inline]
    pub fn label_values(&self) -> &[(String, String)] {
        &self.label_values
    }

    pub fn check(&self) -> Result<(), ConfigError> {
        if self.period.is_zero() {
            return Err(ConfigError::ZeroPeriod);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        let mut names = BTreeSet::new();
        for (k, _) in &self.label_values {
            if !names.insert(k.as_str()) {
                return Err(ConfigError::DuplicatedLabel(k.clone()));
            }
        }
        Ok(())
    }
}
