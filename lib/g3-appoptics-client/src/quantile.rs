/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::sync::Arc;

use hdrhistogram::{CreationError, Histogram};

/// Streaming estimator backing a histogram point.
pub trait QuantileEngine: Send {
    fn observe(&mut self, value: f64);
    fn quantile(&self, q: f64) -> f64;
}

/// Creates a fresh engine for every new histogram point.
#[derive(Clone)]
pub struct EngineFactory(Arc<dyn Fn() -> Box<dyn QuantileEngine> + Send + Sync>);

impl EngineFactory {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> Box<dyn QuantileEngine> + Send + Sync + 'static,
    {
        EngineFactory(Arc::new(f))
    }

    pub(crate) fn build(&self) -> Box<dyn QuantileEngine> {
        (self.0)()
    }
}

impl Default for EngineFactory {
    fn default() -> Self {
        EngineFactory::new(|| Box::new(HdrQuantileEngine::new()))
    }
}

impl fmt::Debug for EngineFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EngineFactory")
    }
}

/// Values are kept with three decimal places.
const VALUE_SCALE: f64 = 1000.0;

/// HDR histogram engine. Negative and NaN observations are recorded as 0.
pub struct HdrQuantileEngine {
    inner: Histogram<u64>,
    min: f64,
    max: f64,
}

impl HdrQuantileEngine {
    pub fn new() -> Self {
        HdrQuantileEngine::with_sigfig(3).unwrap()
    }

    pub fn with_sigfig(sigfig: u8) -> Result<Self, CreationError> {
        let inner = Histogram::new(sigfig)?;
        Ok(HdrQuantileEngine {
            inner,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        })
    }

    pub fn len(&self) -> u64 {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for HdrQuantileEngine {
    fn default() -> Self {
        HdrQuantileEngine::new()
    }
}

impl QuantileEngine for HdrQuantileEngine {
    fn observe(&mut self, value: f64) {
        let value = if value.is_nan() { 0.0 } else { value.max(0.0) };
        // float to int casts saturate
        let _ = self.inner.record((value * VALUE_SCALE).round() as u64);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    fn quantile(&self, q: f64) -> f64 {
        if self.inner.is_empty() {
            return 0.0;
        }
        let q = if q.is_nan() { 0.0 } else { q.clamp(0.0, 1.0) };
        let v = self.inner.value_at_quantile(q) as f64 / VALUE_SCALE;
        v.clamp(self.min, self.max)
    }
}
