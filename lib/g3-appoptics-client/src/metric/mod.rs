/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use log::debug;

use crate::key::{TagMap, compute_key, merge_tags};
use crate::store::PointStore;

mod counter;
pub use counter::CounterHandle;

mod gauge;
pub use gauge::GaugeHandle;

mod histogram;
pub use histogram::HistogramHandle;

/// Name and declared labels of a metric.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricIdentifier {
    pub name: String,
    pub labels: Vec<String>,
}

impl MetricIdentifier {
    pub fn new<T: Into<String>>(name: T) -> Self {
        MetricIdentifier {
            name: name.into(),
            labels: Vec::new(),
        }
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }
}

pub trait Counter {
    fn with(&self, tags: &[(&str, &str)]) -> Self
    where
        Self: Sized;
    fn add(&self, delta: f64);
}

pub trait Gauge {
    fn with(&self, tags: &[(&str, &str)]) -> Self
    where
        Self: Sized;
    fn set(&self, value: f64);
    fn add(&self, delta: f64);
}

pub trait Histogram {
    fn with(&self, tags: &[(&str, &str)]) -> Self
    where
        Self: Sized;
    fn observe(&self, value: f64);
}

/// State shared by all handle kinds. Never mutated after creation.
#[derive(Clone)]
pub(crate) struct MetricHandle {
    pub(crate) store: Arc<PointStore>,
    pub(crate) name: Arc<str>,
    pub(crate) labels: Arc<[String]>,
    pub(crate) tags: Arc<TagMap>,
}

impl MetricHandle {
    pub(crate) fn new(
        store: Arc<PointStore>,
        name: &str,
        labels: Vec<String>,
        tags: TagMap,
    ) -> Self {
        MetricHandle {
            store,
            name: Arc::from(name),
            labels: Arc::from(labels),
            tags: Arc::new(tags),
        }
    }

    fn is_declared(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub(crate) fn with(&self, pairs: &[(&str, &str)]) -> Self {
        let mut declared = Vec::with_capacity(pairs.len());
        for (k, v) in pairs {
            if self.is_declared(k) {
                declared.push((*k, *v));
            } else {
                debug!("metric {}: ignored undeclared label {k}", self.name);
            }
        }
        MetricHandle {
            store: self.store.clone(),
            name: self.name.clone(),
            labels: self.labels.clone(),
            tags: Arc::new(merge_tags(&self.tags, declared.as_slice())),
        }
    }

    pub(crate) fn key(&self) -> String {
        compute_key(&self.name, &self.labels[..], &self.tags)
    }

    #[cfg(test)]
    pub(crate) fn tags(&self) -> &TagMap {
        &self.tags
    }
}
