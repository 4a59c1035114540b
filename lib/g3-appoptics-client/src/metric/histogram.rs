/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use super::{Histogram, MetricHandle};

#[derive(Clone)]
pub struct HistogramHandle {
    inner: MetricHandle,
}

impl HistogramHandle {
    pub(crate) fn new(inner: MetricHandle) -> Self {
        HistogramHandle { inner }
    }

    pub fn key(&self) -> String {
        self.inner.key()
    }
}

impl Histogram for HistogramHandle {
    fn with(&self, tags: &[(&str, &str)]) -> Self {
        HistogramHandle {
            inner: self.inner.with(tags),
        }
    }

    fn observe(&self, value: f64) {
        let h = &self.inner;
        h.store.observe(h.key(), &h.name, &h.tags, value);
    }
}
