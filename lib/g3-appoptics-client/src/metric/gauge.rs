/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use super::{Gauge, MetricHandle};
use crate::store::PointKind;

#[derive(Clone)]
pub struct GaugeHandle {
    inner: MetricHandle,
}

impl GaugeHandle {
    pub(crate) fn new(inner: MetricHandle) -> Self {
        GaugeHandle { inner }
    }

    pub fn key(&self) -> String {
        self.inner.key()
    }
}

impl Gauge for GaugeHandle {
    fn with(&self, tags: &[(&str, &str)]) -> Self {
        GaugeHandle {
            inner: self.inner.with(tags),
        }
    }

    fn set(&self, value: f64) {
        let h = &self.inner;
        h.store.set(h.key(), &h.name, &h.tags, value);
    }

    fn add(&self, delta: f64) {
        let h = &self.inner;
        h.store.add(h.key(), &h.name, PointKind::Gauge, &h.tags, delta);
    }
}
