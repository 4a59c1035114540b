/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use super::{Counter, MetricHandle};
use crate::store::PointKind;

/// Counter whose value is reset every time it is sampled.
#[derive(Clone)]
pub struct CounterHandle {
    inner: MetricHandle,
}

impl CounterHandle {
    pub(crate) fn new(inner: MetricHandle) -> Self {
        CounterHandle { inner }
    }

    pub fn key(&self) -> String {
        self.inner.key()
    }
}

impl Counter for CounterHandle {
    fn with(&self, tags: &[(&str, &str)]) -> Self {
        CounterHandle {
            inner: self.inner.with(tags),
        }
    }

    fn add(&self, delta: f64) {
        let h = &self.inner;
        h.store
            .add(h.key(), &h.name, PointKind::Counter, &h.tags, delta);
    }
}
