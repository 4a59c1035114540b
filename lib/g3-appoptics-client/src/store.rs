/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ahash::AHashMap;
use log::debug;

use crate::key::TagMap;
use crate::quantile::{EngineFactory, QuantileEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointKind {
    Counter,
    Gauge,
    Histogram,
}

pub(crate) enum PointValue {
    Float(f64),
    Histogram(Box<dyn QuantileEngine>),
}

/// Aggregation cell of one metric instance.
pub struct Point {
    pub(crate) name: Arc<str>,
    pub(crate) kind: PointKind,
    pub(crate) tags: Arc<TagMap>,
    pub(crate) value: PointValue,
}

impl Point {
    fn new(name: &str, kind: PointKind, tags: Arc<TagMap>, engine: &EngineFactory) -> Self {
        let value = match kind {
            PointKind::Counter | PointKind::Gauge => PointValue::Float(0.0),
            PointKind::Histogram => PointValue::Histogram(engine.build()),
        };
        Point {
            name: Arc::from(name),
            kind,
            tags,
            value,
        }
    }

    #[inline]
    pub fn kind(&self) -> PointKind {
        self.kind
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn tags(&self) -> &TagMap {
        &self.tags
    }

    /// Counter points are reset each time they are sampled.
    #[inline]
    pub fn reset_on_read(&self) -> bool {
        self.kind == PointKind::Counter
    }

    /// Non-finite results are dropped, the point keeps its previous value.
    pub fn add(&mut self, delta: f64) {
        match &mut self.value {
            PointValue::Float(v) => {
                let next = *v + delta;
                if next.is_finite() {
                    *v = next;
                } else {
                    debug!("metric {}: dropped add of {delta}, result not finite", self.name);
                }
            }
            PointValue::Histogram(_) => self.kind_mismatch("add"),
        }
    }

    pub fn set(&mut self, value: f64) {
        match (&mut self.value, self.kind) {
            (PointValue::Float(v), PointKind::Gauge) => {
                if value.is_finite() {
                    *v = value;
                } else {
                    debug!("metric {}: dropped set of non-finite value {value}", self.name);
                }
            }
            _ => self.kind_mismatch("set"),
        }
    }

    pub fn observe(&mut self, value: f64) {
        match &mut self.value {
            PointValue::Histogram(h) => h.observe(value),
            PointValue::Float(_) => self.kind_mismatch("observe"),
        }
    }

    /// Current numeric value, `None` for histogram points.
    pub fn float_value(&self) -> Option<f64> {
        match &self.value {
            PointValue::Float(v) => Some(*v),
            PointValue::Histogram(_) => None,
        }
    }

    pub fn quantile(&self, q: f64) -> Option<f64> {
        match &self.value {
            PointValue::Histogram(h) => Some(h.quantile(q)),
            PointValue::Float(_) => None,
        }
    }

    fn kind_mismatch(&self, op: &str) {
        debug!(
            "metric {}: dropped {op} on {:?} point with the same identity",
            self.name, self.kind
        );
    }
}

/// All points of a provider, behind one lock.
pub struct PointStore {
    engine: EngineFactory,
    points: Mutex<AHashMap<String, Point>>,
}

impl PointStore {
    pub fn new(engine: EngineFactory) -> Self {
        PointStore {
            engine,
            points: Mutex::new(AHashMap::new()),
        }
    }

    pub fn lock(&self) -> PointStoreGuard<'_> {
        PointStoreGuard {
            engine: &self.engine,
            points: self.points.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    pub(crate) fn add(
        &self,
        key: String,
        name: &str,
        kind: PointKind,
        tags: &Arc<TagMap>,
        delta: f64,
    ) {
        let mut guard = self.lock();
        let point = guard.get_or_create(key, name, kind, tags);
        if point.kind == kind {
            point.add(delta);
        } else {
            point.kind_mismatch("add");
        }
    }

    pub(crate) fn set(&self, key: String, name: &str, tags: &Arc<TagMap>, value: f64) {
        self.lock()
            .get_or_create(key, name, PointKind::Gauge, tags)
            .set(value);
    }

    pub(crate) fn observe(&self, key: String, name: &str, tags: &Arc<TagMap>, value: f64) {
        self.lock()
            .get_or_create(key, name, PointKind::Histogram, tags)
            .observe(value);
    }
}

pub struct PointStoreGuard<'a> {
    engine: &'a EngineFactory,
    points: MutexGuard<'a, AHashMap<String, Point>>,
}

impl PointStoreGuard<'_> {
    /// Return the point of `key`, creating it if it does not exist yet.
    pub fn get_or_create(
        &mut self,
        key: String,
        name: &str,
        kind: PointKind,
        tags: &Arc<TagMap>,
    ) -> &mut Point {
        let engine = self.engine;
        self.points
            .entry(key)
            .or_insert_with(|| Point::new(name, kind, tags.clone(), engine))
    }

    pub fn get(&self, key: &str) -> Option<&Point> {
        self.points.get(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iteration order is unspecified.
    pub(crate) fn points_mut(&mut self) -> impl Iterator<Item = &mut Point> {
        self.points.values_mut()
    }
}
