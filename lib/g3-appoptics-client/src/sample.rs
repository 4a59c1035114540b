/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::key::TagMap;
use crate::store::{PointStore, PointValue};

const HISTOGRAM_QUANTILES: [(&str, f64); 4] = [
    (".perc50", 0.50),
    (".perc90", 0.90),
    (".perc95", 0.95),
    (".perc99", 0.99),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MeasurementAttributes {
    pub aggregate: bool,
}

/// One outbound record of a flush cycle.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Measurement {
    pub name: String,
    pub time: i64,
    pub period: u64,
    pub attributes: MeasurementAttributes,
    pub tags: Arc<TagMap>,
    #[serde(serialize_with = "serialize_finite")]
    pub value: f64,
}

fn serialize_finite<S: Serializer>(v: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if v.is_finite() {
        serializer.serialize_f64(*v)
    } else {
        Err(serde::ser::Error::custom(format!("unsupported value: {v}")))
    }
}

/// Round `now` down to a multiple of `period` since the unix epoch.
fn truncate_time(now: DateTime<Utc>, period: Duration) -> i64 {
    const NANOS_PER_SEC: i128 = 1_000_000_000;

    let period = period.as_nanos() as i128;
    if period == 0 {
        return now.timestamp();
    }
    let nanos = now.timestamp() as i128 * NANOS_PER_SEC + now.timestamp_subsec_nanos() as i128;
    let truncated = nanos - nanos.rem_euclid(period);
    truncated.div_euclid(NANOS_PER_SEC) as i64
}

/// Take a snapshot of every point, resetting counters on the way.
///
/// The store lock is held for the whole traversal. The order of the returned
/// measurements is unspecified.
pub fn sample(store: &PointStore, period: Duration, now: DateTime<Utc>) -> Vec<Measurement> {
    let mut guard = store.lock();
    if guard.is_empty() {
        return Vec::new();
    }

    let time = truncate_time(now, period);
    let period = period.as_secs();
    let attributes = MeasurementAttributes { aggregate: true };

    let mut measurements = Vec::with_capacity(guard.len());
    for point in guard.points_mut() {
        let reset = point.reset_on_read();
        match &mut point.value {
            PointValue::Float(v) => {
                measurements.push(Measurement {
                    name: point.name.to_string(),
                    time,
                    period,
                    attributes,
                    tags: point.tags.clone(),
                    value: *v,
                });
                if reset {
                    *v = 0.0;
                }
            }
            PointValue::Histogram(h) => {
                for (suffix, q) in HISTOGRAM_QUANTILES {
                    measurements.push(Measurement {
                        name: format!("{}{suffix}", point.name),
                        time,
                        period,
                        attributes,
                        tags: point.tags.clone(),
                        value: h.quantile(q),
                    });
                }
            }
        }
    }
    measurements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::make_tags;
    use crate::quantile::EngineFactory;
    use crate::store::PointKind;
    use chrono::TimeZone;

    fn at(secs: i64, nanos: u32) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, nanos).unwrap()
    }

    #[test]
    fn truncate() {
        let minute = Duration::from_secs(60);
        assert_eq!(truncate_time(at(1_700_000_039, 999), minute), 1_699_999_980);
        assert_eq!(truncate_time(at(1_699_999_980, 0), minute), 1_699_999_980);
        assert_eq!(
            truncate_time(at(1_700_000_001, 700_000_000), Duration::from_millis(500)),
            1_700_000_001
        );
        assert_eq!(truncate_time(at(1_700_000_001, 1), Duration::ZERO), 1_700_000_001);
    }

    #[test]
    fn empty_store() {
        let store = PointStore::new(EngineFactory::default());
        assert!(sample(&store, Duration::from_secs(60), Utc::now()).is_empty());
    }

    #[test]
    fn counter_reset() {
        let store = PointStore::new(EngineFactory::default());
        let tags = Arc::new(make_tags(&["region"]));
        store.add("c__region:unknown".to_string(), "c", PointKind::Counter, &tags, 5.0);

        let now = at(1_700_000_030, 0);
        let ms = sample(&store, Duration::from_secs(60), now);
        assert_eq!(ms.len(), 1);
        let m = &ms[0];
        assert_eq!(m.name, "c");
        assert_eq!(m.time, 1_699_999_980);
        assert_eq!(m.period, 60);
        assert!(m.attributes.aggregate);
        assert_eq!(m.tags.get("region").unwrap(), "unknown");
        assert_eq!(m.value, 5.0);

        let ms = sample(&store, Duration::from_secs(60), now);
        assert_eq!(ms.len(), 1);
        assert_eq!(ms[0].value, 0.0);
    }

    #[test]
    fn gauge_kept() {
        let store = PointStore::new(EngineFactory::default());
        let tags = Arc::new(TagMap::new());
        store.set("g__".to_string(), "g", &tags, 1000.0);

        for _ in 0..2 {
            let ms = sample(&store, Duration::from_secs(60), Utc::now());
            assert_eq!(ms.len(), 1);
            assert_eq!(ms[0].value, 1000.0);
        }
    }

    #[test]
    fn histogram_quantiles() {
        let store = PointStore::new(EngineFactory::default());
        let tags = Arc::new(TagMap::new());
        store.observe("h__".to_string(), "h", &tags, 10.0);

        let mut ms = sample(&store, Duration::from_secs(60), Utc::now());
        ms.sort_by(|a, b| a.name.cmp(&b.name));
        let names: Vec<&str> = ms.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["h.perc50", "h.perc90", "h.perc95", "h.perc99"]);
        assert!(ms.iter().all(|m| m.value == 10.0));

        // not reset
        let ms = sample(&store, Duration::from_secs(60), Utc::now());
        assert!(ms.iter().all(|m| m.value == 10.0));
    }

    #[test]
    fn shared_timestamp() {
        let store = PointStore::new(EngineFactory::default());
        let tags = Arc::new(TagMap::new());
        for i in 0..10 {
            store.add(format!("c{i}__"), "c", PointKind::Counter, &tags, 1.0);
        }
        let ms = sample(&store, Duration::from_secs(10), at(1_700_000_007, 5));
        assert_eq!(ms.len(), 10);
        assert!(ms.iter().all(|m| m.time == 1_700_000_000 && m.period == 10));
    }
}
