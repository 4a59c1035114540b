/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;

use crate::EncodeError;
use crate::sample::Measurement;

pub const DEFAULT_BATCH_SIZE: usize = 300;

#[derive(Serialize)]
struct MeasurementsBody<'a> {
    measurements: &'a [Measurement],
}

/// Encoded request body, delivered and retried on its own.
#[derive(Clone, Debug)]
pub struct Batch {
    len: usize,
    payload: Bytes,
}

impl Batch {
    /// Number of measurements in the batch.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

/// Split `measurements` into bodies of at most `batch_size` records.
///
/// The first encode failure is returned and no batch is produced.
pub fn encode_batches(
    measurements: &[Measurement],
    batch_size: usize,
) -> Result<Vec<Batch>, EncodeError> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::with_capacity(measurements.len().div_ceil(batch_size));
    for chunk in measurements.chunks(batch_size) {
        let mut writer = BytesMut::with_capacity(chunk.len() * 128).writer();
        serde_json::to_writer(&mut writer, &MeasurementsBody { measurements: chunk })?;
        batches.push(Batch {
            len: chunk.len(),
            payload: writer.into_inner().freeze(),
        });
    }
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::key::TagMap;
    use crate::sample::MeasurementAttributes;

    fn measurement(name: &str, value: f64) -> Measurement {
        let mut tags = TagMap::new();
        tags.insert("region".to_string(), "us".to_string());
        Measurement {
            name: name.to_string(),
            time: 1_700_000_000,
            period: 60,
            attributes: MeasurementAttributes { aggregate: true },
            tags: Arc::new(tags),
            value,
        }
    }

    #[test]
    fn empty() {
        let batches = encode_batches(&[], DEFAULT_BATCH_SIZE).unwrap();
        assert!(batches.is_empty());
    }

    #[test]
    fn payload_shape() {
        let batches = encode_batches(&[measurement("m", 1.5)], DEFAULT_BATCH_SIZE).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
        assert_eq!(
            batches[0].payload().as_ref(),
            br#"{"measurements":[{"name":"m","time":1700000000,"period":60,"attributes":{"aggregate":true},"tags":{"region":"us"},"value":1.5}]}"#
        );
    }

    #[test]
    fn partition() {
        let ms: Vec<Measurement> = (0..650)
            .map(|i| measurement(&format!("m{i}"), i as f64))
            .collect();
        let batches = encode_batches(&ms, 300).unwrap();
        let sizes: Vec<usize> = batches.iter().map(Batch::len).collect();
        assert_eq!(sizes, [300, 300, 50]);

        let body: serde_json::Value = serde_json::from_slice(batches[2].payload()).unwrap();
        let list = body["measurements"].as_array().unwrap();
        assert_eq!(list.len(), 50);
        assert_eq!(list[0]["name"], "m600");
    }

    #[test]
    fn exact_multiple() {
        let ms: Vec<Measurement> = (0..600).map(|i| measurement("m", i as f64)).collect();
        let batches = encode_batches(&ms, 300).unwrap();
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn non_finite_aborts() {
        let mut ms: Vec<Measurement> = (0..10).map(|i| measurement("m", i as f64)).collect();
        ms.push(measurement("bad", f64::NAN));
        assert!(encode_batches(&ms, 5).is_err());
        assert!(encode_batches(&[measurement("inf", f64::INFINITY)], 5).is_err());
    }
}
