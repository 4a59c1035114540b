/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

mod error;
pub use error::{DeliveryError, EncodeError, FlushError};

mod key;
pub use key::{TagMap, UNKNOWN_VALUE, compute_key};

mod quantile;
pub use quantile::{EngineFactory, HdrQuantileEngine, QuantileEngine};

mod store;
pub use store::{Point, PointKind, PointStore, PointStoreGuard};

mod metric;
pub use metric::{
    Counter, CounterHandle, Gauge, GaugeHandle, Histogram, HistogramHandle, MetricIdentifier,
};

mod sample;
pub use sample::{Measurement, MeasurementAttributes, sample};

mod encode;
pub use encode::{Batch, DEFAULT_BATCH_SIZE, encode_batches};

mod transport;
pub use transport::{HttpTransport, MeasurementTransport, extract_credentials};

mod dispatch;
pub use dispatch::Dispatcher;

mod send;
pub use send::{ErrorSink, LoopState, SendLoop, spawn_ticker};

mod config;
pub use config::{AppopticsClientConfig, ConfigError, RetryConfig};

mod provider;
pub use provider::AppopticsProvider;
