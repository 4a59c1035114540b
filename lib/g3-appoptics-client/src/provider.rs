/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::{AppopticsClientConfig, ConfigError};
use crate::dispatch::Dispatcher;
use crate::key::{TagMap, make_tags, merge_tags};
use crate::metric::{CounterHandle, GaugeHandle, HistogramHandle, MetricHandle, MetricIdentifier};
use crate::send::SendLoop;
use crate::store::PointStore;
use crate::transport::{HttpTransport, MeasurementTransport};
use crate::{DeliveryError, FlushError};

/// Entry point: creates metric handles and sends what they recorded.
pub struct AppopticsProvider {
    config: AppopticsClientConfig,
    store: Arc<PointStore>,
}

impl AppopticsProvider {
    pub fn new(config: AppopticsClientConfig) -> Result<Self, ConfigError> {
        config.check()?;
        let store = Arc::new(PointStore::new(config.engine.clone()));
        Ok(AppopticsProvider { config, store })
    }

    #[inline]
    pub fn config(&self) -> &AppopticsClientConfig {
        &self.config
    }

    #[inline]
    pub fn store(&self) -> &Arc<PointStore> {
        &self.store
    }

    fn build_handle(&self, id: &MetricIdentifier) -> MetricHandle {
        let defaults = self.config.label_values();
        let mut labels: Vec<String> = defaults.iter().map(|(k, _)| k.clone()).collect();
        for label in &id.labels {
            if !labels.contains(label) {
                labels.push(label.clone());
            }
        }
        let tags: TagMap = merge_tags(&make_tags(labels.as_slice()), defaults);
        MetricHandle::new(self.store.clone(), &id.name, labels, tags)
    }

    pub fn new_counter(&self, id: &MetricIdentifier) -> CounterHandle {
        CounterHandle::new(self.build_handle(id))
    }

    pub fn new_gauge(&self, id: &MetricIdentifier) -> GaugeHandle {
        GaugeHandle::new(self.build_handle(id))
    }

    pub fn new_histogram(&self, id: &MetricIdentifier) -> HistogramHandle {
        HistogramHandle::new(self.build_handle(id))
    }

    /// Build a send loop on top of `transport`, without starting it.
    pub fn new_send_loop<T>(&self, transport: Arc<T>) -> SendLoop<T>
    where
        T: MeasurementTransport + ?Sized + 'static,
    {
        let dispatcher = Dispatcher::new(transport, self.config.retry());
        SendLoop::new(
            self.store.clone(),
            self.config.period(),
            self.config.batch_size(),
            dispatcher,
        )
    }

    /// Run a single flush cycle right now.
    pub async fn flush<T>(
        &self,
        transport: Arc<T>,
        cancel: &CancellationToken,
    ) -> Result<(), FlushError>
    where
        T: MeasurementTransport + ?Sized + 'static,
    {
        self.new_send_loop(transport).flush_once(cancel).await
    }

    /// Send measurements to `url` once per tick, until `cancel` fires or
    /// `ticks` is closed.
    ///
    /// The credentials in `url` are used for basic authentication.
    pub async fn send_loop<X>(
        &self,
        ticks: mpsc::Receiver<X>,
        cancel: CancellationToken,
        url: &Url,
    ) -> Result<(), DeliveryError> {
        let transport = HttpTransport::new(url, self.config.request_timeout())?;
        self.new_send_loop(Arc::new(transport))
            .run(ticks, cancel)
            .await;
        Ok(())
    }
}
