/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, warn};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::FlushError;
use crate::dispatch::Dispatcher;
use crate::encode::encode_batches;
use crate::sample::sample;
use crate::store::PointStore;
use crate::transport::MeasurementTransport;

/// Receives every error of a failed flush cycle.
pub type ErrorSink = Arc<dyn Fn(&FlushError) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Flushing,
    Terminated,
}

fn default_error_sink() -> ErrorSink {
    Arc::new(|e: &FlushError| warn!("failed to send measurements: {e}"))
}

pub struct SendLoop<T: ?Sized> {
    store: Arc<PointStore>,
    period: Duration,
    batch_size: usize,
    dispatcher: Dispatcher<T>,
    error_sink: ErrorSink,
    state: watch::Sender<LoopState>,
}

impl<T> SendLoop<T>
where
    T: MeasurementTransport + ?Sized + 'static,
{
    pub(crate) fn new(
        store: Arc<PointStore>,
        period: Duration,
        batch_size: usize,
        dispatcher: Dispatcher<T>,
    ) -> Self {
        let (state, _) = watch::channel(LoopState::Idle);
        SendLoop {
            store,
            period,
            batch_size,
            dispatcher,
            error_sink: default_error_sink(),
            state,
        }
    }

    pub fn with_error_sink(mut self, sink: ErrorSink) -> Self {
        self.error_sink = sink;
        self
    }

    /// Watch the loop state. Still usable after the loop has been consumed
    /// by [`SendLoop::run`].
    pub fn state(&self) -> watch::Receiver<LoopState> {
        self.state.subscribe()
    }

    /// Run one sample, encode and dispatch cycle.
    pub async fn flush_once(&self, cancel: &CancellationToken) -> Result<(), FlushError> {
        let measurements = sample(&self.store, self.period, Utc::now());
        if measurements.is_empty() {
            return Ok(());
        }
        let batches = encode_batches(&measurements, self.batch_size)?;
        debug!(
            "sending {} measurements in {} batches",
            measurements.len(),
            batches.len()
        );
        self.dispatcher.dispatch(batches, cancel).await
    }

    /// Flush once per received tick until `cancel` fires or the tick
    /// channel is closed.
    ///
    /// A flush in progress always runs to completion, cancellation is only
    /// noticed between two cycles.
    pub async fn run<X>(self, mut ticks: mpsc::Receiver<X>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,
                r = ticks.recv() => {
                    if r.is_none() {
                        break;
                    }
                    self.state.send_replace(LoopState::Flushing);
                    if let Err(e) = self.flush_once(&cancel).await {
                        (self.error_sink)(&e);
                    }
                    self.state.send_replace(LoopState::Idle);
                }
            }
        }
        self.state.send_replace(LoopState::Terminated);
    }
}

/// Send a tick every `period`, the first one after a full period.
///
/// The ticker stops once the receiver is dropped. Ticks are dropped while a
/// previous one is still pending.
pub fn spawn_ticker(period: Duration) -> mpsc::Receiver<()> {
    let (sender, receiver) = mpsc::channel(1);
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + period;
        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;

                _ = sender.closed() => break,
                _ = interval.tick() => {
                    if let Err(mpsc::error::TrySendError::Closed(_)) = sender.try_send(()) {
                        break;
                    }
                }
            }
        }
    });
    receiver
}
