/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::future::Future;
use std::sync::Arc;

use log::debug;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::RetryConfig;
use crate::encode::Batch;
use crate::transport::MeasurementTransport;
use crate::{DeliveryError, FlushError};

/// A set of delivery tasks sharing one cancellation token.
///
/// The first failure cancels the token and is the only one returned by
/// [`TaskGroup::wait`].
pub(crate) struct TaskGroup {
    tasks: JoinSet<Result<(), DeliveryError>>,
    cancel: CancellationToken,
}

impl TaskGroup {
    pub(crate) fn new(cancel: CancellationToken) -> Self {
        TaskGroup {
            tasks: JoinSet::new(),
            cancel,
        }
    }

    pub(crate) fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Result<(), DeliveryError>> + Send + 'static,
    {
        self.tasks.spawn(task);
    }

    /// Wait for every task, even after the first failure.
    pub(crate) async fn wait(mut self) -> Result<(), FlushError> {
        let mut first_err = None;
        while let Some(r) = self.tasks.join_next().await {
            let e = match r {
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => FlushError::Delivery(e),
                Err(e) if e.is_panic() => FlushError::TaskPanicked,
                Err(_) => continue,
            };
            if first_err.is_none() {
                self.cancel.cancel();
                first_err = Some(e);
            } else {
                debug!("discarded delivery error: {e}");
            }
        }
        self.cancel.cancel();
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Delivers every batch of a flush cycle concurrently.
pub struct Dispatcher<T: ?Sized> {
    transport: Arc<T>,
    retry: RetryConfig,
}

impl<T> Dispatcher<T>
where
    T: MeasurementTransport + ?Sized + 'static,
{
    pub fn new(transport: Arc<T>, retry: RetryConfig) -> Self {
        Dispatcher { transport, retry }
    }

    /// Deliver all `batches` and return the first error reported by any of
    /// them. Returns only after every delivery task has finished.
    pub async fn dispatch(
        &self,
        batches: Vec<Batch>,
        cancel: &CancellationToken,
    ) -> Result<(), FlushError> {
        let mut group = TaskGroup::new(cancel.child_token());
        for batch in batches {
            let transport = self.transport.clone();
            let retry = self.retry;
            let token = group.token();
            group.spawn(async move { deliver(transport.as_ref(), &batch, retry, &token).await });
        }
        group.wait().await
    }
}

async fn deliver<T>(
    transport: &T,
    batch: &Batch,
    retry: RetryConfig,
    cancel: &CancellationToken,
) -> Result<(), DeliveryError>
where
    T: MeasurementTransport + ?Sized,
{
    let mut retries = 0;
    loop {
        let e = match transport.post(batch).await {
            Ok(_) => return Ok(()),
            Err(e) => e,
        };
        if retries >= retry.max {
            return Err(e);
        }
        // the only point where a task looks at the group token
        if retry.stop_on_group_failure && cancel.is_cancelled() {
            debug!("batch of {} measurements: group failed, giving up: {e}", batch.len());
            return Err(e);
        }
        debug!(
            "batch of {} measurements: attempt {} failed: {e}",
            batch.len(),
            retries + 1
        );
        tokio::time::sleep(retry.delay).await;
        retries += 1;
    }
}
