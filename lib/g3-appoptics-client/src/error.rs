/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("json encode failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid base url {0}")]
    InvalidBaseUrl(String),
    #[error("transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("expected 2xx, got {0}")]
    UnexpectedStatusCode(u16),
}

#[derive(Debug, Error)]
pub enum FlushError {
    #[error("encode measurements failed: {0}")]
    Encode(#[from] EncodeError),
    #[error("deliver measurements failed: {0}")]
    Delivery(#[from] DeliveryError),
    #[error("delivery task panicked")]
    TaskPanicked,
}
