/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use url::Url;

use crate::DeliveryError;
use crate::encode::Batch;

const MEASUREMENTS_API_PATH: &str = "/v1/measurements";

#[async_trait]
pub trait MeasurementTransport: Send + Sync {
    async fn post(&self, batch: &Batch) -> Result<(), DeliveryError>;
}

/// Split the userinfo out of `url`. The argument is left untouched.
pub fn extract_credentials(url: &Url) -> (Url, String, String) {
    let username = percent_decode_str(url.username())
        .decode_utf8_lossy()
        .into_owned();
    let password = url
        .password()
        .map(|p| percent_decode_str(p).decode_utf8_lossy().into_owned())
        .unwrap_or_default();

    let mut cleaned = url.clone();
    // only fails for urls that can not carry credentials at all
    let _ = cleaned.set_username("");
    let _ = cleaned.set_password(None);
    (cleaned, username, password)
}

/// Posts batches to the measurements API with basic authentication.
pub struct HttpTransport {
    client: reqwest::Client,
    api_url: Url,
    username: String,
    password: String,
}

impl HttpTransport {
    pub fn new(url: &Url, request_timeout: Duration) -> Result<Self, DeliveryError> {
        let (base, username, password) = extract_credentials(url);
        if !matches!(base.scheme(), "http" | "https") {
            return Err(DeliveryError::InvalidBaseUrl(base.to_string()));
        }
        let api_url = base
            .join(MEASUREMENTS_API_PATH)
            .map_err(|e| DeliveryError::InvalidBaseUrl(format!("{base}: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(HttpTransport {
            client,
            api_url,
            username,
            password,
        })
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }
}

#[async_trait]
impl MeasurementTransport for HttpTransport {
    async fn post(&self, batch: &Batch) -> Result<(), DeliveryError> {
        let rsp = self
            .client
            .post(self.api_url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(batch.payload().clone())
            .send()
            .await?;

        let status = rsp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::UnexpectedStatusCode(status.as_u16()))
        }
    }
}
