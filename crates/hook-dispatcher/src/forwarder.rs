// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use core::time::Duration;
use std::collections::HashMap;
use std::error::Error;
use std::time::Instant;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Url;
use tracing::debug;

use crate::error::ForwardError;

/// Builds a reqwest client with optional proxy configuration and timeout.
pub fn build_client(
    proxy_url: Option<&str>,
    timeout: Duration,
) -> Result<reqwest::Client, Box<dyn Error>> {
    let mut builder = reqwest::Client::builder().use_rustls_tls().timeout(timeout);
    if let Some(proxy) = proxy_url {
        builder = builder.proxy(reqwest::Proxy::https(proxy)?);
    }
    Ok(builder.build()?)
}

/// Posts message payloads to the webhook endpoint.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
}

impl Forwarder {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Sends `payload` to `endpoint` with every header copied verbatim.
    ///
    /// Only construction and transport failures are errors; the response
    /// status is logged and otherwise ignored. No retry is attempted.
    pub async fn forward(
        &self,
        payload: &[u8],
        headers: &HashMap<String, String>,
        endpoint: &str,
    ) -> Result<(), ForwardError> {
        let url = Url::parse(endpoint).map_err(|e| {
            ForwardError::RequestConstruction(format!("invalid endpoint '{endpoint}': {e}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ForwardError::RequestConstruction(format!(
                "unsupported scheme '{}' in endpoint '{endpoint}'",
                url.scheme()
            )));
        }
        let header_map = to_header_map(headers)?;

        let time = Instant::now();
        let response = self
            .client
            .post(url)
            .headers(header_map)
            .body(payload.to_vec())
            .send()
            .await?;

        debug!(
            status = response.status().as_u16(),
            "Forwarded {} bytes in {} ms",
            payload.len(),
            time.elapsed().as_millis()
        );
        Ok(())
    }
}

// Appends rather than inserts so a repeated name keeps every value.
fn to_header_map(headers: &HashMap<String, String>) -> Result<HeaderMap, ForwardError> {
    let mut header_map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ForwardError::RequestConstruction(format!("invalid header name '{name}': {e}"))
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| {
            ForwardError::RequestConstruction(format!("invalid value for header '{name}': {e}"))
        })?;
        header_map.append(header_name, header_value);
    }
    Ok(header_map)
}
