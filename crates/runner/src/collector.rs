// Copyright 2025 Loadgauge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Single-request sample collection.
//!
//! A [`Collector`] turns one [`RequestSpec`] into one [`Sample`]. Expected
//! network failures (timeouts, refused or dropped connections, unaccepted
//! status codes) are data, not errors: they come back as samples with the
//! matching [`Outcome`]. Only a request that cannot be built at all is a
//! [`ConfigurationError`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use loadgauge_core::{
    ConfigurationError, HttpMethod, Outcome, RequestSpec, Sample, UnreachableTargetError,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Executes requests and measures them.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Issue one request and record its latency and outcome.
    async fn collect(
        &self,
        operation_name: &str,
        request: &RequestSpec,
        timeout: Duration,
    ) -> Result<Sample, ConfigurationError>;

    /// Pre-flight reachability check against the target base URL.
    ///
    /// Any HTTP response counts as reachable.
    async fn probe(&self, base_url: &str, timeout: Duration) -> Result<(), UnreachableTargetError>;
}

/// [`Collector`] backed by a pooled `reqwest` client.
///
/// Redirects are not followed so that a `302` is observable as such.
#[derive(Debug, Clone)]
pub struct HttpCollector {
    client: reqwest::Client,
}

impl HttpCollector {
    /// Create a collector with its own connection pool.
    pub fn new() -> Result<Self, ConfigurationError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("loadgauge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigurationError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn build_request(
        &self,
        operation_name: &str,
        request: &RequestSpec,
        timeout: Duration,
    ) -> Result<reqwest::RequestBuilder, ConfigurationError> {
        let (url, headers) = parse_request(operation_name, request)?;
        let mut builder = self
            .client
            .request(to_method(request.method), url)
            .headers(headers)
            .timeout(timeout);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        Ok(builder)
    }
}

/// Check that a request spec can be turned into an HTTP request.
pub fn validate_request(operation_name: &str, request: &RequestSpec) -> Result<(), ConfigurationError> {
    parse_request(operation_name, request).map(|_| ())
}

fn parse_request(
    operation_name: &str,
    request: &RequestSpec,
) -> Result<(Url, HeaderMap), ConfigurationError> {
    let url = Url::parse(&request.url).map_err(|e| {
        ConfigurationError::malformed_request(
            operation_name,
            format!("invalid url '{}': {}", request.url, e),
        )
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigurationError::malformed_request(
            operation_name,
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    let mut headers = HeaderMap::new();
    for (name, value) in &request.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ConfigurationError::malformed_request(
                operation_name,
                format!("invalid header name '{}': {}", name, e),
            )
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            ConfigurationError::malformed_request(
                operation_name,
                format!("invalid value for header '{}': {}", name, e),
            )
        })?;
        headers.append(name, value);
    }
    Ok((url, headers))
}

#[async_trait]
impl Collector for HttpCollector {
    async fn collect(
        &self,
        operation_name: &str,
        request: &RequestSpec,
        timeout: Duration,
    ) -> Result<Sample, ConfigurationError> {
        let builder = self.build_request(operation_name, request, timeout)?;

        let timestamp = Utc::now();
        let started = Instant::now();

        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => return classify_error(operation_name, timestamp, started, timeout, err),
        };
        let status = response.status().as_u16();

        // Latency covers the full body, not just the headers.
        if let Err(err) = response.bytes().await {
            return classify_error(operation_name, timestamp, started, timeout, err);
        }
        let latency_ms = elapsed_ms(started);

        if request.accepts(status) {
            Ok(Sample::success(operation_name, timestamp, latency_ms, status))
        } else {
            debug!(operation = %operation_name, status, "unexpected status");
            Ok(Sample::http_error(operation_name, timestamp, latency_ms, status))
        }
    }

    async fn probe(&self, base_url: &str, timeout: Duration) -> Result<(), UnreachableTargetError> {
        let unreachable = |reason: String| UnreachableTargetError {
            base_url: base_url.to_string(),
            reason,
        };
        let url = Url::parse(base_url).map_err(|e| unreachable(e.to_string()))?;

        match self.client.get(url).timeout(timeout).send().await {
            Ok(response) if response.status().is_success() => {
                info!(base_url = %base_url, status = response.status().as_u16(), "Target reachable");
                Ok(())
            }
            Ok(response) => {
                warn!(
                    base_url = %base_url,
                    status = response.status().as_u16(),
                    "Target reachable but answered with a non-success status"
                );
                Ok(())
            }
            Err(err) => Err(unreachable(error_chain(&err))),
        }
    }
}

fn classify_error(
    operation_name: &str,
    timestamp: DateTime<Utc>,
    started: Instant,
    timeout: Duration,
    err: reqwest::Error,
) -> Result<Sample, ConfigurationError> {
    if err.is_builder() {
        return Err(ConfigurationError::malformed_request(
            operation_name,
            err.to_string(),
        ));
    }
    let detail = error_chain(&err);
    if err.is_timeout() {
        debug!(operation = %operation_name, "request timed out");
        Ok(Sample::failure(
            operation_name,
            timestamp,
            timeout.as_secs_f64() * 1000.0,
            Outcome::Timeout,
            detail,
        ))
    } else {
        debug!(operation = %operation_name, error = %detail, "request failed");
        Ok(Sample::failure(
            operation_name,
            timestamp,
            elapsed_ms(started),
            Outcome::ConnectionError,
            detail,
        ))
    }
}

/// Flatten an error and its sources into one line.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Head => Method::HEAD,
    }
}
