//! Pushgateway client
//!
//! Delivers a gathered metric family to a Prometheus Pushgateway under
//! `/metrics/job/<job>` plus any configured grouping labels. The body is the
//! Prometheus text exposition format. One call is one HTTP request; there is
//! no retry.

use crate::config::{GatewayConfig, PushMethod};
use crate::error::{AppError, AppResult, PublishError};
use crate::metrics::encode_families;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE;
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, TextEncoder};
use reqwest::Url;
use std::collections::BTreeMap;
use std::time::Duration;

/// Destination for metric pushes
#[async_trait]
pub trait Pusher: Send + Sync {
    /// Address used in reports
    fn endpoint(&self) -> &str;

    /// Push `families` grouped under `job`
    async fn push(&self, job: &str, families: &[MetricFamily]) -> Result<(), PublishError>;
}

/// HTTP client for a Prometheus Pushgateway
pub struct PushgatewayClient {
    client: reqwest::Client,
    base: Url,
    endpoint: String,
    method: PushMethod,
    timeout: Duration,
    grouping: BTreeMap<String, String>,
}

impl PushgatewayClient {
    /// Build a client from gateway settings
    ///
    /// Accepts `host:port` addresses (an `http://` scheme is assumed) as well
    /// as full URLs. No connection is made here.
    ///
    /// # Errors
    ///
    /// Returns `AppError::HttpClient` if the address is not a usable base URL
    /// or the HTTP client cannot be created.
    pub fn new(config: &GatewayConfig) -> AppResult<Self> {
        let endpoint = normalize_address(&config.address);
        let base = Url::parse(&endpoint).map_err(|e| {
            AppError::HttpClient(format!("invalid gateway address '{}': {}", config.address, e))
        })?;
        if base.cannot_be_a_base() {
            return Err(AppError::HttpClient(format!(
                "invalid gateway address '{}': not a base URL",
                config.address
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::HttpClient(format!("failed to build HTTP client: {}", e)))?;

        tracing::debug!(
            endpoint = %endpoint,
            method = ?config.method,
            timeout_seconds = config.timeout_seconds,
            "Pushgateway client created"
        );

        Ok(Self {
            client,
            base,
            endpoint,
            method: config.method,
            timeout: config.timeout(),
            grouping: config.grouping.clone(),
        })
    }

    /// URL that pushes for `job` are sent to
    ///
    /// Job and grouping values that are empty or contain `/` use the
    /// gateway's `<label>@base64/<value>` form. Other values are
    /// percent-encoded as path segments.
    pub fn push_url(&self, job: &str) -> Result<Url, PublishError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| self.push_error(format!("'{}' is not a base URL", self.base)))?;
            segments.pop_if_empty().push("metrics");
            let grouping = self
                .grouping
                .iter()
                .map(|(label, value)| (label.as_str(), value.as_str()));
            for (label, value) in std::iter::once(("job", job)).chain(grouping) {
                let (label, value) = grouping_segments(label, value);
                segments.extend([label.as_str(), value.as_str()]);
            }
        }
        Ok(url)
    }

    fn push_error(&self, reason: String) -> PublishError {
        PublishError::EndpointPush {
            endpoint: self.endpoint.clone(),
            reason,
        }
    }
}

#[async_trait]
impl Pusher for PushgatewayClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn push(&self, job: &str, families: &[MetricFamily]) -> Result<(), PublishError> {
        let url = self.push_url(job)?;
        let body = encode_families(families)
            .map_err(|e| self.push_error(format!("failed to encode metrics: {}", e)))?;

        let request = match self.method {
            PushMethod::Put => self.client.put(url.clone()),
            PushMethod::Post => self.client.post(url.clone()),
        };

        let response = request
            .header(reqwest::header::CONTENT_TYPE, TextEncoder::new().format_type())
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    self.push_error(format!(
                        "request timed out after {} seconds",
                        self.timeout.as_secs()
                    ))
                } else {
                    self.push_error(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(self.push_error(format!("{} {}", status, detail.trim())));
        }

        tracing::debug!(url = %url, status = %status, "Push accepted");
        Ok(())
    }
}

/// Path segments for one grouping key label and its value
fn grouping_segments(label: &str, value: &str) -> (String, String) {
    if value.is_empty() {
        // A lone `=` is the base64 form of an empty value
        (format!("{}@base64", label), "=".to_string())
    } else if value.contains('/') {
        (format!("{}@base64", label), URL_SAFE.encode(value))
    } else {
        (label.to_string(), value.to_string())
    }
}

/// Prepend `http://` to addresses given as `host:port`
pub fn normalize_address(address: &str) -> String {
    let address = address.trim();
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}
