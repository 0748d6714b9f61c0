//! HR API client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use crate::employees::{extract_employees, Employee};
use crate::error::{ForwardError, ForwardResult};
use crate::record::OutboundRecord;

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Connection-test timeout
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Status and body of an HR API response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HrResponse {
    pub status: u16,
    pub body: String,
}

impl HrResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Operations against the HR system.
///
/// `post_batch` and `probe` return the response whatever its status;
/// only transport failures are errors.
#[async_trait]
pub trait HrApi: Send + Sync {
    /// POST `{"data": records}` to `url`
    async fn post_batch(&self, url: &str, records: &[OutboundRecord]) -> ForwardResult<HrResponse>;

    /// GET the employee list at `url`
    async fn fetch_employees(&self, url: &str) -> ForwardResult<Vec<Employee>>;

    /// GET `url` to check that the HR API answers
    async fn probe(&self, url: &str) -> ForwardResult<HrResponse>;
}

#[derive(Serialize)]
struct Batch<'a> {
    data: &'a [OutboundRecord],
}

/// Settings for [`HrClient`]
#[derive(Debug, Clone)]
pub struct HrClientConfig {
    pub timeout: Duration,
    /// Skip TLS certificate verification (self-signed HR servers)
    pub accept_invalid_certs: bool,
}

impl Default for HrClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            accept_invalid_certs: false,
        }
    }
}

/// reqwest-backed [`HrApi`]
#[derive(Debug, Clone)]
pub struct HrClient {
    client: Client,
}

impl HrClient {
    pub fn new() -> ForwardResult<Self> {
        Self::with_config(&HrClientConfig::default())
    }

    pub fn with_config(config: &HrClientConfig) -> ForwardResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if config.accept_invalid_certs {
            tracing::warn!("TLS certificate verification is disabled for HR API requests");
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self { client })
    }

    async fn read(response: reqwest::Response) -> ForwardResult<HrResponse> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HrResponse { status, body })
    }
}

#[async_trait]
impl HrApi for HrClient {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn post_batch(&self, url: &str, records: &[OutboundRecord]) -> ForwardResult<HrResponse> {
        let url = Url::parse(url)?;
        let response = self
            .client
            .post(url)
            .json(&Batch { data: records })
            .send()
            .await?;
        let response = Self::read(response).await?;
        debug!(status = response.status, "HR API answered batch");
        Ok(response)
    }

    #[instrument(skip(self))]
    async fn fetch_employees(&self, url: &str) -> ForwardResult<Vec<Employee>> {
        let url = Url::parse(url)?;
        let response = Self::read(self.client.get(url).send().await?).await?;
        if !response.is_success() {
            return Err(ForwardError::Status {
                status: response.status,
                body: truncate(&response.body, 200),
            });
        }

        let body: serde_json::Value = serde_json::from_str(&response.body)
            .map_err(|e| ForwardError::InvalidResponse(format!("invalid JSON: {e}")))?;
        let employees = extract_employees(body);
        debug!(count = employees.len(), "Fetched employees");
        Ok(employees)
    }

    #[instrument(skip(self))]
    async fn probe(&self, url: &str) -> ForwardResult<HrResponse> {
        let url = Url::parse(url)?;
        let response = self.client.get(url).timeout(PROBE_TIMEOUT).send().await?;
        Self::read(response).await
    }
}

/// Cut `text` to at most `max` characters
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
