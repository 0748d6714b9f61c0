//! Batch delivery with per-record fallback

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::client::{truncate, HrApi};
use crate::error::ForwardResult;
use crate::record::OutboundRecord;

/// Pause between single-record sends after a refused batch
pub const DEFAULT_INDIVIDUAL_DELAY: Duration = Duration::from_millis(500);

/// Outcome of a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SendStatus {
    /// The batch was accepted as a whole
    Success,
    /// The batch was refused but at least one single send went through
    PartialSuccess,
    /// Nothing was delivered
    Error,
}

/// A record the HR API did not accept
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRecord {
    pub emp_no: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What happened to a batch
#[derive(Debug, Clone, PartialEq)]
pub struct SendReport {
    pub status: SendStatus,
    pub total: usize,
    /// Records the HR API accepted, in send order
    pub delivered: Vec<OutboundRecord>,
    pub failed: Vec<FailedRecord>,
    /// Status of the batch request
    pub batch_status: u16,
    /// Batch response body; JSON when it parses, text otherwise
    pub api_response: Value,
}

impl SendReport {
    pub fn sent(&self) -> usize {
        self.delivered.len()
    }

    pub fn any_delivered(&self) -> bool {
        !self.delivered.is_empty()
    }

    /// Human-readable line for the last-send record
    pub fn summary(&self) -> String {
        match self.status {
            SendStatus::Success => format!("Sent {} records", self.total),
            _ => format!(
                "Sent {} out of {} records individually",
                self.sent(),
                self.total
            ),
        }
    }
}

/// Sends formatted records to the HR API
#[derive(Clone)]
pub struct Forwarder {
    api: Arc<dyn HrApi>,
    individual_delay: Duration,
}

impl Forwarder {
    pub fn new(api: Arc<dyn HrApi>) -> Self {
        Self {
            api,
            individual_delay: DEFAULT_INDIVIDUAL_DELAY,
        }
    }

    pub fn with_individual_delay(mut self, delay: Duration) -> Self {
        self.individual_delay = delay;
        self
    }

    pub fn api(&self) -> &Arc<dyn HrApi> {
        &self.api
    }

    /// POST all records as one batch; on refusal resend them one at a time.
    ///
    /// Fails only when the batch request itself cannot be sent.
    pub async fn send_batch(&self, api_url: &str, records: &[OutboundRecord]) -> ForwardResult<SendReport> {
        tracing::info!(count = records.len(), "Sending attendance batch to HR API");

        let batch = self.api.post_batch(api_url, records).await?;
        let api_response = serde_json::from_str(&batch.body)
            .unwrap_or_else(|_| Value::String(truncate(&batch.body, 500)));

        if batch.is_success() {
            tracing::info!(status = batch.status, count = records.len(), "Batch accepted");
            return Ok(SendReport {
                status: SendStatus::Success,
                total: records.len(),
                delivered: records.to_vec(),
                failed: Vec::new(),
                batch_status: batch.status,
                api_response,
            });
        }

        tracing::warn!(
            status = batch.status,
            "Batch request failed, trying individual records"
        );

        let mut delivered = Vec::new();
        let mut failed = Vec::new();

        for (index, record) in records.iter().enumerate() {
            if index > 0 && !self.individual_delay.is_zero() {
                tokio::time::sleep(self.individual_delay).await;
            }

            match self.api.post_batch(api_url, std::slice::from_ref(record)).await {
                Ok(response) if response.is_success() => {
                    tracing::debug!(emp_no = record.emp_no, "Record accepted");
                    delivered.push(record.clone());
                }
                Ok(response) => {
                    tracing::warn!(emp_no = record.emp_no, status = response.status, "Record refused");
                    failed.push(FailedRecord {
                        emp_no: record.emp_no,
                        status_code: Some(response.status),
                        response: Some(truncate(&response.body, 100)),
                        error: None,
                    });
                }
                Err(e) => {
                    tracing::error!(emp_no = record.emp_no, error = %e, "Error sending record");
                    failed.push(FailedRecord {
                        emp_no: record.emp_no,
                        status_code: None,
                        response: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let status = if delivered.is_empty() {
            SendStatus::Error
        } else {
            SendStatus::PartialSuccess
        };
        tracing::info!(
            sent = delivered.len(),
            failed = failed.len(),
            total = records.len(),
            "Individual sends finished"
        );

        Ok(SendReport {
            status,
            total: records.len(),
            delivered,
            failed,
            batch_status: batch.status,
            api_response,
        })
    }
}
