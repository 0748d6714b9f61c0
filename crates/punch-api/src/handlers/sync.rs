//! Forwarding punches to the HR API

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Local;
use punch_core::RecordFilter;
use punch_forward::{format_records, FailedRecord, SendStatus, SkippedRecord};
use punch_store::LastSend;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::attendance::{load_records, parse_date};
use crate::error::ApiError;
use crate::extract::{DeviceSelection, JsonBody};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendAttendanceRequest {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendAttendanceResponse {
    pub status: SendStatus,
    pub message: String,
    pub records_sent: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records_failed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_records: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_records: Option<Vec<FailedRecord>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_records: Vec<SkippedRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_response: Option<Value>,
    /// Present on failure so callers can tell it apart from other errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

impl SendAttendanceResponse {
    fn nothing_to_send(message: &str, skipped_records: Vec<SkippedRecord>) -> Self {
        Self {
            status: SendStatus::Success,
            message: message.to_string(),
            records_sent: 0,
            records_failed: None,
            total_records: None,
            failed_records: None,
            skipped_records,
            api_response: None,
            error: None,
        }
    }
}

/// POST /api/send-attendance
///
/// Sends the punches between `start_date` and `end_date` (inclusive) to the
/// configured attendance URL.
pub async fn send_attendance(
    State(state): State<AppState>,
    selection: DeviceSelection,
    JsonBody(request): JsonBody<SendAttendanceRequest>,
) -> Result<Response, ApiError> {
    let (Some(start), Some(end)) = (
        parse_date("start_date", request.start_date.as_deref())?,
        parse_date("end_date", request.end_date.as_deref())?,
    ) else {
        return Err(ApiError::validation("Start date and end date are required"));
    };
    if start > end {
        return Err(ApiError::validation("start_date must not be after end_date"));
    }

    let api_url = state.registry().snapshot().attendance_api_url;
    if api_url.trim().is_empty() {
        return Err(ApiError::validation(
            "No API URL configured. Please set the attendance API URL in the settings.",
        ));
    }
    if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
        return Err(ApiError::Validation(format!(
            "Invalid API URL format: {api_url}. URL must start with http:// or https://"
        )));
    }

    let records = load_records(&state, &selection, RecordFilter::between(start, end)).await?;
    if records.is_empty() {
        return Ok(Json(SendAttendanceResponse::nothing_to_send(
            "No attendance records found in the specified date range",
            Vec::new(),
        ))
        .into_response());
    }

    let (formatted, skipped) = format_records(&records, state.device_code());
    if formatted.is_empty() {
        return Ok(Json(SendAttendanceResponse::nothing_to_send(
            "No records with a numeric employee id in the specified date range",
            skipped,
        ))
        .into_response());
    }

    let report = state.forwarder().send_batch(&api_url, &formatted).await?;

    if report.any_delivered() {
        let now = Local::now().naive_local();
        let preview = report
            .delivered
            .iter()
            .filter_map(|r| serde_json::to_value(r).ok())
            .collect();
        let send = LastSend::new(now, report.sent(), report.summary(), preview);
        let recorded = state
            .with_registry(move |registry| registry.record_send(send))
            .await;
        if let Err(e) = recorded {
            tracing::error!(error = %e, "Failed to record last successful send");
        }
        state.mark_synced(now);
    }

    let response = match report.status {
        SendStatus::Success => SendAttendanceResponse {
            status: SendStatus::Success,
            message: format!(
                "Successfully sent {} attendance records to API",
                report.total
            ),
            records_sent: report.sent(),
            records_failed: None,
            total_records: Some(report.total),
            failed_records: None,
            skipped_records: skipped,
            api_response: Some(report.api_response),
            error: None,
        },
        SendStatus::PartialSuccess => SendAttendanceResponse {
            status: SendStatus::PartialSuccess,
            message: format!(
                "Successfully sent {} out of {} attendance records to API individually",
                report.sent(),
                report.total
            ),
            records_sent: report.sent(),
            records_failed: Some(report.failed.len()),
            total_records: Some(report.total),
            failed_records: Some(report.failed),
            skipped_records: skipped,
            api_response: None,
            error: None,
        },
        SendStatus::Error => {
            tracing::error!(
                batch_status = report.batch_status,
                failed = report.failed.len(),
                "Failed to send any attendance records"
            );
            let body = SendAttendanceResponse {
                status: SendStatus::Error,
                message: "Failed to send any attendance records to API".to_string(),
                records_sent: 0,
                records_failed: Some(report.failed.len()),
                total_records: Some(report.total),
                failed_records: Some(report.failed),
                skipped_records: skipped,
                api_response: Some(report.api_response),
                error: Some("upstream"),
            };
            return Ok((StatusCode::BAD_GATEWAY, Json(body)).into_response());
        }
    };

    Ok(Json(response).into_response())
}
