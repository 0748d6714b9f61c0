//! Attendance handlers
//!
//! Three views over the same filtered punches: the flat list, the lossy
//! first/last summary per day, and the lossless per-day timeline.

use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use punch_core::shaping::{day_summaries, timelines};
use punch_core::{
    AttendanceRecord, DaySummary, PunchLabels, RecordFilter, TimelineEntry, DATETIME_FORMAT,
    DATE_FORMAT,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::DeviceSelection;
use crate::state::AppState;

/// Filters shared by every attendance view
#[derive(Debug, Default, Deserialize)]
pub struct AttendanceQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub emp_no: Option<String>,
}

impl AttendanceQuery {
    pub fn to_filter(&self) -> Result<RecordFilter, ApiError> {
        Ok(RecordFilter {
            start: parse_date("start_date", self.start_date.as_deref())?,
            end: parse_date("end_date", self.end_date.as_deref())?,
            emp_no: self
                .emp_no
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        })
    }
}

/// Parse an optional `YYYY-MM-DD` parameter; blank means absent
pub fn parse_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Some)
            .map_err(|_| ApiError::Validation(format!("Invalid {field} '{s}', expected YYYY-MM-DD"))),
    }
}

#[derive(Serialize)]
pub struct PunchView {
    pub uid: u16,
    pub user_id: String,
    /// `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
    /// Numeric label ("1".."6" or "Unknown")
    pub punch: &'static str,
    /// Raw punch code
    pub punch_type: u8,
    pub status: u8,
}

impl From<&AttendanceRecord> for PunchView {
    fn from(record: &AttendanceRecord) -> Self {
        Self {
            uid: record.uid,
            user_id: record.user_id.clone(),
            timestamp: record.timestamp.format(DATETIME_FORMAT).to_string(),
            punch: PunchLabels::Numeric.label(record.punch),
            punch_type: record.punch,
            status: record.status,
        }
    }
}

#[derive(Serialize)]
pub struct AttendanceResponse {
    pub status: &'static str,
    pub attendance: Vec<PunchView>,
    pub count: usize,
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub status: &'static str,
    /// user id -> date -> first/last punch
    pub data: BTreeMap<String, BTreeMap<String, DaySummary>>,
    pub count: usize,
}

#[derive(Serialize)]
pub struct TimelineResponse {
    pub status: &'static str,
    /// user id -> date -> every punch in order
    pub data: BTreeMap<String, BTreeMap<String, Vec<TimelineEntry>>>,
    pub count: usize,
}

/// Read every punch from the resolved device and apply `filter`
pub async fn load_records(
    state: &AppState,
    selection: &DeviceSelection,
    filter: RecordFilter,
) -> Result<Vec<AttendanceRecord>, ApiError> {
    let records = state
        .with_active_device(selection, |lease| lease.list_attendance())
        .await?;
    let total = records.len();
    let records = filter.apply(records);

    tracing::debug!(total, kept = records.len(), ?filter, "Filtered attendance");
    Ok(records)
}

/// GET /api/attendance
pub async fn list_attendance(
    State(state): State<AppState>,
    selection: DeviceSelection,
    Query(query): Query<AttendanceQuery>,
) -> Result<Json<AttendanceResponse>, ApiError> {
    let filter = query.to_filter()?;
    let records = load_records(&state, &selection, filter).await?;

    Ok(Json(AttendanceResponse {
        status: "success",
        count: records.len(),
        attendance: records.iter().map(PunchView::from).collect(),
    }))
}

/// GET /api/attendance/summary
pub async fn attendance_summary(
    State(state): State<AppState>,
    selection: DeviceSelection,
    Query(query): Query<AttendanceQuery>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let filter = query.to_filter()?;
    let records = load_records(&state, &selection, filter).await?;

    Ok(Json(SummaryResponse {
        status: "success",
        data: day_summaries(&records),
        count: records.len(),
    }))
}

/// GET /api/attendance/timeline
pub async fn attendance_timeline(
    State(state): State<AppState>,
    selection: DeviceSelection,
    Query(query): Query<AttendanceQuery>,
) -> Result<Json<TimelineResponse>, ApiError> {
    let filter = query.to_filter()?;
    let records = load_records(&state, &selection, filter).await?;

    Ok(Json(TimelineResponse {
        status: "success",
        data: timelines(&records, PunchLabels::Semantic),
        count: records.len(),
    }))
}
