//! Attendance shaping - grouping punches by user and calendar date
//!
//! Two presentations exist and each endpoint picks exactly one:
//! - [`day_summaries`] collapses a day to its first and last punch (lossy)
//! - [`timelines`] keeps every punch of the day in order (lossless)

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::AttendanceRecord;
use crate::punch::PunchLabels;

/// Punches of one user keyed by `YYYY-MM-DD`, each day sorted ascending
pub type DayGroups<'a> = BTreeMap<String, Vec<&'a AttendanceRecord>>;

/// First and last punch of a day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySummary {
    pub check_in: String,
    pub check_out: String,
}

/// One punch in a lossless day timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub time: String,
    pub punch_type: String,
}

/// Group records by user id, then by local calendar date.
///
/// Within a date the records are sorted by timestamp ascending.
pub fn group_by_user_and_date(
    records: &[AttendanceRecord],
) -> BTreeMap<String, DayGroups<'_>> {
    let mut grouped: BTreeMap<String, DayGroups<'_>> = BTreeMap::new();

    for record in records {
        grouped
            .entry(record.user_id.clone())
            .or_default()
            .entry(record.date_key())
            .or_default()
            .push(record);
    }

    for days in grouped.values_mut() {
        for punches in days.values_mut() {
            punches.sort_by_key(|r| r.timestamp);
        }
    }

    grouped
}

/// Collapse each day to `{check_in, check_out}`; drops intermediate punches
pub fn day_summaries(
    records: &[AttendanceRecord],
) -> BTreeMap<String, BTreeMap<String, DaySummary>> {
    group_by_user_and_date(records)
        .into_iter()
        .map(|(user_id, days)| (user_id, summarize(days)))
        .collect()
}

/// Day summaries for records already known to belong to one user
pub fn summarize_user(records: &[AttendanceRecord]) -> BTreeMap<String, DaySummary> {
    group_by_user_and_date(records)
        .into_values()
        .flat_map(summarize)
        .collect()
}

/// Keep every punch, ordered, labelled with `labels`
pub fn timelines(
    records: &[AttendanceRecord],
    labels: PunchLabels,
) -> BTreeMap<String, BTreeMap<String, Vec<TimelineEntry>>> {
    group_by_user_and_date(records)
        .into_iter()
        .map(|(user_id, days)| {
            let days = days
                .into_iter()
                .map(|(date, punches)| {
                    let entries = punches
                        .into_iter()
                        .map(|r| TimelineEntry {
                            time: r.time_key(),
                            punch_type: labels.label(r.punch).to_string(),
                        })
                        .collect();
                    (date, entries)
                })
                .collect();
            (user_id, days)
        })
        .collect()
}

fn summarize(days: DayGroups<'_>) -> BTreeMap<String, DaySummary> {
    days.into_iter()
        .filter_map(|(date, punches)| {
            // Groups are sorted, so first/last are min/max
            let first = punches.first()?;
            let last = punches.last()?;
            Some((
                date,
                DaySummary {
                    check_in: first.time_key(),
                    check_out: last.time_key(),
                },
            ))
        })
        .collect()
}

/// Date-range and employee filter applied before shaping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// First day included
    pub start: Option<NaiveDate>,
    /// Last day included (the whole day)
    pub end: Option<NaiveDate>,
    /// Exact employee identifier
    pub emp_no: Option<String>,
}

impl RecordFilter {
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            emp_no: None,
        }
    }

    pub fn with_emp_no(mut self, emp_no: impl Into<String>) -> Self {
        self.emp_no = Some(emp_no.into());
        self
    }

    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        let day = record.timestamp.date();
        if self.start.is_some_and(|start| day < start) {
            return false;
        }
        if self.end.is_some_and(|end| day > end) {
            return false;
        }
        match &self.emp_no {
            Some(emp_no) => record.user_id == *emp_no,
            None => true,
        }
    }

    pub fn apply(&self, records: Vec<AttendanceRecord>) -> Vec<AttendanceRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}
