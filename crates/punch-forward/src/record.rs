//! Outbound record format

use punch_core::{AttendanceRecord, PunchLabels, DATETIME_FORMAT, DATE_FORMAT};
use serde::{Deserialize, Serialize};

/// Device code sent with every record unless configured otherwise
pub const DEFAULT_DEVICE_CODE: &str = "111";

/// One punch as the HR ingestion API expects it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundRecord {
    pub emp_no: i64,
    pub device_id: String,
    /// Numeric punch label ("1".."6" or "Unknown")
    pub punch_type: String,
    /// `YYYY-MM-DD`
    pub punch_date: String,
    /// `YYYY-MM-DD HH:MM:SS`
    pub punch_time: String,
}

impl OutboundRecord {
    /// Format a device punch; `None` when the user id is not an integer
    pub fn from_record(record: &AttendanceRecord, device_code: &str) -> Option<Self> {
        let emp_no = record.user_id.trim().parse::<i64>().ok()?;
        Some(Self {
            emp_no,
            device_id: device_code.to_string(),
            punch_type: PunchLabels::Numeric.label(record.punch).to_string(),
            punch_date: record.timestamp.format(DATE_FORMAT).to_string(),
            punch_time: record.timestamp.format(DATETIME_FORMAT).to_string(),
        })
    }
}

/// A punch that could not be formatted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub user_id: String,
    pub timestamp: String,
    pub reason: String,
}

/// Format every record, setting aside the ones with a non-integer user id
pub fn format_records(
    records: &[AttendanceRecord],
    device_code: &str,
) -> (Vec<OutboundRecord>, Vec<SkippedRecord>) {
    let mut formatted = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();

    for record in records {
        match OutboundRecord::from_record(record, device_code) {
            Some(out) => formatted.push(out),
            None => {
                tracing::warn!(user_id = %record.user_id, "Skipping punch with non-numeric user id");
                skipped.push(SkippedRecord {
                    user_id: record.user_id.clone(),
                    timestamp: record.timestamp.format(DATETIME_FORMAT).to_string(),
                    reason: "user id is not an integer".to_string(),
                });
            }
        }
    }

    (formatted, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use pretty_assertions::assert_eq;

    fn punch(user: &str, code: u8) -> AttendanceRecord {
        let ts = NaiveDateTime::parse_from_str("2024-01-10 08:01:00", DATETIME_FORMAT).unwrap();
        AttendanceRecord::new(user, ts, code)
    }

    #[test]
    fn test_outbound_format() {
        let out = OutboundRecord::from_record(&punch("0042", 1), DEFAULT_DEVICE_CODE).unwrap();
        assert_eq!(
            serde_json::to_value(&out).unwrap(),
            serde_json::json!({
                "emp_no": 42,
                "device_id": "111",
                "punch_type": "2",
                "punch_date": "2024-01-10",
                "punch_time": "2024-01-10 08:01:00"
            })
        );
    }

    #[test]
    fn test_non_integer_ids_are_skipped() {
        let (formatted, skipped) =
            format_records(&[punch("7", 0), punch("A-17", 0), punch("", 9)], "9");

        assert_eq!(formatted.len(), 1);
        assert_eq!(formatted[0].device_id, "9");
        let ids: Vec<&str> = skipped.iter().map(|s| s.user_id.as_str()).collect();
        assert_eq!(ids, vec!["A-17", ""]);
    }
}
