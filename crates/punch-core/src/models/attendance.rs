//! Attendance (punch) models

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A single punch recorded by the device.
///
/// Timestamps are the device's local wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Device slot of the user who punched
    #[serde(default)]
    pub uid: u16,
    /// Employee identifier
    pub user_id: String,
    /// Local time of the punch
    pub timestamp: NaiveDateTime,
    /// Verification status reported by the device
    #[serde(default)]
    pub status: u8,
    /// Punch code (check in/out, break, overtime)
    #[serde(default)]
    pub punch: u8,
}

impl AttendanceRecord {
    pub fn new(user_id: impl Into<String>, timestamp: NaiveDateTime, punch: u8) -> Self {
        Self {
            uid: 0,
            user_id: user_id.into(),
            timestamp,
            status: 0,
            punch,
        }
    }

    /// Calendar date of the punch (`YYYY-MM-DD`)
    pub fn date_key(&self) -> String {
        self.timestamp.format(DATE_FORMAT).to_string()
    }

    /// Time of day of the punch (`HH:MM:SS`)
    pub fn time_key(&self) -> String {
        self.timestamp.format(TIME_FORMAT).to_string()
    }
}

/// Date format used in every JSON view
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Time-of-day format used in every JSON view
pub const TIME_FORMAT: &str = "%H:%M:%S";
/// Full timestamp format used in every JSON view
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
