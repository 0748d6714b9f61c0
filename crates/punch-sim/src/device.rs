//! State of one simulated device

use std::time::Duration;

use chrono::NaiveDateTime;
use punch_core::{AttendanceRecord, DeviceInfo, UserRecord, USER_DEFAULT};

/// In-memory time-clock
#[derive(Debug, Clone, Default)]
pub struct SimDevice {
    pub info: DeviceInfo,
    pub users: Vec<UserRecord>,
    pub attendance: Vec<AttendanceRecord>,
    /// Unreachable devices refuse the handshake
    pub reachable: bool,
    /// Simulated round-trip time of every call
    pub latency: Duration,
}

impl SimDevice {
    pub fn new(serial_number: impl Into<String>) -> Self {
        Self {
            info: DeviceInfo {
                serial_number: Some(serial_number.into()),
                firmware_version: Some("Ver 6.60 Sep 27 2019".to_string()),
                platform: Some("ZMM220_TFT".to_string()),
                device_name: Some("SimClock".to_string()),
                ..DeviceInfo::default()
            },
            reachable: true,
            ..Self::default()
        }
    }

    pub fn with_info(mut self, info: DeviceInfo) -> Self {
        self.info = info;
        self
    }

    /// Enroll a normal user in slot `uid`
    pub fn with_user(mut self, uid: u16, user_id: impl Into<String>, name: impl Into<String>) -> Self {
        self.users.push(UserRecord {
            uid,
            user_id: user_id.into(),
            name: name.into(),
            privilege: USER_DEFAULT,
            password: String::new(),
            group_id: String::new(),
            card: 0,
        });
        self
    }

    pub fn with_punch(mut self, user_id: impl Into<String>, timestamp: NaiveDateTime, punch: u8) -> Self {
        let user_id = user_id.into();
        let uid = self
            .users
            .iter()
            .find(|u| u.user_id == user_id)
            .map(|u| u.uid)
            .unwrap_or_default();
        let mut record = AttendanceRecord::new(user_id, timestamp, punch);
        record.uid = uid;
        self.attendance.push(record);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }
}
