//! Simulated connector and session

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use parking_lot::RwLock;
use punch_core::{
    next_free_uid, AttendanceRecord, DeviceConnector, DeviceEndpoint, DeviceError, DeviceInfo,
    DeviceResult, DeviceSession, NewUser, UserRecord,
};

use crate::device::SimDevice;

type Devices = Arc<RwLock<HashMap<String, SimDevice>>>;

/// Connector backed by in-memory devices.
///
/// Clones share the same devices and session counter, so a test can keep a
/// handle while the gateway owns another.
#[derive(Debug, Clone, Default)]
pub struct SimulatedConnector {
    devices: Devices,
    open_sessions: Arc<AtomicUsize>,
    connects: Arc<AtomicUsize>,
}

impl SimulatedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// One device at 192.168.1.201:4370 with a few users and punches for
    /// today and yesterday
    pub fn demo() -> Self {
        let today = Local::now().date_naive();
        let yesterday = today.pred_opt().unwrap_or(today);
        let at = |day: NaiveDate, h: u32, m: u32| {
            day.and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN))
        };

        let mut device = SimDevice::new("DEMO0000001")
            .with_user(1, "1", "Administrator")
            .with_user(2, "1001", "Alice Nguyen")
            .with_user(3, "1002", "Bao Tran")
            .with_user(4, "1003", "Chi Le")
            .with_punch("1001", at(yesterday, 8, 2), 0)
            .with_punch("1001", at(yesterday, 12, 0), 2)
            .with_punch("1001", at(yesterday, 13, 1), 3)
            .with_punch("1001", at(yesterday, 17, 30), 1)
            .with_punch("1002", at(yesterday, 7, 55), 0)
            .with_punch("1002", at(yesterday, 16, 45), 1)
            .with_punch("1001", at(today, 8, 5), 0)
            .with_punch("1003", at(today, 9, 12), 0);

        if let Some(admin) = device.users.first_mut() {
            admin.privilege = punch_core::USER_ADMIN;
        }

        Self::new().with_device("192.168.1.201", 4370, device)
    }

    /// Add a device at `ip:port`
    pub fn with_device(self, ip: &str, port: u16, device: SimDevice) -> Self {
        self.insert(ip, port, device);
        self
    }

    /// Add or replace a device at `ip:port`
    pub fn insert(&self, ip: &str, port: u16, device: SimDevice) {
        self.devices.write().insert(key(ip, port), device);
    }

    /// Toggle whether the device at `ip:port` answers
    pub fn set_reachable(&self, ip: &str, port: u16, reachable: bool) {
        if let Some(device) = self.devices.write().get_mut(&key(ip, port)) {
            device.reachable = reachable;
        }
    }

    /// Copy of the device at `ip:port`
    pub fn device(&self, ip: &str, port: u16) -> Option<SimDevice> {
        self.devices.read().get(&key(ip, port)).cloned()
    }

    /// Append a punch to the device at `ip:port`
    pub fn push_punch(&self, ip: &str, port: u16, user_id: &str, timestamp: NaiveDateTime, punch: u8) {
        if let Some(device) = self.devices.write().get_mut(&key(ip, port)) {
            device
                .attendance
                .push(AttendanceRecord::new(user_id, timestamp, punch));
        }
    }

    /// Sessions opened and not yet disconnected
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    /// Successful handshakes so far
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl DeviceConnector for SimulatedConnector {
    fn connect(&self, endpoint: &DeviceEndpoint) -> DeviceResult<Box<dyn DeviceSession>> {
        let key = key(&endpoint.ip, endpoint.port);

        let latency = {
            let devices = self.devices.read();
            let device = devices.get(&key).ok_or_else(|| {
                DeviceError::ConnectionFailed(format!("no device answering at {endpoint}"))
            })?;
            if !device.reachable {
                return Err(DeviceError::ConnectionFailed(format!(
                    "device at {endpoint} is unreachable"
                )));
            }
            device.latency
        };
        wait(latency, endpoint.timeout)?;

        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        self.connects.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(endpoint = %endpoint, "Simulated device connected");

        Ok(Box::new(SimSession {
            key,
            timeout: endpoint.timeout,
            devices: self.devices.clone(),
            open_sessions: self.open_sessions.clone(),
            connected: true,
        }))
    }
}

/// Open session with a simulated device
struct SimSession {
    key: String,
    timeout: u64,
    devices: Devices,
    open_sessions: Arc<AtomicUsize>,
    connected: bool,
}

impl SimSession {
    /// Run `f` against the device after checking the session is usable
    fn with_device<T>(&self, f: impl FnOnce(&mut SimDevice) -> DeviceResult<T>) -> DeviceResult<T> {
        if !self.connected {
            return Err(DeviceError::ConnectionFailed("session closed".to_string()));
        }
        let latency = {
            let devices = self.devices.read();
            let device = devices
                .get(&self.key)
                .filter(|d| d.reachable)
                .ok_or_else(|| DeviceError::ConnectionFailed(format!("lost device {}", self.key)))?;
            device.latency
        };
        wait(latency, self.timeout)?;

        let mut devices = self.devices.write();
        let device = devices
            .get_mut(&self.key)
            .ok_or_else(|| DeviceError::ConnectionFailed(format!("lost device {}", self.key)))?;
        f(device)
    }

    fn close(&mut self) {
        if self.connected {
            self.connected = false;
            self.open_sessions.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl DeviceSession for SimSession {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn list_users(&mut self) -> DeviceResult<Vec<UserRecord>> {
        self.with_device(|d| Ok(d.users.clone()))
    }

    fn list_attendance(&mut self) -> DeviceResult<Vec<AttendanceRecord>> {
        self.with_device(|d| Ok(d.attendance.clone()))
    }

    fn device_info(&mut self) -> DeviceResult<DeviceInfo> {
        self.with_device(|d| Ok(d.info.clone()))
    }

    fn upsert_user(&mut self, user: &NewUser) -> DeviceResult<u16> {
        self.with_device(|d| {
            let existing = d.users.iter().position(|u| u.user_id == user.user_id);
            let uid = match (user.uid, existing) {
                (Some(uid), _) => uid,
                (None, Some(idx)) => d.users[idx].uid,
                (None, None) => next_free_uid(d.users.iter().map(|u| &u.uid))
                    .ok_or_else(|| DeviceError::InvalidRequest("no free user slot".to_string()))?,
            };
            if uid == 0 {
                return Err(DeviceError::InvalidRequest("uid 0 is reserved".to_string()));
            }

            let record = UserRecord {
                uid,
                user_id: user.user_id.clone(),
                name: user.name.clone(),
                privilege: user.privilege,
                password: user.password.clone(),
                group_id: user.group_id.clone(),
                card: user.card,
            };

            // A slot holds one user; writing a slot replaces whoever was there
            d.users.retain(|u| u.uid != uid && u.user_id != user.user_id);
            d.users.push(record);
            d.users.sort_by_key(|u| u.uid);
            Ok(uid)
        })
    }

    fn delete_user(&mut self, user_id: &str) -> DeviceResult<()> {
        self.with_device(|d| {
            let before = d.users.len();
            d.users.retain(|u| u.user_id != user_id);
            if d.users.len() == before {
                return Err(DeviceError::NotFound(format!("user {user_id}")));
            }
            Ok(())
        })
    }

    fn disconnect(&mut self) -> DeviceResult<()> {
        self.close();
        tracing::debug!(device = %self.key, "Simulated device disconnected");
        Ok(())
    }
}

impl Drop for SimSession {
    fn drop(&mut self) {
        self.close();
    }
}

fn key(ip: &str, port: u16) -> String {
    format!("{ip}:{port}")
}

/// Sleep for `latency`, failing once it exceeds `timeout_secs`
fn wait(latency: Duration, timeout_secs: u64) -> DeviceResult<()> {
    let timeout = Duration::from_secs(timeout_secs);
    if latency > timeout {
        std::thread::sleep(timeout);
        return Err(DeviceError::Timeout(timeout_secs));
    }
    if !latency.is_zero() {
        std::thread::sleep(latency);
    }
    Ok(())
}
