//! Device boundary - the seam between the gateway and the vendor SDK
//!
//! The gateway never speaks the device protocol itself. A [`DeviceConnector`]
//! opens a [`DeviceSession`]; the session is wrapped in a [`DeviceLease`]
//! that disconnects on every exit path.
//!
//! SDK calls block, so callers in async code run leases on a blocking
//! worker thread.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DeviceError, DeviceResult};
use crate::models::{AttendanceRecord, DeviceInfo, NewUser, UserRecord};

/// Network location and handshake timeout of a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEndpoint {
    pub ip: String,
    pub port: u16,
    /// Handshake / request timeout in seconds
    pub timeout: u64,
}

impl DeviceEndpoint {
    pub fn new(ip: impl Into<String>, port: u16, timeout: u64) -> Self {
        Self {
            ip: ip.into(),
            port,
            timeout,
        }
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl fmt::Display for DeviceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// Opens sessions with time-clock devices.
///
/// Implementations wrap the vendor SDK (or a simulator). A successful
/// return must be a session that reports itself connected.
pub trait DeviceConnector: Send + Sync {
    /// Perform the handshake with the device at `endpoint`
    fn connect(&self, endpoint: &DeviceEndpoint) -> DeviceResult<Box<dyn DeviceSession>>;
}

/// An open session with one device.
///
/// All calls are synchronous and single-shot; no retry happens at this layer.
pub trait DeviceSession: Send {
    /// Whether the underlying handle still reports a live connection
    fn is_connected(&self) -> bool;

    /// List enrolled users
    fn list_users(&mut self) -> DeviceResult<Vec<UserRecord>>;

    /// Read every stored punch
    fn list_attendance(&mut self) -> DeviceResult<Vec<AttendanceRecord>>;

    /// Read identification (serial, firmware, platform, ...)
    fn device_info(&mut self) -> DeviceResult<DeviceInfo>;

    /// Create or overwrite a user; returns the slot that was written
    fn upsert_user(&mut self, user: &NewUser) -> DeviceResult<u16>;

    /// Remove a user by employee identifier
    fn delete_user(&mut self, user_id: &str) -> DeviceResult<()>;

    /// Close the session
    fn disconnect(&mut self) -> DeviceResult<()>;
}

/// Scoped acquisition of a device session.
///
/// The session is disconnected when the lease is dropped, whichever way the
/// owning scope exits. Disconnect failures are logged, never escalated.
pub struct DeviceLease {
    device_id: String,
    session: Option<Box<dyn DeviceSession>>,
}

impl DeviceLease {
    /// Open a lease through `connector`.
    ///
    /// A session that comes back not-connected is closed again and reported
    /// as [`DeviceError::ConnectionFailed`].
    pub fn open(
        connector: &dyn DeviceConnector,
        device_id: impl Into<String>,
        endpoint: &DeviceEndpoint,
    ) -> DeviceResult<Self> {
        let device_id = device_id.into();
        tracing::debug!(device_id = %device_id, endpoint = %endpoint, "Opening device session");

        let session = connector.connect(endpoint)?;
        let lease = Self {
            device_id,
            session: Some(session),
        };

        if !lease.is_connected() {
            return Err(DeviceError::ConnectionFailed(format!(
                "device {} at {} reports not connected",
                lease.device_id, endpoint
            )));
        }

        Ok(lease)
    }

    /// Identifier of the registered device this lease belongs to
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Release explicitly; equivalent to dropping the lease
    pub fn release(self) {}
}

impl Deref for DeviceLease {
    type Target = dyn DeviceSession;

    fn deref(&self) -> &Self::Target {
        // Only `drop` takes the session out
        self.session
            .as_deref()
            .unwrap_or_else(|| unreachable!("device session taken before drop"))
    }
}

impl DerefMut for DeviceLease {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session
            .as_deref_mut()
            .unwrap_or_else(|| unreachable!("device session taken before drop"))
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            match session.disconnect() {
                Ok(()) => tracing::debug!(device_id = %self.device_id, "Device disconnected"),
                Err(e) => tracing::warn!(
                    device_id = %self.device_id,
                    error = %e,
                    "Error disconnecting from device"
                ),
            }
        }
    }
}

impl fmt::Debug for DeviceLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceLease")
            .field("device_id", &self.device_id)
            .field("open", &self.session.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSession {
        connected: bool,
        fail_disconnect: bool,
        disconnects: Arc<AtomicUsize>,
    }

    impl DeviceSession for CountingSession {
        fn is_connected(&self) -> bool {
            self.connected
        }

        fn list_users(&mut self) -> DeviceResult<Vec<UserRecord>> {
            Err(DeviceError::Protocol("garbled frame".to_string()))
        }

        fn list_attendance(&mut self) -> DeviceResult<Vec<AttendanceRecord>> {
            Ok(vec![])
        }

        fn device_info(&mut self) -> DeviceResult<DeviceInfo> {
            Ok(DeviceInfo::default())
        }

        fn upsert_user(&mut self, _user: &NewUser) -> DeviceResult<u16> {
            Ok(1)
        }

        fn delete_user(&mut self, _user_id: &str) -> DeviceResult<()> {
            Ok(())
        }

        fn disconnect(&mut self) -> DeviceResult<()> {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            if self.fail_disconnect {
                Err(DeviceError::Protocol("socket already closed".to_string()))
            } else {
                Ok(())
            }
        }
    }

    struct CountingConnector {
        connected: bool,
        fail_disconnect: bool,
        disconnects: Arc<AtomicUsize>,
    }

    impl DeviceConnector for CountingConnector {
        fn connect(&self, _endpoint: &DeviceEndpoint) -> DeviceResult<Box<dyn DeviceSession>> {
            Ok(Box::new(CountingSession {
                connected: self.connected,
                fail_disconnect: self.fail_disconnect,
                disconnects: self.disconnects.clone(),
            }))
        }
    }

    fn connector(connected: bool, fail_disconnect: bool) -> CountingConnector {
        CountingConnector {
            connected,
            fail_disconnect,
            disconnects: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn endpoint() -> DeviceEndpoint {
        DeviceEndpoint::new("10.0.0.5", 4370, 5)
    }

    #[test]
    fn test_lease_disconnects_on_drop() {
        let conn = connector(true, false);
        {
            let mut lease = DeviceLease::open(&conn, "front", &endpoint()).unwrap();
            assert!(lease.list_attendance().unwrap().is_empty());
        }
        assert_eq!(conn.disconnects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lease_disconnects_on_error_path() {
        let conn = connector(true, false);
        let result = (|| -> DeviceResult<usize> {
            let mut lease = DeviceLease::open(&conn, "front", &endpoint())?;
            let users = lease.list_users()?;
            Ok(users.len())
        })();

        assert!(matches!(result, Err(DeviceError::Protocol(_))));
        assert_eq!(conn.disconnects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lease_rejects_unconnected_handle() {
        let conn = connector(false, false);
        let err = DeviceLease::open(&conn, "front", &endpoint()).unwrap_err();

        assert!(err.is_connection_error());
        // The half-open handle is still released
        assert_eq!(conn.disconnects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_disconnect_is_not_escalated() {
        let conn = connector(true, true);
        let lease = DeviceLease::open(&conn, "front", &endpoint()).unwrap();
        lease.release();
        assert_eq!(conn.disconnects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_endpoint_display() {
        assert_eq!(endpoint().to_string(), "10.0.0.5:4370");
        assert_eq!(endpoint().timeout_duration(), Duration::from_secs(5));
    }
}
