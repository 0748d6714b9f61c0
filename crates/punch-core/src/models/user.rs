//! Enrolled user models

use serde::{Deserialize, Serialize};

/// Privilege level of a normal user
pub const USER_DEFAULT: u8 = 0;

/// Privilege level of a device administrator
pub const USER_ADMIN: u8 = 14;

/// Highest usable user slot on a device
pub const MAX_UID: u16 = 65534;

/// A user enrolled on a time-clock.
///
/// Older firmware omits some fields; they default at the deserialization
/// boundary instead of being probed for at use sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Internal slot number on the device
    pub uid: u16,
    /// Employee identifier shown on punches
    pub user_id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Privilege level (0 = user, 14 = admin)
    #[serde(default)]
    pub privilege: u8,
    /// Keypad password
    #[serde(default)]
    pub password: String,
    /// Access group
    #[serde(default)]
    pub group_id: String,
    /// RFID card number (0 = none)
    #[serde(default)]
    pub card: u64,
}

impl UserRecord {
    /// Whether this user holds the admin privilege
    pub fn is_admin(&self) -> bool {
        self.privilege == USER_ADMIN
    }

    /// Human-readable privilege label
    pub fn privilege_label(&self) -> &'static str {
        if self.is_admin() {
            "Admin"
        } else {
            "User"
        }
    }
}

/// Parameters for creating or updating a user on a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// Employee identifier
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Explicit slot; the first free slot is used when `None`
    #[serde(default)]
    pub uid: Option<u16>,
    #[serde(default)]
    pub privilege: u8,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub card: u64,
}

impl NewUser {
    /// A normal user with no password, group or card
    pub fn basic(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            uid: None,
            privilege: USER_DEFAULT,
            password: String::new(),
            group_id: String::new(),
            card: 0,
        }
    }

    /// Pin the user to a specific slot
    pub fn with_uid(mut self, uid: u16) -> Self {
        self.uid = Some(uid);
        self
    }
}

/// Find the lowest slot in `1..=MAX_UID` not present in `used`
pub fn next_free_uid<'a>(used: impl IntoIterator<Item = &'a u16>) -> Option<u16> {
    let taken: std::collections::HashSet<u16> = used.into_iter().copied().collect();
    (1..=MAX_UID).find(|uid| !taken.contains(uid))
}
