//! User handlers

use std::collections::{BTreeMap, HashSet};

use axum::extract::{Path, State};
use axum::Json;
use punch_core::shaping::summarize_user;
use punch_core::{next_free_uid, DaySummary, DeviceError, NewUser, UserRecord, USER_DEFAULT};
use punch_forward::Employee;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::StatusMessage;
use crate::error::ApiError;
use crate::extract::{
    opt_lenient_int, opt_string_or_number, DeviceSelection, JsonBody,
};
use crate::state::AppState;

#[derive(Serialize)]
pub struct UserView {
    /// Employee identifier
    pub id: String,
    pub uid: u16,
    pub name: String,
    pub privilege: u8,
    pub role: &'static str,
    pub group_id: String,
    pub card: u64,
}

impl From<&UserRecord> for UserView {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.user_id.clone(),
            uid: user.uid,
            name: user.name.clone(),
            privilege: user.privilege,
            role: user.privilege_label(),
            group_id: user.group_id.clone(),
            card: user.card,
        }
    }
}

#[derive(Serialize)]
pub struct UsersResponse {
    pub status: &'static str,
    pub users: Vec<UserView>,
    pub count: usize,
}

#[derive(Serialize)]
pub struct UserDetailResponse {
    pub status: &'static str,
    pub user: UserView,
    pub punch_count: usize,
    /// Day summaries keyed by `YYYY-MM-DD`
    pub attendance: BTreeMap<String, DaySummary>,
}

#[derive(Serialize)]
pub struct SaveUserResponse {
    pub status: &'static str,
    pub message: String,
    pub uid: u16,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default, alias = "user_id", deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "opt_lenient_int")]
    pub privilege: Option<u8>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub group_id: Option<String>,
    #[serde(default, deserialize_with = "opt_lenient_int")]
    pub card: Option<u64>,
    #[serde(default, deserialize_with = "opt_lenient_int")]
    pub uid: Option<u16>,
}

impl CreateUserRequest {
    fn into_new_user(self) -> Result<NewUser, ApiError> {
        let id = self.id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let name = self.name.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let (Some(user_id), Some(name)) = (id, name) else {
            return Err(ApiError::validation("User ID and name are required"));
        };

        Ok(NewUser {
            user_id,
            name,
            uid: self.uid,
            privilege: self.privilege.unwrap_or(USER_DEFAULT),
            password: self.password.unwrap_or_default(),
            group_id: self.group_id.unwrap_or_default(),
            card: self.card.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ImportUsersRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FailedUser {
    pub emp_id: Option<String>,
    pub name: Option<String>,
    pub error: String,
    pub user_data: Value,
}

#[derive(Debug, Serialize)]
pub struct ImportUsersResponse {
    pub status: &'static str,
    pub message: String,
    pub success_count: usize,
    pub failed_count: usize,
    pub skipped_count: usize,
    pub failed_users: Vec<FailedUser>,
}

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    selection: DeviceSelection,
) -> Result<Json<UsersResponse>, ApiError> {
    let users = state
        .with_active_device(&selection, |lease| lease.list_users())
        .await?;

    tracing::debug!(count = users.len(), "Fetched users");
    let users: Vec<UserView> = users.iter().map(UserView::from).collect();
    Ok(Json(UsersResponse {
        status: "success",
        count: users.len(),
        users,
    }))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    selection: DeviceSelection,
    JsonBody(request): JsonBody<CreateUserRequest>,
) -> Result<Json<SaveUserResponse>, ApiError> {
    let user = request.into_new_user()?;
    let name = user.name.clone();
    let user_id = user.user_id.clone();

    let uid = state
        .with_active_device(&selection, move |lease| lease.upsert_user(&user))
        .await?;

    tracing::info!(user_id = %user_id, uid, "User saved");
    Ok(Json(SaveUserResponse {
        status: "success",
        message: format!("User {name} added successfully"),
        uid,
    }))
}

/// GET /api/users/{user_id}
///
/// The user's punches are collapsed to first/last per day.
pub async fn get_user(
    State(state): State<AppState>,
    selection: DeviceSelection,
    Path(user_id): Path<String>,
) -> Result<Json<UserDetailResponse>, ApiError> {
    let wanted = user_id.clone();
    let (user, punches) = state
        .with_active_device(&selection, move |lease| {
            let user = lease
                .list_users()?
                .into_iter()
                .find(|u| u.user_id == wanted)
                .ok_or_else(|| DeviceError::NotFound(format!("User with ID {wanted}")))?;
            let punches: Vec<_> = lease
                .list_attendance()?
                .into_iter()
                .filter(|r| r.user_id == wanted)
                .collect();
            Ok((user, punches))
        })
        .await?;

    Ok(Json(UserDetailResponse {
        status: "success",
        user: UserView::from(&user),
        punch_count: punches.len(),
        attendance: summarize_user(&punches),
    }))
}

/// DELETE /api/users/{user_id}
pub async fn delete_user(
    State(state): State<AppState>,
    selection: DeviceSelection,
    Path(user_id): Path<String>,
) -> Result<Json<StatusMessage>, ApiError> {
    if user_id.trim().is_empty() {
        return Err(ApiError::validation("User ID is required"));
    }

    let target = user_id.clone();
    state
        .with_active_device(&selection, move |lease| {
            if !lease.list_users()?.iter().any(|u| u.user_id == target) {
                return Err(DeviceError::NotFound(format!("User with ID {target}")));
            }
            lease.delete_user(&target)
        })
        .await?;

    tracing::info!(user_id = %user_id, "User deleted");
    Ok(Json(StatusMessage::success(format!(
        "User {user_id} deleted successfully"
    ))))
}

/// POST /api/add-users-from-url
///
/// Imports employees from the HR API. Ids already on the device are skipped;
/// new users get the lowest free slots.
pub async fn import_users(
    State(state): State<AppState>,
    selection: DeviceSelection,
    JsonBody(request): JsonBody<ImportUsersRequest>,
) -> Result<Json<ImportUsersResponse>, ApiError> {
    let url = request
        .url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| state.registry().snapshot().employees_api_url);
    if url.is_empty() {
        return Err(ApiError::validation("URL is required"));
    }

    // Fail before the HR call when there is no device to write to
    state.active_device_id(&selection).await?;

    tracing::info!(url = %url, "Fetching employees");
    let employees = state.hr().fetch_employees(&url).await?;
    if employees.is_empty() {
        return Err(ApiError::validation("No users data found in response"));
    }

    let total = employees.len();
    let outcome = state
        .with_active_device(&selection, move |lease| {
            let existing = lease.list_users()?;
            Ok(import_into(&existing, employees, |user| lease.upsert_user(user)))
        })
        .await?;

    tracing::info!(
        added = outcome.success_count,
        skipped = outcome.skipped_count,
        failed = outcome.failed_users.len(),
        "Employee import finished"
    );

    Ok(Json(ImportUsersResponse {
        status: if outcome.success_count > 0 { "success" } else { "error" },
        message: format!("Added {} out of {} users to the device", outcome.success_count, total),
        success_count: outcome.success_count,
        failed_count: outcome.failed_users.len(),
        skipped_count: outcome.skipped_count,
        failed_users: outcome.failed_users,
    }))
}

#[derive(Debug, Default)]
struct ImportOutcome {
    success_count: usize,
    skipped_count: usize,
    failed_users: Vec<FailedUser>,
}

/// Write each new employee through `upsert`, allocating slots as it goes
fn import_into(
    existing: &[UserRecord],
    employees: Vec<Employee>,
    mut upsert: impl FnMut(&NewUser) -> Result<u16, DeviceError>,
) -> ImportOutcome {
    let mut known: HashSet<String> = existing.iter().map(|u| u.user_id.clone()).collect();
    let mut used: HashSet<u16> = existing.iter().map(|u| u.uid).collect();
    let mut outcome = ImportOutcome::default();

    for employee in employees {
        let Some(emp_id) = employee.emp_id.clone() else {
            tracing::warn!("Employee entry without emp_id");
            outcome.failed_users.push(FailedUser {
                emp_id: None,
                name: None,
                error: "Missing emp_id field".to_string(),
                user_data: employee.raw,
            });
            continue;
        };

        if known.contains(&emp_id) {
            outcome.skipped_count += 1;
            continue;
        }

        let Some(uid) = next_free_uid(&used) else {
            outcome.failed_users.push(FailedUser {
                emp_id: Some(emp_id),
                name: Some(employee.name),
                error: "No available UIDs".to_string(),
                user_data: employee.raw,
            });
            continue;
        };

        let user = NewUser::basic(emp_id.clone(), employee.name.clone()).with_uid(uid);
        match upsert(&user) {
            Ok(written) => {
                used.insert(written);
                known.insert(emp_id);
                outcome.success_count += 1;
            }
            Err(e) => {
                tracing::error!(emp_id = %emp_id, error = %e, "Error adding user");
                outcome.failed_users.push(FailedUser {
                    emp_id: Some(emp_id),
                    name: Some(employee.name),
                    error: e.to_string(),
                    user_data: employee.raw,
                });
            }
        }
    }

    outcome
}
