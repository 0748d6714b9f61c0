//! Dashboard counters

use std::collections::HashSet;

use axum::extract::State;
use axum::Json;
use chrono::{Local, NaiveDate};
use punch_core::AttendanceRecord;
use serde::Serialize;

use crate::extract::DeviceSelection;
use crate::state::AppState;

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub today_attendance: usize,
    pub total_users: usize,
    pub present_today: usize,
    pub last_sync: Option<String>,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub status: &'static str,
    pub data: Stats,
}

/// GET /api/stats
///
/// Never fails: without a reachable device the counters are zero.
pub async fn get_stats(State(state): State<AppState>, selection: DeviceSelection) -> Json<StatsResponse> {
    let last_sync = state
        .last_sync()
        .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string());

    let counts = if state.registry().is_empty() {
        None
    } else {
        let today = Local::now().date_naive();
        match state
            .with_active_device(&selection, move |lease| {
                let punches = lease.list_attendance()?;
                let users = lease.list_users()?;
                Ok(count_today(&punches, users.len(), today))
            })
            .await
        {
            Ok(stats) => Some(stats),
            Err(e) => {
                tracing::warn!(error = %e, "Error getting stats");
                None
            }
        }
    };

    let data = Stats {
        last_sync,
        ..counts.unwrap_or_default()
    };
    Json(StatsResponse {
        status: "success",
        data,
    })
}

fn count_today(punches: &[AttendanceRecord], total_users: usize, today: NaiveDate) -> Stats {
    let todays: Vec<&AttendanceRecord> = punches
        .iter()
        .filter(|r| r.timestamp.date() == today)
        .collect();
    let present: HashSet<&str> = todays.iter().map(|r| r.user_id.as_str()).collect();

    Stats {
        today_attendance: todays.len(),
        total_users,
        present_today: present.len(),
        last_sync: None,
    }
}
