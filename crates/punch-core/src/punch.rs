//! Punch-code labels
//!
//! Devices report a small integer per punch. Two label tables are in use:
//! a numeric one expected by the HR ingestion API, and a semantic one for
//! people reading timelines. Codes outside a table map to `"Unknown"`.

use serde::{Deserialize, Serialize};

/// Label for any code a table does not know
pub const UNKNOWN_LABEL: &str = "Unknown";

const NUMERIC: [(u8, &str); 6] = [(0, "1"), (1, "2"), (2, "3"), (3, "4"), (4, "5"), (5, "6")];

const SEMANTIC: [(u8, &str); 6] = [
    (1, "Check In"),
    (2, "Check Out"),
    (3, "Break Out"),
    (4, "Break In"),
    (5, "Overtime In"),
    (6, "Overtime Out"),
];

/// Which label table to apply to punch codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PunchLabels {
    /// Codes 0-5 to "1".."6"
    Numeric,
    /// Codes 1-6 to "Check In", "Check Out", ...
    Semantic,
}

impl PunchLabels {
    /// Label for `code`; never fails
    pub fn label(self, code: u8) -> &'static str {
        let table: &[(u8, &str)] = match self {
            PunchLabels::Numeric => &NUMERIC,
            PunchLabels::Semantic => &SEMANTIC,
        };
        table
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, label)| *label)
            .unwrap_or(UNKNOWN_LABEL)
    }
}
