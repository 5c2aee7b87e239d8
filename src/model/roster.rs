use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "title_case")]
pub enum RosterStatus {
    OnDuty,
    OffDay,
}

/// One planned roster slot, at most one per (date, employee).
///
/// Shift name and color are copied from the shift definition at write
/// time and never re-synced, so historical rosters stay stable even if
/// the shift is later renamed or recolored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterAssignment {
    pub employee_id: String,
    pub date: NaiveDate,
    pub status: RosterStatus,
    pub shift_id: Option<String>,
    pub shift_name: Option<String>,
    pub shift_color: Option<String>,
}

impl RosterAssignment {
    pub fn is_off_day(&self) -> bool {
        self.status == RosterStatus::OffDay
    }
}
