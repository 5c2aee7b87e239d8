use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Late,
    #[strum(serialize = "On Break")]
    OnBreak,
    #[strum(serialize = "Auto Clock-out")]
    AutoClockOut,
}

/// Punch record for one (date, employee). Created on the first punch of
/// the day and mutated by later punches. Absence is the absence of a
/// record, never a stored value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub employee_id: String,
    pub date: NaiveDate,
    pub check_in: Option<NaiveTime>,
    pub check_out: Option<NaiveTime>,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub late_minutes: i64,
    #[serde(default)]
    pub break_minutes: i64,
    #[serde(default)]
    pub overtime_minutes: i64,
}
