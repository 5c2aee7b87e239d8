use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "title_case")]
pub enum SwapStatus {
    Pending,
    Approved,
    Rejected,
}

impl SwapStatus {
    /// Stored string form, as written to the status field.
    pub fn as_str(&self) -> &'static str {
        match self {
            SwapStatus::Pending => "pending",
            SwapStatus::Approved => "approved",
            SwapStatus::Rejected => "rejected",
        }
    }
}

/// Shift-swap proposal raised by an employee against one roster day.
/// Approval is an audit step only; the roster itself is changed
/// separately by the assignment editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftSwapRequest {
    pub id: String,
    pub requester_id: String,
    pub requester_name: String,
    pub date: NaiveDate,
    pub shift_name: String,
    pub reason: String,
    pub status: SwapStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl ShiftSwapRequest {
    /// Approved and Rejected are terminal; no further transitions.
    pub fn is_terminal(&self) -> bool {
        self.status != SwapStatus::Pending
    }
}
