use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "title_case")]
pub enum ConditionType {
    Sick,
    #[strum(serialize = "WFH")]
    Wfh,
    Late,
    EarlyDeparture,
    Emergency,
}

impl ConditionType {
    /// Sick, WFH and Emergency inform the day view without changing the
    /// derived status. Late and EarlyDeparture pre-authorize a deviation
    /// from the shift's nominal hours.
    pub fn is_advisory(&self) -> bool {
        matches!(
            self,
            ConditionType::Sick | ConditionType::Wfh | ConditionType::Emergency
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "title_case")]
pub enum ConditionStatus {
    Pending,
    Acknowledged,
    Rejected,
}

impl ConditionStatus {
    /// Stored string form, as written to the status field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionStatus::Pending => "pending",
            ConditionStatus::Acknowledged => "acknowledged",
            ConditionStatus::Rejected => "rejected",
        }
    }
}

/// Ad-hoc self-reported status change for one employee-day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionReport {
    pub id: String,
    pub employee_id: String,
    pub employee_name: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: ConditionType,
    pub reason: Option<String>,
    pub attachment_url: Option<String>,
    /// Set on Late reports; a check-in at or before this time is not
    /// flagged late once the report is acknowledged.
    pub estimated_arrival: Option<NaiveTime>,
    /// Set on EarlyDeparture reports.
    pub departure_time: Option<NaiveTime>,
    pub status: ConditionStatus,
    pub created_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl ConditionReport {
    pub fn is_terminal(&self) -> bool {
        self.status != ConditionStatus::Pending
    }

    pub fn is_acknowledged(&self) -> bool {
        self.status == ConditionStatus::Acknowledged
    }
}
