use chrono::NaiveDate;
use derive_more::{Display, Error};

use crate::store::StoreError;

/// Engine-level error taxonomy. Data-quality anomalies (negative
/// durations, missing punches) are not errors; they travel as flags on
/// the derived status.
#[derive(Debug, Display, Error)]
pub enum EngineError {
    #[display(fmt = "shift {} not found", shift_id)]
    ShiftNotFound {
        #[error(not(source))]
        shift_id: String,
    },

    #[display(fmt = "employee {} not found", employee_id)]
    EmployeeNotFound {
        #[error(not(source))]
        employee_id: String,
    },

    #[display(fmt = "request {} not found", request_id)]
    RequestNotFound {
        #[error(not(source))]
        request_id: String,
    },

    /// A write tried to transition a workflow record that is already
    /// terminal. Carries the stored status so the caller can report it.
    #[display(fmt = "request already {}", current)]
    Conflict {
        #[error(not(source))]
        current: String,
    },

    #[display(fmt = "employee {} has approved leave covering {}", employee_id, date)]
    LeaveConflict {
        employee_id: String,
        date: NaiveDate,
    },

    /// Distinct from "no data yet": the collection could not be read at
    /// all, so its contents are unknown, not empty.
    #[display(fmt = "collection {} is unavailable", collection)]
    StoreUnavailable {
        #[error(not(source))]
        collection: &'static str,
    },

    #[display(fmt = "store error: {}", source)]
    Store { source: StoreError },
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable { collection } => EngineError::StoreUnavailable { collection },
            StoreError::Conflict { current } => EngineError::Conflict { current },
            other => EngineError::Store { source: other },
        }
    }
}
