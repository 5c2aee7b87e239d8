//! Roster assignment write path.
//!
//! Setting an assignment copies the shift's name and color into the
//! record so historical rosters survive later shift edits. Clearing
//! deletes the record outright, keeping "no assignment" and "explicitly
//! off day" distinguishable.

use chrono::NaiveDate;

use crate::error::EngineError;
use crate::model::leave_request::LeaveRequest;
use crate::model::roster::{RosterAssignment, RosterStatus};
use crate::model::shift::Shift;
use crate::store::{self, Collection, RecordStore, day_key};

#[derive(Debug, Clone)]
pub enum AssignmentChoice {
    OffDay,
    Shift(String),
}

/// Writes (or overwrites) the single assignment for one employee-day.
///
/// An On-Duty assignment on a date already covered by approved leave is
/// refused: leave outranks the roster, so the assignment would never
/// surface. This is a usability safeguard, not a data-layer constraint.
pub async fn set_assignment(
    record_store: &dyn RecordStore,
    employee_id: &str,
    date: NaiveDate,
    choice: AssignmentChoice,
) -> Result<RosterAssignment, EngineError> {
    if let AssignmentChoice::Shift(_) = &choice {
        ensure_no_approved_leave(record_store, employee_id, date).await?;
    }

    let assignment = match choice {
        AssignmentChoice::OffDay => RosterAssignment {
            employee_id: employee_id.to_string(),
            date,
            status: RosterStatus::OffDay,
            shift_id: None,
            shift_name: None,
            shift_color: None,
        },
        AssignmentChoice::Shift(shift_id) => {
            let doc = record_store
                .get(Collection::Shifts, &shift_id)
                .await?
                .ok_or_else(|| EngineError::ShiftNotFound {
                    shift_id: shift_id.clone(),
                })?;
            let shift: Shift = store::decode(&shift_id, &doc)?;
            RosterAssignment {
                employee_id: employee_id.to_string(),
                date,
                status: RosterStatus::OnDuty,
                shift_id: Some(shift.id),
                shift_name: Some(shift.name),
                shift_color: Some(shift.color),
            }
        }
    };

    record_store
        .put(
            Collection::Roster,
            &day_key(date, employee_id),
            store::encode(&assignment)?,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, employee_id, %date, "Could not write roster assignment");
            EngineError::from(e)
        })?;

    tracing::info!(employee_id, %date, status = %assignment.status, "Roster assignment written");
    Ok(assignment)
}

pub async fn clear_assignment(
    record_store: &dyn RecordStore,
    employee_id: &str,
    date: NaiveDate,
) -> Result<(), EngineError> {
    record_store
        .delete(Collection::Roster, &day_key(date, employee_id))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, employee_id, %date, "Could not clear roster assignment");
            EngineError::from(e)
        })?;

    tracing::info!(employee_id, %date, "Roster assignment cleared");
    Ok(())
}

async fn ensure_no_approved_leave(
    record_store: &dyn RecordStore,
    employee_id: &str,
    date: NaiveDate,
) -> Result<(), EngineError> {
    let leaves = record_store.fetch(Collection::LeaveRequests).await?;
    for (key, doc) in &leaves {
        let leave: LeaveRequest = match store::decode(key, doc) {
            Ok(leave) => leave,
            Err(e) => {
                tracing::warn!(%key, error = %e, "skipping undecodable leave request");
                continue;
            }
        };
        if leave.employee_id == employee_id && leave.overrides(date) {
            return Err(EngineError::LeaveConflict {
                employee_id: employee_id.to_string(),
                date,
            });
        }
    }
    Ok(())
}
