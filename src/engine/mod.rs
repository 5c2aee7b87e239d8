//! The reconciliation engine proper.
//!
//! Every derived view is a pure, re-entrant recomputation over a fresh
//! snapshot of each collection. Nothing incremental is kept between
//! changes; a missed update can therefore never leave stale state
//! behind, it only delays the next recomputation.

pub mod clock;
pub mod reconcile;
pub mod stats;
pub mod watch;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::error::EngineError;
use crate::model::attendance::AttendanceRecord;
use crate::model::condition_report::ConditionReport;
use crate::model::employee::Employee;
use crate::model::leave_request::LeaveRequest;
use crate::model::roster::RosterAssignment;
use crate::model::shift::Shift;
use crate::model::swap_request::ShiftSwapRequest;
use crate::store::{self, Collection, RecordStore, SnapshotMap, StoreError};
use crate::workflow;
use crate::workflow::assignment::AssignmentChoice;
use crate::workflow::condition::NewConditionReport;
use crate::workflow::swap::NewSwapRequest;

pub use clock::{Clock, FixedClock, SystemClock};
pub use reconcile::{DayStatus, EffectiveStatus, WorkDuration, evaluate_check_in};
pub use stats::DailyStats;
pub use watch::DayWatch;

/// A collection's contribution to a snapshot. `Unavailable` means the
/// read failed; the contents are unknown, which is never the same as
/// empty.
#[derive(Debug, Clone)]
pub enum SnapshotState<T> {
    Loaded(T),
    Unavailable,
}

impl<T> SnapshotState<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            SnapshotState::Loaded(value) => Some(value),
            SnapshotState::Unavailable => None,
        }
    }

    fn map<U>(self, f: impl FnOnce(T) -> U) -> SnapshotState<U> {
        match self {
            SnapshotState::Loaded(value) => SnapshotState::Loaded(f(value)),
            SnapshotState::Unavailable => SnapshotState::Unavailable,
        }
    }

    fn require(&self, collection: Collection) -> Result<&T, EngineError> {
        self.loaded().ok_or(EngineError::StoreUnavailable {
            collection: collection.as_str(),
        })
    }
}

/// Point-in-time join input for one calendar day, built fresh from each
/// collection's current snapshot. Day-irrelevant records are already
/// filtered out: leaves are approved and covering, condition reports are
/// acknowledged, employees are active with the organization's root
/// record removed.
pub struct DaySnapshot {
    pub date: NaiveDate,
    pub employees: SnapshotState<Vec<Employee>>,
    pub shifts: SnapshotState<HashMap<String, Shift>>,
    pub roster: SnapshotState<HashMap<String, RosterAssignment>>,
    pub leaves: SnapshotState<Vec<LeaveRequest>>,
    pub attendance: SnapshotState<HashMap<String, AttendanceRecord>>,
    pub conditions: SnapshotState<Vec<ConditionReport>>,
}

pub(crate) struct LoadedDay<'a> {
    pub date: NaiveDate,
    pub employees: &'a [Employee],
    pub roster: &'a HashMap<String, RosterAssignment>,
    pub leaves: &'a [LeaveRequest],
    pub attendance: &'a HashMap<String, AttendanceRecord>,
    pub conditions: Option<&'a [ConditionReport]>,
}

impl DaySnapshot {
    /// The four collections reconciliation cannot do without. Condition
    /// reports stay optional: they only annotate, so a failed read there
    /// degrades the view instead of blocking it.
    pub(crate) fn require_loaded(&self) -> Result<LoadedDay<'_>, EngineError> {
        Ok(LoadedDay {
            date: self.date,
            employees: self.employees.require(Collection::Employees)?,
            roster: self.roster.require(Collection::Roster)?,
            leaves: self.leaves.require(Collection::LeaveRequests)?,
            attendance: self.attendance.require(Collection::Attendance)?,
            conditions: self.conditions.loaded().map(Vec::as_slice),
        })
    }
}

fn decoded<T: DeserializeOwned>(
    collection: Collection,
    fetched: Result<SnapshotMap, StoreError>,
) -> SnapshotState<Vec<T>> {
    match fetched {
        Ok(map) => {
            let mut records = Vec::with_capacity(map.len());
            for (key, doc) in &map {
                match store::decode::<T>(key, doc) {
                    Ok(record) => records.push(record),
                    // One bad record must not take the day down with it.
                    Err(e) => {
                        tracing::warn!(%collection, %key, error = %e, "skipping undecodable record");
                    }
                }
            }
            SnapshotState::Loaded(records)
        }
        Err(e) => {
            tracing::warn!(%collection, error = %e, "collection unavailable");
            SnapshotState::Unavailable
        }
    }
}

/// Reads all collections concurrently and narrows them to one day.
/// Collection failures are isolated: each failed read turns only its own
/// slot `Unavailable` and the rest of the snapshot still loads.
pub(crate) async fn load_day_snapshot(
    record_store: &dyn RecordStore,
    org_root_id: Option<&str>,
    date: NaiveDate,
) -> DaySnapshot {
    let (employees_raw, shifts_raw, roster_raw, leaves_raw, attendance_raw, conditions_raw) = tokio::join!(
        record_store.fetch(Collection::Employees),
        record_store.fetch(Collection::Shifts),
        record_store.fetch(Collection::Roster),
        record_store.fetch(Collection::LeaveRequests),
        record_store.fetch(Collection::Attendance),
        record_store.fetch(Collection::ConditionReports),
    );

    let employees = decoded::<Employee>(Collection::Employees, employees_raw).map(|records| {
        records
            .into_iter()
            .filter(|e| e.is_active() && org_root_id != Some(e.id.as_str()))
            .collect::<Vec<_>>()
    });

    let shifts = decoded::<Shift>(Collection::Shifts, shifts_raw).map(|records| {
        records
            .into_iter()
            .map(|shift| (shift.id.clone(), shift))
            .collect::<HashMap<_, _>>()
    });

    let roster = decoded::<RosterAssignment>(Collection::Roster, roster_raw).map(|records| {
        records
            .into_iter()
            .filter(|assignment| assignment.date == date)
            .map(|assignment| (assignment.employee_id.clone(), assignment))
            .collect::<HashMap<_, _>>()
    });

    let leaves = decoded::<LeaveRequest>(Collection::LeaveRequests, leaves_raw).map(|records| {
        records
            .into_iter()
            .filter(|leave| leave.overrides(date))
            .collect::<Vec<_>>()
    });

    let attendance =
        decoded::<AttendanceRecord>(Collection::Attendance, attendance_raw).map(|records| {
            records
                .into_iter()
                .filter(|record| record.date == date)
                .map(|record| (record.employee_id.clone(), record))
                .collect::<HashMap<_, _>>()
        });

    let conditions =
        decoded::<ConditionReport>(Collection::ConditionReports, conditions_raw).map(|records| {
            records
                .into_iter()
                .filter(|report| report.date == date && report.is_acknowledged())
                .collect::<Vec<_>>()
        });

    DaySnapshot {
        date,
        employees,
        shifts,
        roster,
        leaves,
        attendance,
        conditions,
    }
}

pub(crate) fn derive_for(
    day: &LoadedDay<'_>,
    employee: &Employee,
    now: DateTime<Utc>,
) -> DayStatus {
    let leave = day
        .leaves
        .iter()
        .find(|leave| leave.employee_id == employee.id);
    let condition = day
        .conditions
        .and_then(|reports| reports.iter().find(|r| r.employee_id == employee.id));
    reconcile::derive_day_status(
        &employee.id,
        day.date,
        day.roster.get(&employee.id),
        leave,
        day.attendance.get(&employee.id),
        condition,
        now,
    )
}

/// One day's fully derived picture: per-employee statuses plus the
/// fleet-wide roll-up.
#[derive(Debug, Clone, Serialize)]
pub struct DayView {
    pub date: NaiveDate,
    pub statuses: Vec<DayStatus>,
    pub stats: DailyStats,
}

pub(crate) fn build_day_view(
    snapshot: &DaySnapshot,
    now: DateTime<Utc>,
) -> Result<DayView, EngineError> {
    let day = snapshot.require_loaded()?;
    let statuses = day
        .employees
        .iter()
        .map(|employee| derive_for(&day, employee, now))
        .collect();
    let stats = stats::summarize(snapshot, now)?;
    Ok(DayView {
        date: snapshot.date,
        statuses,
        stats,
    })
}

/// Facade over the store adapter: derived reads on one side, the
/// workflow write paths on the other.
pub struct RosterEngine {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    config: Config,
}

impl RosterEngine {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>, config: Config) -> Self {
        RosterEngine {
            store,
            clock,
            config,
        }
    }

    pub async fn day_snapshot(&self, date: NaiveDate) -> DaySnapshot {
        load_day_snapshot(self.store.as_ref(), self.config.org_root_id.as_deref(), date).await
    }

    pub async fn day_status(
        &self,
        employee_id: &str,
        date: NaiveDate,
    ) -> Result<DayStatus, EngineError> {
        let snapshot = self.day_snapshot(date).await;
        let day = snapshot.require_loaded()?;
        let employee = day
            .employees
            .iter()
            .find(|e| e.id == employee_id)
            .ok_or_else(|| EngineError::EmployeeNotFound {
                employee_id: employee_id.to_string(),
            })?;
        Ok(derive_for(&day, employee, self.clock.now()))
    }

    pub async fn daily_stats(&self, date: NaiveDate) -> Result<DailyStats, EngineError> {
        let snapshot = self.day_snapshot(date).await;
        stats::summarize(&snapshot, self.clock.now())
    }

    /// Work duration for one employee-day; `None` when no punch record
    /// exists (which is simply an absence, not an error).
    pub async fn work_duration(
        &self,
        employee_id: &str,
        date: NaiveDate,
    ) -> Result<Option<WorkDuration>, EngineError> {
        let snapshot = self.day_snapshot(date).await;
        let attendance = snapshot.attendance.require(Collection::Attendance)?;
        Ok(attendance
            .get(employee_id)
            .map(|record| reconcile::work_duration(record, self.clock.now())))
    }

    pub async fn day_view(&self, date: NaiveDate) -> Result<DayView, EngineError> {
        let snapshot = self.day_snapshot(date).await;
        build_day_view(&snapshot, self.clock.now())
    }

    /// Live recomputation feed for one day. See [`watch::watch_day`].
    pub fn watch_day(&self, date: NaiveDate) -> Result<DayWatch, EngineError> {
        watch::watch_day(self, date)
    }

    pub async fn submit_swap(
        &self,
        request: NewSwapRequest,
    ) -> Result<ShiftSwapRequest, EngineError> {
        workflow::swap::submit(self.store.as_ref(), self.clock.as_ref(), request).await
    }

    pub async fn approve_swap(&self, request_id: &str) -> Result<ShiftSwapRequest, EngineError> {
        workflow::swap::approve(self.store.as_ref(), self.clock.as_ref(), request_id).await
    }

    pub async fn reject_swap(&self, request_id: &str) -> Result<ShiftSwapRequest, EngineError> {
        workflow::swap::reject(self.store.as_ref(), self.clock.as_ref(), request_id).await
    }

    pub async fn submit_condition(
        &self,
        report: NewConditionReport,
    ) -> Result<ConditionReport, EngineError> {
        workflow::condition::submit(self.store.as_ref(), self.clock.as_ref(), report).await
    }

    pub async fn acknowledge_condition(
        &self,
        report_id: &str,
    ) -> Result<ConditionReport, EngineError> {
        workflow::condition::acknowledge(self.store.as_ref(), self.clock.as_ref(), report_id).await
    }

    pub async fn reject_condition(&self, report_id: &str) -> Result<ConditionReport, EngineError> {
        workflow::condition::reject(self.store.as_ref(), self.clock.as_ref(), report_id).await
    }

    pub async fn set_assignment(
        &self,
        employee_id: &str,
        date: NaiveDate,
        choice: AssignmentChoice,
    ) -> Result<RosterAssignment, EngineError> {
        workflow::assignment::set_assignment(self.store.as_ref(), employee_id, date, choice).await
    }

    pub async fn clear_assignment(
        &self,
        employee_id: &str,
        date: NaiveDate,
    ) -> Result<(), EngineError> {
        workflow::assignment::clear_assignment(self.store.as_ref(), employee_id, date).await
    }
}
