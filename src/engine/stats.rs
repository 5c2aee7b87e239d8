use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::reconcile::EffectiveStatus;
use super::{DaySnapshot, derive_for};
use crate::error::EngineError;
use crate::model::attendance::AttendanceStatus;

/// Fleet-wide roll-up for one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub total_employees: usize,
    /// Present plus Late; the people who actually showed up.
    pub present: usize,
    pub late: usize,
    pub on_break: usize,
    /// Expected but nothing recorded. Off-day and on-leave employees are
    /// not expected and never land here.
    pub absent: usize,
    pub missing_punch: usize,
    /// present / total, 0.0 for an empty fleet, always within [0, 1].
    pub attendance_rate: f64,
    pub overtime_hours: f64,
}

/// Rolls per-employee derived statuses into [`DailyStats`]. Pure: the
/// same snapshot and the same "now" always produce the same figures.
pub fn summarize(snapshot: &DaySnapshot, now: DateTime<Utc>) -> Result<DailyStats, EngineError> {
    let day = snapshot.require_loaded()?;

    let total_employees = day.employees.len();
    let mut present = 0usize;
    let mut late = 0usize;
    let mut on_break = 0usize;
    let mut absent = 0usize;

    for employee in day.employees {
        match derive_for(&day, employee, now).status {
            EffectiveStatus::Present => present += 1,
            EffectiveStatus::Late => {
                present += 1;
                late += 1;
            }
            EffectiveStatus::OnBreak => on_break += 1,
            EffectiveStatus::Absent => absent += 1,
            _ => {}
        }
    }

    let mut missing_punch = 0usize;
    let mut overtime_minutes = 0i64;
    for record in day.attendance.values() {
        if record.check_out.is_none() && record.status != AttendanceStatus::OnBreak {
            missing_punch += 1;
        }
        overtime_minutes += record.overtime_minutes;
    }

    let attendance_rate = if total_employees == 0 {
        0.0
    } else {
        present as f64 / total_employees as f64
    };

    Ok(DailyStats {
        date: snapshot.date,
        total_employees,
        present,
        late,
        on_break,
        absent,
        missing_punch,
        attendance_rate,
        overtime_hours: (overtime_minutes as f64 / 60.0 * 10.0).round() / 10.0,
    })
}
