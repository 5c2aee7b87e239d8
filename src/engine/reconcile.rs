//! Status reconciliation for one employee-day.
//!
//! Three independently written sources (roster, approved leave, punches)
//! are joined into a single effective status by an ordered rule list.
//! Every function here is pure; "now" always arrives as an argument.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use strum_macros::Display;

use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::model::condition_report::{ConditionReport, ConditionType};
use crate::model::leave_request::LeaveRequest;
use crate::model::roster::{RosterAssignment, RosterStatus};
use crate::model::shift::{PLACEHOLDER_SHIFT, Shift};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "title_case")]
pub enum EffectiveStatus {
    OnLeave,
    Present,
    Late,
    OnBreak,
    #[strum(serialize = "Auto Clock-out")]
    AutoClockOut,
    OffDay,
    Absent,
    NotYetClockedIn,
}

impl From<AttendanceStatus> for EffectiveStatus {
    fn from(status: AttendanceStatus) -> Self {
        match status {
            AttendanceStatus::Present => EffectiveStatus::Present,
            AttendanceStatus::Late => EffectiveStatus::Late,
            AttendanceStatus::OnBreak => EffectiveStatus::OnBreak,
            AttendanceStatus::AutoClockOut => EffectiveStatus::AutoClockOut,
        }
    }
}

/// Work-duration metrics plus data-quality flags. Flags are conditions
/// carried alongside an otherwise valid status, not errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkDuration {
    pub work_minutes: i64,
    /// Check-in without check-out after the day has passed.
    pub missing_punch: bool,
    /// Clock-out before clock-in; the displayed duration was clamped.
    pub negative_duration: bool,
    /// No check-out yet, so the figure was computed against "now".
    pub provisional: bool,
}

/// The derived view of one employee-day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayStatus {
    pub employee_id: String,
    pub date: NaiveDate,
    pub status: EffectiveStatus,
    /// Denormalized name of the rostered shift, if on duty.
    pub shift_name: Option<String>,
    pub late_minutes: i64,
    pub duration: WorkDuration,
    /// Acknowledged Sick/WFH/Emergency report for the day. Advisory:
    /// shown next to the status, never replacing it.
    pub condition: Option<ConditionType>,
}

struct RuleInput<'a> {
    date: NaiveDate,
    today: NaiveDate,
    roster: Option<&'a RosterAssignment>,
    leave: Option<&'a LeaveRequest>,
    attendance: Option<&'a AttendanceRecord>,
}

type Rule = for<'a> fn(&RuleInput<'a>) -> Option<EffectiveStatus>;

/// Precedence, highest first. Falls through to `NotYetClockedIn`.
const RULES: &[(&str, Rule)] = &[
    ("approved_leave", approved_leave_rule),
    ("attendance_record", attendance_rule),
    ("off_day", off_day_rule),
    ("past_absence", past_absence_rule),
];

fn approved_leave_rule(input: &RuleInput<'_>) -> Option<EffectiveStatus> {
    input
        .leave
        .filter(|leave| leave.overrides(input.date))
        .map(|_| EffectiveStatus::OnLeave)
}

fn attendance_rule(input: &RuleInput<'_>) -> Option<EffectiveStatus> {
    input.attendance.map(|record| record.status.into())
}

fn off_day_rule(input: &RuleInput<'_>) -> Option<EffectiveStatus> {
    input
        .roster
        .filter(|assignment| assignment.is_off_day())
        .map(|_| EffectiveStatus::OffDay)
}

fn past_absence_rule(input: &RuleInput<'_>) -> Option<EffectiveStatus> {
    (input.attendance.is_none() && input.date < input.today).then_some(EffectiveStatus::Absent)
}

/// Joins one employee-day across the three sources.
///
/// Leave wins over any punch data for the headline status; the punch
/// record is still used for the duration figures. A day with no data is
/// `Absent` once it is in the past and `NotYetClockedIn` while it is
/// still today.
pub fn derive_day_status(
    employee_id: &str,
    date: NaiveDate,
    roster: Option<&RosterAssignment>,
    leave: Option<&LeaveRequest>,
    attendance: Option<&AttendanceRecord>,
    condition: Option<&ConditionReport>,
    now: DateTime<Utc>,
) -> DayStatus {
    let input = RuleInput {
        date,
        today: now.date_naive(),
        roster,
        leave,
        attendance,
    };

    let status = RULES
        .iter()
        .find_map(|&(name, rule)| {
            let status = rule(&input)?;
            tracing::trace!(employee_id, %date, rule = name, "status rule matched");
            Some(status)
        })
        .unwrap_or(EffectiveStatus::NotYetClockedIn);

    let shift_name = roster.and_then(|assignment| match assignment.status {
        RosterStatus::OnDuty => Some(
            assignment
                .shift_name
                .clone()
                .unwrap_or_else(|| PLACEHOLDER_SHIFT.name.clone()),
        ),
        RosterStatus::OffDay => None,
    });

    DayStatus {
        employee_id: employee_id.to_string(),
        date,
        status,
        shift_name,
        late_minutes: attendance.map(|record| record.late_minutes).unwrap_or(0),
        duration: attendance
            .map(|record| work_duration(record, now))
            .unwrap_or_default(),
        condition: condition
            .filter(|report| {
                report.date == date && report.is_acknowledged() && report.kind.is_advisory()
            })
            .map(|report| report.kind),
    }
}

/// Minutes worked for one punch record.
///
/// An open record is measured against "now" and marked provisional; once
/// the day has passed it is additionally flagged as a missing punch. A
/// negative raw figure is clamped to zero and flagged, never shown.
pub fn work_duration(record: &AttendanceRecord, now: DateTime<Utc>) -> WorkDuration {
    let Some(check_in) = record.check_in else {
        return WorkDuration::default();
    };

    let started = record.date.and_time(check_in);
    let (ended, provisional) = match record.check_out {
        Some(check_out) => (record.date.and_time(check_out), false),
        None => (now.naive_utc(), true),
    };

    let raw = (ended - started).num_minutes() - record.break_minutes;
    WorkDuration {
        work_minutes: raw.max(0),
        missing_punch: record.check_out.is_none() && record.date < now.date_naive(),
        negative_duration: raw < 0,
        provisional,
    }
}

/// Punch-time evaluation of a check-in against the rostered shift.
///
/// With no shift to be late against the status defaults to Present. An
/// acknowledged Late report whose estimated arrival covers the punch
/// pre-authorizes the deviation.
pub fn evaluate_check_in(
    check_in: NaiveTime,
    shift: Option<&Shift>,
    late_authorization: Option<&ConditionReport>,
) -> (AttendanceStatus, i64) {
    let Some(shift) = shift else {
        return (AttendanceStatus::Present, 0);
    };

    let late_minutes = (check_in - shift.start_time).num_minutes().max(0);
    if late_minutes == 0 {
        return (AttendanceStatus::Present, 0);
    }

    let authorized = late_authorization.is_some_and(|report| {
        report.is_acknowledged()
            && report.kind == ConditionType::Late
            && report.estimated_arrival.is_some_and(|eta| check_in <= eta)
    });
    if authorized {
        (AttendanceStatus::Present, 0)
    } else {
        (AttendanceStatus::Late, late_minutes)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::model::condition_report::ConditionStatus;
    use crate::model::leave_request::LeaveStatus;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn noon_on(day: NaiveDate) -> DateTime<Utc> {
        Utc.from_utc_datetime(&day.and_time(time(12, 0)))
    }

    fn morning_shift() -> Shift {
        Shift {
            id: "sh-morning".into(),
            name: "Morning".into(),
            start_time: time(8, 0),
            end_time: time(16, 0),
            color: "#2196f3".into(),
        }
    }

    fn on_duty(employee_id: &str, day: NaiveDate) -> RosterAssignment {
        RosterAssignment {
            employee_id: employee_id.into(),
            date: day,
            status: RosterStatus::OnDuty,
            shift_id: Some("sh-morning".into()),
            shift_name: Some("Morning".into()),
            shift_color: Some("#2196f3".into()),
        }
    }

    fn off_day(employee_id: &str, day: NaiveDate) -> RosterAssignment {
        RosterAssignment {
            employee_id: employee_id.into(),
            date: day,
            status: RosterStatus::OffDay,
            shift_id: None,
            shift_name: None,
            shift_color: None,
        }
    }

    fn leave(employee_id: &str, from: NaiveDate, to: NaiveDate, status: LeaveStatus) -> LeaveRequest {
        LeaveRequest {
            id: "lv-1".into(),
            employee_id: employee_id.into(),
            start_date: from,
            end_date: to,
            leave_type: "annual".into(),
            status,
        }
    }

    fn punched(employee_id: &str, day: NaiveDate, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            employee_id: employee_id.into(),
            date: day,
            check_in: Some(time(8, 12)),
            check_out: Some(time(16, 0)),
            status,
            late_minutes: if status == AttendanceStatus::Late { 12 } else { 0 },
            break_minutes: 0,
            overtime_minutes: 0,
        }
    }

    fn late_report(employee_id: &str, day: NaiveDate, eta: NaiveTime) -> ConditionReport {
        ConditionReport {
            id: "cr-1".into(),
            employee_id: employee_id.into(),
            employee_name: "Jane Doe".into(),
            date: day,
            kind: ConditionType::Late,
            reason: Some("traffic".into()),
            attachment_url: None,
            estimated_arrival: Some(eta),
            departure_time: None,
            status: ConditionStatus::Acknowledged,
            created_at: noon_on(day),
            acknowledged_at: Some(noon_on(day)),
        }
    }

    #[test]
    fn approved_leave_wins_over_punch_and_roster() {
        // Leave 2024-03-01..2024-03-10, punch record present on 03-04.
        let day = date(2024, 3, 4);
        let lv = leave("e1", date(2024, 3, 1), date(2024, 3, 10), LeaveStatus::Approved);
        let att = punched("e1", day, AttendanceStatus::Late);
        let status = derive_day_status(
            "e1",
            day,
            Some(&on_duty("e1", day)),
            Some(&lv),
            Some(&att),
            None,
            noon_on(day),
        );
        assert_eq!(status.status, EffectiveStatus::OnLeave);
        // Punch data is retained, just not surfaced as the headline.
        assert_eq!(status.duration.work_minutes, 468);
    }

    #[test]
    fn pending_or_rejected_leave_does_not_override() {
        let day = date(2024, 3, 4);
        for st in [LeaveStatus::Pending, LeaveStatus::Rejected] {
            let lv = leave("e1", day, day, st);
            let att = punched("e1", day, AttendanceStatus::Present);
            let status =
                derive_day_status("e1", day, None, Some(&lv), Some(&att), None, noon_on(day));
            assert_eq!(status.status, EffectiveStatus::Present);
        }
    }

    #[test]
    fn attendance_status_is_taken_from_the_record() {
        let day = date(2024, 3, 4);
        let att = punched("e1", day, AttendanceStatus::Late);
        let status = derive_day_status(
            "e1",
            day,
            Some(&on_duty("e1", day)),
            None,
            Some(&att),
            None,
            noon_on(day),
        );
        assert_eq!(status.status, EffectiveStatus::Late);
        assert_eq!(status.late_minutes, 12);
        assert_eq!(status.shift_name.as_deref(), Some("Morning"));
    }

    #[test]
    fn punch_on_an_off_day_still_counts() {
        let day = date(2024, 3, 4);
        let att = punched("e1", day, AttendanceStatus::Present);
        let status = derive_day_status(
            "e1",
            day,
            Some(&off_day("e1", day)),
            None,
            Some(&att),
            None,
            noon_on(day),
        );
        assert_eq!(status.status, EffectiveStatus::Present);
    }

    #[test]
    fn off_day_without_punch() {
        let day = date(2024, 3, 4);
        let status = derive_day_status(
            "e1",
            day,
            Some(&off_day("e1", day)),
            None,
            None,
            None,
            noon_on(day),
        );
        assert_eq!(status.status, EffectiveStatus::OffDay);
        assert_eq!(status.shift_name, None);
    }

    #[test]
    fn empty_past_day_is_absent_but_today_is_not() {
        let day = date(2024, 3, 4);
        let past = derive_day_status("e1", day, None, None, None, None, noon_on(date(2024, 3, 5)));
        assert_eq!(past.status, EffectiveStatus::Absent);

        let today = derive_day_status("e1", day, None, None, None, None, noon_on(day));
        assert_eq!(today.status, EffectiveStatus::NotYetClockedIn);
    }

    #[test]
    fn rules_fire_individually() {
        let day = date(2024, 3, 4);
        let input = RuleInput {
            date: day,
            today: date(2024, 3, 5),
            roster: None,
            leave: None,
            attendance: None,
        };
        assert_eq!(approved_leave_rule(&input), None);
        assert_eq!(attendance_rule(&input), None);
        assert_eq!(off_day_rule(&input), None);
        assert_eq!(past_absence_rule(&input), Some(EffectiveStatus::Absent));
    }

    #[test]
    fn missing_denormalized_shift_name_renders_placeholder() {
        let day = date(2024, 3, 4);
        let mut assignment = on_duty("e1", day);
        assignment.shift_name = None;
        let status =
            derive_day_status("e1", day, Some(&assignment), None, None, None, noon_on(day));
        assert_eq!(status.shift_name.as_deref(), Some("Unknown Shift"));
    }

    #[test]
    fn acknowledged_sick_report_is_advisory_only() {
        let day = date(2024, 3, 4);
        let mut report = late_report("e1", day, time(9, 0));
        report.kind = ConditionType::Sick;
        report.estimated_arrival = None;

        let status = derive_day_status("e1", day, None, None, None, Some(&report), noon_on(day));
        assert_eq!(status.status, EffectiveStatus::NotYetClockedIn);
        assert_eq!(status.condition, Some(ConditionType::Sick));
    }

    #[test]
    fn work_duration_subtracts_breaks() {
        let day = date(2024, 3, 4);
        let record = AttendanceRecord {
            employee_id: "e1".into(),
            date: day,
            check_in: Some(time(8, 0)),
            check_out: Some(time(16, 30)),
            status: AttendanceStatus::Present,
            late_minutes: 0,
            break_minutes: 30,
            overtime_minutes: 0,
        };
        let duration = work_duration(&record, noon_on(day));
        assert_eq!(duration.work_minutes, 480);
        assert!(!duration.provisional);
        assert!(!duration.missing_punch);
        assert!(!duration.negative_duration);
    }

    #[test]
    fn negative_duration_is_clamped_and_flagged() {
        let day = date(2024, 3, 4);
        let record = AttendanceRecord {
            employee_id: "e1".into(),
            date: day,
            check_in: Some(time(16, 0)),
            check_out: Some(time(8, 0)),
            status: AttendanceStatus::Present,
            late_minutes: 0,
            break_minutes: 0,
            overtime_minutes: 0,
        };
        let duration = work_duration(&record, noon_on(day));
        assert_eq!(duration.work_minutes, 0);
        assert!(duration.negative_duration);
    }

    #[test]
    fn open_record_on_a_past_day_is_a_missing_punch() {
        let day = date(2024, 3, 4);
        let record = AttendanceRecord {
            employee_id: "e1".into(),
            date: day,
            check_in: Some(time(8, 0)),
            check_out: None,
            status: AttendanceStatus::Present,
            late_minutes: 0,
            break_minutes: 0,
            overtime_minutes: 0,
        };
        let now = noon_on(date(2024, 3, 5));
        let duration = work_duration(&record, now);
        assert!(duration.missing_punch);
        assert!(duration.provisional);
        // Still measured against "now" for display: 28h minus nothing.
        assert_eq!(duration.work_minutes, 28 * 60);
    }

    #[test]
    fn open_record_today_is_provisional_but_not_missing() {
        let day = date(2024, 3, 4);
        let record = AttendanceRecord {
            employee_id: "e1".into(),
            date: day,
            check_in: Some(time(8, 0)),
            check_out: None,
            status: AttendanceStatus::Present,
            late_minutes: 0,
            break_minutes: 0,
            overtime_minutes: 0,
        };
        let duration = work_duration(&record, noon_on(day));
        assert!(duration.provisional);
        assert!(!duration.missing_punch);
        assert_eq!(duration.work_minutes, 4 * 60);
    }

    #[test]
    fn check_in_after_shift_start_is_late() {
        // Morning 08:00-16:00, check-in 08:12.
        let shift = morning_shift();
        let (status, late) = evaluate_check_in(time(8, 12), Some(&shift), None);
        assert_eq!(status, AttendanceStatus::Late);
        assert_eq!(late, 12);
    }

    #[test]
    fn check_in_without_a_shift_defaults_to_present() {
        let (status, late) = evaluate_check_in(time(11, 45), None, None);
        assert_eq!(status, AttendanceStatus::Present);
        assert_eq!(late, 0);
    }

    #[test]
    fn acknowledged_late_report_preauthorizes_the_punch() {
        let day = date(2024, 3, 4);
        let shift = morning_shift();
        let report = late_report("e1", day, time(8, 30));

        let (status, late) = evaluate_check_in(time(8, 12), Some(&shift), Some(&report));
        assert_eq!(status, AttendanceStatus::Present);
        assert_eq!(late, 0);

        // Arriving past the estimated time is still late.
        let (status, late) = evaluate_check_in(time(8, 45), Some(&shift), Some(&report));
        assert_eq!(status, AttendanceStatus::Late);
        assert_eq!(late, 45);
    }

    #[test]
    fn pending_late_report_does_not_preauthorize() {
        let day = date(2024, 3, 4);
        let shift = morning_shift();
        let mut report = late_report("e1", day, time(8, 30));
        report.status = ConditionStatus::Pending;
        report.acknowledged_at = None;

        let (status, late) = evaluate_check_in(time(8, 12), Some(&shift), Some(&report));
        assert_eq!(status, AttendanceStatus::Late);
        assert_eq!(late, 12);
    }
}
