//! Condition-report workflow: Pending, then Acknowledged or Rejected,
//! both terminal. An acknowledged Late report pre-authorizes a late
//! arrival at punch time; Sick, WFH and Emergency reports only annotate
//! the day view.

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::engine::clock::Clock;
use crate::error::EngineError;
use crate::model::condition_report::{ConditionReport, ConditionStatus, ConditionType};
use crate::store::{self, Collection, RecordStore};

/// Payload for an employee filing a report.
#[derive(Debug, Clone, Deserialize)]
pub struct NewConditionReport {
    pub employee_id: String,
    pub employee_name: String,
    pub date: NaiveDate,
    pub kind: ConditionType,
    pub reason: Option<String>,
    pub attachment_url: Option<String>,
    pub estimated_arrival: Option<NaiveTime>,
    pub departure_time: Option<NaiveTime>,
}

pub async fn submit(
    record_store: &dyn RecordStore,
    clock: &dyn Clock,
    report: NewConditionReport,
) -> Result<ConditionReport, EngineError> {
    let record = ConditionReport {
        id: Uuid::new_v4().to_string(),
        employee_id: report.employee_id,
        employee_name: report.employee_name,
        date: report.date,
        kind: report.kind,
        reason: report.reason,
        attachment_url: report.attachment_url,
        estimated_arrival: report.estimated_arrival,
        departure_time: report.departure_time,
        status: ConditionStatus::Pending,
        created_at: clock.now(),
        acknowledged_at: None,
    };

    record_store
        .put(
            Collection::ConditionReports,
            &record.id,
            store::encode(&record)?,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, report_id = %record.id, "Submit condition report failed");
            EngineError::from(e)
        })?;

    tracing::info!(
        report_id = %record.id,
        employee_id = %record.employee_id,
        kind = %record.kind,
        date = %record.date,
        "Condition report submitted"
    );
    Ok(record)
}

#[instrument(name = "condition_acknowledge", skip(record_store, clock))]
pub async fn acknowledge(
    record_store: &dyn RecordStore,
    clock: &dyn Clock,
    report_id: &str,
) -> Result<ConditionReport, EngineError> {
    review(
        record_store,
        clock,
        report_id,
        ConditionStatus::Acknowledged,
        "acknowledge",
    )
    .await
}

#[instrument(name = "condition_reject", skip(record_store, clock))]
pub async fn reject(
    record_store: &dyn RecordStore,
    clock: &dyn Clock,
    report_id: &str,
) -> Result<ConditionReport, EngineError> {
    review(
        record_store,
        clock,
        report_id,
        ConditionStatus::Rejected,
        "reject",
    )
    .await
}

async fn review(
    record_store: &dyn RecordStore,
    clock: &dyn Clock,
    report_id: &str,
    next: ConditionStatus,
    action: &'static str,
) -> Result<ConditionReport, EngineError> {
    let doc = record_store
        .get(Collection::ConditionReports, report_id)
        .await?
        .ok_or_else(|| EngineError::RequestNotFound {
            request_id: report_id.to_string(),
        })?;
    let mut record: ConditionReport = store::decode(report_id, &doc)?;

    if record.is_terminal() {
        return Err(EngineError::Conflict {
            current: record.status.as_str().to_string(),
        });
    }

    record.status = next;
    if next == ConditionStatus::Acknowledged {
        record.acknowledged_at = Some(clock.now());
    }

    // Same conditional-write guard as the swap workflow.
    record_store
        .put_if_status(
            Collection::ConditionReports,
            report_id,
            ConditionStatus::Pending.as_str(),
            store::encode(&record)?,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, report_id, action, "Could not review condition report");
            EngineError::from(e)
        })?;

    tracing::info!(report_id, status = %record.status, "Condition report reviewed");
    Ok(record)
}
