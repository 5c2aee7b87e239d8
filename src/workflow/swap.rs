//! Shift-swap request workflow: Pending, then Approved or Rejected,
//! both terminal. Approving a swap never touches the roster itself;
//! the assignment editor applies the change as a separate, auditable
//! step.

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::engine::clock::Clock;
use crate::error::EngineError;
use crate::model::swap_request::{ShiftSwapRequest, SwapStatus};
use crate::store::{self, Collection, RecordStore};

/// Payload for an employee raising a swap proposal.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSwapRequest {
    pub requester_id: String,
    pub requester_name: String,
    pub date: NaiveDate,
    pub shift_name: String,
    pub reason: String,
}

pub async fn submit(
    record_store: &dyn RecordStore,
    clock: &dyn Clock,
    request: NewSwapRequest,
) -> Result<ShiftSwapRequest, EngineError> {
    let record = ShiftSwapRequest {
        id: Uuid::new_v4().to_string(),
        requester_id: request.requester_id,
        requester_name: request.requester_name,
        date: request.date,
        shift_name: request.shift_name,
        reason: request.reason,
        status: SwapStatus::Pending,
        created_at: clock.now(),
        reviewed_at: None,
    };

    record_store
        .put(
            Collection::SwapRequests,
            &record.id,
            store::encode(&record)?,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, request_id = %record.id, "Submit swap request failed");
            EngineError::from(e)
        })?;

    tracing::info!(
        request_id = %record.id,
        requester_id = %record.requester_id,
        date = %record.date,
        "Swap request submitted"
    );
    Ok(record)
}

#[instrument(name = "swap_approve", skip(record_store, clock))]
pub async fn approve(
    record_store: &dyn RecordStore,
    clock: &dyn Clock,
    request_id: &str,
) -> Result<ShiftSwapRequest, EngineError> {
    review(record_store, clock, request_id, SwapStatus::Approved, "approve").await
}

#[instrument(name = "swap_reject", skip(record_store, clock))]
pub async fn reject(
    record_store: &dyn RecordStore,
    clock: &dyn Clock,
    request_id: &str,
) -> Result<ShiftSwapRequest, EngineError> {
    review(record_store, clock, request_id, SwapStatus::Rejected, "reject").await
}

async fn review(
    record_store: &dyn RecordStore,
    clock: &dyn Clock,
    request_id: &str,
    next: SwapStatus,
    action: &'static str,
) -> Result<ShiftSwapRequest, EngineError> {
    let doc = record_store
        .get(Collection::SwapRequests, request_id)
        .await?
        .ok_or_else(|| EngineError::RequestNotFound {
            request_id: request_id.to_string(),
        })?;
    let mut record: ShiftSwapRequest = store::decode(request_id, &doc)?;

    if record.is_terminal() {
        return Err(EngineError::Conflict {
            current: record.status.as_str().to_string(),
        });
    }

    record.status = next;
    record.reviewed_at = Some(clock.now());

    // Conditional write: the transition only lands while the stored
    // status is still pending, so a concurrent reviewer loses cleanly
    // instead of overwriting a terminal record.
    record_store
        .put_if_status(
            Collection::SwapRequests,
            request_id,
            SwapStatus::Pending.as_str(),
            store::encode(&record)?,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, request_id, action, "Could not review swap request");
            EngineError::from(e)
        })?;

    tracing::info!(request_id, status = %record.status, "Swap request reviewed");
    Ok(record)
}
