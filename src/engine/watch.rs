//! Live recomputation feed for one day.
//!
//! A watch holds one subscription per collection and re-derives the full
//! day view whenever any of them reports a change. A periodic tick also
//! re-emits the view so elapsed-time figures for employees still clocked
//! in move without any record changing underneath.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use chrono::NaiveDate;
use futures::future::select_all;
use futures_util::{Stream, StreamExt, stream};
use tokio::time::{Interval, MissedTickBehavior};

use super::clock::Clock;
use super::{DayView, RosterEngine, build_day_view, load_day_snapshot};
use crate::error::EngineError;
use crate::store::{Collection, RecordStore, Subscription};

/// Collections that feed a day view. Swap requests do not: approving
/// one never changes derived state by itself.
const WATCHED: [Collection; 6] = [
    Collection::Employees,
    Collection::Shifts,
    Collection::Roster,
    Collection::LeaveRequests,
    Collection::Attendance,
    Collection::ConditionReports,
];

struct WatchState {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    org_root_id: Option<String>,
    date: NaiveDate,
    subscriptions: Vec<Subscription>,
    ticker: Interval,
}

impl WatchState {
    /// Parks until a collection changes or the refresh tick fires. Dead
    /// feeds are discarded as they are discovered; with every feed gone
    /// the ticker alone keeps the view moving.
    async fn wait_trigger(&mut self) {
        loop {
            if self.subscriptions.is_empty() {
                self.ticker.tick().await;
                return;
            }

            let outcome = {
                let changes =
                    select_all(self.subscriptions.iter_mut().map(|s| Box::pin(s.changed())));
                tokio::select! {
                    (alive, index, _) = changes => Some((alive, index)),
                    _ = self.ticker.tick() => None,
                }
            };

            match outcome {
                None => return,
                Some((true, _)) => return,
                Some((false, index)) => {
                    self.subscriptions.remove(index);
                }
            }
        }
    }
}

/// Stream of recomputed [`DayView`]s. The first view arrives promptly;
/// afterwards one is emitted per change or tick. Dropping the watch
/// releases every underlying subscription.
pub struct DayWatch {
    inner: Pin<Box<dyn Stream<Item = Result<DayView, EngineError>> + Send>>,
}

impl std::fmt::Debug for DayWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DayWatch").finish_non_exhaustive()
    }
}

impl DayWatch {
    pub async fn next(&mut self) -> Option<Result<DayView, EngineError>> {
        self.inner.next().await
    }
}

impl Stream for DayWatch {
    type Item = Result<DayView, EngineError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

pub(crate) fn watch_day(engine: &RosterEngine, date: NaiveDate) -> Result<DayWatch, EngineError> {
    let mut subscriptions = Vec::with_capacity(WATCHED.len());
    for collection in WATCHED {
        subscriptions.push(engine.store.subscribe(collection)?);
    }

    let mut ticker = tokio::time::interval(engine.config.refresh_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let state = WatchState {
        store: Arc::clone(&engine.store),
        clock: Arc::clone(&engine.clock),
        org_root_id: engine.config.org_root_id.clone(),
        date,
        subscriptions,
        ticker,
    };

    let inner = stream::unfold(state, |mut state| async move {
        state.wait_trigger().await;
        let snapshot =
            load_day_snapshot(state.store.as_ref(), state.org_root_id.as_deref(), state.date).await;
        let item = build_day_view(&snapshot, state.clock.now());
        Some((item, state))
    });

    Ok(DayWatch {
        inner: Box::pin(inner),
    })
}
