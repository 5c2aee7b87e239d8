//! Workforce roster and attendance reconciliation engine.
//!
//! Derives a single authoritative status for every employee-day from
//! three independently maintained sources (roster assignments, approved
//! leave, attendance punches), rolls those statuses into fleet-wide
//! daily statistics, and runs the shift-swap and condition-report
//! approval workflows that mutate the same records. Storage and screens
//! live elsewhere; this crate only joins, derives and writes single
//! records through the [`store::RecordStore`] seam.

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;
pub mod store;
pub mod workflow;

pub use config::Config;
pub use engine::RosterEngine;
pub use error::EngineError;
