// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod notify;
pub mod reconcile;
pub mod record;
pub mod report;
pub mod runner;
pub mod scrape;
pub mod snapshot;

// ---- Re-exports for stable public API ----
pub use crate::reconcile::{reconcile, reconcile_at, Reconciliation, StayDuration};
pub use crate::record::AnimalRecord;
pub use crate::runner::{run_once, RunOptions, RunSummary};
