//! Collector module for incremental timeline collection
//!
//! This module contains the core collection logic, including:
//! - Seeds, constraints and the page legs they expand to
//! - Retrying transient page accessor failures
//! - Adaptive pagination and stall detection
//! - Run-scoped deduplication
//! - Overall collection orchestration

mod constraints;
mod driver;
mod engine;
mod ledger;
mod retry;
mod seed;

pub use constraints::{ConstraintViolation, Constraints, DateRange};
pub use driver::{fingerprint, CycleOutcome, DriverSettings, PaginationDriver};
pub use engine::{
    Collection, CollectionEngine, CollectionInterrupted, CollectionSummary, EngineSettings,
    LegSummary,
};
pub use ledger::DedupLedger;
pub use retry::{retry_accessor_call, Attempts, RetryExhausted, RetryPolicy};
pub use seed::{search_url, Leg, LegItems, Seed};
