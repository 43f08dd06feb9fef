//! State module for tracking collection progress
//!
//! # Components
//!
//! - `PaginationState`: States of the pagination driver (idle, triggering, measuring, etc.)
//! - `StopReason`: Why a collection leg or run ended

mod pagination_state;

// Re-export main types
pub use pagination_state::{PaginationState, StopReason};
