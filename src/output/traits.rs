//! Record sink traits and types
//!
//! This module defines the trait interface for sinks that receive collected
//! records as they are emitted, and the status a sink records for a run.

use crate::record::Record;
use crate::state::StopReason;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Final status of a stored run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Cancelled,
}

impl RunStatus {
    /// Status of a run that ended for `reason`
    pub fn from_stop_reason(reason: Option<StopReason>) -> Self {
        match reason {
            Some(StopReason::Interrupted) => Self::Interrupted,
            Some(StopReason::Cancelled) => Self::Cancelled,
            _ => Self::Completed,
        }
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Trait for record sinks
///
/// A sink receives the records of one seed in emission order. Records
/// written before an interruption must remain usable, so sinks persist each
/// record as it arrives rather than on `finish`.
pub trait RecordSink {
    /// Persists one record
    ///
    /// # Arguments
    ///
    /// * `record` - The record to write
    fn write_record(&mut self, record: &Record) -> OutputResult<()>;

    /// Flushes buffered output and records the final status
    ///
    /// # Arguments
    ///
    /// * `status` - How the run ended
    fn finish(&mut self, status: RunStatus) -> OutputResult<()>;
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn write_record(&mut self, record: &Record) -> OutputResult<()> {
        (**self).write_record(record)
    }

    fn finish(&mut self, status: RunStatus) -> OutputResult<()> {
        (**self).finish(status)
    }
}
