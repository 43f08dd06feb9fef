//! Timeline-Trawler: An infinite-scroll timeline collector
//!
//! This crate collects posts and follower/following edges from a rendered
//! social timeline by driving a page session through scroll cycles,
//! extracting structured records from each rendering, and streaming them
//! into CSV files or a SQLite database.

pub mod accessor;
pub mod collector;
pub mod config;
pub mod extract;
pub mod output;
pub mod record;
pub mod runner;
pub mod state;

use thiserror::Error;

/// Main error type for Timeline-Trawler operations
#[derive(Debug, Error)]
pub enum TrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Page session error: {0}")]
    Accessor(#[from] accessor::AccessorError),

    #[error("Invalid collection request: {0}")]
    Constraint(#[from] collector::ConstraintViolation),

    #[error("Collection interrupted: {0}")]
    Interrupted(#[from] collector::CollectionInterrupted),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Timeline-Trawler operations
pub type Result<T> = std::result::Result<T, TrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use collector::{CollectionEngine, CollectionSummary, Constraints, DateRange, Seed};
pub use config::Config;
pub use record::{Edge, Post, Record, RelationKind};
pub use state::StopReason;
