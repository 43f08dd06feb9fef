//! Configuration module for timeline-trawler
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and turning them into engine settings and seed jobs.
//!
//! # Example
//!
//! ```no_run
//! use timeline_trawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("trawler.toml")).unwrap();
//! println!("Collector will stop after {} stalled cycles", config.collector.stall_threshold);
//! ```

mod parser;
mod plan;
mod types;
mod validation;

// Re-export types
pub use types::{
    BackendKind, BrowserConfig, CollectorConfig, Config, HashtagGroup, NetworkGroup,
    OutputConfig, OutputFormat, RetryConfig, TimelineGroup,
};

pub use plan::{SeedGroup, SeedJob};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, load_handle_file, merge_handles,
    parse_config,
};
pub use validation::{parse_relations, parse_session_cookie};
