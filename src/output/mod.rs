//! Output module for persisting collected records and reporting runs
//!
//! This module handles:
//! - Streaming records into CSV files or a SQLite database as they arrive
//! - Recording the final status of every seed run
//! - Printing run statistics

mod csv_sink;
mod schema;
mod sqlite_sink;
pub mod stats;
mod traits;

pub use csv_sink::{CsvSink, EDGE_COLUMNS, POST_COLUMNS};
pub use schema::{initialize_schema, SCHEMA_SQL};
pub use sqlite_sink::SqliteSink;
pub use stats::{format_summary, print_summary, RunTotals};
pub use traits::{OutputError, OutputResult, RecordSink, RunStatus};

use crate::config::{OutputConfig, OutputFormat, SeedJob};
use std::path::PathBuf;

/// File name of a seed's CSV output
///
/// # Example
///
/// ```
/// use timeline_trawler::output::csv_file_name;
///
/// assert_eq!(csv_file_name("hashtag", "#Rust"), "hashtag_rust.csv");
/// assert_eq!(csv_file_name("search", "\"a b\""), "search_a_b.csv");
/// ```
pub fn csv_file_name(kind: &str, seed: &str) -> String {
    let mut name = String::with_capacity(kind.len() + seed.len() + 5);
    name.push_str(kind);
    name.push('_');

    let mut last_underscore = true;
    for c in seed.chars() {
        if c.is_alphanumeric() {
            name.extend(c.to_lowercase());
            last_underscore = false;
        } else if !last_underscore {
            name.push('_');
            last_underscore = true;
        }
    }
    while name.ends_with('_') {
        name.pop();
    }

    name.push_str(".csv");
    name
}

/// Opens the sink a seed job writes to
///
/// # Arguments
///
/// * `output` - Output configuration
/// * `job` - The seed job about to run
/// * `config_hash` - Hash of the configuration, stored with SQLite runs
///
/// # Returns
///
/// * `Ok(Box<dyn RecordSink>)` - Sink ready for the job's records
/// * `Err(OutputError)` - The output could not be created
pub fn open_sink(
    output: &OutputConfig,
    job: &SeedJob,
    config_hash: &str,
) -> OutputResult<Box<dyn RecordSink + Send>> {
    match output.format {
        OutputFormat::Csv => {
            std::fs::create_dir_all(&output.path)?;
            let path: PathBuf = output
                .path
                .join(csv_file_name(job.group.as_str(), &job.seed.to_string()));
            tracing::info!("Writing {} to {}", job.seed, path.display());
            Ok(Box::new(CsvSink::create(&path)?))
        }
        OutputFormat::Sqlite => {
            if let Some(parent) = output.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            Ok(Box::new(SqliteSink::open(
                &output.path,
                &job.seed.to_string(),
                job.seed.kind_label(),
                config_hash,
            )?))
        }
    }
}
