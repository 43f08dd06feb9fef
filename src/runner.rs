//! Run orchestration - collecting every configured seed
//!
//! This module ties the pieces of a run together:
//! - Building the page session for the configured backend
//! - Expanding seed groups into jobs
//! - Collecting seeds one after another on the same session
//! - Streaming records into the configured sink
//! - Handling cancellation and per-seed interruptions

use crate::accessor::{BrowserlessSource, HtmlPageAccessor, PageAccessor, ReplaySource};
use crate::collector::{CollectionEngine, CollectionSummary, Leg};
use crate::config::{BackendKind, Config, SeedGroup, SeedJob};
use crate::output::{open_sink, OutputResult, RecordSink, RunStatus};
use crate::TrawlError;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Caller options for one run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Collect only seeds of this group
    pub only: Option<SeedGroup>,

    /// Record limit overriding the configuration
    pub max_records: Option<u64>,
}

/// Seed jobs of a configuration after applying the run options
///
/// # Arguments
///
/// * `config` - Validated configuration
/// * `config_dir` - Directory relative paths in the configuration are resolved against
/// * `options` - Run options
pub fn plan_jobs(
    config: &Config,
    config_dir: &Path,
    options: &RunOptions,
) -> Result<Vec<SeedJob>, TrawlError> {
    let jobs = config.seed_jobs(config_dir, options.max_records)?;
    Ok(jobs
        .into_iter()
        .filter(|job| options.only.map_or(true, |group| job.group == group))
        .collect())
}

/// Page legs each job would visit, without touching the network
pub fn plan_legs(config: &Config, jobs: &[SeedJob]) -> Result<Vec<(SeedJob, Vec<Leg>)>, TrawlError> {
    let settings = config.engine_settings()?;
    jobs.iter()
        .map(|job| -> Result<(SeedJob, Vec<Leg>), TrawlError> {
            job.constraints.validate(&job.seed)?;
            let legs = job.seed.legs(&settings.site_base, &job.constraints)?;
            Ok((job.clone(), legs))
        })
        .collect()
}

/// Runs every job against the configured backend
///
/// # Arguments
///
/// * `config` - Validated configuration
/// * `config_dir` - Directory relative paths in the configuration are resolved against
/// * `config_hash` - Hash of the configuration file, stored with SQLite runs
/// * `jobs` - Seeds to collect, in order
/// * `cancel` - Token that stops the run between cycles
///
/// # Returns
///
/// * `Ok(Vec<CollectionSummary>)` - One summary per collected seed
/// * `Err(TrawlError)` - The session or an output could not be set up
pub async fn run_collection(
    config: &Config,
    config_dir: &Path,
    config_hash: &str,
    jobs: &[SeedJob],
    cancel: CancellationToken,
) -> Result<Vec<CollectionSummary>, TrawlError> {
    let settings = config.engine_settings()?;
    let open = |job: &SeedJob| open_sink(&config.output, job, config_hash);

    match config.browser.backend {
        BackendKind::Browserless => {
            let source = BrowserlessSource::new(config.browser.browserless_options()?)?;
            let mut engine = CollectionEngine::new(HtmlPageAccessor::new(source), settings)
                .with_cancellation(cancel);
            run_jobs(&mut engine, jobs, open).await
        }
        BackendKind::Replay => {
            let dir = resolve(config_dir, config.browser.replay_dir.as_deref());
            info!("Replaying recorded snapshots from {}", dir.display());
            let source = ReplaySource::from_dir(&dir)?;
            let mut engine = CollectionEngine::new(HtmlPageAccessor::new(source), settings)
                .with_cancellation(cancel);
            run_jobs(&mut engine, jobs, open).await
        }
    }
}

fn resolve(base: &Path, path: Option<&Path>) -> PathBuf {
    match path {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => base.join(path),
        None => base.to_path_buf(),
    }
}

/// Collects jobs sequentially on one engine, streaming records into sinks
///
/// An interrupted seed keeps the records it emitted and the run moves on to
/// the next seed; cancellation stops the whole run.
pub async fn run_jobs<A, S, F>(
    engine: &mut CollectionEngine<A>,
    jobs: &[SeedJob],
    mut open: F,
) -> Result<Vec<CollectionSummary>, TrawlError>
where
    A: PageAccessor,
    S: RecordSink,
    F: FnMut(&SeedJob) -> OutputResult<S>,
{
    let cancel = engine.cancellation_token();
    let mut summaries = Vec::with_capacity(jobs.len());

    for (index, job) in jobs.iter().enumerate() {
        if cancel.is_cancelled() {
            warn!("Run cancelled, skipping {} remaining seed(s)", jobs.len() - index);
            break;
        }

        info!(
            "Seed {}/{}: {} ({})",
            index + 1,
            jobs.len(),
            job.seed,
            job.group
        );

        let mut sink = open(job)?;
        let mut collection = engine.collect(job.seed.clone(), job.constraints.clone())?;

        while let Some(item) = collection.next().await {
            match item {
                Ok(record) => sink.write_record(&record)?,
                Err(interrupted) => {
                    error!("Seed {} ended early: {}", job.seed, interrupted);
                }
            }
        }

        let summary = collection.summary();
        sink.finish(RunStatus::from_stop_reason(summary.stop_reason))?;
        summaries.push(summary);
    }

    Ok(summaries)
}
