//! Conversion of a validated configuration into engine settings and seeds

use crate::accessor::BrowserlessOptions;
use crate::collector::{Constraints, DateRange, DriverSettings, EngineSettings, RetryPolicy, Seed};
use crate::config::parser::{load_handle_file, merge_handles};
use crate::config::types::{BrowserConfig, CollectorConfig, Config, RetryConfig};
use crate::config::validation::{parse_relations, parse_session_cookie};
use crate::ConfigError;
use chrono::NaiveDate;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Seed group a job was declared in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeedGroup {
    Hashtag,
    Timeline,
    Network,
}

impl SeedGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hashtag => "hashtag",
            Self::Timeline => "timeline",
            Self::Network => "network",
        }
    }
}

impl fmt::Display for SeedGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One seed to collect, with the constraints of its group
#[derive(Debug, Clone, PartialEq)]
pub struct SeedJob {
    pub group: SeedGroup,
    pub seed: Seed,
    pub constraints: Constraints,
}

impl CollectorConfig {
    /// Pagination driver settings
    pub fn driver_settings(&self) -> DriverSettings {
        DriverSettings {
            stall_threshold: self.stall_threshold,
            base_wait: Duration::from_millis(self.base_wait_ms),
            max_wait: Duration::from_millis(self.max_wait_ms),
            wait_growth: self.wait_growth,
            jitter: Duration::from_millis(self.jitter_ms),
        }
    }
}

impl RetryConfig {
    /// Retry policy for page accessor calls
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            growth_factor: self.growth_factor,
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

impl BrowserConfig {
    /// Options for a Browserless rendering source
    pub fn browserless_options(&self) -> Result<BrowserlessOptions, ConfigError> {
        let endpoint = self.endpoint.clone().ok_or_else(|| {
            ConfigError::Validation("The browserless backend requires an endpoint".to_string())
        })?;
        let session_cookie = self
            .session_cookie
            .as_deref()
            .map(parse_session_cookie)
            .transpose()?;

        Ok(BrowserlessOptions {
            endpoint,
            token: self.token.clone(),
            session_cookie,
            user_agent: self.user_agent.clone(),
            scroll_step_px: self.scroll_step_px,
            scroll_pause: Duration::from_millis(self.scroll_pause_ms),
            settle: Duration::from_millis(self.settle_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        })
    }
}

impl Config {
    /// Settings shared by every collection run
    pub fn engine_settings(&self) -> Result<EngineSettings, ConfigError> {
        let site_base = Url::parse(&self.browser.site_base)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid site-base: {}", e)))?;

        Ok(EngineSettings {
            site_base,
            driver: self.collector.driver_settings(),
            retry: self.retry.policy(),
            initial_load_timeout: Duration::from_millis(self.collector.initial_load_timeout_ms),
        })
    }

    /// Expands the seed groups into jobs, in declaration order
    ///
    /// Relative handle files are resolved against `base_dir`, normally the
    /// directory of the configuration file.
    ///
    /// # Arguments
    ///
    /// * `base_dir` - Directory relative paths are resolved against
    /// * `max_records` - Limit overriding every group and the collector default
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<SeedJob>)` - Jobs to run, hashtags first, then timelines, then networks
    /// * `Err(ConfigError)` - A handle file could not be read or a group is empty
    pub fn seed_jobs(
        &self,
        base_dir: &Path,
        max_records: Option<u64>,
    ) -> Result<Vec<SeedJob>, ConfigError> {
        let mut jobs = Vec::new();
        let limit = |group: Option<u64>| max_records.or(group).or(self.collector.max_records);

        for group in &self.hashtag {
            let constraints = Constraints {
                max_records: limit(group.max_records),
                date_range: date_range(group.since, group.until)?,
                relation_kinds: None,
                assume_reverse_chronological: self.collector.assume_reverse_chronological,
            };
            for tag in &group.tags {
                let tag = tag.trim().trim_start_matches('#').trim();
                if tag.is_empty() {
                    continue;
                }
                jobs.push(SeedJob {
                    group: SeedGroup::Hashtag,
                    seed: Seed::Hashtag {
                        tag: tag.to_string(),
                    },
                    constraints: constraints.clone(),
                });
            }
        }

        for group in &self.timeline {
            let constraints = Constraints {
                max_records: limit(group.max_records),
                date_range: date_range(group.since, group.until)?,
                relation_kinds: None,
                assume_reverse_chronological: self.collector.assume_reverse_chronological,
            };
            for handle in group_handles(&group.handles, group.handle_file.as_deref(), base_dir)? {
                jobs.push(SeedJob {
                    group: SeedGroup::Timeline,
                    seed: Seed::Timeline { handle },
                    constraints: constraints.clone(),
                });
            }
        }

        for group in &self.network {
            let relation_kinds = group
                .relations
                .as_deref()
                .map(parse_relations)
                .transpose()?;
            let constraints = Constraints {
                max_records: limit(group.max_records),
                date_range: None,
                relation_kinds,
                assume_reverse_chronological: self.collector.assume_reverse_chronological,
            };
            for handle in group_handles(&group.handles, group.handle_file.as_deref(), base_dir)? {
                jobs.push(SeedJob {
                    group: SeedGroup::Network,
                    seed: Seed::Network { handle },
                    constraints: constraints.clone(),
                });
            }
        }

        Ok(jobs)
    }
}

fn date_range(
    since: Option<NaiveDate>,
    until: Option<NaiveDate>,
) -> Result<Option<DateRange>, ConfigError> {
    match (since, until) {
        (Some(since), Some(until)) => DateRange::new(since, until)
            .map(Some)
            .map_err(|e| ConfigError::Validation(e.to_string())),
        _ => Ok(None),
    }
}

fn group_handles(
    inline: &[String],
    handle_file: Option<&Path>,
    base_dir: &Path,
) -> Result<Vec<String>, ConfigError> {
    let mut all: Vec<String> = inline.to_vec();
    if let Some(file) = handle_file {
        let path: PathBuf = if file.is_absolute() {
            file.to_path_buf()
        } else {
            base_dir.join(file)
        };
        all.extend(load_handle_file(&path)?);
    }

    let handles = merge_handles(all.iter().map(String::as_str));
    if handles.is_empty() {
        return Err(ConfigError::Validation(
            "Seed group has no usable handles".to_string(),
        ));
    }
    Ok(handles)
}
