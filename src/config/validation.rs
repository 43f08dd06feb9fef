use crate::config::types::{
    BackendKind, BrowserConfig, CollectorConfig, Config, HashtagGroup, NetworkGroup, RetryConfig,
    TimelineGroup,
};
use crate::record::RelationKind;
use crate::ConfigError;
use chrono::NaiveDate;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_collector_config(&config.collector)?;
    validate_retry_config(&config.retry)?;
    validate_browser_config(&config.browser)?;
    validate_hashtag_groups(&config.hashtag)?;
    validate_timeline_groups(&config.timeline)?;
    validate_network_groups(&config.network)?;

    if config.hashtag.is_empty() && config.timeline.is_empty() && config.network.is_empty() {
        return Err(ConfigError::Validation(
            "At least one [[hashtag]], [[timeline]] or [[network]] group is required".to_string(),
        ));
    }

    if config.output.path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates collector configuration
fn validate_collector_config(config: &CollectorConfig) -> Result<(), ConfigError> {
    validate_max_records(config.max_records, "[collector]")?;

    if config.stall_threshold < 1 {
        return Err(ConfigError::Validation(
            "stall-threshold must be >= 1".to_string(),
        ));
    }

    if config.max_wait_ms < config.base_wait_ms {
        return Err(ConfigError::Validation(format!(
            "max-wait-ms ({}) must be >= base-wait-ms ({})",
            config.max_wait_ms, config.base_wait_ms
        )));
    }

    validate_growth(config.wait_growth, "wait-growth")?;

    Ok(())
}

/// Validates retry configuration
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(
            "max-attempts must be >= 1".to_string(),
        ));
    }

    if config.max_delay_ms < config.base_delay_ms {
        return Err(ConfigError::Validation(format!(
            "max-delay-ms ({}) must be >= base-delay-ms ({})",
            config.max_delay_ms, config.base_delay_ms
        )));
    }

    validate_growth(config.growth_factor, "growth-factor")
}

/// Validates browser configuration
fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    let site_base = Url::parse(&config.site_base)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid site-base: {}", e)))?;
    if !matches!(site_base.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "site-base '{}' must use http or https",
            config.site_base
        )));
    }

    match config.backend {
        BackendKind::Browserless => {
            let endpoint = config.endpoint.as_deref().ok_or_else(|| {
                ConfigError::Validation("The browserless backend requires an endpoint".to_string())
            })?;
            Url::parse(endpoint)
                .map_err(|e| ConfigError::InvalidUrl(format!("Invalid endpoint: {}", e)))?;
        }
        BackendKind::Replay => {
            if config.replay_dir.is_none() {
                return Err(ConfigError::Validation(
                    "The replay backend requires a replay-dir".to_string(),
                ));
            }
        }
    }

    if let Some(cookie) = &config.session_cookie {
        parse_session_cookie(cookie)?;
    }

    if config.scroll_step_px == 0 {
        return Err(ConfigError::Validation(
            "scroll-step-px must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Splits a `name=value` session cookie
pub fn parse_session_cookie(cookie: &str) -> Result<(String, String), ConfigError> {
    match cookie.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() && !value.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(ConfigError::Validation(
            "session-cookie must have the form name=value".to_string(),
        )),
    }
}

/// Validates hashtag groups
fn validate_hashtag_groups(groups: &[HashtagGroup]) -> Result<(), ConfigError> {
    for group in groups {
        if group.tags.iter().all(|tag| tag.trim().trim_start_matches('#').is_empty()) {
            return Err(ConfigError::Validation(
                "Each [[hashtag]] group must list at least one tag".to_string(),
            ));
        }
        validate_date_range(group.since, group.until)?;
        validate_max_records(group.max_records, "[[hashtag]]")?;
    }
    Ok(())
}

/// Validates timeline groups
fn validate_timeline_groups(groups: &[TimelineGroup]) -> Result<(), ConfigError> {
    for group in groups {
        if group.handles.is_empty() && group.handle_file.is_none() {
            return Err(ConfigError::Validation(
                "Each [[timeline]] group needs handles or a handle-file".to_string(),
            ));
        }
        validate_date_range(group.since, group.until)?;
        validate_max_records(group.max_records, "[[timeline]]")?;
    }
    Ok(())
}

/// Validates network groups
fn validate_network_groups(groups: &[NetworkGroup]) -> Result<(), ConfigError> {
    for group in groups {
        if group.handles.is_empty() && group.handle_file.is_none() {
            return Err(ConfigError::Validation(
                "Each [[network]] group needs handles or a handle-file".to_string(),
            ));
        }
        if let Some(relations) = &group.relations {
            parse_relations(relations)?;
        }
        validate_max_records(group.max_records, "[[network]]")?;
    }
    Ok(())
}

/// Parses relation kind labels
pub fn parse_relations(labels: &[String]) -> Result<Vec<RelationKind>, ConfigError> {
    if labels.is_empty() {
        return Err(ConfigError::Validation(
            "relations cannot be empty; omit it to collect all listings".to_string(),
        ));
    }

    labels
        .iter()
        .map(|label| {
            RelationKind::from_label(label).ok_or_else(|| {
                ConfigError::Validation(format!(
                    "Unknown relation '{}', expected following, followers or verified_followers",
                    label
                ))
            })
        })
        .collect()
}

fn validate_date_range(
    since: Option<NaiveDate>,
    until: Option<NaiveDate>,
) -> Result<(), ConfigError> {
    match (since, until) {
        (Some(since), Some(until)) if since > until => Err(ConfigError::Validation(format!(
            "since ({}) must not be after until ({})",
            since, until
        ))),
        (Some(_), None) | (None, Some(_)) => Err(ConfigError::Validation(
            "since and until must be given together".to_string(),
        )),
        _ => Ok(()),
    }
}

fn validate_max_records(max_records: Option<u64>, section: &str) -> Result<(), ConfigError> {
    if max_records == Some(0) {
        return Err(ConfigError::Validation(format!(
            "max-records in {} must be >= 1",
            section
        )));
    }
    Ok(())
}

fn validate_growth(growth: f64, key: &str) -> Result<(), ConfigError> {
    if !growth.is_finite() || growth < 1.0 {
        return Err(ConfigError::Validation(format!(
            "{} must be >= 1.0, got {}",
            key, growth
        )));
    }
    Ok(())
}
