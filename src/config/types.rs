use chrono::NaiveDate;
use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for timeline-trawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    pub browser: BrowserConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub hashtag: Vec<HashtagGroup>,
    #[serde(default)]
    pub timeline: Vec<TimelineGroup>,
    #[serde(default)]
    pub network: Vec<NetworkGroup>,
}

/// Collection behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Default record limit per seed; groups may override it
    #[serde(rename = "max-records", default)]
    pub max_records: Option<u64>,

    /// Consecutive stalled cycles after which a page is exhausted
    #[serde(rename = "stall-threshold", default = "default_stall_threshold")]
    pub stall_threshold: u32,

    /// Wait after a scroll while progress is made (milliseconds)
    #[serde(rename = "base-wait-ms", default = "default_base_wait_ms")]
    pub base_wait_ms: u64,

    /// Upper bound of the adaptive wait (milliseconds)
    #[serde(rename = "max-wait-ms", default = "default_max_wait_ms")]
    pub max_wait_ms: u64,

    /// Multiplier applied to the wait after each stall
    #[serde(rename = "wait-growth", default = "default_wait_growth")]
    pub wait_growth: f64,

    /// Upper bound of the random pause added to every cycle (milliseconds)
    #[serde(rename = "jitter-ms", default = "default_jitter_ms")]
    pub jitter_ms: u64,

    /// Time a fresh page may take to render items or its empty state (milliseconds)
    #[serde(
        rename = "initial-load-timeout-ms",
        default = "default_initial_load_timeout_ms"
    )]
    pub initial_load_timeout_ms: u64,

    /// Stop a dated search at the first post older than its start date
    #[serde(rename = "assume-reverse-chronological", default = "default_true")]
    pub assume_reverse_chronological: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_records: None,
            stall_threshold: default_stall_threshold(),
            base_wait_ms: default_base_wait_ms(),
            max_wait_ms: default_max_wait_ms(),
            wait_growth: default_wait_growth(),
            jitter_ms: default_jitter_ms(),
            initial_load_timeout_ms: default_initial_load_timeout_ms(),
            assume_reverse_chronological: true,
        }
    }
}

/// Retry configuration for page accessor calls
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay after the first failure (milliseconds)
    #[serde(rename = "base-delay-ms", default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(rename = "growth-factor", default = "default_growth_factor")]
    pub growth_factor: f64,

    /// Upper bound on any single delay (milliseconds)
    #[serde(rename = "max-delay-ms", default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            growth_factor: default_growth_factor(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Page rendering backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Live pages rendered by a Browserless service
    Browserless,

    /// Recorded HTML snapshots read from a directory
    Replay,
}

/// Browser session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    pub backend: BackendKind,

    /// Base URL of the Browserless service
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Browserless API token
    #[serde(default)]
    pub token: Option<String>,

    /// Authenticated session cookie as `name=value`
    #[serde(rename = "session-cookie", default)]
    pub session_cookie: Option<String>,

    /// Site origin pages are collected from
    #[serde(rename = "site-base", default = "default_site_base")]
    pub site_base: String,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Distance of one scroll step (pixels)
    #[serde(rename = "scroll-step-px", default = "default_scroll_step_px")]
    pub scroll_step_px: u32,

    /// Pause after each scroll step while rendering (milliseconds)
    #[serde(rename = "scroll-pause-ms", default = "default_scroll_pause_ms")]
    pub scroll_pause_ms: u64,

    /// Time allowed for client-side rendering after load (milliseconds)
    #[serde(rename = "settle-ms", default = "default_settle_ms")]
    pub settle_ms: u64,

    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Directory of recorded snapshots for the replay backend
    #[serde(rename = "replay-dir", default)]
    pub replay_dir: Option<PathBuf>,
}

/// Output file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One CSV file per seed in the output directory
    Csv,

    /// A single SQLite database
    Sqlite,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,

    /// Output directory (csv) or database file (sqlite)
    pub path: PathBuf,
}

/// Hashtag seed group
#[derive(Debug, Clone, Deserialize)]
pub struct HashtagGroup {
    /// Hashtags, with or without the leading `#`
    pub tags: Vec<String>,

    /// First day of the date range (inclusive)
    #[serde(default)]
    pub since: Option<NaiveDate>,

    /// Last day of the date range (inclusive)
    #[serde(default)]
    pub until: Option<NaiveDate>,

    #[serde(rename = "max-records", default)]
    pub max_records: Option<u64>,
}

/// Timeline seed group
#[derive(Debug, Clone, Deserialize)]
pub struct TimelineGroup {
    #[serde(default)]
    pub handles: Vec<String>,

    /// Plain-text file with one handle per line
    #[serde(rename = "handle-file", default)]
    pub handle_file: Option<PathBuf>,

    #[serde(default)]
    pub since: Option<NaiveDate>,

    #[serde(default)]
    pub until: Option<NaiveDate>,

    #[serde(rename = "max-records", default)]
    pub max_records: Option<u64>,
}

/// Network seed group
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkGroup {
    #[serde(default)]
    pub handles: Vec<String>,

    #[serde(rename = "handle-file", default)]
    pub handle_file: Option<PathBuf>,

    /// Listings to read (`following`, `followers`, `verified_followers`); all if omitted
    #[serde(default)]
    pub relations: Option<Vec<String>>,

    #[serde(rename = "max-records", default)]
    pub max_records: Option<u64>,
}

fn default_stall_threshold() -> u32 {
    10
}

fn default_base_wait_ms() -> u64 {
    2000
}

fn default_max_wait_ms() -> u64 {
    10_000
}

fn default_wait_growth() -> f64 {
    1.5
}

fn default_jitter_ms() -> u64 {
    1000
}

fn default_initial_load_timeout_ms() -> u64 {
    15_000
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    2000
}

fn default_growth_factor() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_site_base() -> String {
    "https://x.com".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string()
}

fn default_scroll_step_px() -> u32 {
    2500
}

fn default_scroll_pause_ms() -> u64 {
    1500
}

fn default_settle_ms() -> u64 {
    3000
}

fn default_request_timeout_ms() -> u64 {
    60_000
}
