//! Integration tests for the collector
//!
//! These tests drive full collection runs over recorded HTML snapshots
//! served by the replay source, and check the records that reach the
//! CSV and SQLite outputs.

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::StreamExt;
use std::collections::HashSet;
use std::time::Duration;
use timeline_trawler::accessor::{
    AccessorError, AccessorResult, HtmlPageAccessor, HtmlSource, ReplaySource,
};
use timeline_trawler::collector::{
    CollectionEngine, Constraints, DateRange, DriverSettings, EngineSettings, RetryPolicy, Seed,
};
use timeline_trawler::config::parse_config;
use timeline_trawler::output::{open_sink, RunStatus};
use timeline_trawler::runner::{plan_jobs, run_collection, run_jobs, RunOptions};
use timeline_trawler::{Record, RelationKind, StopReason};
use tokio_util::sync::CancellationToken;

/// Renders one post the way the timeline does
fn post_html(id: u32, handle: &str, published: &str, body: &str) -> String {
    format!(
        r#"<article data-testid="tweet">
  <div data-testid="User-Name">
    <a href="/{handle}"><span>{handle} Name</span></a>
    <a href="/{handle}"><span>@{handle}</span></a>
    <a href="/{handle}/status/{id}"><time datetime="{published}">date</time></a>
  </div>
  <div data-testid="tweetText"><span>{body}</span></div>
  <div role="group">
    <button data-testid="reply"><span>3</span></button>
    <button data-testid="retweet"><span></span></button>
    <button data-testid="like"><span>1.2K</span></button>
    <a href="/{handle}/status/{id}/analytics"><span>15K</span></a>
  </div>
</article>"#
    )
}

fn post(id: u32) -> String {
    post_html(
        id,
        "alice",
        "2024-01-10T08:00:00.000Z",
        &format!("post number {} #rust", id),
    )
}

fn user_row(handle: &str) -> String {
    format!(
        r#"<div data-testid="UserCell"><a href="/{handle}"><span>{handle}</span></a><a href="/{handle}"><span>@{handle}</span></a></div>"#
    )
}

fn page(items: impl IntoIterator<Item = String>) -> String {
    let mut html = String::from("<html><body><main>");
    for item in items {
        html.push_str(&item);
    }
    html.push_str("</main></body></html>");
    html
}

fn posts(ids: std::ops::RangeInclusive<u32>) -> String {
    page(ids.map(post))
}

/// Settings with every wait collapsed so runs finish immediately
fn settings(stall_threshold: u32) -> EngineSettings {
    let mut settings = EngineSettings::new(url::Url::parse("https://x.com").unwrap());
    settings.driver = DriverSettings {
        stall_threshold,
        base_wait: Duration::ZERO,
        max_wait: Duration::ZERO,
        wait_growth: 1.0,
        jitter: Duration::ZERO,
    };
    settings.retry = RetryPolicy {
        max_attempts: 2,
        base_delay: Duration::ZERO,
        growth_factor: 1.0,
        max_delay: Duration::ZERO,
    };
    settings.initial_load_timeout = Duration::ZERO;
    settings
}

fn engine(source: ReplaySource, stall_threshold: u32) -> CollectionEngine<HtmlPageAccessor<ReplaySource>> {
    CollectionEngine::new(HtmlPageAccessor::new(source), settings(stall_threshold))
}

fn hashtag() -> Seed {
    Seed::Hashtag {
        tag: "rust".to_string(),
    }
}

fn post_ids(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .filter_map(|record| match record {
            Record::Post(post) => Some(post.id.clone()),
            Record::Edge(_) => None,
        })
        .collect()
}

async fn collect_all<S: HtmlSource>(
    engine: &mut CollectionEngine<HtmlPageAccessor<S>>,
    seed: Seed,
    constraints: Constraints,
) -> (Vec<Record>, timeline_trawler::CollectionSummary) {
    let mut collection = engine.collect(seed, constraints).unwrap();
    let mut records = Vec::new();
    while let Some(item) = collection.next().await {
        records.push(item.unwrap());
    }
    (records, collection.summary())
}

#[tokio::test]
async fn test_same_snapshots_give_same_records() {
    let snapshots = vec![posts(1..=5), posts(1..=8), posts(1..=8)];

    let mut first = engine(ReplaySource::new(snapshots.clone()), 2);
    let (a, summary) = collect_all(&mut first, hashtag(), Constraints::default()).await;

    let mut second = engine(ReplaySource::new(snapshots), 2);
    let (b, _) = collect_all(&mut second, hashtag(), Constraints::default()).await;

    assert_eq!(a, b);
    assert_eq!(post_ids(&a).len(), 8);
    assert_eq!(summary.stop_reason, Some(StopReason::NoMoreContent));
}

#[tokio::test]
async fn test_overlapping_windows_emit_each_post_once() {
    // The timeline keeps only a window of posts mounted while scrolling.
    let snapshots = vec![posts(1..=5), posts(4..=9), posts(8..=12), posts(8..=12)];
    let mut engine = engine(ReplaySource::new(snapshots), 2);

    let (records, summary) = collect_all(&mut engine, hashtag(), Constraints::default()).await;
    let ids = post_ids(&records);
    let unique: HashSet<_> = ids.iter().collect();

    assert_eq!(ids.len(), 12);
    assert_eq!(unique.len(), 12);
    assert_eq!(ids.first().map(String::as_str), Some("1"));
    assert_eq!(ids.last().map(String::as_str), Some("12"));
    assert!(summary.duplicates >= 3);
}

#[tokio::test]
async fn test_post_fields_are_extracted() {
    let mut engine = engine(ReplaySource::new(vec![posts(7..=7)]), 1);
    let (records, _) = collect_all(&mut engine, hashtag(), Constraints::default()).await;

    let Record::Post(post) = &records[0] else {
        panic!("expected a post, got {:?}", records[0]);
    };
    assert_eq!(post.id, "7");
    assert_eq!(post.author_handle, "alice");
    assert_eq!(post.author_name, "alice Name");
    assert_eq!(post.text, "post number 7 #rust");
    assert_eq!(post.hashtags, vec!["#rust".to_string()]);
    assert_eq!(post.permalink, "https://x.com/alice/status/7");
    assert_eq!(post.engagement.replies, Some(3));
    assert_eq!(post.engagement.retweets, Some(0));
    assert_eq!(post.engagement.likes, Some(1_200));
    assert_eq!(post.engagement.views, Some(15_000));
    assert_eq!(post.engagement.bookmarks, None);
    assert_eq!(post.target, "rust");
}

#[tokio::test]
async fn test_max_records_stops_early() {
    let snapshots = vec![posts(1..=5), posts(1..=10)];
    let mut engine = engine(ReplaySource::new(snapshots), 3);
    let constraints = Constraints {
        max_records: Some(3),
        ..Constraints::default()
    };

    let (records, summary) = collect_all(&mut engine, hashtag(), constraints).await;

    assert_eq!(post_ids(&records), vec!["1", "2", "3"]);
    assert_eq!(summary.stop_reason, Some(StopReason::MaxRecords));
    assert_eq!(summary.cycles, 0);
}

#[tokio::test]
async fn test_date_range_filters_and_ends_at_older_posts() {
    let snapshot = page([
        post_html(4, "alice", "2024-01-20T10:00:00.000Z", "too new"),
        post_html(3, "alice", "2024-01-15T10:00:00.000Z", "inside"),
        post_html(2, "alice", "2024-01-10T10:00:00.000Z", "inside too"),
        post_html(1, "alice", "2024-01-01T10:00:00.000Z", "too old"),
    ]);
    let mut engine = engine(ReplaySource::new(vec![snapshot]), 3);
    let range = DateRange::new(
        NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(),
    )
    .unwrap();
    let constraints = Constraints {
        date_range: Some(range),
        ..Constraints::default()
    };

    let (records, summary) = collect_all(&mut engine, hashtag(), constraints).await;

    assert_eq!(post_ids(&records), vec!["3", "2"]);
    assert_eq!(summary.out_of_range, 2);
    assert_eq!(summary.stop_reason, Some(StopReason::DateBoundPassed));
}

#[tokio::test]
async fn test_malformed_item_is_skipped() {
    let items = (1..=20).map(|id| {
        if id == 7 {
            // No handle span in the author block.
            r#"<article data-testid="tweet">
  <div data-testid="User-Name"><span>Broken</span><a href="/x/status/7"><time datetime="2024-01-10T08:00:00.000Z">d</time></a></div>
  <div data-testid="tweetText">broken</div>
</article>"#
                .to_string()
        } else {
            post(id)
        }
    });
    let mut engine = engine(ReplaySource::new(vec![page(items)]), 2);

    let (records, summary) = collect_all(&mut engine, hashtag(), Constraints::default()).await;
    let ids = post_ids(&records);

    assert_eq!(ids.len(), 19);
    assert!(!ids.contains(&"7".to_string()));
    assert_eq!(summary.extraction_failures, 1);
    assert_eq!(summary.stop_reason, Some(StopReason::NoMoreContent));
}

#[tokio::test]
async fn test_unchanged_page_ends_after_stall_threshold() {
    let mut engine = engine(ReplaySource::new(vec![posts(1..=3)]), 3);

    let (records, summary) = collect_all(&mut engine, hashtag(), Constraints::default()).await;

    assert_eq!(records.len(), 3);
    assert_eq!(summary.cycles, 3);
    assert_eq!(summary.stop_reason, Some(StopReason::NoMoreContent));
    assert_eq!(engine.accessor().scrolls(), 3);
}

#[tokio::test]
async fn test_empty_search_reports_empty_results() {
    let empty = r#"<html><body><div data-testid="emptyState">No results</div></body></html>"#;
    let mut engine = engine(ReplaySource::new(vec![empty.to_string()]), 3);

    let (records, summary) = collect_all(&mut engine, hashtag(), Constraints::default()).await;

    assert!(records.is_empty());
    assert_eq!(summary.stop_reason, Some(StopReason::EmptyResults));
}

#[tokio::test]
async fn test_network_edges_are_distinct_per_relation() {
    let source = ReplaySource::default()
        .with_page(
            "https://x.com/alice/followers",
            vec![page([user_row("bob"), user_row("carol")])],
        )
        .with_page(
            "https://x.com/alice/following",
            vec![page([user_row("bob"), user_row("dave")])],
        );
    let mut engine = engine(source, 2);
    let seed = Seed::Network {
        handle: "@alice".to_string(),
    };
    let constraints = Constraints {
        relation_kinds: Some(vec![RelationKind::Followers, RelationKind::Following]),
        ..Constraints::default()
    };

    let (records, summary) = collect_all(&mut engine, seed, constraints).await;
    let edges: Vec<_> = records
        .iter()
        .filter_map(|record| match record {
            Record::Edge(edge) => Some((edge.source.as_str(), edge.target.as_str(), edge.kind)),
            Record::Post(_) => None,
        })
        .collect();

    assert_eq!(
        edges,
        vec![
            ("alice", "bob", RelationKind::Followers),
            ("alice", "carol", RelationKind::Followers),
            ("alice", "bob", RelationKind::Following),
            ("alice", "dave", RelationKind::Following),
        ]
    );
    assert_eq!(summary.legs.len(), 2);
    assert_eq!(summary.stop_reason, Some(StopReason::NoMoreContent));
}

/// Serves one snapshot, then fails every later render
struct FailingAfterFirst {
    snapshot: String,
    renders: u32,
}

#[async_trait]
impl HtmlSource for FailingAfterFirst {
    async fn render(&mut self, _url: &str, _scrolls: u32) -> AccessorResult<String> {
        self.renders += 1;
        if self.renders == 1 {
            Ok(self.snapshot.clone())
        } else {
            Err(AccessorError::Backend {
                status: 503,
                message: "Service Unavailable".to_string(),
            })
        }
    }
}

#[tokio::test]
async fn test_backend_failure_interrupts_after_partial_results() {
    let source = FailingAfterFirst {
        snapshot: posts(1..=4),
        renders: 0,
    };
    let mut engine = CollectionEngine::new(HtmlPageAccessor::new(source), settings(3));
    let mut collection = engine.collect(hashtag(), Constraints::default()).unwrap();

    let mut records = Vec::new();
    let mut interruptions = Vec::new();
    while let Some(item) = collection.next().await {
        match item {
            Ok(record) => records.push(record),
            Err(interrupted) => interruptions.push(interrupted),
        }
    }

    assert_eq!(records.len(), 4);
    assert_eq!(interruptions.len(), 1);
    assert_eq!(interruptions[0].emitted, 4);
    assert_eq!(interruptions[0].attempts, 2);
    assert!(matches!(
        interruptions[0].source,
        AccessorError::Backend { status: 503, .. }
    ));
    assert_eq!(collection.summary().stop_reason, Some(StopReason::Interrupted));
    assert!(collection.is_finished());

    drop(collection);
    // One successful render plus two failed scroll attempts.
    assert_eq!(engine.into_accessor().into_source().renders, 3);
}

#[tokio::test]
async fn test_cancelled_run_stops_between_cycles() {
    let cancel = CancellationToken::new();
    let snapshots = vec![posts(1..=2), posts(1..=4), posts(1..=6)];
    let mut engine = engine(ReplaySource::new(snapshots), 3).with_cancellation(cancel.clone());

    let mut stream = Box::pin(
        engine
            .collect(hashtag(), Constraints::default())
            .unwrap()
            .into_stream(),
    );

    let mut ids = Vec::new();
    while let Some(item) = stream.next().await {
        if let Record::Post(post) = item.unwrap() {
            ids.push(post.id);
        }
        cancel.cancel();
    }

    // The initial batch is delivered before the cancellation is observed.
    assert_eq!(ids, vec!["1", "2"]);
}

fn output_config(replay_dir: &str, format: &str, path: &str) -> String {
    format!(
        r#"
[collector]
stall-threshold = 2
base-wait-ms = 0
max-wait-ms = 0
jitter-ms = 0
initial-load-timeout-ms = 0

[retry]
base-delay-ms = 0
max-delay-ms = 0

[browser]
backend = "replay"
replay-dir = "{replay_dir}"

[output]
format = "{format}"
path = "{path}"

[[hashtag]]
tags = ["rust"]

[[network]]
handles = ["alice"]
relations = ["followers"]
"#
    )
}

#[tokio::test]
async fn test_csv_output_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("csv");
    let config = parse_config(&output_config(
        "unused",
        "csv",
        &out.display().to_string(),
    ))
    .unwrap();
    let jobs = plan_jobs(
        &config,
        dir.path(),
        &RunOptions {
            only: Some(timeline_trawler::config::SeedGroup::Hashtag),
            max_records: None,
        },
    )
    .unwrap();

    let mut engine = CollectionEngine::new(
        HtmlPageAccessor::new(ReplaySource::new(vec![posts(1..=3), posts(1..=5)])),
        config.engine_settings().unwrap(),
    );
    let summaries = run_jobs(&mut engine, &jobs, |job| open_sink(&config.output, job, "hash"))
        .await
        .unwrap();
    assert_eq!(summaries[0].emitted, 5);

    let mut reader = csv::Reader::from_path(out.join("hashtag_rust.csv")).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(&headers[0], "id");

    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 5);
    assert_eq!(&rows[0][0], "1");
    assert_eq!(&rows[4][0], "5");
}

#[tokio::test]
async fn test_sqlite_output_from_replay_dir() {
    let dir = tempfile::tempdir().unwrap();
    let replay = dir.path().join("snapshots");
    std::fs::create_dir_all(&replay).unwrap();
    std::fs::write(
        replay.join("0000.html"),
        page([post(1), post(2), user_row("bob")]),
    )
    .unwrap();
    std::fs::write(
        replay.join("0001.html"),
        page([post(1), post(2), post(3), user_row("bob"), user_row("carol")]),
    )
    .unwrap();

    let db = dir.path().join("out").join("trawl.db");
    let config = parse_config(&output_config(
        &replay.display().to_string(),
        "sqlite",
        &db.display().to_string(),
    ))
    .unwrap();
    let jobs = plan_jobs(&config, dir.path(), &RunOptions::default()).unwrap();
    assert_eq!(jobs.len(), 2);

    let summaries = run_collection(&config, dir.path(), "hash", &jobs, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].emitted, 3);
    assert_eq!(summaries[1].emitted, 2);

    let conn = rusqlite::Connection::open(&db).unwrap();
    let posts: i64 = conn
        .query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))
        .unwrap();
    let edges: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM edges WHERE source = 'alice' AND kind = 'followers'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(posts, 3);
    assert_eq!(edges, 2);

    let mut stmt = conn
        .prepare("SELECT seed, status, records FROM runs ORDER BY id")
        .unwrap();
    let runs: Vec<(String, String, i64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .map(Result::unwrap)
        .collect();
    assert_eq!(
        runs,
        vec![
            ("#rust".to_string(), RunStatus::Completed.to_db_string().to_string(), 3),
            ("@alice".to_string(), RunStatus::Completed.to_db_string().to_string(), 2),
        ]
    );
}
