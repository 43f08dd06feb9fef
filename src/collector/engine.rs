//! Collection engine - incremental collection orchestration
//!
//! This module turns an infinitely scrolling page into a bounded,
//! deduplicated, lazily consumed sequence of records:
//! - Expanding a seed into page legs and opening each one
//! - Driving pagination cycles until a terminal condition
//! - Reading and extracting rendered items, skipping per-item failures
//! - Deduplicating through the run's ledger
//! - Enforcing the record limit and date range
//! - Retrying transient page accessor errors and surfacing interruptions

use crate::accessor::{
    AccessorError, AccessorResult, ElementHandle, FieldRole, PageAccessor, WaitCondition,
};
use crate::collector::constraints::{ConstraintViolation, Constraints};
use crate::collector::driver::{fingerprint, CycleOutcome, DriverSettings, PaginationDriver};
use crate::collector::ledger::DedupLedger;
use crate::collector::retry::{retry_accessor_call, RetryExhausted, RetryPolicy};
use crate::collector::seed::{Leg, LegItems, Seed};
use crate::extract::{extract_edge, extract_post, post_identity, ExtractionFailure, ItemFields};
use crate::record::{Record, RecordIdentity};
use crate::state::StopReason;
use futures::stream::{self, Stream};
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

/// Settings shared by every run of an engine
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Site origin used to build page URLs and canonical permalinks
    pub site_base: Url,

    /// Pagination tuning
    pub driver: DriverSettings,

    /// Retry policy for page accessor calls
    pub retry: RetryPolicy,

    /// How long a freshly loaded page may take to render items or its empty state
    pub initial_load_timeout: Duration,
}

impl EngineSettings {
    /// Default settings for a site
    pub fn new(site_base: Url) -> Self {
        Self {
            site_base,
            driver: DriverSettings::default(),
            retry: RetryPolicy::default(),
            initial_load_timeout: Duration::from_secs(15),
        }
    }
}

/// A run ended early because the page accessor kept failing
///
/// Records emitted before the interruption remain valid.
#[derive(Debug, Error)]
#[error("Collection interrupted after {emitted} record(s): {operation} failed after {attempts} attempt(s): {source}")]
pub struct CollectionInterrupted {
    /// Records emitted before the interruption
    pub emitted: u64,

    /// Accessor operation that failed
    pub operation: String,

    /// Attempts made before giving up
    pub attempts: u32,

    #[source]
    pub source: AccessorError,
}

/// How one leg of a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegSummary {
    pub label: String,
    pub url: String,
    pub stop_reason: StopReason,
}

/// Statistics of one collection run
#[derive(Debug, Clone, Default)]
pub struct CollectionSummary {
    /// Seed as displayed in logs
    pub seed: String,

    /// Records handed to the caller
    pub emitted: u64,

    /// Rendered items whose identity was already seen
    pub duplicates: u64,

    /// Rendered items that failed extraction
    pub extraction_failures: u64,

    /// Posts dropped by the date range
    pub out_of_range: u64,

    /// Scroll cycles run across all legs
    pub cycles: u64,

    /// Per-leg outcomes, in order
    pub legs: Vec<LegSummary>,

    /// Why the run ended; `None` while it is still running
    pub stop_reason: Option<StopReason>,

    /// Wall-clock time of the run
    pub elapsed: Duration,
}

/// Outcome of reading one rendered item
enum Harvested {
    /// Already emitted in this run or earlier in the same batch
    Duplicate,

    /// Failed extraction in an earlier cycle
    Known,

    /// Failed extraction; `key` stays the same while the item stays rendered
    Failed {
        key: String,
        failure: ExtractionFailure,
    },

    Fresh(Record),
}

/// Items rendered on the page in one cycle
struct Harvest {
    items: Vec<Harvested>,
    fingerprint: u64,
    rendered: usize,
}

/// Identities and failure keys the harvest may skip reading in full
struct KnownIdentities<'a> {
    ledger: &'a DedupLedger,
    failed: &'a HashSet<String>,
}

/// Stable key of an item that has no usable identity, built from its fields
fn content_key(prefix: &str, fields: &ItemFields, roles: &[FieldRole]) -> String {
    let mut key = String::from(prefix);
    for &role in roles {
        for value in fields.all(role) {
            key.push_str(&format!("|{:?}={}", role, value));
        }
    }
    key
}

async fn read_fields<A: PageAccessor + ?Sized>(
    accessor: &mut A,
    handle: ElementHandle,
    roles: &[FieldRole],
) -> AccessorResult<ItemFields> {
    let mut fields = ItemFields::new();
    for &role in roles {
        if role.is_multi_valued() {
            fields.set(role, accessor.read_all(handle, role).await?);
        } else if let Some(value) = accessor.read_field(handle, role).await? {
            fields.push(role, value);
        }
    }
    Ok(fields)
}

/// Reads every rendered item of a leg's page
///
/// Post identity is read first so items already seen are not read in full.
async fn harvest<A: PageAccessor + ?Sized>(
    accessor: &mut A,
    leg: &Leg,
    target: &str,
    site_base: &str,
    known: KnownIdentities<'_>,
) -> AccessorResult<Harvest> {
    let handles = accessor.find_items(leg.role()).await?;
    let rendered = handles.len();

    let mut batch = HashSet::new();
    let mut keys = Vec::with_capacity(rendered);
    let mut items = Vec::with_capacity(rendered);

    for handle in handles {
        let (key, outcome) = match &leg.items {
            LegItems::Posts => {
                let permalink = accessor.read_field(handle, FieldRole::Permalink).await?;
                let id = match permalink.as_deref().map(|raw| (raw, post_identity(raw))) {
                    Some((_, Ok(id))) => id,
                    Some((raw, Err(failure))) => {
                        let key = format!("permalink:{}", raw.trim());
                        let outcome = if known.failed.contains(&key) {
                            Harvested::Known
                        } else {
                            Harvested::Failed {
                                key: key.clone(),
                                failure,
                            }
                        };
                        keys.push(key);
                        items.push(outcome);
                        continue;
                    }
                    None => {
                        let fields = read_fields(accessor, handle, FieldRole::post_fields()).await?;
                        let key = content_key("post", &fields, FieldRole::post_fields());
                        let outcome = if known.failed.contains(&key) {
                            Harvested::Known
                        } else {
                            Harvested::Failed {
                                key: key.clone(),
                                failure: ExtractionFailure::MissingIdentity {
                                    field: FieldRole::Permalink,
                                },
                            }
                        };
                        keys.push(key);
                        items.push(outcome);
                        continue;
                    }
                };

                let identity = RecordIdentity::Post(id);
                let failure_key = identity.to_string();
                let outcome = if known.failed.contains(&failure_key) {
                    Harvested::Known
                } else if known.ledger.seen(&identity) || !batch.insert(identity.clone()) {
                    Harvested::Duplicate
                } else {
                    let fields = read_fields(accessor, handle, FieldRole::post_fields()).await?;
                    match extract_post(&fields, target, site_base) {
                        Ok(post) => Harvested::Fresh(Record::Post(post)),
                        Err(failure) => Harvested::Failed {
                            key: failure_key,
                            failure,
                        },
                    }
                };
                (identity.to_string(), outcome)
            }
            LegItems::Edges { source, kind } => {
                let fields = read_fields(accessor, handle, FieldRole::user_row_fields()).await?;
                match extract_edge(&fields, source, *kind) {
                    Ok(edge) => {
                        let record = Record::Edge(edge);
                        let identity = record.identity();
                        let outcome =
                            if known.ledger.seen(&identity) || !batch.insert(identity.clone()) {
                                Harvested::Duplicate
                            } else {
                                Harvested::Fresh(record)
                            };
                        (identity.to_string(), outcome)
                    }
                    Err(failure) => {
                        let key = content_key("row", &fields, FieldRole::user_row_fields());
                        let outcome = if known.failed.contains(&key) {
                            Harvested::Known
                        } else {
                            Harvested::Failed {
                                key: key.clone(),
                                failure,
                            }
                        };
                        (key, outcome)
                    }
                }
            }
        };

        keys.push(key);
        items.push(outcome);
    }

    Ok(Harvest {
        items,
        fingerprint: fingerprint(&keys),
        rendered,
    })
}

/// Orchestrates collection runs over one exclusively owned page session
pub struct CollectionEngine<A: PageAccessor> {
    accessor: A,
    settings: EngineSettings,
    cancel: CancellationToken,
}

impl<A: PageAccessor> CollectionEngine<A> {
    /// Creates an engine owning `accessor`
    pub fn new(accessor: A, settings: EngineSettings) -> Self {
        Self {
            accessor,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the engine's cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that cancels in-flight runs between cycles
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn accessor(&self) -> &A {
        &self.accessor
    }

    /// Consumes the engine and returns its page session
    pub fn into_accessor(self) -> A {
        self.accessor
    }

    /// Starts a collection run
    ///
    /// Nothing is navigated until the returned [`Collection`] is polled.
    ///
    /// # Arguments
    ///
    /// * `seed` - What to collect
    /// * `constraints` - Bounds of the run
    ///
    /// # Returns
    ///
    /// * `Ok(Collection)` - Lazy sequence of records
    /// * `Err(ConstraintViolation)` - The seed or constraints are invalid
    pub fn collect(
        &mut self,
        seed: Seed,
        constraints: Constraints,
    ) -> Result<Collection<'_, A>, ConstraintViolation> {
        constraints.validate(&seed)?;
        let legs = seed.legs(&self.settings.site_base, &constraints)?;

        info!(
            "Starting {} collection for {} ({} leg(s))",
            seed.kind_label(),
            seed,
            legs.len()
        );

        Ok(Collection {
            target: seed.target(),
            summary: CollectionSummary {
                seed: seed.to_string(),
                ..CollectionSummary::default()
            },
            engine: self,
            seed,
            constraints,
            legs: legs.into(),
            active: None,
            ledger: DedupLedger::new(),
            failed: HashSet::new(),
            pending: VecDeque::new(),
            accepted: 0,
            started: Instant::now(),
            finished: false,
        })
    }
}

/// Leg currently being paginated
struct ActiveLeg {
    leg: Leg,
    driver: PaginationDriver,
    rendered: usize,
}

/// A lazy, forward-only sequence of records from one run
pub struct Collection<'e, A: PageAccessor> {
    engine: &'e mut CollectionEngine<A>,
    seed: Seed,
    target: String,
    constraints: Constraints,
    legs: VecDeque<Leg>,
    active: Option<ActiveLeg>,
    ledger: DedupLedger,
    failed: HashSet<String>,
    pending: VecDeque<Record>,
    accepted: u64,
    summary: CollectionSummary,
    started: Instant,
    finished: bool,
}

impl<'e, A: PageAccessor> Collection<'e, A> {
    /// Next record of the run
    ///
    /// # Returns
    ///
    /// * `Some(Ok(Record))` - The next record
    /// * `Some(Err(CollectionInterrupted))` - The run was interrupted; returned once
    /// * `None` - The run is over
    pub async fn next(&mut self) -> Option<Result<Record, CollectionInterrupted>> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                self.summary.emitted += 1;
                if self.summary.emitted % 10 == 0 {
                    let rate = self.summary.emitted as f64
                        / self.started.elapsed().as_secs_f64().max(f64::EPSILON);
                    info!(
                        "Progress: {} records emitted for {}, {} duplicates skipped, {:.2} records/sec",
                        self.summary.emitted, self.seed, self.summary.duplicates, rate
                    );
                }
                return Some(Ok(record));
            }

            if self.finished {
                return None;
            }

            if let Err(interrupted) = self.advance().await {
                return Some(Err(interrupted));
            }
        }
    }

    /// Statistics of the run so far
    pub fn summary(&self) -> CollectionSummary {
        let mut summary = self.summary.clone();
        if !self.finished {
            summary.elapsed = self.started.elapsed();
        }
        summary
    }

    /// Returns true once the sequence is over
    pub fn is_finished(&self) -> bool {
        self.finished && self.pending.is_empty()
    }

    /// Adapts the collection to a [`Stream`]
    pub fn into_stream(self) -> impl Stream<Item = Result<Record, CollectionInterrupted>> + 'e
    where
        A: 'e,
    {
        stream::unfold(self, |mut collection| async move {
            collection.next().await.map(|item| (item, collection))
        })
    }

    async fn advance(&mut self) -> Result<(), CollectionInterrupted> {
        if self.engine.cancel.is_cancelled() {
            if let Some(active) = self.active.take() {
                self.record_leg(&active.leg, StopReason::Cancelled);
            }
            self.stop_run(StopReason::Cancelled);
            return Ok(());
        }

        match self.active.take() {
            Some(active) => self.cycle(active).await,
            None => match self.legs.pop_front() {
                Some(leg) => self.open_leg(leg).await,
                None => {
                    self.finish();
                    Ok(())
                }
            },
        }
    }

    async fn open_leg(&mut self, leg: Leg) -> Result<(), CollectionInterrupted> {
        info!("Collecting {} for {} from {}", leg.label(), self.seed, leg.url);
        let role = leg.role();

        if let Err(failure) = self.navigate(&leg.url).await {
            return Err(self.interrupt(&leg, failure));
        }

        let timeout = self.engine.settings.initial_load_timeout;
        let ready = match self.wait_for(WaitCondition::ItemsOrEmpty(role), timeout).await {
            Ok(ready) => ready,
            Err(failure) => return Err(self.interrupt(&leg, failure)),
        };
        if !ready {
            self.end_leg(&leg, StopReason::NoContent);
            return Ok(());
        }

        let harvest = match self.harvest(&leg).await {
            Ok(harvest) => harvest,
            Err(failure) => return Err(self.interrupt(&leg, failure)),
        };
        if harvest.rendered == 0 {
            self.end_leg(&leg, StopReason::EmptyResults);
            return Ok(());
        }

        let mut driver = PaginationDriver::new(self.engine.settings.driver.clone());
        driver.prime(harvest.fingerprint);

        let (new_unique, stop) = self.process(harvest.items);
        debug!(
            "Initial load of {} rendered {} item(s), {} new",
            leg.url, harvest.rendered, new_unique
        );

        match stop {
            Some(reason) => {
                driver.exhaust();
                self.end_leg(&leg, reason);
            }
            None => {
                self.active = Some(ActiveLeg {
                    leg,
                    driver,
                    rendered: harvest.rendered,
                });
            }
        }
        Ok(())
    }

    async fn cycle(&mut self, mut active: ActiveLeg) -> Result<(), CollectionInterrupted> {
        let role = active.leg.role();
        let wait = active.driver.begin_cycle();
        self.summary.cycles += 1;

        if let Err(failure) = self.scroll().await {
            active.driver.block();
            return Err(self.interrupt(&active.leg, failure));
        }

        let condition = WaitCondition::ItemCountExceeds(role, active.rendered);
        if let Err(failure) = self.wait_for(condition, wait).await {
            active.driver.block();
            return Err(self.interrupt(&active.leg, failure));
        }

        let jitter = active.driver.jitter();
        if !self.pause(jitter).await {
            self.record_leg(&active.leg, StopReason::Cancelled);
            self.stop_run(StopReason::Cancelled);
            return Ok(());
        }
        active.driver.triggered();

        let harvest = match self.harvest(&active.leg).await {
            Ok(harvest) => harvest,
            Err(failure) => {
                active.driver.block();
                return Err(self.interrupt(&active.leg, failure));
            }
        };
        active.rendered = harvest.rendered;

        let (new_unique, stop) = self.process(harvest.items);
        if let Some(reason) = stop {
            active.driver.exhaust();
            self.end_leg(&active.leg, reason);
            return Ok(());
        }

        match active.driver.measure(harvest.fingerprint, new_unique) {
            CycleOutcome::Progress => {
                debug!(
                    "Cycle {} on {}: {} rendered, {} new",
                    active.driver.cycles(),
                    active.leg.label(),
                    harvest.rendered,
                    new_unique
                );
            }
            CycleOutcome::Stalled { consecutive } => {
                debug!(
                    "Cycle {} on {} stalled ({} in a row), next wait {:?}",
                    active.driver.cycles(),
                    active.leg.label(),
                    consecutive,
                    active.driver.current_wait()
                );
            }
            CycleOutcome::NoMoreContent => {
                self.end_leg(&active.leg, StopReason::NoMoreContent);
                return Ok(());
            }
        }

        self.active = Some(active);
        Ok(())
    }

    /// Applies dedup, date range and record limit to one batch
    ///
    /// Returns the number of new unique records and the stop reason, if the
    /// batch satisfied a caller bound.
    fn process(&mut self, items: Vec<Harvested>) -> (usize, Option<StopReason>) {
        let mut new_unique = 0;

        for item in items {
            let record = match item {
                Harvested::Duplicate => {
                    self.summary.duplicates += 1;
                    continue;
                }
                Harvested::Known => continue,
                Harvested::Failed { key, failure } => {
                    self.summary.extraction_failures += 1;
                    warn!(seed = %self.seed, error = %failure, "Skipping item that failed extraction");
                    self.failed.insert(key);
                    continue;
                }
                Harvested::Fresh(record) => record,
            };

            if !self.ledger.mark(record.identity()) {
                self.summary.duplicates += 1;
                continue;
            }
            new_unique += 1;

            if let (Record::Post(post), Some(range)) = (&record, &self.constraints.date_range) {
                match post.published_at {
                    Some(ts) if range.contains(&ts) => {}
                    Some(ts) if range.is_before(&ts) => {
                        self.summary.out_of_range += 1;
                        if self.constraints.assume_reverse_chronological {
                            debug!("Post {} predates {}, date range passed", post.id, range.start());
                            return (new_unique, Some(StopReason::DateBoundPassed));
                        }
                        continue;
                    }
                    _ => {
                        self.summary.out_of_range += 1;
                        continue;
                    }
                }
            }

            self.pending.push_back(record);
            self.accepted += 1;

            if self
                .constraints
                .max_records
                .is_some_and(|max| self.accepted >= max)
            {
                return (new_unique, Some(StopReason::MaxRecords));
            }
        }

        (new_unique, None)
    }

    async fn navigate(&mut self, url: &str) -> Result<(), RetryExhausted> {
        let policy = self.engine.settings.retry.clone();
        let url = url.to_string();
        retry_accessor_call(&mut self.engine.accessor, &policy, "navigate", |accessor| {
            let url = url.clone();
            Box::pin(async move { accessor.navigate(&url).await })
        })
        .await
    }

    async fn scroll(&mut self) -> Result<(), RetryExhausted> {
        let policy = self.engine.settings.retry.clone();
        retry_accessor_call(&mut self.engine.accessor, &policy, "scroll", |accessor| {
            accessor.scroll()
        })
        .await
    }

    async fn wait_for(
        &mut self,
        condition: WaitCondition,
        timeout: Duration,
    ) -> Result<bool, RetryExhausted> {
        let policy = self.engine.settings.retry.clone();
        retry_accessor_call(&mut self.engine.accessor, &policy, "wait", |accessor| {
            accessor.wait_until(condition, timeout)
        })
        .await
    }

    async fn harvest(&mut self, leg: &Leg) -> Result<Harvest, RetryExhausted> {
        let policy = self.engine.settings.retry.clone();
        let mut attempts = policy.attempts("read items");
        loop {
            let result = harvest(
                &mut self.engine.accessor,
                leg,
                &self.target,
                self.engine.settings.site_base.as_str(),
                KnownIdentities {
                    ledger: &self.ledger,
                    failed: &self.failed,
                },
            )
            .await;

            match result {
                Ok(harvest) => return Ok(harvest),
                Err(error) => attempts.backoff(error).await?,
            }
        }
    }

    /// Sleeps unless cancelled; returns false if the run was cancelled
    async fn pause(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.engine.cancel.is_cancelled();
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.engine.cancel.cancelled() => false,
        }
    }

    fn interrupt(&mut self, leg: &Leg, failure: RetryExhausted) -> CollectionInterrupted {
        let interrupted = CollectionInterrupted {
            emitted: self.summary.emitted,
            operation: failure.operation,
            attempts: failure.attempts,
            source: failure.source,
        };
        error!("Collection of {} on {}: {}", self.seed, leg.url, interrupted);

        self.record_leg(leg, StopReason::Interrupted);
        self.stop_run(StopReason::Interrupted);
        interrupted
    }

    fn record_leg(&mut self, leg: &Leg, reason: StopReason) {
        self.summary.legs.push(LegSummary {
            label: leg.label(),
            url: leg.url.clone(),
            stop_reason: reason,
        });
        self.summary.stop_reason = Some(reason);
    }

    fn end_leg(&mut self, leg: &Leg, reason: StopReason) {
        info!("Finished {} for {}: {}", leg.label(), self.seed, reason);
        self.record_leg(leg, reason);
        if reason.ends_run() {
            self.stop_run(reason);
        }
    }

    fn stop_run(&mut self, reason: StopReason) {
        self.legs.clear();
        self.active = None;
        self.summary.stop_reason = Some(reason);
        self.finish();
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.summary.elapsed = self.started.elapsed();

        info!(
            "Collection of {} finished ({}): {} records, {} duplicates, {} extraction failures, {} out of range, {} cycles",
            self.seed,
            self.summary
                .stop_reason
                .map(|reason| reason.to_string())
                .unwrap_or_else(|| "no legs".to_string()),
            self.summary.emitted + self.pending.len() as u64,
            self.summary.duplicates,
            self.summary.extraction_failures,
            self.summary.out_of_range,
            self.summary.cycles
        );
    }
}
