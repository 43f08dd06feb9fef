//! Pagination driver
//!
//! This module decides how long to wait for content after each scroll and
//! when a page has stopped producing new items:
//! - Adaptive wait that grows after consecutive stalls and resets on progress
//! - Optional random pacing jitter between cycles
//! - Stall detection by rendered-item fingerprint and new unique records
//! - Terminal "no more content" after a configurable number of stalls

use crate::state::PaginationState;
use rand::Rng;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

/// Tuning of the pagination driver
#[derive(Debug, Clone, PartialEq)]
pub struct DriverSettings {
    /// Consecutive stalls after which the page is considered exhausted
    pub stall_threshold: u32,

    /// Wait after a scroll while progress is being made
    pub base_wait: Duration,

    /// Upper bound of the adaptive wait
    pub max_wait: Duration,

    /// Multiplier applied to the wait after each stall
    pub wait_growth: f64,

    /// Upper bound of the random pause added to every cycle
    pub jitter: Duration,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            stall_threshold: 10,
            base_wait: Duration::from_secs(2),
            max_wait: Duration::from_secs(10),
            wait_growth: 1.5,
            jitter: Duration::from_millis(1000),
        }
    }
}

/// Result of measuring one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// New unique items were rendered
    Progress,

    /// Nothing new; the driver will try again
    Stalled { consecutive: u32 },

    /// The stall threshold was reached
    NoMoreContent,
}

/// Fingerprint of the currently rendered items
pub fn fingerprint<I, T>(identities: I) -> u64
where
    I: IntoIterator<Item = T>,
    T: Hash,
{
    let mut hasher = DefaultHasher::new();
    let mut count = 0usize;
    for identity in identities {
        identity.hash(&mut hasher);
        count += 1;
    }
    count.hash(&mut hasher);
    hasher.finish()
}

/// State machine advancing one page leg
///
/// `Idle -> Triggering -> Measuring -> {Idle | Stalled | Exhausted | Blocked}`
pub struct PaginationDriver {
    settings: DriverSettings,
    state: PaginationState,
    current_wait: Duration,
    consecutive_stalls: u32,
    last_fingerprint: Option<u64>,
    cycles: u64,
}

impl PaginationDriver {
    /// Creates a driver in the `Idle` state
    pub fn new(settings: DriverSettings) -> Self {
        let current_wait = settings.base_wait;
        Self {
            settings,
            state: PaginationState::Idle,
            current_wait,
            consecutive_stalls: 0,
            last_fingerprint: None,
            cycles: 0,
        }
    }

    pub fn state(&self) -> PaginationState {
        self.state
    }

    /// Wait the next cycle will allow for content to render
    pub fn current_wait(&self) -> Duration {
        self.current_wait
    }

    pub fn consecutive_stalls(&self) -> u32 {
        self.consecutive_stalls
    }

    /// Number of scroll cycles started
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    fn transition(&mut self, next: PaginationState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal pagination transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
    }

    /// Records the rendered items of the initially loaded page
    pub fn prime(&mut self, fingerprint: u64) {
        self.last_fingerprint = Some(fingerprint);
    }

    /// Starts a cycle; returns the bounded wait to allow after the scroll
    pub fn begin_cycle(&mut self) -> Duration {
        self.transition(PaginationState::Triggering);
        self.cycles += 1;
        self.current_wait
    }

    /// Random pause to add to the current cycle
    pub fn jitter(&self) -> Duration {
        let max_ms = self.settings.jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=max_ms))
    }

    /// Marks the scroll and wait of the current cycle as done
    pub fn triggered(&mut self) {
        self.transition(PaginationState::Measuring);
    }

    /// Compares the cycle's rendered items against the previous cycle
    ///
    /// A cycle is progress only if the rendered items changed and at least
    /// one new unique record appeared.
    pub fn measure(&mut self, fingerprint: u64, new_unique: usize) -> CycleOutcome {
        let changed = self.last_fingerprint != Some(fingerprint);
        self.last_fingerprint = Some(fingerprint);

        if changed && new_unique > 0 {
            self.consecutive_stalls = 0;
            self.current_wait = self.settings.base_wait;
            self.transition(PaginationState::Idle);
            return CycleOutcome::Progress;
        }

        self.consecutive_stalls += 1;
        self.transition(PaginationState::Stalled);

        if self.consecutive_stalls >= self.settings.stall_threshold {
            self.transition(PaginationState::Exhausted);
            return CycleOutcome::NoMoreContent;
        }

        let grown = self.current_wait.as_secs_f64() * self.settings.wait_growth;
        self.current_wait = if grown.is_finite() && grown < self.settings.max_wait.as_secs_f64() {
            Duration::from_secs_f64(grown)
        } else {
            self.settings.max_wait
        };

        CycleOutcome::Stalled {
            consecutive: self.consecutive_stalls,
        }
    }

    /// Ends the leg because a caller bound was satisfied
    pub fn exhaust(&mut self) {
        if !self.state.is_terminal() {
            self.state = PaginationState::Exhausted;
        }
    }

    /// Ends the leg because the page accessor failed beyond the retry budget
    pub fn block(&mut self) {
        if !self.state.is_terminal() {
            self.state = PaginationState::Blocked;
        }
    }
}
