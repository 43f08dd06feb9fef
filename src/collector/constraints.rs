//! Caller constraints on a collection run
//!
//! Constraints are validated against the seed before any navigation happens;
//! an invalid combination fails fast with a [`ConstraintViolation`].

use crate::collector::seed::Seed;
use crate::record::RelationKind;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// Invalid seed or constraint combination
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintViolation {
    #[error("Date range start {start} is after end {end}")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },

    #[error("max-records must be at least 1")]
    ZeroMaxRecords,

    #[error("At least one relation kind is required")]
    EmptyRelationKinds,

    #[error("Relation kinds only apply to network seeds")]
    RelationKindsOnPostSeed,

    #[error("A date range cannot be applied to a network seed")]
    DateRangeOnNetworkSeed,

    #[error("Seed has no query or handle")]
    EmptySeed,

    #[error("Invalid site base URL {0}")]
    InvalidSiteBase(String),
}

/// Inclusive range of calendar days (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range; `start` must not be after `end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ConstraintViolation> {
        if start > end {
            return Err(ConstraintViolation::InvertedDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Returns true if the timestamp falls on a day inside the range
    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        let day = ts.date_naive();
        self.start <= day && day <= self.end
    }

    /// Returns true if the timestamp falls on a day before the range
    pub fn is_before(&self, ts: &DateTime<Utc>) -> bool {
        ts.date_naive() < self.start
    }
}

/// Options bounding one collection run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraints {
    /// Stop after this many emitted records
    pub max_records: Option<u64>,

    /// Keep only posts published inside this range
    pub date_range: Option<DateRange>,

    /// Listings to read for a network seed; `None` reads all of them
    pub relation_kinds: Option<Vec<RelationKind>>,

    /// Treat the first post older than the range start as the end of results
    ///
    /// Only correct when the source lists posts newest first.
    pub assume_reverse_chronological: bool,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            max_records: None,
            date_range: None,
            relation_kinds: None,
            assume_reverse_chronological: true,
        }
    }
}

impl Constraints {
    /// Checks the constraints against the seed they will be applied to
    pub fn validate(&self, seed: &Seed) -> Result<(), ConstraintViolation> {
        seed.validate()?;

        if self.max_records == Some(0) {
            return Err(ConstraintViolation::ZeroMaxRecords);
        }

        if self.date_range.is_some() && seed.is_network() {
            return Err(ConstraintViolation::DateRangeOnNetworkSeed);
        }

        match &self.relation_kinds {
            Some(_) if !seed.is_network() => Err(ConstraintViolation::RelationKindsOnPostSeed),
            Some(kinds) if kinds.is_empty() => Err(ConstraintViolation::EmptyRelationKinds),
            _ => Ok(()),
        }
    }

    /// Relation kinds to collect, deduplicated, in the order given
    pub fn relation_kinds(&self) -> Vec<RelationKind> {
        let kinds = self.relation_kinds.clone().unwrap_or_else(RelationKind::all);
        let mut unique = Vec::with_capacity(kinds.len());
        for kind in kinds {
            if !unique.contains(&kind) {
                unique.push(kind);
            }
        }
        unique
    }
}
