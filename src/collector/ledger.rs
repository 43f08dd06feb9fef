//! Deduplication ledger
//!
//! Remembers the identity of every record emitted during one collection run.

use crate::record::RecordIdentity;
use std::collections::HashSet;

/// Set of record identities already seen in one collection run
///
/// Scoped to a single run; never evicts.
#[derive(Debug, Default)]
pub struct DedupLedger {
    seen: HashSet<RecordIdentity>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the identity was already marked
    pub fn seen(&self, identity: &RecordIdentity) -> bool {
        self.seen.contains(identity)
    }

    /// Marks an identity as seen; returns true if it was new
    pub fn mark(&mut self, identity: RecordIdentity) -> bool {
        self.seen.insert(identity)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
