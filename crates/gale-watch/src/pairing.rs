//! Temporal pairing of merged groups.
//!
//! Pairs are two merged groups on the same date, six hours apart, sharing
//! a forecast offset. The search is incremental: each newly merged key is
//! checked against the existing pool only, never the pool against itself,
//! keeping cost linear in total artifacts rather than quadratic per event.
//!
//! Dedup is two-layered. The processed set stops a pair from being
//! reported again after its conversion succeeded, and the converter's own
//! output-existence gate stops a reconversion after a restart (the
//! processed set lives only as long as the watcher process; the pool is
//! rebuilt from disk on startup).

use std::collections::HashSet;

use tracing::debug;

use gale_types::{GroupKey, PairKey};

/// Incremental pairing over the pool of merged groups.
#[derive(Debug, Default)]
pub struct PairingEngine {
    pool: HashSet<GroupKey>,
    processed: HashSet<PairKey>,
}

impl PairingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a merged key to the pool and return the unprocessed pairs it
    /// participates in.
    ///
    /// Re-adding a key is harmless; it simply re-derives the same
    /// candidates, which the processed set then filters. That is exactly
    /// the retry path for a pair whose conversion failed earlier.
    pub fn add_merged(&mut self, key: GroupKey) -> Vec<PairKey> {
        self.pool.insert(key);

        let mut candidates: Vec<PairKey> = self
            .pool
            .iter()
            .filter_map(|other| PairKey::of(&key, other))
            .filter(|pair| !self.processed.contains(pair))
            .collect();
        candidates.sort_by_key(|p| (p.date, p.earlier_hour, p.forecast));

        if !candidates.is_empty() {
            debug!(group = %key, pairs = candidates.len(), "pair candidates found");
        }
        candidates
    }

    /// Record a pair as processed so it is never reported again within
    /// this process.
    pub fn mark_processed(&mut self, pair: PairKey) {
        self.processed.insert(pair);
    }

    pub fn is_processed(&self, pair: &PairKey) -> bool {
        self.processed.contains(pair)
    }

    /// Number of merged groups currently pooled.
    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }
}
