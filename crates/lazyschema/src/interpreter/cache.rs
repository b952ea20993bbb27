//! Memoized expression results and their invalidation.
//!
//! Entries are keyed by the concrete expression path and the fingerprint of
//! the context it was evaluated under. Staleness is decided on read: every
//! write bumps a global epoch and stamps it on the written logical path
//! (`written`) and on every ancestor of it, the root included (`touched`).
//! An entry is stale when one of its dependencies was touched after the
//! entry's epoch, or when a strict ancestor of a dependency was written.
//! Stamps no older than the oldest live entry or running evaluation can no
//! longer make anything stale and are pruned.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::Value;
use tracing::debug;

use crate::types::Path;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct CacheKey {
    pub path: Path,
    /// Fingerprint of the effective context.
    pub scope: String,
}

#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    pub value: Value,
    /// Epoch at which the evaluation started.
    pub epoch: u64,
    /// Logical paths the evaluation read, transitively.
    pub deps: BTreeSet<Path>,
}

#[derive(Debug, Default)]
pub(crate) struct Cache {
    entries: BTreeMap<CacheKey, CacheEntry>,
    epoch: u64,
    written: HashMap<Path, u64>,
    touched: HashMap<Path, u64>,
    /// Start epochs of evaluations that have not finished, with counts.
    running: BTreeMap<u64, usize>,
}

impl Cache {
    /// Register an evaluation starting now. Its entry carries the returned
    /// epoch.
    pub fn begin(&mut self) -> u64 {
        *self.running.entry(self.epoch).or_default() += 1;
        self.epoch
    }

    pub fn finish(&mut self, epoch: u64) {
        if let Some(count) = self.running.get_mut(&epoch) {
            *count -= 1;
            if *count == 0 {
                self.running.remove(&epoch);
            }
        }
    }

    /// A fresh entry for `key`, if there is one.
    pub fn lookup(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries
            .get(key)
            .filter(|entry| self.is_fresh(entry))
    }

    pub fn insert(&mut self, key: CacheKey, entry: CacheEntry) {
        debug!(path = %key.path, deps = entry.deps.len(), "cached expression result");
        self.entries.insert(key, entry);
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        let after = |stamp: Option<&u64>| stamp.is_some_and(|&e| e > entry.epoch);
        entry.deps.iter().all(|dep| {
            !after(self.touched.get(dep))
                && !(0..dep.len()).any(|len| after(self.written.get(&dep.prefix(len))))
        })
    }

    /// Record a write at `path` and drop the entries it replaces.
    pub fn invalidate(&mut self, path: &Path) {
        self.epoch += 1;
        let logical = path.logical();
        self.written.insert(logical.clone(), self.epoch);
        for prefix in logical.prefixes() {
            self.touched.insert(prefix, self.epoch);
        }
        let before = self.entries.len();
        self.entries.retain(|key, _| key.path.logical() != logical);
        debug!(
            path = %logical,
            epoch = self.epoch,
            dropped = before - self.entries.len(),
            "invalidated"
        );
        self.prune();
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.prune();
    }

    fn prune(&mut self) {
        let oldest = self
            .entries
            .values()
            .map(|entry| entry.epoch)
            .chain(self.running.keys().copied())
            .min();
        match oldest {
            Some(floor) => {
                self.written.retain(|_, stamp| *stamp > floor);
                self.touched.retain(|_, stamp| *stamp > floor);
            }
            None => {
                self.written.clear();
                self.touched.clear();
            }
        }
    }

    /// Number of stored entries, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
