//! In-process cache of reconciled progress records.
//!
//! An entry is only served while the curriculum's `modules_version` equals the
//! version the entry was reconciled against. The live curriculum is still read
//! on every lookup; the cache saves the ledger read and the recomputation.
//!
//! Entries only move forward: a record is never replaced by an older revision
//! of itself. The cache is bounded; when full, the least recently stored entry
//! is dropped.

use std::collections::HashMap;

use pathtrack_core::{CurriculumId, LearnerId, Progress};
use tokio::sync::RwLock;
use tracing::debug;

type Key = (LearnerId, CurriculumId);

/// Default entry bound.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

struct Entry {
    stored_at: u64,
    progress: Progress,
}

#[derive(Default)]
struct Entries {
    map: HashMap<Key, Entry>,
    tick: u64,
}

/// Reconciled progress keyed by (learner, curriculum).
pub struct ProgressCache {
    entries: RwLock<Entries>,
    capacity: usize,
}

impl Default for ProgressCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl ProgressCache {
    /// Create an empty cache with the default capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache holding at most `capacity` entries (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            capacity: capacity.max(1),
        }
    }

    /// Cached record, if it was reconciled against `modules_version`.
    pub async fn get(
        &self,
        learner: LearnerId,
        curriculum: CurriculumId,
        modules_version: u64,
    ) -> Option<Progress> {
        let entries = self.entries.read().await;
        let hit = entries
            .map
            .get(&(learner, curriculum))
            .map(|e| &e.progress)
            .filter(|p| p.reconciled_version() == modules_version)
            .cloned();
        debug!(
            "Progress cache {} for learner {} in {}",
            if hit.is_some() { "hit" } else { "miss" },
            learner,
            curriculum
        );
        hit
    }

    /// Store a committed record. Ignored when the cache already holds the same
    /// record at this revision or a later one. Returns whether it was stored.
    pub async fn put(&self, progress: Progress) -> bool {
        let key = (progress.learner_id, progress.curriculum_id);
        let mut entries = self.entries.write().await;

        if let Some(existing) = entries.map.get(&key) {
            if existing.progress.id == progress.id && existing.progress.revision >= progress.revision {
                debug!(
                    "Keeping cached progress {} at revision {} over revision {}",
                    progress.id, existing.progress.revision, progress.revision
                );
                return false;
            }
        } else if entries.map.len() >= self.capacity {
            let oldest = entries
                .map
                .iter()
                .min_by_key(|(_, e)| e.stored_at)
                .map(|(k, _)| *k);
            if let Some(oldest) = oldest {
                entries.map.remove(&oldest);
            }
        }

        entries.tick += 1;
        let stored_at = entries.tick;
        entries.map.insert(key, Entry { stored_at, progress });
        true
    }

    /// Drop one entry.
    pub async fn evict(&self, learner: LearnerId, curriculum: CurriculumId) {
        self.entries.write().await.map.remove(&(learner, curriculum));
    }

    /// Drop every entry of a curriculum. Returns the number evicted.
    pub async fn invalidate_curriculum(&self, curriculum: CurriculumId) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.map.len();
        entries.map.retain(|(_, c), _| *c != curriculum);
        before - entries.map.len()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.map.len()
    }

    /// Whether the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.map.is_empty()
    }
}
