//! Progress ledger.
//!
//! One entry per (learner, curriculum) pair. Every mutation is a single
//! re-applicable step run inside a read-reconcile-write loop against the
//! storage revision, so two concurrent completions of different modules both
//! land: the loser re-reads and re-applies its completion onto the winner's
//! record.

use std::sync::Arc;

use chrono::Utc;
use pathtrack_core::{Curriculum, CurriculumId, LearnerId, ModuleId, Progress, ProgressId, Time};
use pathtrack_storage::{Storage, StorageError};
use tracing::{debug, info, warn};

use crate::cache::ProgressCache;
use crate::config::LedgerConfig;
use crate::error::{ProgressError, Result};
use crate::reconcile::{clamp_index, next_resume_index, reconcile, Reconciliation};

/// A reconciled ledger entry with its audit details.
#[derive(Debug, Clone)]
pub struct ProgressReport {
    /// The reconciled record
    pub progress: Progress,

    /// Reconciliation details (stale completions, remaining modules)
    pub reconciliation: Reconciliation,

    /// Minutes of live modules not yet completed
    pub remaining_minutes: u64,
}

/// Per-pair completion ledger.
#[derive(Clone)]
pub struct ProgressLedger {
    storage: Arc<dyn Storage>,
    cache: Arc<ProgressCache>,
    config: LedgerConfig,
}

impl ProgressLedger {
    /// Create a ledger over shared storage and cache.
    pub fn new(storage: Arc<dyn Storage>, cache: Arc<ProgressCache>, config: LedgerConfig) -> Self {
        Self { storage, cache, config }
    }

    /// Return the pair's entry, creating an empty one if there is none.
    ///
    /// A concurrent creation that loses the uniqueness check collapses into a
    /// read of the winner's entry.
    pub async fn create_if_absent(&self, learner: LearnerId, curriculum: CurriculumId) -> Result<Progress> {
        let live = self.load_curriculum(curriculum).await?;
        if self.storage.load_progress(learner, curriculum).await?.is_some() {
            return self.get(learner, curriculum).await;
        }

        let mut fresh = Progress::new(learner, curriculum, Utc::now());
        fresh.store_derived(reconcile(&fresh, &live).derived);

        match self.storage.create_progress(&fresh).await {
            Ok(stored) => {
                info!("Created progress {} for learner {} in {}", stored.id, learner, curriculum);
                if self.config.cache_enabled {
                    self.cache.put(stored.clone()).await;
                }
                Ok(stored)
            }
            Err(StorageError::DuplicateLedgerEntry { .. }) => {
                debug!("Progress for learner {} in {} created concurrently, reading it", learner, curriculum);
                self.get(learner, curriculum).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The pair's entry, reconciled against the live curriculum.
    pub async fn get(&self, learner: LearnerId, curriculum: CurriculumId) -> Result<Progress> {
        if self.config.cache_enabled {
            let live = self.load_curriculum(curriculum).await?;
            if let Some(cached) = self.cache.get(learner, curriculum, live.modules_version()).await {
                return Ok(cached);
            }
        }
        self.update(learner, curriculum, |_, _| Ok(())).await
    }

    /// Reconciled entry together with stale completions and what remains.
    pub async fn report(&self, learner: LearnerId, curriculum: CurriculumId) -> Result<ProgressReport> {
        let progress = self.update(learner, curriculum, |_, _| Ok(())).await?;
        let live = self.load_curriculum(curriculum).await?;
        let reconciliation = reconcile(&progress, &live);
        let remaining_minutes = reconciliation
            .remaining_modules
            .iter()
            .filter_map(|id| live.module(*id))
            .map(|m| u64::from(m.duration_minutes))
            .sum();
        Ok(ProgressReport {
            progress,
            reconciliation,
            remaining_minutes,
        })
    }

    /// Mark a module complete on the entry with the given id.
    pub async fn mark_module_complete(
        &self,
        progress_id: ProgressId,
        module: ModuleId,
        at: Time,
    ) -> Result<Progress> {
        let entry = self
            .storage
            .load_progress_by_id(progress_id)
            .await?
            .ok_or_else(|| ProgressError::UnknownLedgerEntry(format!("id {}", progress_id)))?;
        self.complete_module(entry.learner_id, entry.curriculum_id, module, at).await
    }

    /// Mark a module complete for a pair.
    ///
    /// Idempotent: repeating a completion only moves `last_accessed`. A first
    /// completion clears the pause intent and advances the resume pointer.
    pub async fn complete_module(
        &self,
        learner: LearnerId,
        curriculum: CurriculumId,
        module: ModuleId,
        at: Time,
    ) -> Result<Progress> {
        let progress = self
            .update(learner, curriculum, |p, c| {
                if !c.contains_module(module) {
                    return Err(ProgressError::UnknownModule {
                        curriculum: c.id,
                        module,
                    });
                }
                if p.record_completion(module, at) {
                    p.set_paused(false);
                    p.set_current_module(next_resume_index(p, c));
                }
                p.touch(at);
                Ok(())
            })
            .await?;
        info!(
            "Learner {} completed module {} in {}: {}% {}",
            learner,
            module,
            curriculum,
            progress.progress_percentage(),
            progress.status()
        );
        Ok(progress)
    }

    /// Set or clear the explicit pause intent.
    pub async fn set_paused(&self, learner: LearnerId, curriculum: CurriculumId, paused: bool) -> Result<Progress> {
        let now = Utc::now();
        let progress = self
            .update(learner, curriculum, |p, _| {
                p.set_paused(paused);
                p.touch(now);
                Ok(())
            })
            .await?;
        info!("Learner {} in {} paused={} -> {}", learner, curriculum, paused, progress.status());
        Ok(progress)
    }

    /// Move the resume pointer, clamped into the live module range.
    pub async fn set_current_module(
        &self,
        learner: LearnerId,
        curriculum: CurriculumId,
        index: usize,
    ) -> Result<Progress> {
        let now = Utc::now();
        self.update(learner, curriculum, |p, c| {
            p.set_current_module(clamp_index(index, c.module_count()));
            p.touch(now);
            Ok(())
        })
        .await
    }

    /// Delete the pair's entry. Returns false if there was none.
    pub async fn purge(&self, learner: LearnerId, curriculum: CurriculumId) -> Result<bool> {
        let removed = self.storage.delete_progress(learner, curriculum).await?;
        self.cache.evict(learner, curriculum).await;
        if removed {
            info!("Purged progress of learner {} in {}", learner, curriculum);
        }
        Ok(removed)
    }

    /// Drop the pair's cached record.
    pub(crate) async fn forget(&self, learner: LearnerId, curriculum: CurriculumId) {
        self.cache.evict(learner, curriculum).await;
    }

    /// All entries of a curriculum, each reconciled.
    pub async fn list_for_curriculum(&self, curriculum: CurriculumId) -> Result<Vec<Progress>> {
        let entries = self.storage.list_progress_for_curriculum(curriculum).await?;
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            match self.get(entry.learner_id, curriculum).await {
                Ok(p) => out.push(p),
                // purged between list and read
                Err(ProgressError::UnknownLedgerEntry(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    async fn load_curriculum(&self, id: CurriculumId) -> Result<Curriculum> {
        self.storage
            .load_curriculum(id)
            .await?
            .ok_or(ProgressError::UnknownCurriculum(id))
    }

    /// Read-modify-reconcile-write loop. `apply` must be safe to run again on
    /// a fresher record. The curriculum is re-read on every attempt.
    async fn update<F>(&self, learner: LearnerId, curriculum: CurriculumId, apply: F) -> Result<Progress>
    where
        F: Fn(&mut Progress, &Curriculum) -> Result<()> + Send + Sync,
    {
        let attempts = self.config.attempts();
        for attempt in 1..=attempts {
            let live = self.load_curriculum(curriculum).await?;
            let current = self
                .storage
                .load_progress(learner, curriculum)
                .await?
                .ok_or_else(|| ProgressError::unknown_pair(learner, curriculum))?;

            let mut next = current.clone();
            apply(&mut next, &live)?;
            let reconciliation = reconcile(&next, &live);
            next.store_derived(reconciliation.derived);

            // a read that changed nothing is not cached: a newer revision may
            // already have been committed since the load
            if next == current {
                return Ok(current);
            }

            match self.storage.update_progress(&next).await {
                Ok(stored) => {
                    debug!(
                        "Progress {} written at revision {} ({}%, modules version {})",
                        stored.id,
                        stored.revision,
                        stored.progress_percentage(),
                        stored.reconciled_version()
                    );
                    if self.config.cache_enabled {
                        self.cache.put(stored.clone()).await;
                    }
                    return Ok(stored);
                }
                Err(e) if e.is_conflict() => {
                    warn!("Progress {} update lost attempt {}/{}: {}", current.id, attempt, attempts, e);
                }
                Err(StorageError::NotFound(_)) => {
                    return Err(ProgressError::unknown_pair(learner, curriculum));
                }
                Err(e) => return Err(e.into()),
            }
        }
        warn!(
            "Progress of learner {} in {} gave up after {} attempts",
            learner, curriculum, attempts
        );
        self.cache.evict(learner, curriculum).await;
        Err(ProgressError::ConcurrentUpdateConflict { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use pathtrack_core::{CurriculumDraft, ModuleDraft, ProgressStatus};
    use pathtrack_storage::MemoryStorage;
    use std::sync::atomic::{AtomicU32, Ordering};

    async fn setup(modules: usize) -> (ProgressLedger, Arc<MemoryStorage>, Curriculum) {
        let storage = Arc::new(MemoryStorage::new());
        let draft = CurriculumDraft {
            title: "ML/AI".to_string(),
            description: "Models from scratch".to_string(),
            modules: (0..modules).map(|i| ModuleDraft::new(format!("M{}", i), 30)).collect(),
            ..Default::default()
        };
        let curriculum = storage
            .create_curriculum(&Curriculum::new(draft, Utc::now()).unwrap())
            .await
            .unwrap();
        let ledger = ProgressLedger::new(storage.clone(), Arc::new(ProgressCache::new()), LedgerConfig::default());
        (ledger, storage, curriculum)
    }

    fn module(c: &Curriculum, i: usize) -> ModuleId {
        c.modules()[i].id
    }

    #[tokio::test]
    async fn test_create_if_absent_returns_existing() {
        let (ledger, _, c) = setup(2).await;
        let learner = LearnerId::new();
        let first = ledger.create_if_absent(learner, c.id).await.unwrap();
        let second = ledger.create_if_absent(learner, c.id).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.status(), ProgressStatus::InProgress);
        assert_eq!(first.progress_percentage(), 0);
    }

    #[tokio::test]
    async fn test_create_for_unknown_curriculum() {
        let (ledger, _, _) = setup(1).await;
        let err = ledger.create_if_absent(LearnerId::new(), CurriculumId::new()).await.unwrap_err();
        assert!(matches!(err, ProgressError::UnknownCurriculum(_)));
    }

    #[tokio::test]
    async fn test_complete_is_idempotent() {
        let (ledger, _, c) = setup(3).await;
        let learner = LearnerId::new();
        ledger.create_if_absent(learner, c.id).await.unwrap();
        let t0 = Utc::now();

        let once = ledger.complete_module(learner, c.id, module(&c, 0), t0).await.unwrap();
        let later = t0 + Duration::minutes(10);
        let twice = ledger.complete_module(learner, c.id, module(&c, 0), later).await.unwrap();

        assert_eq!(once.completed_modules(), twice.completed_modules());
        assert_eq!(once.progress_percentage(), 33);
        assert_eq!(twice.progress_percentage(), 33);
        assert_eq!(twice.last_accessed, later);
    }

    #[tokio::test]
    async fn test_percentage_is_monotonic_for_fixed_curriculum() {
        let (ledger, _, c) = setup(4).await;
        let learner = LearnerId::new();
        ledger.create_if_absent(learner, c.id).await.unwrap();

        let mut last = 0;
        for i in [2, 0, 2, 3, 1, 1] {
            let p = ledger.complete_module(learner, c.id, module(&c, i), Utc::now()).await.unwrap();
            assert!(p.progress_percentage() >= last);
            assert!(p.progress_percentage() <= 100);
            last = p.progress_percentage();
        }
        assert_eq!(last, 100);
    }

    #[tokio::test]
    async fn test_unknown_module_leaves_ledger_unchanged() {
        let (ledger, storage, c) = setup(2).await;
        let learner = LearnerId::new();
        ledger.create_if_absent(learner, c.id).await.unwrap();
        let before = storage.load_progress(learner, c.id).await.unwrap().unwrap();

        let err = ledger
            .complete_module(learner, c.id, ModuleId::new(), Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, ProgressError::UnknownModule { .. }));
        let after = storage.load_progress(learner, c.id).await.unwrap().unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_complete_without_enrollment() {
        let (ledger, _, c) = setup(1).await;
        let err = ledger
            .complete_module(LearnerId::new(), c.id, module(&c, 0), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::UnknownLedgerEntry(_)));
    }

    #[tokio::test]
    async fn test_mark_by_progress_id() {
        let (ledger, _, c) = setup(2).await;
        let entry = ledger.create_if_absent(LearnerId::new(), c.id).await.unwrap();
        let p = ledger.mark_module_complete(entry.id, module(&c, 1), Utc::now()).await.unwrap();
        assert_eq!(p.progress_percentage(), 50);

        let err = ledger
            .mark_module_complete(ProgressId::new(), module(&c, 1), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::UnknownLedgerEntry(_)));
    }

    #[tokio::test]
    async fn test_completion_clears_pause_and_advances() {
        let (ledger, _, c) = setup(3).await;
        let learner = LearnerId::new();
        ledger.create_if_absent(learner, c.id).await.unwrap();

        let paused = ledger.set_paused(learner, c.id, true).await.unwrap();
        assert_eq!(paused.status(), ProgressStatus::Paused);

        let p = ledger.complete_module(learner, c.id, module(&c, 0), Utc::now()).await.unwrap();
        assert!(!p.is_paused());
        assert_eq!(p.status(), ProgressStatus::InProgress);
        assert_eq!(p.current_module(), 1);
    }

    #[tokio::test]
    async fn test_pause_does_not_override_completed() {
        let (ledger, _, c) = setup(1).await;
        let learner = LearnerId::new();
        ledger.create_if_absent(learner, c.id).await.unwrap();
        ledger.complete_module(learner, c.id, module(&c, 0), Utc::now()).await.unwrap();

        let p = ledger.set_paused(learner, c.id, true).await.unwrap();
        assert!(p.is_paused());
        assert_eq!(p.status(), ProgressStatus::Completed);
    }

    #[tokio::test]
    async fn test_set_current_module_is_clamped() {
        let (ledger, _, c) = setup(3).await;
        let learner = LearnerId::new();
        ledger.create_if_absent(learner, c.id).await.unwrap();
        let p = ledger.set_current_module(learner, c.id, 99).await.unwrap();
        assert_eq!(p.current_module(), 2);
    }

    #[tokio::test]
    async fn test_reads_reconcile_after_curriculum_edit() {
        let (ledger, storage, c) = setup(2).await;
        let learner = LearnerId::new();
        ledger.create_if_absent(learner, c.id).await.unwrap();
        for i in 0..2 {
            ledger.complete_module(learner, c.id, module(&c, i), Utc::now()).await.unwrap();
        }
        assert_eq!(ledger.get(learner, c.id).await.unwrap().status(), ProgressStatus::Completed);

        // edit the curriculum behind the ledger's back: no notification
        let mut edited = storage.load_curriculum(c.id).await.unwrap().unwrap();
        edited.add_module(ModuleDraft::new("M2", 30), Utc::now()).unwrap();
        storage.update_curriculum(&edited).await.unwrap();

        let p = ledger.get(learner, c.id).await.unwrap();
        assert_eq!(p.progress_percentage(), 67);
        assert_eq!(p.status(), ProgressStatus::InProgress);

        // the reconciled values were written back
        let stored = storage.load_progress(learner, c.id).await.unwrap().unwrap();
        assert_eq!(stored.progress_percentage(), 67);
        assert_eq!(stored.reconciled_version(), edited.modules_version());
    }

    #[tokio::test]
    async fn test_report_lists_stale_and_remaining() {
        let (ledger, storage, c) = setup(3).await;
        let learner = LearnerId::new();
        ledger.create_if_absent(learner, c.id).await.unwrap();
        ledger.complete_module(learner, c.id, module(&c, 0), Utc::now()).await.unwrap();

        let mut edited = storage.load_curriculum(c.id).await.unwrap().unwrap();
        edited.remove_module(module(&c, 0), Utc::now()).unwrap();
        storage.update_curriculum(&edited).await.unwrap();

        let report = ledger.report(learner, c.id).await.unwrap();
        assert_eq!(report.reconciliation.stale_completions.len(), 1);
        assert_eq!(report.reconciliation.remaining_modules.len(), 2);
        assert_eq!(report.remaining_minutes, 60);
        assert_eq!(report.progress.progress_percentage(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_completions_are_not_lost() {
        let (ledger, _, c) = setup(4).await;
        let learner = LearnerId::new();
        ledger.create_if_absent(learner, c.id).await.unwrap();
        let cid = c.id;

        let tasks = (0..4).map(|i| {
            let ledger = ledger.clone();
            let m = module(&c, i);
            tokio::spawn(async move { ledger.complete_module(learner, cid, m, Utc::now()).await })
        });
        for joined in futures::future::join_all(tasks).await {
            joined.unwrap().unwrap();
        }

        let p = ledger.get(learner, c.id).await.unwrap();
        assert_eq!(p.completed_modules().len(), 4);
        assert_eq!(p.progress_percentage(), 100);
        assert_eq!(p.status(), ProgressStatus::Completed);
    }

    /// Storage whose progress updates always lose.
    struct ConflictingStorage {
        inner: MemoryStorage,
        updates: AtomicU32,
    }

    #[async_trait]
    impl Storage for ConflictingStorage {
        async fn create_curriculum(&self, c: &Curriculum) -> pathtrack_storage::Result<Curriculum> {
            self.inner.create_curriculum(c).await
        }
        async fn update_curriculum(&self, c: &Curriculum) -> pathtrack_storage::Result<Curriculum> {
            self.inner.update_curriculum(c).await
        }
        async fn load_curriculum(&self, id: CurriculumId) -> pathtrack_storage::Result<Option<Curriculum>> {
            self.inner.load_curriculum(id).await
        }
        async fn list_curricula(&self) -> pathtrack_storage::Result<Vec<Curriculum>> {
            self.inner.list_curricula().await
        }
        async fn delete_curriculum(&self, id: CurriculumId) -> pathtrack_storage::Result<()> {
            self.inner.delete_curriculum(id).await
        }
        async fn create_progress(&self, p: &Progress) -> pathtrack_storage::Result<Progress> {
            self.inner.create_progress(p).await
        }
        async fn update_progress(&self, p: &Progress) -> pathtrack_storage::Result<Progress> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            Err(StorageError::RevisionConflict {
                kind: "progress",
                id: p.id.to_string(),
                expected: p.revision,
                found: p.revision + 1,
            })
        }
        async fn load_progress(&self, l: LearnerId, c: CurriculumId) -> pathtrack_storage::Result<Option<Progress>> {
            self.inner.load_progress(l, c).await
        }
        async fn load_progress_by_id(&self, id: ProgressId) -> pathtrack_storage::Result<Option<Progress>> {
            self.inner.load_progress_by_id(id).await
        }
        async fn list_progress_for_curriculum(&self, c: CurriculumId) -> pathtrack_storage::Result<Vec<Progress>> {
            self.inner.list_progress_for_curriculum(c).await
        }
        async fn list_progress_for_learner(&self, l: LearnerId) -> pathtrack_storage::Result<Vec<Progress>> {
            self.inner.list_progress_for_learner(l).await
        }
        async fn delete_progress(&self, l: LearnerId, c: CurriculumId) -> pathtrack_storage::Result<bool> {
            self.inner.delete_progress(l, c).await
        }
    }

    #[tokio::test]
    async fn test_conflicts_surface_after_bounded_attempts() {
        let storage = Arc::new(ConflictingStorage {
            inner: MemoryStorage::new(),
            updates: AtomicU32::new(0),
        });
        let draft = CurriculumDraft {
            title: "Other".to_string(),
            description: "Misc".to_string(),
            modules: vec![ModuleDraft::new("Only", 10)],
            ..Default::default()
        };
        let c = storage
            .create_curriculum(&Curriculum::new(draft, Utc::now()).unwrap())
            .await
            .unwrap();
        let config = LedgerConfig {
            max_update_attempts: 3,
            ..Default::default()
        };
        let ledger = ProgressLedger::new(storage.clone(), Arc::new(ProgressCache::new()), config);
        let learner = LearnerId::new();
        ledger.create_if_absent(learner, c.id).await.unwrap();

        let err = ledger
            .complete_module(learner, c.id, module(&c, 0), Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, ProgressError::ConcurrentUpdateConflict { attempts: 3 }));
        assert_eq!(storage.updates.load(Ordering::SeqCst), 3);
    }

    /// Storage that commits one completion right after handing out a snapshot,
    /// as a concurrent writer would.
    struct RacingStorage {
        inner: MemoryStorage,
        pending: std::sync::Mutex<Option<ModuleId>>,
    }

    #[async_trait]
    impl Storage for RacingStorage {
        async fn create_curriculum(&self, c: &Curriculum) -> pathtrack_storage::Result<Curriculum> {
            self.inner.create_curriculum(c).await
        }
        async fn update_curriculum(&self, c: &Curriculum) -> pathtrack_storage::Result<Curriculum> {
            self.inner.update_curriculum(c).await
        }
        async fn load_curriculum(&self, id: CurriculumId) -> pathtrack_storage::Result<Option<Curriculum>> {
            self.inner.load_curriculum(id).await
        }
        async fn list_curricula(&self) -> pathtrack_storage::Result<Vec<Curriculum>> {
            self.inner.list_curricula().await
        }
        async fn delete_curriculum(&self, id: CurriculumId) -> pathtrack_storage::Result<()> {
            self.inner.delete_curriculum(id).await
        }
        async fn create_progress(&self, p: &Progress) -> pathtrack_storage::Result<Progress> {
            self.inner.create_progress(p).await
        }
        async fn update_progress(&self, p: &Progress) -> pathtrack_storage::Result<Progress> {
            self.inner.update_progress(p).await
        }
        async fn load_progress(&self, l: LearnerId, c: CurriculumId) -> pathtrack_storage::Result<Option<Progress>> {
            let snapshot = self.inner.load_progress(l, c).await?;
            let pending = self.pending.lock().unwrap().take();
            if let (Some(module), Some(current)) = (pending, snapshot.clone()) {
                let mut next = current;
                next.record_completion(module, Utc::now());
                self.inner.update_progress(&next).await?;
            }
            Ok(snapshot)
        }
        async fn load_progress_by_id(&self, id: ProgressId) -> pathtrack_storage::Result<Option<Progress>> {
            self.inner.load_progress_by_id(id).await
        }
        async fn list_progress_for_curriculum(&self, c: CurriculumId) -> pathtrack_storage::Result<Vec<Progress>> {
            self.inner.list_progress_for_curriculum(c).await
        }
        async fn list_progress_for_learner(&self, l: LearnerId) -> pathtrack_storage::Result<Vec<Progress>> {
            self.inner.list_progress_for_learner(l).await
        }
        async fn delete_progress(&self, l: LearnerId, c: CurriculumId) -> pathtrack_storage::Result<bool> {
            self.inner.delete_progress(l, c).await
        }
    }

    #[tokio::test]
    async fn test_read_racing_a_write_is_not_served_from_cache() {
        let storage = Arc::new(RacingStorage {
            inner: MemoryStorage::new(),
            pending: std::sync::Mutex::new(None),
        });
        let draft = CurriculumDraft {
            title: "Web".to_string(),
            description: "HTTP and browsers".to_string(),
            modules: vec![ModuleDraft::new("A", 10), ModuleDraft::new("B", 10)],
            ..Default::default()
        };
        let c = storage
            .create_curriculum(&Curriculum::new(draft, Utc::now()).unwrap())
            .await
            .unwrap();
        let ledger = ProgressLedger::new(storage.clone(), Arc::new(ProgressCache::new()), LedgerConfig::default());
        let learner = LearnerId::new();
        ledger.create_if_absent(learner, c.id).await.unwrap();
        ledger.cache.evict(learner, c.id).await;

        *storage.pending.lock().unwrap() = Some(module(&c, 0));
        let raced = ledger.get(learner, c.id).await.unwrap();
        assert!(raced.completed_modules().is_empty());

        let served = ledger.get(learner, c.id).await.unwrap();
        let stored = storage.inner.load_progress(learner, c.id).await.unwrap().unwrap();
        assert_eq!(served.revision, stored.revision);
        assert_eq!(served.completed_modules().len(), 1);
        assert_eq!(served.progress_percentage(), 50);
    }

    #[tokio::test]
    async fn test_commit_is_not_overwritten_by_older_snapshot() {
        let (ledger, storage, c) = setup(2).await;
        let learner = LearnerId::new();
        let snapshot = ledger.create_if_absent(learner, c.id).await.unwrap();

        ledger.complete_module(learner, c.id, module(&c, 0), Utc::now()).await.unwrap();
        ledger.cache.put(snapshot).await;

        let served = ledger.get(learner, c.id).await.unwrap();
        let stored = storage.load_progress(learner, c.id).await.unwrap().unwrap();
        assert_eq!(served, stored);
        assert_eq!(served.progress_percentage(), 50);
    }

    #[tokio::test]
    async fn test_list_for_curriculum_reconciles_each_entry() {
        let (ledger, storage, c) = setup(2).await;
        let done = LearnerId::new();
        let fresh = LearnerId::new();
        ledger.create_if_absent(done, c.id).await.unwrap();
        ledger.create_if_absent(fresh, c.id).await.unwrap();
        ledger.complete_module(done, c.id, module(&c, 0), Utc::now()).await.unwrap();

        let mut edited = storage.load_curriculum(c.id).await.unwrap().unwrap();
        edited.remove_module(module(&c, 1), Utc::now()).unwrap();
        storage.update_curriculum(&edited).await.unwrap();

        let listed = ledger.list_for_curriculum(c.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        let done_entry = listed.iter().find(|p| p.learner_id == done).unwrap();
        assert_eq!(done_entry.progress_percentage(), 100);
        assert_eq!(done_entry.status(), ProgressStatus::Completed);
        let fresh_entry = listed.iter().find(|p| p.learner_id == fresh).unwrap();
        assert_eq!(fresh_entry.progress_percentage(), 0);
    }
}
