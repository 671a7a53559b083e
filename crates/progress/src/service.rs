//! Collaborator-facing progress service.
//!
//! HTTP handlers and the CLI talk to this facade only. Every call carries its
//! (learner, curriculum) key explicitly; there is no session state.

use std::sync::Arc;

use async_trait::async_trait;
use pathtrack_core::{CurriculumId, LearnerId, ModuleId, Progress, Time};
use pathtrack_storage::Storage;
use tracing::debug;

use crate::cache::ProgressCache;
use crate::config::LedgerConfig;
use crate::curriculum_store::CurriculumStore;
use crate::enrollment::EnrollmentRegistry;
use crate::error::Result;
use crate::ledger::{ProgressLedger, ProgressReport};

/// Operations exposed to the API layer.
#[async_trait]
pub trait ProgressApi: Send + Sync {
    /// Reconciled progress of a pair, or `UnknownLedgerEntry`.
    async fn progress(&self, learner: LearnerId, curriculum: CurriculumId) -> Result<Progress>;

    /// Mark a module complete.
    async fn complete_module(
        &self,
        learner: LearnerId,
        curriculum: CurriculumId,
        module: ModuleId,
        at: Time,
    ) -> Result<Progress>;

    /// Enroll a learner; returns the (possibly pre-existing) ledger entry.
    async fn enroll(&self, learner: LearnerId, curriculum: CurriculumId) -> Result<Progress>;

    /// Set or clear the pause intent.
    async fn set_paused(&self, learner: LearnerId, curriculum: CurriculumId, paused: bool) -> Result<Progress>;

    /// Hint that a curriculum's module list changed.
    async fn notify_modules_changed(&self, curriculum: CurriculumId);
}

/// The progress core wired over one storage backend.
#[derive(Clone)]
pub struct ProgressService {
    storage: Arc<dyn Storage>,
    cache: Arc<ProgressCache>,
    config: LedgerConfig,
    curricula: CurriculumStore,
    ledger: ProgressLedger,
    enrollment: EnrollmentRegistry,
}

impl ProgressService {
    /// Create a service with the default configuration.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::build(storage, LedgerConfig::default())
    }

    /// Replace the configuration.
    pub fn with_config(self, config: LedgerConfig) -> Self {
        Self::build(self.storage, config)
    }

    fn build(storage: Arc<dyn Storage>, config: LedgerConfig) -> Self {
        let cache = Arc::new(ProgressCache::with_capacity(config.cache_capacity));
        let curricula = CurriculumStore::new(storage.clone(), cache.clone(), config.clone());
        let ledger = ProgressLedger::new(storage.clone(), cache.clone(), config.clone());
        let enrollment = EnrollmentRegistry::new(curricula.clone(), ledger.clone());
        Self {
            storage,
            cache,
            config,
            curricula,
            ledger,
            enrollment,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Curriculum store.
    pub fn curricula(&self) -> &CurriculumStore {
        &self.curricula
    }

    /// Progress ledger.
    pub fn ledger(&self) -> &ProgressLedger {
        &self.ledger
    }

    /// Enrollment registry.
    pub fn enrollment(&self) -> &EnrollmentRegistry {
        &self.enrollment
    }

    /// Remove a learner from a curriculum's enrolled set, keeping progress.
    pub async fn unenroll(&self, learner: LearnerId, curriculum: CurriculumId) -> Result<bool> {
        self.enrollment.unenroll(learner, curriculum).await
    }

    /// Delete a pair's progress record.
    pub async fn purge_progress(&self, learner: LearnerId, curriculum: CurriculumId) -> Result<bool> {
        self.ledger.purge(learner, curriculum).await
    }

    /// Move the resume pointer.
    pub async fn set_current_module(
        &self,
        learner: LearnerId,
        curriculum: CurriculumId,
        index: usize,
    ) -> Result<Progress> {
        self.ledger.set_current_module(learner, curriculum, index).await
    }

    /// Every ledger entry of a curriculum, each reconciled.
    pub async fn curriculum_progress(&self, curriculum: CurriculumId) -> Result<Vec<Progress>> {
        self.curricula.get(curriculum).await?;
        self.ledger.list_for_curriculum(curriculum).await
    }

    /// Progress with stale completions and remaining work.
    pub async fn report(&self, learner: LearnerId, curriculum: CurriculumId) -> Result<ProgressReport> {
        self.ledger.report(learner, curriculum).await
    }
}

#[async_trait]
impl ProgressApi for ProgressService {
    async fn progress(&self, learner: LearnerId, curriculum: CurriculumId) -> Result<Progress> {
        self.ledger.get(learner, curriculum).await
    }

    async fn complete_module(
        &self,
        learner: LearnerId,
        curriculum: CurriculumId,
        module: ModuleId,
        at: Time,
    ) -> Result<Progress> {
        self.ledger.complete_module(learner, curriculum, module, at).await
    }

    async fn enroll(&self, learner: LearnerId, curriculum: CurriculumId) -> Result<Progress> {
        self.enrollment.enroll(learner, curriculum).await
    }

    async fn set_paused(&self, learner: LearnerId, curriculum: CurriculumId, paused: bool) -> Result<Progress> {
        self.ledger.set_paused(learner, curriculum, paused).await
    }

    async fn notify_modules_changed(&self, curriculum: CurriculumId) {
        let evicted = self.cache.invalidate_curriculum(curriculum).await;
        debug!("Modules of {} changed, evicted {} cached entries", curriculum, evicted);
    }
}
