//! Curriculum store service.
//!
//! All edits run as read-modify-write against the storage revision and are
//! retried on conflict. Module-list edits evict the progress cache of the
//! curriculum; progress records themselves are reconciled lazily.

use std::sync::Arc;

use chrono::Utc;
use pathtrack_core::{
    Curriculum, CurriculumDraft, CurriculumError, CurriculumId, Module, ModuleDraft, ModuleId, Time,
};
use pathtrack_storage::Storage;
use tracing::{debug, info, warn};

use crate::cache::ProgressCache;
use crate::config::LedgerConfig;
use crate::error::{ProgressError, Result};

/// Curriculum definitions and their module lists.
#[derive(Clone)]
pub struct CurriculumStore {
    storage: Arc<dyn Storage>,
    cache: Arc<ProgressCache>,
    config: LedgerConfig,
}

impl CurriculumStore {
    /// Create a store over shared storage and cache.
    pub fn new(storage: Arc<dyn Storage>, cache: Arc<ProgressCache>, config: LedgerConfig) -> Self {
        Self { storage, cache, config }
    }

    /// Validate and persist a new curriculum.
    pub async fn create(&self, draft: CurriculumDraft) -> Result<Curriculum> {
        let curriculum = Curriculum::new(draft, Utc::now())?;
        let stored = self.storage.create_curriculum(&curriculum).await?;
        info!(
            "Created curriculum {} '{}' with {} modules",
            stored.id,
            stored.title,
            stored.module_count()
        );
        Ok(stored)
    }

    /// Load a curriculum, failing if it does not exist.
    pub async fn get(&self, id: CurriculumId) -> Result<Curriculum> {
        self.storage
            .load_curriculum(id)
            .await?
            .ok_or(ProgressError::UnknownCurriculum(id))
    }

    /// All curricula, oldest first.
    pub async fn list(&self) -> Result<Vec<Curriculum>> {
        Ok(self.storage.list_curricula().await?)
    }

    /// Append a module.
    pub async fn add_module(&self, id: CurriculumId, draft: ModuleDraft) -> Result<(Curriculum, ModuleId)> {
        self.edit(id, |c, now| c.add_module(draft.clone(), now)).await
    }

    /// Insert a module at a sequence position.
    pub async fn insert_module(
        &self,
        id: CurriculumId,
        draft: ModuleDraft,
        position: usize,
    ) -> Result<(Curriculum, ModuleId)> {
        self.edit(id, |c, now| c.insert_module(draft.clone(), position, now)).await
    }

    /// Remove a module; its id is retired.
    pub async fn remove_module(&self, id: CurriculumId, module: ModuleId) -> Result<(Curriculum, Module)> {
        self.edit(id, |c, now| c.remove_module(module, now)).await
    }

    /// Move a module to a new sequence position.
    pub async fn move_module(&self, id: CurriculumId, module: ModuleId, position: usize) -> Result<Curriculum> {
        let (curriculum, ()) = self.edit(id, |c, now| c.move_module(module, position, now)).await?;
        Ok(curriculum)
    }

    /// Change a module's duration.
    pub async fn set_module_duration(
        &self,
        id: CurriculumId,
        module: ModuleId,
        duration_minutes: u32,
    ) -> Result<Curriculum> {
        let (curriculum, ()) = self
            .edit(id, |c, now| c.set_module_duration(module, duration_minutes, now))
            .await?;
        Ok(curriculum)
    }

    /// Delete a curriculum and every progress record referencing it.
    pub async fn delete(&self, id: CurriculumId) -> Result<()> {
        self.get(id).await?;
        self.storage.delete_curriculum(id).await?;
        self.cache.invalidate_curriculum(id).await;
        info!("Deleted curriculum {}", id);
        Ok(())
    }

    /// Read-modify-write a curriculum. Writes are skipped when `apply` leaves
    /// the curriculum unchanged.
    pub(crate) async fn edit<T, F>(&self, id: CurriculumId, apply: F) -> Result<(Curriculum, T)>
    where
        F: Fn(&mut Curriculum, Time) -> std::result::Result<T, CurriculumError> + Send + Sync,
        T: Send,
    {
        let attempts = self.config.attempts();
        for attempt in 1..=attempts {
            let current = self.get(id).await?;
            let mut next = current.clone();
            let out = apply(&mut next, Utc::now())?;

            if next == current {
                return Ok((current, out));
            }

            match self.storage.update_curriculum(&next).await {
                Ok(stored) => {
                    if stored.modules_version() != current.modules_version() {
                        let evicted = self.cache.invalidate_curriculum(id).await;
                        info!(
                            "Curriculum {} modules changed (version {}), {} cached progress entries evicted",
                            id,
                            stored.modules_version(),
                            evicted
                        );
                    }
                    return Ok((stored, out));
                }
                Err(e) if e.is_conflict() => {
                    debug!("Curriculum {} edit lost attempt {}/{}: {}", id, attempt, attempts, e);
                }
                Err(e) => return Err(e.into()),
            }
        }
        warn!("Curriculum {} edit gave up after {} attempts", id, attempts);
        Err(ProgressError::ConcurrentUpdateConflict { attempts })
    }
}
