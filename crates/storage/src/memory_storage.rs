//! In-memory storage implementation.
//!
//! Holds every record behind a single `RwLock`, so each trait call is atomic.
//! Used by tests and by embedders that persist elsewhere.

use std::collections::HashMap;

use pathtrack_core::{Curriculum, CurriculumId, LearnerId, Progress, ProgressId};
use tokio::sync::RwLock;
use tracing::debug;

use super::trait_::next_revision;
use super::{Result, Storage, StorageError};

#[derive(Default)]
struct State {
    curricula: HashMap<CurriculumId, Curriculum>,
    progress: HashMap<ProgressId, Progress>,
    pairs: HashMap<(LearnerId, CurriculumId), ProgressId>,
}

/// Process-local storage backend.
#[derive(Default)]
pub struct MemoryStorage {
    state: RwLock<State>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn create_curriculum(&self, curriculum: &Curriculum) -> Result<Curriculum> {
        let mut state = self.state.write().await;
        if state.curricula.contains_key(&curriculum.id) {
            return Err(StorageError::Other(format!("curriculum {} already exists", curriculum.id)));
        }
        let mut stored = curriculum.clone();
        stored.revision = 1;
        state.curricula.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_curriculum(&self, curriculum: &Curriculum) -> Result<Curriculum> {
        let mut state = self.state.write().await;
        let current = state
            .curricula
            .get(&curriculum.id)
            .ok_or_else(|| StorageError::NotFound(format!("curriculum {}", curriculum.id)))?;
        let revision = next_revision(
            "curriculum",
            curriculum.id.to_string(),
            curriculum.revision,
            current.revision,
        )?;
        let mut stored = curriculum.clone();
        stored.revision = revision;
        state.curricula.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn load_curriculum(&self, id: CurriculumId) -> Result<Option<Curriculum>> {
        Ok(self.state.read().await.curricula.get(&id).cloned())
    }

    async fn list_curricula(&self) -> Result<Vec<Curriculum>> {
        let mut all: Vec<Curriculum> = self.state.read().await.curricula.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    async fn delete_curriculum(&self, id: CurriculumId) -> Result<()> {
        let mut state = self.state.write().await;
        state.curricula.remove(&id);
        let orphaned: Vec<ProgressId> = state
            .progress
            .values()
            .filter(|p| p.curriculum_id == id)
            .map(|p| p.id)
            .collect();
        for pid in &orphaned {
            if let Some(p) = state.progress.remove(pid) {
                state.pairs.remove(&(p.learner_id, p.curriculum_id));
            }
        }
        debug!("Deleted curriculum {} and {} progress records", id, orphaned.len());
        Ok(())
    }

    async fn create_progress(&self, progress: &Progress) -> Result<Progress> {
        let mut state = self.state.write().await;
        let key = (progress.learner_id, progress.curriculum_id);
        if state.pairs.contains_key(&key) {
            return Err(StorageError::DuplicateLedgerEntry {
                learner: progress.learner_id,
                curriculum: progress.curriculum_id,
            });
        }
        let mut stored = progress.clone();
        stored.revision = 1;
        state.pairs.insert(key, stored.id);
        state.progress.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_progress(&self, progress: &Progress) -> Result<Progress> {
        let mut state = self.state.write().await;
        let current = state
            .progress
            .get(&progress.id)
            .ok_or_else(|| StorageError::NotFound(format!("progress {}", progress.id)))?;
        let revision = next_revision(
            "progress",
            progress.id.to_string(),
            progress.revision,
            current.revision,
        )?;
        let mut stored = progress.clone();
        stored.revision = revision;
        state.progress.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn load_progress(
        &self,
        learner: LearnerId,
        curriculum: CurriculumId,
    ) -> Result<Option<Progress>> {
        let state = self.state.read().await;
        Ok(state
            .pairs
            .get(&(learner, curriculum))
            .and_then(|id| state.progress.get(id))
            .cloned())
    }

    async fn load_progress_by_id(&self, id: ProgressId) -> Result<Option<Progress>> {
        Ok(self.state.read().await.progress.get(&id).cloned())
    }

    async fn list_progress_for_curriculum(&self, curriculum: CurriculumId) -> Result<Vec<Progress>> {
        let state = self.state.read().await;
        Ok(state
            .progress
            .values()
            .filter(|p| p.curriculum_id == curriculum)
            .cloned()
            .collect())
    }

    async fn list_progress_for_learner(&self, learner: LearnerId) -> Result<Vec<Progress>> {
        let state = self.state.read().await;
        Ok(state
            .progress
            .values()
            .filter(|p| p.learner_id == learner)
            .cloned()
            .collect())
    }

    async fn delete_progress(&self, learner: LearnerId, curriculum: CurriculumId) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.pairs.remove(&(learner, curriculum)) {
            Some(id) => {
                state.progress.remove(&id);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
