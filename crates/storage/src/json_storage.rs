//! JSON file storage implementation.
//!
//! Stores one JSON file per record under the storage root:
//! `curricula/<curriculum>.json` and `progress/<learner>_<curriculum>.json`.
//! The progress file name is the uniqueness key of a ledger entry.
//! Writes go through a temporary file and a rename, and are serialized by an
//! in-process lock so that revision checks are atomic for one `JsonStorage`.

use std::path::{Path, PathBuf};

use pathtrack_core::{Curriculum, CurriculumId, LearnerId, Progress, ProgressId};
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::trait_::next_revision;
use super::{Result, Storage, StorageError};

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonStorage {
    /// Create storage, creating the record directories if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("curricula")).await?;
        fs::create_dir_all(root.join("progress")).await?;

        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// Storage root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn curriculum_path(&self, id: CurriculumId) -> PathBuf {
        self.root.join("curricula").join(format!("{}.json", id))
    }

    fn progress_path(&self, learner: LearnerId, curriculum: CurriculumId) -> PathBuf {
        self.root
            .join("progress")
            .join(format!("{}_{}.json", learner, curriculum))
    }
}

#[async_trait::async_trait]
impl Storage for JsonStorage {
    async fn create_curriculum(&self, curriculum: &Curriculum) -> Result<Curriculum> {
        let _guard = self.write_lock.lock().await;
        let mut stored = curriculum.clone();
        stored.revision = 1;
        let created = write_new(&self.curriculum_path(stored.id), &stored).await?;
        if !created {
            return Err(StorageError::Other(format!("curriculum {} already exists", stored.id)));
        }
        Ok(stored)
    }

    async fn update_curriculum(&self, curriculum: &Curriculum) -> Result<Curriculum> {
        let _guard = self.write_lock.lock().await;
        let path = self.curriculum_path(curriculum.id);
        let current: Curriculum = read_json(&path)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("curriculum {}", curriculum.id)))?;
        let revision = next_revision(
            "curriculum",
            curriculum.id.to_string(),
            curriculum.revision,
            current.revision,
        )?;
        let mut stored = curriculum.clone();
        stored.revision = revision;
        write_json(&path, &stored).await?;
        Ok(stored)
    }

    async fn load_curriculum(&self, id: CurriculumId) -> Result<Option<Curriculum>> {
        read_json(&self.curriculum_path(id)).await
    }

    async fn list_curricula(&self) -> Result<Vec<Curriculum>> {
        let mut all: Vec<Curriculum> = list_dir(&self.root.join("curricula")).await?;
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    async fn delete_curriculum(&self, id: CurriculumId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        remove_if_exists(&self.curriculum_path(id)).await?;

        let orphaned: Vec<Progress> = list_dir(&self.root.join("progress")).await?;
        let mut removed = 0usize;
        for p in orphaned.into_iter().filter(|p| p.curriculum_id == id) {
            remove_if_exists(&self.progress_path(p.learner_id, p.curriculum_id)).await?;
            removed += 1;
        }
        debug!("Deleted curriculum {} and {} progress files", id, removed);
        Ok(())
    }

    async fn create_progress(&self, progress: &Progress) -> Result<Progress> {
        let _guard = self.write_lock.lock().await;
        let mut stored = progress.clone();
        stored.revision = 1;
        let path = self.progress_path(stored.learner_id, stored.curriculum_id);
        if !write_new(&path, &stored).await? {
            return Err(StorageError::DuplicateLedgerEntry {
                learner: stored.learner_id,
                curriculum: stored.curriculum_id,
            });
        }
        Ok(stored)
    }

    async fn update_progress(&self, progress: &Progress) -> Result<Progress> {
        let _guard = self.write_lock.lock().await;
        let path = self.progress_path(progress.learner_id, progress.curriculum_id);
        let current: Progress = read_json(&path)
            .await?
            .filter(|p: &Progress| p.id == progress.id)
            .ok_or_else(|| StorageError::NotFound(format!("progress {}", progress.id)))?;
        let revision = next_revision(
            "progress",
            progress.id.to_string(),
            progress.revision,
            current.revision,
        )?;
        let mut stored = progress.clone();
        stored.revision = revision;
        write_json(&path, &stored).await?;
        Ok(stored)
    }

    async fn load_progress(
        &self,
        learner: LearnerId,
        curriculum: CurriculumId,
    ) -> Result<Option<Progress>> {
        read_json(&self.progress_path(learner, curriculum)).await
    }

    async fn load_progress_by_id(&self, id: ProgressId) -> Result<Option<Progress>> {
        let all: Vec<Progress> = list_dir(&self.root.join("progress")).await?;
        Ok(all.into_iter().find(|p| p.id == id))
    }

    async fn list_progress_for_curriculum(&self, curriculum: CurriculumId) -> Result<Vec<Progress>> {
        let all: Vec<Progress> = list_dir(&self.root.join("progress")).await?;
        Ok(all.into_iter().filter(|p| p.curriculum_id == curriculum).collect())
    }

    async fn list_progress_for_learner(&self, learner: LearnerId) -> Result<Vec<Progress>> {
        let all: Vec<Progress> = list_dir(&self.root.join("progress")).await?;
        Ok(all.into_iter().filter(|p| p.learner_id == learner).collect())
    }

    async fn delete_progress(&self, learner: LearnerId, curriculum: CurriculumId) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        remove_if_exists(&self.progress_path(learner, curriculum)).await
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json.as_bytes()).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

/// Write a file that must not exist yet. Returns false if it already does.
async fn write_new<T: Serialize>(path: &Path, value: &T) -> Result<bool> {
    let json = serde_json::to_string_pretty(value)?;
    let file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await;
    match file {
        Ok(mut file) => {
            file.write_all(json.as_bytes()).await?;
            file.flush().await?;
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.into()),
    }
}

async fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        match read_json(&entry.path()).await {
            Ok(Some(item)) => items.push(item),
            Ok(None) => {}
            Err(e) => warn!("Skipping unreadable record {}: {}", entry.path().display(), e),
        }
    }
    Ok(items)
}
