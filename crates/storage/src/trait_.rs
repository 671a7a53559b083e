//! Storage trait abstraction.

use async_trait::async_trait;
use pathtrack_core::{Curriculum, CurriculumId, LearnerId, Progress, ProgressId};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A ledger entry already exists for the (learner, curriculum) pair
    #[error("progress for learner {learner} in curriculum {curriculum} already exists")]
    DuplicateLedgerEntry {
        /// Learner
        learner: LearnerId,
        /// Curriculum
        curriculum: CurriculumId,
    },

    /// Conditional write lost against a newer revision
    #[error("{kind} {id} revision conflict: expected {expected}, found {found}")]
    RevisionConflict {
        /// Record kind
        kind: &'static str,
        /// Record id
        id: String,
        /// Revision the writer read
        expected: u64,
        /// Revision currently stored
        found: u64,
    },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl StorageError {
    /// Whether this is a lost conditional write that can be retried.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StorageError::RevisionConflict { .. })
    }
}

/// Storage abstraction for Pathtrack data.
///
/// Writes are conditional: `update_*` succeeds only when the record's
/// `revision` matches the stored one, and the returned copy carries the new
/// revision. Implementations must make each call atomic with respect to
/// concurrent callers sharing the same backend.
#[async_trait]
pub trait Storage: Send + Sync {
    // === Curriculum operations ===

    /// Insert a new curriculum.
    async fn create_curriculum(&self, curriculum: &Curriculum) -> Result<Curriculum>;

    /// Replace a curriculum if its revision is current.
    async fn update_curriculum(&self, curriculum: &Curriculum) -> Result<Curriculum>;

    /// Load a curriculum by ID.
    async fn load_curriculum(&self, id: CurriculumId) -> Result<Option<Curriculum>>;

    /// List all curricula.
    async fn list_curricula(&self) -> Result<Vec<Curriculum>>;

    /// Delete a curriculum together with every progress record that references it.
    async fn delete_curriculum(&self, id: CurriculumId) -> Result<()>;

    // === Progress operations ===

    /// Insert a ledger entry. Fails with `DuplicateLedgerEntry` if the pair exists.
    async fn create_progress(&self, progress: &Progress) -> Result<Progress>;

    /// Replace a ledger entry if its revision is current.
    async fn update_progress(&self, progress: &Progress) -> Result<Progress>;

    /// Load the ledger entry of a (learner, curriculum) pair.
    async fn load_progress(
        &self,
        learner: LearnerId,
        curriculum: CurriculumId,
    ) -> Result<Option<Progress>>;

    /// Load a ledger entry by ID.
    async fn load_progress_by_id(&self, id: ProgressId) -> Result<Option<Progress>>;

    /// List ledger entries of a curriculum.
    async fn list_progress_for_curriculum(&self, curriculum: CurriculumId) -> Result<Vec<Progress>>;

    /// List ledger entries of a learner.
    async fn list_progress_for_learner(&self, learner: LearnerId) -> Result<Vec<Progress>>;

    /// Delete the ledger entry of a pair. Returns false if none existed.
    async fn delete_progress(&self, learner: LearnerId, curriculum: CurriculumId) -> Result<bool>;
}

/// Check a conditional write and return the revision to store.
pub(crate) fn next_revision(kind: &'static str, id: String, expected: u64, found: u64) -> Result<u64> {
    if expected != found {
        return Err(StorageError::RevisionConflict { kind, id, expected, found });
    }
    Ok(found + 1)
}
