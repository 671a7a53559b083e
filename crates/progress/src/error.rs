//! Error taxonomy of the progress services.

use pathtrack_core::{CurriculumError, CurriculumId, LearnerId, ModuleId};
use pathtrack_storage::StorageError;

/// Result alias for progress operations.
pub type Result<T> = std::result::Result<T, ProgressError>;

/// Per-request failures of the progress services. None of them are fatal.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    /// Module is not in the curriculum's live module set. Not retried.
    #[error("module {module} is not part of curriculum {curriculum}")]
    UnknownModule {
        /// Curriculum that was checked
        curriculum: CurriculumId,
        /// Requested module
        module: ModuleId,
    },

    /// No ledger entry exists; the learner must enroll first
    #[error("no progress entry for {0}")]
    UnknownLedgerEntry(String),

    /// Curriculum does not exist
    #[error("curriculum {0} not found")]
    UnknownCurriculum(CurriculumId),

    /// Conditional writes kept losing to concurrent writers
    #[error("concurrent update conflict after {attempts} attempts")]
    ConcurrentUpdateConflict {
        /// Attempts made
        attempts: u32,
    },

    /// Curriculum validation error
    #[error(transparent)]
    Curriculum(CurriculumError),

    /// Storage error
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ProgressError {
    pub(crate) fn unknown_pair(learner: LearnerId, curriculum: CurriculumId) -> Self {
        ProgressError::UnknownLedgerEntry(format!("learner {} in curriculum {}", learner, curriculum))
    }
}

impl From<CurriculumError> for ProgressError {
    fn from(e: CurriculumError) -> Self {
        match e {
            CurriculumError::UnknownModule { curriculum, module } => {
                ProgressError::UnknownModule { curriculum, module }
            }
            other => ProgressError::Curriculum(other),
        }
    }
}
