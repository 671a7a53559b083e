//! Progress model - one ledger entry per (learner, curriculum) pair.

use serde::{Deserialize, Serialize};
use crate::id::{CurriculumId, LearnerId, ModuleId, ProgressId};
use crate::Time;

/// Progress status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    /// Enrolled and working (also the state of a fresh entry)
    #[default]
    InProgress,
    /// Every live module is complete
    Completed,
    /// Learner asked to pause
    Paused,
}

impl ProgressStatus {
    /// Wire label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStatus::InProgress => "in_progress",
            ProgressStatus::Completed => "completed",
            ProgressStatus::Paused => "paused",
        }
    }
}

impl std::fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed module record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedModule {
    /// Module that was completed
    pub module_id: ModuleId,

    /// When it was first completed
    pub completed_at: Time,
}

/// Derived fields of a progress record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedProgress {
    /// Percentage complete (0-100)
    pub percentage: u8,

    /// Derived status
    pub status: ProgressStatus,

    /// Resume pointer, already clamped
    pub current_module: usize,

    /// Curriculum modules version these values were computed against
    pub modules_version: u64,
}

/// Per-learner, per-curriculum completion record.
///
/// `progress_percentage`, `status` and `current_module` are a cache of the
/// last reconciliation and are only written through [`Progress::store_derived`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Unique identifier
    pub id: ProgressId,

    /// Learner
    pub learner_id: LearnerId,

    /// Curriculum
    pub curriculum_id: CurriculumId,

    /// Completed modules, one record per module id
    completed_modules: Vec<CompletedModule>,

    /// Resume pointer into the curriculum's module sequence
    current_module: usize,

    /// Percentage complete (0-100)
    progress_percentage: u8,

    /// Derived status
    status: ProgressStatus,

    /// Explicit pause intent
    paused: bool,

    /// Curriculum modules version of the last reconciliation
    reconciled_version: u64,

    /// Last time the learner touched this record
    pub last_accessed: Time,

    /// Storage revision, managed by the storage backend
    pub revision: u64,

    /// When created
    pub created_at: Time,

    /// Last updated
    pub updated_at: Time,
}

impl Progress {
    /// Create an empty ledger entry.
    pub fn new(learner_id: LearnerId, curriculum_id: CurriculumId, now: Time) -> Self {
        Self {
            id: ProgressId::new(),
            learner_id,
            curriculum_id,
            completed_modules: Vec::new(),
            current_module: 0,
            progress_percentage: 0,
            status: ProgressStatus::InProgress,
            paused: false,
            reconciled_version: 0,
            last_accessed: now,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// All completion records, including stale ones.
    pub fn completed_modules(&self) -> &[CompletedModule] {
        &self.completed_modules
    }

    /// Whether a module has a completion record.
    pub fn has_completed(&self, module_id: ModuleId) -> bool {
        self.completed_modules.iter().any(|c| c.module_id == module_id)
    }

    /// Record a completion. Returns false if the module was already recorded,
    /// in which case the original timestamp is kept.
    pub fn record_completion(&mut self, module_id: ModuleId, at: Time) -> bool {
        if self.has_completed(module_id) {
            return false;
        }
        self.completed_modules.push(CompletedModule {
            module_id,
            completed_at: at,
        });
        self.updated_at = at.max(self.updated_at);
        true
    }

    /// Stored resume pointer. May be out of range until reconciled.
    pub fn current_module(&self) -> usize {
        self.current_module
    }

    /// Stored percentage.
    pub fn progress_percentage(&self) -> u8 {
        self.progress_percentage
    }

    /// Stored status.
    pub fn status(&self) -> ProgressStatus {
        self.status
    }

    /// Pause intent flag.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Set or clear the pause intent.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Set the resume pointer; clamped on the next reconciliation.
    pub fn set_current_module(&mut self, index: usize) {
        self.current_module = index;
    }

    /// Curriculum modules version of the last reconciliation.
    pub fn reconciled_version(&self) -> u64 {
        self.reconciled_version
    }

    /// The derived fields as currently stored.
    pub fn derived(&self) -> DerivedProgress {
        DerivedProgress {
            percentage: self.progress_percentage,
            status: self.status,
            current_module: self.current_module,
            modules_version: self.reconciled_version,
        }
    }

    /// Store reconciled values. Returns true if anything changed.
    pub fn store_derived(&mut self, derived: DerivedProgress) -> bool {
        if self.derived() == derived {
            return false;
        }
        self.progress_percentage = derived.percentage.min(100);
        self.status = derived.status;
        self.current_module = derived.current_module;
        self.reconciled_version = derived.modules_version;
        true
    }

    /// Update `last_accessed`, never moving it backwards.
    pub fn touch(&mut self, at: Time) {
        self.last_accessed = self.last_accessed.max(at);
        self.updated_at = self.updated_at.max(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_new_entry_defaults() {
        let p = Progress::new(LearnerId::new(), CurriculumId::new(), Utc::now());
        assert!(p.completed_modules().is_empty());
        assert_eq!(p.current_module(), 0);
        assert_eq!(p.progress_percentage(), 0);
        assert_eq!(p.status(), ProgressStatus::InProgress);
        assert!(!p.is_paused());
    }

    #[test]
    fn test_record_completion_has_set_semantics() {
        let now = Utc::now();
        let mut p = Progress::new(LearnerId::new(), CurriculumId::new(), now);
        let m = ModuleId::new();

        assert!(p.record_completion(m, now));
        assert!(!p.record_completion(m, now + Duration::minutes(5)));
        assert_eq!(p.completed_modules().len(), 1);
        assert_eq!(p.completed_modules()[0].completed_at, now);
    }

    #[test]
    fn test_store_derived_reports_change() {
        let mut p = Progress::new(LearnerId::new(), CurriculumId::new(), Utc::now());
        let same = p.derived();
        assert!(!p.store_derived(same));

        let next = DerivedProgress {
            percentage: 50,
            status: ProgressStatus::InProgress,
            current_module: 1,
            modules_version: 2,
        };
        assert!(p.store_derived(next));
        assert_eq!(p.progress_percentage(), 50);
        assert_eq!(p.reconciled_version(), 2);
    }

    #[test]
    fn test_touch_never_moves_backwards() {
        let now = Utc::now();
        let mut p = Progress::new(LearnerId::new(), CurriculumId::new(), now);
        p.touch(now - Duration::hours(1));
        assert_eq!(p.last_accessed, now);
        p.touch(now + Duration::hours(1));
        assert_eq!(p.last_accessed, now + Duration::hours(1));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&ProgressStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
