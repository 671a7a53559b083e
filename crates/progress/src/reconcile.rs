//! Reconciliation of a progress record against the live curriculum.
//!
//! Everything here is a pure function of `(Progress, Curriculum)`. Completions
//! of removed modules stay in the record but never count towards the
//! percentage, so the percentage is bounded by 100 whatever the curriculum
//! edit history looks like.

use pathtrack_core::{CompletedModule, Curriculum, DerivedProgress, ModuleId, Progress, ProgressStatus};

/// Outcome of reconciling one progress record.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Values to store on the record
    pub derived: DerivedProgress,

    /// Completions that match a live module
    pub valid_completed: usize,

    /// Live module count
    pub total_modules: usize,

    /// Completions of modules no longer in the curriculum
    pub stale_completions: Vec<CompletedModule>,

    /// Live modules not yet completed, in sequence order
    pub remaining_modules: Vec<ModuleId>,

    /// Whether `derived` differs from what the record currently stores
    pub changed: bool,
}

/// Reconcile a record against the curriculum it references.
pub fn reconcile(progress: &Progress, curriculum: &Curriculum) -> Reconciliation {
    let (valid, stale): (Vec<CompletedModule>, Vec<CompletedModule>) = progress
        .completed_modules()
        .iter()
        .copied()
        .partition(|c| curriculum.contains_module(c.module_id));

    let total_modules = curriculum.module_count();
    let valid_completed = valid.len();
    let percentage = percentage(valid_completed, total_modules);
    let status = derive_status(valid_completed, total_modules, progress.is_paused());

    let derived = DerivedProgress {
        percentage,
        status,
        current_module: clamp_index(progress.current_module(), total_modules),
        modules_version: curriculum.modules_version(),
    };

    let remaining_modules = curriculum
        .modules()
        .iter()
        .map(|m| m.id)
        .filter(|id| !progress.has_completed(*id))
        .collect();

    Reconciliation {
        changed: derived != progress.derived(),
        derived,
        valid_completed,
        total_modules,
        stale_completions: stale,
        remaining_modules,
    }
}

/// `round(100 * completed / total)`, rounding halves up; 0 for an empty curriculum.
///
/// 100 is reserved for a fully completed curriculum, so a partial one with
/// enough modules to round up reports 99.
pub fn percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    let rounded = ((200 * completed as u64 + total as u64) / (2 * total as u64)) as u8;
    if completed < total {
        rounded.min(99)
    } else {
        rounded
    }
}

/// Completed (every live module done) wins over paused; a fresh entry is in
/// progress.
pub fn derive_status(valid_completed: usize, total_modules: usize, paused: bool) -> ProgressStatus {
    if total_modules > 0 && valid_completed >= total_modules {
        ProgressStatus::Completed
    } else if paused {
        ProgressStatus::Paused
    } else {
        ProgressStatus::InProgress
    }
}

/// Clamp a resume pointer into `[0, total - 1]`, or 0 when empty.
pub fn clamp_index(index: usize, total: usize) -> usize {
    index.min(total.saturating_sub(1))
}

/// Position of the first live module not yet completed, or the last module
/// when everything is done.
pub fn next_resume_index(progress: &Progress, curriculum: &Curriculum) -> usize {
    curriculum
        .modules()
        .iter()
        .position(|m| !progress.has_completed(m.id))
        .unwrap_or_else(|| curriculum.module_count().saturating_sub(1))
}
