//! Pathtrack core data models.
//!
//! This crate defines the learning-path curriculum and the per-learner
//! progress ledger entry that the reconciliation services operate on.

#![warn(missing_docs)]

// Core identities
mod id;

// Learning paths
mod curriculum;

// Progress ledger
mod progress;

// Re-exports
pub use id::*;

pub use curriculum::{
    Category, Curriculum, CurriculumDraft, CurriculumError, Difficulty, Module, ModuleDraft,
    Resource, ResourceKind,
};
pub use progress::{CompletedModule, DerivedProgress, Progress, ProgressStatus};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
