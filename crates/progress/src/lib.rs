//! Progress Tracking
//!
//! Learning-path progress ledger, enrollment, curriculum edits and the
//! reconciliation that keeps derived progress consistent with the live
//! curriculum.

#![warn(missing_docs)]

pub mod cache;
pub mod config;
pub mod curriculum_store;
pub mod enrollment;
pub mod error;
pub mod ledger;
pub mod reconcile;
pub mod service;

pub use cache::ProgressCache;
pub use config::LedgerConfig;
pub use curriculum_store::CurriculumStore;
pub use enrollment::EnrollmentRegistry;
pub use error::{ProgressError, Result};
pub use ledger::{ProgressLedger, ProgressReport};
pub use reconcile::{reconcile, Reconciliation};
pub use service::{ProgressApi, ProgressService};
