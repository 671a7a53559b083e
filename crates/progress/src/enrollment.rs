//! Enrollment registry.

use pathtrack_core::{Curriculum, CurriculumId, LearnerId, Progress};
use tracing::info;

use crate::curriculum_store::CurriculumStore;
use crate::error::Result;
use crate::ledger::ProgressLedger;

/// Many-to-many association between learners and curricula.
#[derive(Clone)]
pub struct EnrollmentRegistry {
    curricula: CurriculumStore,
    ledger: ProgressLedger,
}

impl EnrollmentRegistry {
    /// Create a registry over the curriculum store and ledger.
    pub fn new(curricula: CurriculumStore, ledger: ProgressLedger) -> Self {
        Self { curricula, ledger }
    }

    /// Enroll a learner and return their ledger entry. Re-enrolling is a no-op.
    pub async fn enroll(&self, learner: LearnerId, curriculum: CurriculumId) -> Result<Progress> {
        let (_, added) = self
            .curricula
            .edit(curriculum, |c, now| Ok(c.enroll_learner(learner, now)))
            .await?;
        if added {
            info!("Enrolled learner {} in {}", learner, curriculum);
        }
        self.ledger.create_if_absent(learner, curriculum).await
    }

    /// Remove a learner from the enrolled set and drop their cached record.
    /// The ledger entry itself is kept; purging it is the caller's decision.
    /// Returns false if not enrolled.
    pub async fn unenroll(&self, learner: LearnerId, curriculum: CurriculumId) -> Result<bool> {
        let (_, removed) = self
            .curricula
            .edit(curriculum, |c, now| Ok(c.unenroll_learner(learner, now)))
            .await?;
        if removed {
            self.ledger.forget(learner, curriculum).await;
            info!("Unenrolled learner {} from {}", learner, curriculum);
        }
        Ok(removed)
    }

    /// Whether a learner is enrolled.
    pub async fn is_enrolled(&self, learner: LearnerId, curriculum: CurriculumId) -> Result<bool> {
        Ok(self.curricula.get(curriculum).await?.is_enrolled(learner))
    }

    /// Learners enrolled in a curriculum.
    pub async fn enrolled_learners(&self, curriculum: CurriculumId) -> Result<Vec<LearnerId>> {
        Ok(self
            .curricula
            .get(curriculum)
            .await?
            .enrolled_learners()
            .iter()
            .copied()
            .collect())
    }

    /// Curricula a learner is enrolled in.
    pub async fn curricula_for(&self, learner: LearnerId) -> Result<Vec<Curriculum>> {
        Ok(self
            .curricula
            .list()
            .await?
            .into_iter()
            .filter(|c| c.is_enrolled(learner))
            .collect())
    }
}
