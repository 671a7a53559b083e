//! Curriculum model - learning paths and their ordered modules.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use crate::id::{AuthorId, CurriculumId, LearnerId, ModuleId};
use crate::Time;

/// Errors raised by curriculum validation and mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CurriculumError {
    /// Module is not part of the curriculum's live module set
    #[error("module {module} is not part of curriculum {curriculum}")]
    UnknownModule {
        /// Curriculum that was searched
        curriculum: CurriculumId,
        /// Requested module
        module: ModuleId,
    },

    /// A required field is missing or malformed
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Field name
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Learning path category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    /// Browser and UI work
    Frontend,
    /// Services and data stores
    Backend,
    /// Frontend and backend together
    FullStack,
    /// Machine learning and AI
    MlAi,
    /// Build, deploy and operate
    DevOps,
    /// Data structures and algorithms
    Dsa,
    /// Anything else
    #[default]
    Other,
}

impl Category {
    /// Display label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Frontend => "Frontend",
            Category::Backend => "Backend",
            Category::FullStack => "Full-Stack",
            Category::MlAi => "ML/AI",
            Category::DevOps => "DevOps",
            Category::Dsa => "DSA",
            Category::Other => "Other",
        }
    }

    /// Parse a label, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "frontend" => Some(Category::Frontend),
            "backend" => Some(Category::Backend),
            "full-stack" | "fullstack" => Some(Category::FullStack),
            "ml/ai" | "mlai" | "ml" | "ai" => Some(Category::MlAi),
            "devops" => Some(Category::DevOps),
            "dsa" => Some(Category::Dsa),
            "other" => Some(Category::Other),
            _ => None,
        }
    }
}

/// Learning path difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    /// No prior knowledge assumed
    #[default]
    Beginner,
    /// Builds on the basics
    Intermediate,
    /// For experienced learners
    Advanced,
}

impl Difficulty {
    /// Parse a label, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "beginner" => Some(Difficulty::Beginner),
            "intermediate" => Some(Difficulty::Intermediate),
            "advanced" => Some(Difficulty::Advanced),
            _ => None,
        }
    }
}

/// Kind of a module resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// PDF document
    Pdf,
    /// External link
    Link,
    /// Source code or repository
    Code,
    /// Video
    Video,
    /// Unrecognized kind
    #[default]
    Other,
}

impl ResourceKind {
    /// Map a free-form kind label; unknown labels become `Other`.
    pub fn from_label(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pdf" => ResourceKind::Pdf,
            "link" | "url" => ResourceKind::Link,
            "code" => ResourceKind::Code,
            "video" => ResourceKind::Video,
            _ => ResourceKind::Other,
        }
    }
}

/// Supporting material attached to a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource title
    pub title: String,

    /// Location
    pub url: String,

    /// Resource kind
    pub kind: ResourceKind,
}

/// An atomic unit of content within a curriculum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Stable identifier
    pub id: ModuleId,

    /// Module title
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Optional lecture video
    pub video_url: Option<String>,

    /// Duration in minutes
    pub duration_minutes: u32,

    /// Position key; unique within the curriculum
    pub order: u32,

    /// Ordered resources
    pub resources: Vec<Resource>,

    /// When created
    pub created_at: Time,
}

/// Input for adding a module.
#[derive(Debug, Clone, Default)]
pub struct ModuleDraft {
    /// Module title; must not be blank
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Optional video link
    pub video_url: Option<String>,

    /// Duration in minutes
    pub duration_minutes: u32,

    /// Ordered resources
    pub resources: Vec<Resource>,
}

impl ModuleDraft {
    /// Draft with a title and duration.
    pub fn new(title: impl Into<String>, duration_minutes: u32) -> Self {
        Self {
            title: title.into(),
            duration_minutes,
            ..Default::default()
        }
    }

    fn into_module(self, order: u32, now: Time) -> Result<Module, CurriculumError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(CurriculumError::InvalidField {
                field: "module title",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(Module {
            id: ModuleId::new(),
            title,
            description: self.description,
            video_url: self.video_url,
            duration_minutes: self.duration_minutes,
            order,
            resources: self.resources,
            created_at: now,
        })
    }
}

/// Input for creating a curriculum.
#[derive(Debug, Clone, Default)]
pub struct CurriculumDraft {
    /// Title; must not be blank
    pub title: String,

    /// Description; must not be blank
    pub description: String,

    /// Category
    pub category: Category,

    /// Difficulty
    pub difficulty: Difficulty,

    /// Initial modules, in order
    pub modules: Vec<ModuleDraft>,

    /// Who the path is for
    pub target_audience: Option<String>,

    /// What learners should know beforehand
    pub prerequisites: Vec<String>,

    /// What learners will be able to do
    pub learning_outcomes: Vec<String>,

    /// Author
    pub created_by: AuthorId,
}

/// A learning path: an ordered collection of modules.
///
/// Module list, derived duration, retired ids and the enrolled set are only
/// reachable through methods so the derived fields cannot drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curriculum {
    /// Unique identifier
    pub id: CurriculumId,

    /// Title
    pub title: String,

    /// Description
    pub description: String,

    /// Category
    pub category: Category,

    /// Difficulty
    pub difficulty: Difficulty,

    /// Intended audience
    pub target_audience: Option<String>,

    /// Prerequisite topics
    pub prerequisites: Vec<String>,

    /// Learning outcomes
    pub learning_outcomes: Vec<String>,

    /// Owning author
    pub created_by: AuthorId,

    /// Modules, kept sorted by `order`
    modules: Vec<Module>,

    /// Sum of module durations in minutes
    total_duration: u64,

    /// Bumped on every module-list change
    modules_version: u64,

    /// Ids of removed modules
    retired_modules: BTreeSet<ModuleId>,

    /// Enrolled learners
    enrolled_learners: BTreeSet<LearnerId>,

    /// Storage revision, managed by the storage backend
    pub revision: u64,

    /// When created
    pub created_at: Time,

    /// Last updated
    pub updated_at: Time,
}

impl Curriculum {
    /// Validate a draft and build a curriculum from it.
    pub fn new(draft: CurriculumDraft, now: Time) -> Result<Self, CurriculumError> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(CurriculumError::InvalidField {
                field: "title",
                reason: "please provide a title".to_string(),
            });
        }
        if draft.description.trim().is_empty() {
            return Err(CurriculumError::InvalidField {
                field: "description",
                reason: "please provide a description".to_string(),
            });
        }

        let modules = draft
            .modules
            .into_iter()
            .enumerate()
            .map(|(i, m)| m.into_module(i as u32, now))
            .collect::<Result<Vec<_>, _>>()?;

        let mut curriculum = Self {
            id: CurriculumId::new(),
            title,
            description: draft.description,
            category: draft.category,
            difficulty: draft.difficulty,
            target_audience: draft.target_audience,
            prerequisites: draft.prerequisites,
            learning_outcomes: draft.learning_outcomes,
            created_by: draft.created_by,
            modules,
            total_duration: 0,
            modules_version: 0,
            retired_modules: BTreeSet::new(),
            enrolled_learners: BTreeSet::new(),
            revision: 0,
            created_at: now,
            updated_at: now,
        };
        curriculum.recompute_total_duration();
        Ok(curriculum)
    }

    /// Modules in sequence order.
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Number of live modules.
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Whether `id` is in the live module set.
    pub fn contains_module(&self, id: ModuleId) -> bool {
        self.modules.iter().any(|m| m.id == id)
    }

    /// Whether `id` belonged to this curriculum and was removed.
    pub fn is_retired(&self, id: ModuleId) -> bool {
        self.retired_modules.contains(&id)
    }

    /// Look up a live module.
    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == id)
    }

    /// Sequence position of a live module.
    pub fn position_of(&self, id: ModuleId) -> Option<usize> {
        self.modules.iter().position(|m| m.id == id)
    }

    /// Total duration in minutes.
    pub fn total_duration(&self) -> u64 {
        self.total_duration
    }

    /// Module-list version, for cache validation.
    pub fn modules_version(&self) -> u64 {
        self.modules_version
    }

    /// Retired module ids.
    pub fn retired_modules(&self) -> &BTreeSet<ModuleId> {
        &self.retired_modules
    }

    /// Append a module after the current last one.
    pub fn add_module(&mut self, draft: ModuleDraft, now: Time) -> Result<ModuleId, CurriculumError> {
        let order = self.modules.last().map(|m| m.order + 1).unwrap_or(0);
        let module = draft.into_module(order, now)?;
        let id = module.id;
        self.modules.push(module);
        self.touch_modules(now);
        Ok(id)
    }

    /// Insert a module at a sequence position, shifting the order of every
    /// module at or after it. Positions past the end append.
    pub fn insert_module(
        &mut self,
        draft: ModuleDraft,
        position: usize,
        now: Time,
    ) -> Result<ModuleId, CurriculumError> {
        if position >= self.modules.len() {
            return self.add_module(draft, now);
        }

        let order = self.modules[position].order;
        let module = draft.into_module(order, now)?;
        let id = module.id;
        for m in &mut self.modules[position..] {
            m.order += 1;
        }
        self.modules.insert(position, module);
        self.touch_modules(now);
        Ok(id)
    }

    /// Remove a module and retire its id.
    pub fn remove_module(&mut self, id: ModuleId, now: Time) -> Result<Module, CurriculumError> {
        let position = self.require_position(id)?;
        let module = self.modules.remove(position);
        self.retired_modules.insert(module.id);
        self.touch_modules(now);
        Ok(module)
    }

    /// Move a module to a new sequence position and renumber orders.
    pub fn move_module(
        &mut self,
        id: ModuleId,
        position: usize,
        now: Time,
    ) -> Result<(), CurriculumError> {
        let from = self.require_position(id)?;
        let module = self.modules.remove(from);
        let to = position.min(self.modules.len());
        self.modules.insert(to, module);
        for (i, m) in self.modules.iter_mut().enumerate() {
            m.order = i as u32;
        }
        self.touch_modules(now);
        Ok(())
    }

    /// Change a module's duration.
    pub fn set_module_duration(
        &mut self,
        id: ModuleId,
        duration_minutes: u32,
        now: Time,
    ) -> Result<(), CurriculumError> {
        let position = self.require_position(id)?;
        self.modules[position].duration_minutes = duration_minutes;
        self.touch_modules(now);
        Ok(())
    }

    /// Enrolled learners.
    pub fn enrolled_learners(&self) -> &BTreeSet<LearnerId> {
        &self.enrolled_learners
    }

    /// Whether a learner is enrolled.
    pub fn is_enrolled(&self, learner: LearnerId) -> bool {
        self.enrolled_learners.contains(&learner)
    }

    /// Add a learner to the enrolled set. Returns false if already enrolled.
    pub fn enroll_learner(&mut self, learner: LearnerId, now: Time) -> bool {
        let added = self.enrolled_learners.insert(learner);
        if added {
            self.updated_at = now;
        }
        added
    }

    /// Remove a learner from the enrolled set. Returns false if not enrolled.
    pub fn unenroll_learner(&mut self, learner: LearnerId, now: Time) -> bool {
        let removed = self.enrolled_learners.remove(&learner);
        if removed {
            self.updated_at = now;
        }
        removed
    }

    fn require_position(&self, id: ModuleId) -> Result<usize, CurriculumError> {
        self.position_of(id).ok_or(CurriculumError::UnknownModule {
            curriculum: self.id,
            module: id,
        })
    }

    fn touch_modules(&mut self, now: Time) {
        self.recompute_total_duration();
        self.modules_version += 1;
        self.updated_at = now;
    }

    fn recompute_total_duration(&mut self) {
        self.total_duration = self.modules.iter().map(|m| u64::from(m.duration_minutes)).sum();
    }
}
