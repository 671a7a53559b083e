//! Unique identifiers for Pathtrack entities.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(Ulid);

        impl $name {
            /// Generate a fresh identifier.
            pub fn new() -> Self {
                Self(Ulid::new())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = ulid::DecodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }
    };
}

define_id!(
    /// Unique identifier for a Curriculum (learning path)
    CurriculumId
);

define_id!(
    /// Unique identifier for a Module.
    ///
    /// Module ids are never reused, so a retired id can always be told apart
    /// from a module added later.
    ModuleId
);

define_id!(
    /// Unique identifier for a learner
    LearnerId
);

define_id!(
    /// Unique identifier for a curriculum author
    AuthorId
);

define_id!(
    /// Unique identifier for a Progress ledger entry
    ProgressId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_parses_back() {
        let id = ModuleId::new();
        let parsed: ModuleId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_fresh_ids_differ() {
        assert_ne!(CurriculumId::new(), CurriculumId::new());
    }

    #[test]
    fn test_invalid_id_rejected() {
        assert!("not-a-ulid".parse::<LearnerId>().is_err());
    }
}
