use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Error raised when an identifier cannot be parsed back from text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid identifier: {0}")]
pub struct InvalidId(pub String);

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde-full", serde(transparent))]
        #[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
        pub struct $name(pub String);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidId;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(InvalidId(value.to_string()));
                }
                Ok(Self(trimmed.to_string()))
            }
        }
    };
}

string_id!(
    /// Browser tab (one live page session).
    TabId
);
string_id!(
    /// One user request handled by the orchestrator.
    TaskId
);
string_id!(PlanStepId);
string_id!(
    /// Conversation history record.
    EntryId
);

/// Identifies one snapshot/index cycle of a tab.
///
/// Cycle ids are monotonic per tab so that a stale index map can be detected
/// by comparison instead of by lookup.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct CycleId(pub u64);

impl CycleId {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cycle-{}", self.0)
    }
}
