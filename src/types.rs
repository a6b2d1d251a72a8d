//! Shared primitive IDs and ordering enums.

use serde::{Deserialize, Serialize};

/// Record identifier assigned under the lowest-free-slot policy.
pub type RecordId = i64;

/// Ordering applied when listing records by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Oldest record first.
    OldestFirst,
    /// Newest record first.
    #[default]
    NewestFirst,
}

impl SortOrder {
    pub(crate) fn sql_direction(self) -> &'static str {
        match self {
            Self::OldestFirst => "ASC",
            Self::NewestFirst => "DESC",
        }
    }
}
