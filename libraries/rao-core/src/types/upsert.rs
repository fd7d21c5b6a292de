//! Upsert results

use serde::{Deserialize, Serialize};

/// Outcome of an upsert keyed by a natural identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum Upserted<T> {
    /// No row existed, one was inserted
    Created(T),
    /// A row existed and at least one field changed
    Updated(T),
    /// A row existed and already matched
    Unchanged(T),
}

impl<T> Upserted<T> {
    /// Get the upserted entity
    pub fn into_inner(self) -> T {
        match self {
            Self::Created(value) | Self::Updated(value) | Self::Unchanged(value) => value,
        }
    }

    /// Borrow the upserted entity
    pub fn value(&self) -> &T {
        match self {
            Self::Created(value) | Self::Updated(value) | Self::Unchanged(value) => value,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated(_))
    }
}
