//! Library types
//!
//! A library is one configured external asset collection. Its root path is
//! fixed at creation; everything the engine imports hangs off its id.

use serde::{Deserialize, Serialize};

pub type LibraryId = i64;

/// A configured external library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    /// Unique ID
    pub id: LibraryId,

    /// Display name
    pub name: String,

    /// Absolute path to the library root (e.g. `/photos/Main.library`)
    pub path: String,

    /// Which tool produced the library
    pub source_type: SourceType,

    /// Last successful sync (Unix epoch seconds)
    pub last_synced_at: Option<i64>,

    /// Created timestamp (Unix epoch seconds)
    pub created_at: i64,
}

/// Foreign tool that produced a library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Eagle asset manager (`*.library` directories)
    #[default]
    Eagle,
}

impl SourceType {
    /// Convert to string for database storage
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eagle => "eagle",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "eagle" => Some(Self::Eagle),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Request to register a new library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLibrary {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub source_type: SourceType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_round_trip() {
        assert_eq!(SourceType::from_str(SourceType::Eagle.as_str()), Some(SourceType::Eagle));
        assert_eq!(SourceType::from_str("billfish"), None);
        assert_eq!(SourceType::Eagle.to_string(), "eagle");
    }
}
