//! Tag and tag group types

use super::LibraryId;
use serde::{Deserialize, Serialize};

pub type TagId = i64;
pub type TagGroupId = i64;

/// A tag, unique by name within a library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub library_id: LibraryId,
    pub name: String,
}

/// A named, ordered group of tags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagGroup {
    pub id: TagGroupId,
    pub library_id: LibraryId,
    pub name: String,
    pub color: Option<String>,
}

/// Data for upserting a tag group keyed by `(library_id, name)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertTagGroup {
    pub library_id: LibraryId,
    pub name: String,
    pub color: Option<String>,
}
