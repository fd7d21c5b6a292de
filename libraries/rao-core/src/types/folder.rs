//! Folder types

use super::LibraryId;
use serde::{Deserialize, Serialize};

pub type FolderId = i64;

/// A folder of the external library, mirrored into the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub library_id: LibraryId,
    /// Identifier assigned by the external tool, stable across runs
    pub external_id: String,
    pub name: String,
    pub parent_id: Option<FolderId>,
}

/// Data for upserting a folder keyed by `(library_id, external_id)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertFolder {
    pub library_id: LibraryId,
    pub external_id: String,
    pub name: String,
    /// Store id of the parent, which must already be upserted
    pub parent_id: Option<FolderId>,
}
