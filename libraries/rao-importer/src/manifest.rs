//! Library root manifest
//!
//! The root `metadata.json` of an Eagle library holds the folder tree (nested
//! through `children`) and the tag groups. Folders are flattened here so the
//! folder phase can order them itself.

use crate::{ImportError, Result};
use serde::Deserialize;
use std::path::Path;

/// File name of the library manifest
pub const MANIFEST_FILE: &str = "metadata.json";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawManifest {
    #[serde(default)]
    folders: Vec<RawFolder>,
    #[serde(default)]
    tags_groups: Vec<TagGroupEntry>,
}

#[derive(Debug, Deserialize)]
struct RawFolder {
    id: String,
    name: String,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    children: Vec<RawFolder>,
}

/// One folder with its parent resolved from the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    pub id: String,
    pub name: String,
    pub parent: Option<String>,
}

impl FolderEntry {
    pub fn new(id: &str, name: &str, parent: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            parent: parent.map(str::to_string),
        }
    }
}

/// A tag group as listed in the manifest
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TagGroupEntry {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Folders and tag groups of a library
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryManifest {
    /// Pre-order: every folder appears after the folder enclosing it
    pub folders: Vec<FolderEntry>,
    pub tag_groups: Vec<TagGroupEntry>,
}

/// Read `{root}/metadata.json`
pub fn read_manifest(root: &Path) -> Result<LibraryManifest> {
    let path = root.join(MANIFEST_FILE);
    let unreadable = |reason: String| ImportError::ManifestUnreadable {
        path: path.display().to_string(),
        reason,
    };

    let content = std::fs::read_to_string(&path).map_err(|e| unreadable(e.to_string()))?;
    parse_manifest(&content).map_err(|e| unreadable(e.to_string()))
}

/// Parse manifest JSON
pub fn parse_manifest(content: &str) -> std::result::Result<LibraryManifest, serde_json::Error> {
    let raw: RawManifest = serde_json::from_str(content)?;

    Ok(LibraryManifest {
        folders: flatten_folders(raw.folders),
        tag_groups: raw.tags_groups,
    })
}

/// Flatten the nested tree with an explicit stack
///
/// A nested folder's parent is the folder enclosing it; a top-level folder
/// keeps its own `parent` field, if any.
fn flatten_folders(roots: Vec<RawFolder>) -> Vec<FolderEntry> {
    let mut flat = Vec::new();
    let mut stack: Vec<(RawFolder, Option<String>)> = roots
        .into_iter()
        .rev()
        .map(|folder| {
            let parent = folder.parent.clone();
            (folder, parent)
        })
        .collect();

    while let Some((folder, parent)) = stack.pop() {
        let RawFolder {
            id, name, children, ..
        } = folder;

        for child in children.into_iter().rev() {
            stack.push((child, Some(id.clone())));
        }

        flat.push(FolderEntry { id, name, parent });
    }

    flat
}
