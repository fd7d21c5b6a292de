//! Image types
//!
//! `Image` is what the store holds; `ImageData` is what a metadata file maps
//! to. Both keep relations in a canonical order (folder ids ascending, tag
//! names sorted, colors in palette order) so the reconciler can compare
//! them field by field.

use super::{FolderId, LibraryId};
use crate::color::MAX_COLORS;
use serde::{Deserialize, Serialize};

pub type ImageId = i64;

/// A stored image with its relations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,
    pub library_id: LibraryId,
    /// Asset id assigned by the external tool
    pub external_id: String,
    /// Path relative to the library root, unique per library
    pub path: String,
    pub thumbnail_path: String,
    pub name: String,
    /// File size in bytes
    pub size: i64,
    /// Creation time of the metadata entry (Unix epoch milliseconds)
    pub created_time: i64,
    /// Modification time of the metadata entry (Unix epoch milliseconds)
    pub modified_time: i64,
    pub ext: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    /// Duration in seconds for video assets
    pub duration: Option<f64>,
    pub folder_ids: Vec<FolderId>,
    pub tags: Vec<String>,
    pub colors: Vec<String>,
}

/// Field values for creating or updating an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    pub library_id: LibraryId,
    pub external_id: String,
    pub path: String,
    pub thumbnail_path: String,
    pub name: String,
    pub size: i64,
    pub created_time: i64,
    pub modified_time: i64,
    pub ext: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub duration: Option<f64>,
    pub folder_ids: Vec<FolderId>,
    pub tags: Vec<String>,
    pub colors: Vec<String>,
}

impl ImageData {
    /// Bring relations into canonical order
    ///
    /// Folder ids are sorted and deduplicated, tag names trimmed, sorted and
    /// deduplicated (blank names dropped), colors capped at [`MAX_COLORS`].
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.folder_ids.sort_unstable();
        self.folder_ids.dedup();

        self.tags = self
            .tags
            .into_iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();
        self.tags.sort();
        self.tags.dedup();

        self.colors.truncate(MAX_COLORS);
        self
    }

    /// Whether a stored image already holds exactly these values
    pub fn matches(&self, image: &Image) -> bool {
        self.library_id == image.library_id
            && self.external_id == image.external_id
            && self.path == image.path
            && self.thumbnail_path == image.thumbnail_path
            && self.name == image.name
            && self.size == image.size
            && self.created_time == image.created_time
            && self.modified_time == image.modified_time
            && self.ext == image.ext
            && self.width == image.width
            && self.height == image.height
            && self.duration == image.duration
            && self.folder_ids == image.folder_ids
            && self.tags == image.tags
            && self.colors == image.colors
    }
}
