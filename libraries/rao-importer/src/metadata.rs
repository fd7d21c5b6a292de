//! Per-asset metadata reading
//!
//! Every asset of an Eagle library lives in `images/{id}.info/` next to a
//! `metadata.json` describing it. Reading turns that file into an
//! [`AssetMetadata`] record that no longer depends on the file system or on
//! what the store holds.

use crate::{ImportError, Result, SyncConfig};
use chrono::{DateTime, Utc};
use rao_core::color;
use serde::Deserialize;
use std::path::Path;
use std::time::SystemTime;

/// File name of the per-asset metadata
pub const METADATA_FILE: &str = "metadata.json";

/// On-disk schema; unknown fields are ignored
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMetadata {
    id: String,
    name: String,
    ext: String,
    size: i64,
    width: Option<i64>,
    height: Option<i64>,
    duration: Option<f64>,
    no_thumbnail: Option<bool>,
    is_deleted: Option<bool>,
    folders: Option<Vec<String>>,
    tags: Option<Vec<String>>,
    palettes: Option<Vec<RawPalette>>,
}

#[derive(Debug, Deserialize)]
struct RawPalette {
    // Kept loose so one malformed entry drops that color, not the asset
    #[serde(default)]
    color: serde_json::Value,
}

impl RawPalette {
    fn rgb(&self) -> Vec<i64> {
        self.color
            .as_array()
            .map(|values| values.iter().map(|v| v.as_i64().unwrap_or(-1)).collect())
            .unwrap_or_default()
    }
}

/// Canonical record of one asset
#[derive(Debug, Clone, PartialEq)]
pub struct AssetMetadata {
    /// Asset id assigned by Eagle
    pub id: String,
    pub name: String,
    /// Extension as written in the metadata, case preserved
    pub ext: String,
    pub size: i64,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub duration: Option<f64>,
    pub is_deleted: bool,
    /// External folder ids
    pub folders: Vec<String>,
    pub tags: Vec<String>,
    /// Normalized `#rrggbb` palette, at most nine entries
    pub colors: Vec<String>,
    /// Asset path relative to the library root
    pub path: String,
    /// Thumbnail path relative to the library root
    pub thumbnail_path: String,
    /// Unix epoch milliseconds
    pub created_time: i64,
    /// Unix epoch milliseconds
    pub modified_time: i64,
}

/// Relative asset and thumbnail paths, always `/`-separated
pub fn asset_paths(id: &str, name: &str, ext: &str, no_thumbnail: bool) -> (String, String) {
    let path = format!("images/{id}.info/{name}.{ext}");
    let thumbnail_path = if no_thumbnail {
        path.clone()
    } else {
        format!("images/{id}.info/{name}_thumbnail.png")
    };
    (path, thumbnail_path)
}

fn millis(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp_millis()
}

/// Read one asset's `metadata.json`
///
/// Fails with [`ImportError::UnsupportedFormat`] when the extension is not on
/// the allow-list and with [`ImportError::MetadataUnreadable`] for anything
/// else that prevents a complete record. No partial record is ever returned.
pub fn read_asset_metadata(path: &Path, config: &SyncConfig) -> Result<AssetMetadata> {
    let display = path.display().to_string();

    let content = std::fs::read_to_string(path).map_err(|e| ImportError::unreadable(&display, e))?;
    let raw: RawMetadata =
        serde_json::from_str(&content).map_err(|e| ImportError::unreadable(&display, e))?;

    for (field, value) in [("id", &raw.id), ("name", &raw.name), ("ext", &raw.ext)] {
        if value.trim().is_empty() {
            return Err(ImportError::unreadable(&display, format!("empty '{}'", field)));
        }
    }

    let stat = std::fs::metadata(path).map_err(|e| ImportError::unreadable(&display, e))?;
    let modified = stat.modified().map_err(|e| ImportError::unreadable(&display, e))?;
    // Not every file system records a birth time
    let created = stat.created().unwrap_or(modified);

    let (asset_path, thumbnail_path) = asset_paths(
        &raw.id,
        &raw.name,
        &raw.ext,
        raw.no_thumbnail.unwrap_or(false),
    );

    if !config.is_supported(&raw.ext) {
        return Err(ImportError::UnsupportedFormat {
            path: display,
            ext: raw.ext,
        });
    }

    let palette: Vec<Vec<i64>> = raw
        .palettes
        .unwrap_or_default()
        .iter()
        .map(RawPalette::rgb)
        .collect();

    Ok(AssetMetadata {
        id: raw.id,
        name: raw.name,
        ext: raw.ext,
        size: raw.size,
        width: raw.width,
        height: raw.height,
        duration: raw.duration,
        is_deleted: raw.is_deleted.unwrap_or(false),
        folders: raw.folders.unwrap_or_default(),
        tags: raw.tags.unwrap_or_default(),
        colors: color::normalize_palette(&palette),
        path: asset_path,
        thumbnail_path,
        created_time: millis(created),
        modified_time: millis(modified),
    })
}
