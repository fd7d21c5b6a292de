//! Rao Pics Core
//!
//! Domain types, the storage capability trait and error handling shared by
//! the ingestion engine crates.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Library`, `Folder`, `TagGroup`, `Tag`, `Image`
//! - **Core Traits**: `LibraryStore`, the relational store every component receives explicitly
//! - **Color Normalization**: RGB palette entries to `#rrggbb` strings
//! - **Error Handling**: Unified `CoreError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use rao_core::color::{normalize_palette, rgb_to_hex};
//!
//! assert_eq!(rgb_to_hex(&[255, 128, 0]).as_deref(), Some("#ff8000"));
//!
//! let palette = vec![vec![0, 0, 0], vec![300, 0, 0], vec![16, 32, 48]];
//! assert_eq!(normalize_palette(&palette), vec!["#000000", "#102030"]);
//! ```

#![forbid(unsafe_code)]

pub mod color;
pub mod error;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use storage::LibraryStore;

pub use types::{
    // Libraries
    CreateLibrary, Library, LibraryId, SourceType,
    // Folder tree
    Folder, FolderId, UpsertFolder,
    // Tags
    Tag, TagGroup, TagGroupId, TagId, UpsertTagGroup,
    // Images
    Image, ImageData, ImageId,
    // Sync bookkeeping
    RunCounts, SyncRun, SyncRunId, SyncRunStatus,
    // Upsert results
    Upserted,
};
