//! Storage trait for the ingestion engine
//!
//! Every component receives a `LibraryStore` explicitly instead of reaching
//! for a global database handle, so tests can swap in doubles and each run
//! stays scoped to one library.

use crate::error::Result;
use crate::types::{
    Folder, Image, ImageData, ImageId, Library, LibraryId, RunCounts, SyncRunId, SyncRunStatus, Tag,
    TagGroup, TagGroupId, TagId, UpsertFolder, UpsertTagGroup, Upserted,
};
use async_trait::async_trait;

/// Relational store used by the sync engine
///
/// Image writes (`create_image`, `update_image`, `delete_image`) are atomic:
/// an implementation applies the scalar fields, folder links, tag links and
/// colors of one image together or not at all.
#[async_trait]
pub trait LibraryStore: Send + Sync {
    // ========================================================================
    // Libraries
    // ========================================================================

    /// Get library by ID
    async fn get_library(&self, id: LibraryId) -> Result<Option<Library>>;

    /// Record the time of the last completed sync (Unix epoch seconds)
    async fn set_last_synced_at(&self, id: LibraryId, synced_at: i64) -> Result<()>;

    // ========================================================================
    // Run leases
    // ========================================================================

    /// Try to take the per-library sync lease
    ///
    /// Returns `false` when another holder owns an unexpired lease.
    async fn acquire_sync_lease(
        &self,
        library_id: LibraryId,
        holder: &str,
        ttl_secs: i64,
    ) -> Result<bool>;

    /// Push the expiry of a lease this holder owns
    ///
    /// Returns `false` when the lease was lost to another holder.
    async fn renew_sync_lease(
        &self,
        library_id: LibraryId,
        holder: &str,
        ttl_secs: i64,
    ) -> Result<bool>;

    /// Release a lease this holder owns (no-op otherwise)
    async fn release_sync_lease(&self, library_id: LibraryId, holder: &str) -> Result<()>;

    // ========================================================================
    // Run history
    // ========================================================================

    /// Record the start of a sync run
    async fn start_sync_run(&self, library_id: LibraryId) -> Result<SyncRunId>;

    /// Record the end of a sync run
    async fn finish_sync_run(
        &self,
        id: SyncRunId,
        status: SyncRunStatus,
        counts: RunCounts,
        error_message: Option<String>,
    ) -> Result<()>;

    // ========================================================================
    // Folders
    // ========================================================================

    /// Create or update a folder keyed by `(library_id, external_id)`
    async fn upsert_folder(&self, folder: UpsertFolder) -> Result<Upserted<Folder>>;

    /// Get all folders of a library
    async fn get_folders(&self, library_id: LibraryId) -> Result<Vec<Folder>>;

    // ========================================================================
    // Tags
    // ========================================================================

    /// Create or update a tag group keyed by `(library_id, name)`
    async fn upsert_tag_group(&self, group: UpsertTagGroup) -> Result<Upserted<TagGroup>>;

    /// Create a tag keyed by `(library_id, name)` if it does not exist
    async fn upsert_tag(&self, library_id: LibraryId, name: &str) -> Result<Upserted<Tag>>;

    /// Make `tag_ids` the exact ordered membership of a group
    ///
    /// Returns `true` when any membership row changed.
    async fn set_tag_group_members(&self, group_id: TagGroupId, tag_ids: &[TagId])
        -> Result<bool>;

    /// Get all tag groups of a library
    async fn get_tag_groups(&self, library_id: LibraryId) -> Result<Vec<TagGroup>>;

    // ========================================================================
    // Images
    // ========================================================================

    /// Find an image by its library-relative path
    async fn find_image(&self, library_id: LibraryId, path: &str) -> Result<Option<Image>>;

    /// Create an image with its folder links, tag links and colors
    async fn create_image(&self, image: ImageData) -> Result<Image>;

    /// Replace every field and relation of an existing image
    async fn update_image(&self, id: ImageId, image: ImageData) -> Result<Image>;

    /// Delete an image, its colors and its links. Returns `false` if absent.
    async fn delete_image(&self, id: ImageId) -> Result<bool>;

    /// Get `(id, path)` of every image in a library
    async fn get_image_paths(&self, library_id: LibraryId) -> Result<Vec<(ImageId, String)>>;
}
