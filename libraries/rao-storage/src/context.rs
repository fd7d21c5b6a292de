use crate::{folders, images, libraries, sync_leases, sync_runs, tag_groups, tags};
use async_trait::async_trait;
use rao_core::{error::Result, storage::LibraryStore, types::*};
use sqlx::SqlitePool;

/// `LibraryStore` backed by a local `SQLite` database
#[derive(Clone)]
pub struct SqliteLibraryStore {
    pool: SqlitePool,
}

impl SqliteLibraryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl LibraryStore for SqliteLibraryStore {
    // Libraries
    async fn get_library(&self, id: LibraryId) -> Result<Option<Library>> {
        Ok(libraries::get_by_id(&self.pool, id).await?)
    }

    async fn set_last_synced_at(&self, id: LibraryId, synced_at: i64) -> Result<()> {
        Ok(libraries::set_last_synced_at(&self.pool, id, synced_at).await?)
    }

    // Run leases
    async fn acquire_sync_lease(
        &self,
        library_id: LibraryId,
        holder: &str,
        ttl_secs: i64,
    ) -> Result<bool> {
        Ok(sync_leases::acquire(&self.pool, library_id, holder, ttl_secs).await?)
    }

    async fn renew_sync_lease(
        &self,
        library_id: LibraryId,
        holder: &str,
        ttl_secs: i64,
    ) -> Result<bool> {
        Ok(sync_leases::renew(&self.pool, library_id, holder, ttl_secs).await?)
    }

    async fn release_sync_lease(&self, library_id: LibraryId, holder: &str) -> Result<()> {
        Ok(sync_leases::release(&self.pool, library_id, holder).await?)
    }

    // Run history
    async fn start_sync_run(&self, library_id: LibraryId) -> Result<SyncRunId> {
        Ok(sync_runs::start(&self.pool, library_id).await?)
    }

    async fn finish_sync_run(
        &self,
        id: SyncRunId,
        status: SyncRunStatus,
        counts: RunCounts,
        error_message: Option<String>,
    ) -> Result<()> {
        Ok(sync_runs::finish(&self.pool, id, status, counts, error_message.as_deref()).await?)
    }

    // Folders
    async fn upsert_folder(&self, folder: UpsertFolder) -> Result<Upserted<Folder>> {
        Ok(folders::upsert(&self.pool, folder).await?)
    }

    async fn get_folders(&self, library_id: LibraryId) -> Result<Vec<Folder>> {
        Ok(folders::get_by_library(&self.pool, library_id).await?)
    }

    // Tags
    async fn upsert_tag_group(&self, group: UpsertTagGroup) -> Result<Upserted<TagGroup>> {
        Ok(tag_groups::upsert(&self.pool, group).await?)
    }

    async fn upsert_tag(&self, library_id: LibraryId, name: &str) -> Result<Upserted<Tag>> {
        Ok(tags::upsert(&self.pool, library_id, name).await?)
    }

    async fn set_tag_group_members(
        &self,
        group_id: TagGroupId,
        tag_ids: &[TagId],
    ) -> Result<bool> {
        Ok(tag_groups::set_members(&self.pool, group_id, tag_ids).await?)
    }

    async fn get_tag_groups(&self, library_id: LibraryId) -> Result<Vec<TagGroup>> {
        Ok(tag_groups::get_by_library(&self.pool, library_id).await?)
    }

    // Images
    async fn find_image(&self, library_id: LibraryId, path: &str) -> Result<Option<Image>> {
        Ok(images::find_by_path(&self.pool, library_id, path).await?)
    }

    async fn create_image(&self, image: ImageData) -> Result<Image> {
        Ok(images::create(&self.pool, image).await?)
    }

    async fn update_image(&self, id: ImageId, image: ImageData) -> Result<Image> {
        Ok(images::update(&self.pool, id, image).await?)
    }

    async fn delete_image(&self, id: ImageId) -> Result<bool> {
        Ok(images::delete(&self.pool, id).await?)
    }

    async fn get_image_paths(&self, library_id: LibraryId) -> Result<Vec<(ImageId, String)>> {
        Ok(images::get_paths(&self.pool, library_id).await?)
    }
}
