//! Image reconciliation
//!
//! Decides, for one asset, whether its stored image must be created,
//! updated, deleted or left alone, and applies that decision. Each write is a
//! single store call, which the store applies atomically with all of the
//! image's relations.

use crate::metadata::{self, AssetMetadata};
use crate::{ImportError, ReconcileOutcome, Result, SyncConfig};
use rao_core::types::{FolderId, ImageData, LibraryId};
use rao_core::{CoreError, LibraryStore};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Outcome of one asset together with the image path it maps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub path: String,
    pub outcome: ReconcileOutcome,
}

/// Reconciles assets of one library against the store
///
/// Cheap to clone; the orchestrator hands a clone to every worker task.
#[derive(Clone)]
pub struct ImageReconciler {
    store: Arc<dyn LibraryStore>,
    library_id: LibraryId,
    config: Arc<SyncConfig>,
    folder_ids: Arc<HashMap<String, FolderId>>,
}

impl ImageReconciler {
    /// Create a reconciler
    ///
    /// `folder_ids` maps external folder ids to stored ones; memberships in
    /// folders missing from it are dropped.
    pub fn new(
        store: Arc<dyn LibraryStore>,
        library_id: LibraryId,
        config: Arc<SyncConfig>,
        folder_ids: Arc<HashMap<String, FolderId>>,
    ) -> Self {
        Self {
            store,
            library_id,
            config,
            folder_ids,
        }
    }

    /// Read the metadata file on the blocking pool, then apply it
    pub async fn reconcile(&self, metadata_path: PathBuf) -> Result<Reconciled> {
        let config = Arc::clone(&self.config);
        let display = metadata_path.display().to_string();

        let metadata = tokio::task::spawn_blocking(move || {
            metadata::read_asset_metadata(&metadata_path, &config)
        })
        .await
        .map_err(|e| ImportError::unreadable(display, e))??;

        let path = metadata.path.clone();
        let outcome = self.apply(metadata).await?;

        Ok(Reconciled { path, outcome })
    }

    /// Map a metadata record to the values the store should hold
    pub fn to_image_data(&self, metadata: &AssetMetadata) -> ImageData {
        let folder_ids = metadata
            .folders
            .iter()
            .filter_map(|external| {
                let id = self.folder_ids.get(external).copied();
                if id.is_none() {
                    tracing::debug!(
                        "Asset {} references unknown folder {}, dropping it",
                        metadata.id,
                        external
                    );
                }
                id
            })
            .collect();

        ImageData {
            library_id: self.library_id,
            external_id: metadata.id.clone(),
            path: metadata.path.clone(),
            thumbnail_path: metadata.thumbnail_path.clone(),
            name: metadata.name.clone(),
            size: metadata.size,
            created_time: metadata.created_time,
            modified_time: metadata.modified_time,
            ext: metadata.ext.clone(),
            width: metadata.width,
            height: metadata.height,
            duration: metadata.duration,
            folder_ids,
            tags: metadata.tags.clone(),
            colors: metadata.colors.clone(),
        }
        .normalized()
    }

    /// Apply one metadata record to the store
    pub async fn apply(&self, metadata: AssetMetadata) -> Result<ReconcileOutcome> {
        let data = self.to_image_data(&metadata);
        let path = data.path.clone();
        let store_failure = |source: CoreError| ImportError::StoreWriteFailure {
            path: path.clone(),
            source,
        };

        let existing = self
            .store
            .find_image(self.library_id, &data.path)
            .await
            .map_err(store_failure)?;

        if metadata.is_deleted {
            return match existing {
                Some(image) => {
                    self.store.delete_image(image.id).await.map_err(store_failure)?;
                    tracing::debug!("Deleted {}", path);
                    Ok(ReconcileOutcome::Deleted)
                }
                None => Ok(ReconcileOutcome::Unchanged),
            };
        }

        match existing {
            None => {
                self.store.create_image(data).await.map_err(store_failure)?;
                tracing::debug!("Created {}", path);
                Ok(ReconcileOutcome::Created)
            }
            Some(image) if data.matches(&image) => Ok(ReconcileOutcome::Unchanged),
            Some(image) => {
                self.store
                    .update_image(image.id, data)
                    .await
                    .map_err(store_failure)?;
                tracing::debug!("Updated {}", path);
                Ok(ReconcileOutcome::Updated)
            }
        }
    }
}
