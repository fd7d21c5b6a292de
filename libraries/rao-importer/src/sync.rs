//! Library sync orchestration
//!
//! A run takes the library's lease, replays the manifest (folders, then tag
//! groups), reconciles every asset with bounded parallelism and records the
//! result. The lease is released on every exit path once acquired.

use crate::manifest::{self, LibraryManifest};
use crate::reconciler::{ImageReconciler, Reconciled};
use crate::scanner::{self, AssetScanner};
use crate::{
    folders, tags, AssetFailure, FailureKind, ImportError, ProgressCallback, Result, SyncConfig,
    SyncProgress, SyncSummary,
};
use rao_core::types::{Library, LibraryId, SyncRunStatus};
use rao_core::LibraryStore;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Syncs libraries into the store
///
/// One instance can run several libraries at once; runs of the same library
/// exclude each other through the store's sync lease.
pub struct LibrarySync {
    store: Arc<dyn LibraryStore>,
    config: Arc<SyncConfig>,
    scanner: AssetScanner,
    progress: Option<ProgressCallback>,
}

/// Paths accounted for during the image phase
#[derive(Default)]
struct SeenAssets {
    /// Image paths produced by successfully reconciled assets
    paths: HashSet<String>,
    /// `images/{id}.info/` directories whose metadata failed; never pruned
    failed_dirs: HashSet<String>,
    /// A failure that cannot be pinned to one asset directory; disables pruning
    incomplete: bool,
}

impl SeenAssets {
    /// Spare the asset directory holding `path`, or the whole library when
    /// the path belongs to no single asset
    fn spare(&mut self, root: &Path, path: &Path) {
        match scanner::info_dir_of(root, path) {
            Some(dir) => {
                self.failed_dirs.insert(dir);
            }
            None => self.incomplete = true,
        }
    }
}

/// Renews the run lease at a third of its TTL
struct LeaseKeeper<'a> {
    holder: &'a str,
    ttl_secs: i64,
    interval: Duration,
    renewed_at: Instant,
}

impl<'a> LeaseKeeper<'a> {
    fn new(holder: &'a str, ttl_secs: i64) -> Self {
        Self {
            holder,
            ttl_secs,
            interval: Duration::from_secs((ttl_secs / 3).max(1) as u64),
            renewed_at: Instant::now(),
        }
    }

    /// Returns `false` once the lease was taken over by another run
    async fn keep_alive(&mut self, store: &dyn LibraryStore, library_id: LibraryId) -> bool {
        if self.renewed_at.elapsed() < self.interval {
            return true;
        }

        match store
            .renew_sync_lease(library_id, self.holder, self.ttl_secs)
            .await
        {
            Ok(true) => {
                self.renewed_at = Instant::now();
                true
            }
            Ok(false) => {
                error!("Lost sync lease of library {}", library_id);
                false
            }
            Err(e) => {
                warn!("Failed to renew sync lease of library {}: {}", library_id, e);
                true
            }
        }
    }
}

/// `images/{id}.info/` part of an image path
fn info_dir(path: &str) -> &str {
    match path.match_indices('/').nth(1) {
        Some((i, _)) => &path[..=i],
        None => path,
    }
}

impl LibrarySync {
    pub fn new(store: Arc<dyn LibraryStore>, config: SyncConfig) -> Self {
        Self {
            store,
            scanner: AssetScanner::new().follow_links(config.follow_links),
            config: Arc::new(config),
            progress: None,
        }
    }

    /// Report progress after every finished asset
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SyncProgress) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run one sync of a library
    ///
    /// Per-asset problems end up in [`SyncSummary::failures`]. Errors are
    /// returned only when the run cannot happen or cannot continue: unknown
    /// library, lease held by another run, unreadable manifest, or a store
    /// failure during the folder and tag phases.
    pub async fn sync_library(
        &self,
        library_id: LibraryId,
        cancel: CancellationToken,
    ) -> Result<SyncSummary> {
        self.config.validate()?;
        let started = Instant::now();

        let library = self
            .store
            .get_library(library_id)
            .await?
            .ok_or(ImportError::LibraryNotFound(library_id))?;

        let holder = Uuid::new_v4().to_string();
        let acquired = self
            .store
            .acquire_sync_lease(library_id, &holder, self.config.lease_ttl_secs)
            .await?;
        if !acquired {
            warn!("Library {} is already being synced, refusing run", library_id);
            return Err(ImportError::RunLockContention(library_id));
        }

        info!("Starting sync of library {} ({})", library.name, library.path);

        let result = self.run_with_history(&library, &holder, &cancel).await;

        if let Err(e) = self.store.release_sync_lease(library_id, &holder).await {
            warn!("Failed to release sync lease of library {}: {}", library_id, e);
        }

        result.map(|mut summary| {
            summary.duration_ms = started.elapsed().as_millis() as u64;
            info!(
                "Sync of library {} finished in {}ms: {} created, {} updated, {} deleted, {} unchanged, {} skipped{}",
                library_id,
                summary.duration_ms,
                summary.created,
                summary.updated,
                summary.deleted,
                summary.unchanged,
                summary.skipped,
                if summary.cancelled { " (cancelled)" } else { "" }
            );
            summary
        })
    }

    async fn run_with_history(
        &self,
        library: &Library,
        holder: &str,
        cancel: &CancellationToken,
    ) -> Result<SyncSummary> {
        let run_id = self.store.start_sync_run(library.id).await?;
        let mut summary = SyncSummary::new(library.id, run_id);

        match self.run_phases(library, holder, cancel, &mut summary).await {
            Ok(()) => {
                let status = if summary.cancelled {
                    SyncRunStatus::Cancelled
                } else {
                    SyncRunStatus::Completed
                };

                if let Err(e) = self
                    .store
                    .finish_sync_run(run_id, status, summary.run_counts(), None)
                    .await
                {
                    warn!("Failed to record end of sync run {}: {}", run_id, e);
                }

                if !summary.cancelled {
                    let now = chrono::Utc::now().timestamp();
                    if let Err(e) = self.store.set_last_synced_at(library.id, now).await {
                        warn!("Failed to record sync time of library {}: {}", library.id, e);
                    }
                }

                Ok(summary)
            }
            Err(e) => {
                error!("Sync of library {} failed: {}", library.id, e);

                if let Err(finish_err) = self
                    .store
                    .finish_sync_run(
                        run_id,
                        SyncRunStatus::Failed,
                        summary.run_counts(),
                        Some(e.to_string()),
                    )
                    .await
                {
                    warn!("Failed to record end of sync run {}: {}", run_id, finish_err);
                }

                Err(e)
            }
        }
    }

    async fn run_phases(
        &self,
        library: &Library,
        holder: &str,
        cancel: &CancellationToken,
        summary: &mut SyncSummary,
    ) -> Result<()> {
        let root = PathBuf::from(&library.path);

        // Phase 1: Manifest
        debug!("Phase 1: Reading manifest");
        let manifest = read_manifest(root.clone()).await?;

        if cancel.is_cancelled() {
            info!("Sync of library {} cancelled before start", library.id);
            summary.cancelled = true;
            return Ok(());
        }

        // Phase 2: Folders, parents first
        debug!("Phase 2: Syncing {} folders", manifest.folders.len());
        let (folder_stats, folder_ids) =
            folders::sync_folders(self.store.as_ref(), library.id, &manifest.folders).await?;
        summary.folders = folder_stats;

        // Phase 3: Tag groups
        debug!("Phase 3: Syncing {} tag groups", manifest.tag_groups.len());
        summary.tags =
            tags::sync_tag_groups(self.store.as_ref(), library.id, &manifest.tag_groups).await?;

        // Phase 4: Images
        let scanner = self.scanner.clone();
        let scan_root = root.clone();
        let scan = tokio::task::spawn_blocking(move || scanner.scan(&scan_root))
            .await
            .map_err(|e| ImportError::Io(std::io::Error::other(e)))?;
        debug!("Phase 4: Reconciling {} assets", scan.metadata_files.len());

        let mut seen = SeenAssets::default();
        for entry in scan.unreadable {
            let relative = scanner::relative_path(&root, &entry.path);
            let error = ImportError::unreadable(relative.clone(), entry.reason);
            warn!("Skipping {}: {}", relative, error);

            seen.spare(&root, &entry.path);
            summary.record_failure(AssetFailure {
                path: relative,
                kind: error.kind(),
                message: error.to_string(),
            });
        }

        let reconciler = ImageReconciler::new(
            Arc::clone(&self.store),
            library.id,
            Arc::clone(&self.config),
            Arc::new(folder_ids),
        );
        self.reconcile_assets(
            library.id,
            holder,
            cancel,
            &root,
            scan.metadata_files,
            &reconciler,
            &mut seen,
            summary,
        )
        .await;

        // Phase 5: Prune vanished assets
        if self.config.prune_missing {
            if summary.cancelled {
                debug!("Skipping prune of cancelled run");
            } else if seen.incomplete {
                warn!(
                    "Skipping prune of library {}: some failures could not be tied to an asset",
                    library.id
                );
            } else {
                debug!("Phase 5: Pruning vanished assets");
                self.prune(library.id, &seen, summary).await?;
            }
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn reconcile_assets(
        &self,
        library_id: LibraryId,
        holder: &str,
        cancel: &CancellationToken,
        root: &Path,
        paths: Vec<PathBuf>,
        reconciler: &ImageReconciler,
        seen: &mut SeenAssets,
        summary: &mut SyncSummary,
    ) {
        let total = paths.len();
        let mut pending = paths.into_iter();
        let mut tasks: JoinSet<(PathBuf, Result<Reconciled>)> = JoinSet::new();
        let mut lease = LeaseKeeper::new(holder, self.config.lease_ttl_secs);
        let mut stopped = false;
        let mut processed = 0;

        loop {
            // Keep at most `concurrency` assets in flight
            while !stopped && tasks.len() < self.config.concurrency {
                if cancel.is_cancelled() {
                    info!("Sync of library {} cancelled, finishing in-flight assets", library_id);
                    summary.cancelled = true;
                    stopped = true;
                    break;
                }

                let Some(path) = pending.next() else {
                    break;
                };

                // The inner task isolates a panic so the asset keeps its path
                let reconciler = reconciler.clone();
                let worker_path = path.clone();
                let worker = tokio::spawn(async move { reconciler.reconcile(worker_path).await });
                tasks.spawn(async move {
                    let result = match worker.await {
                        Ok(result) => result,
                        Err(e) => Err(ImportError::AssetTaskFailed {
                            path: path.display().to_string(),
                            reason: e.to_string(),
                        }),
                    };
                    (path, result)
                });
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };
            processed += 1;

            match joined {
                Ok((_, Ok(Reconciled { path, outcome }))) => {
                    debug!("{}: {:?}", path, outcome);
                    summary.record(outcome);
                    seen.paths.insert(path);
                }
                Ok((metadata_path, Err(e))) => {
                    let relative = scanner::relative_path(root, &metadata_path);
                    warn!("Skipping {}: {}", relative, e);

                    seen.spare(root, &metadata_path);
                    summary.record_failure(AssetFailure {
                        path: relative,
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    error!("Asset task failed: {}", e);
                    seen.incomplete = true;
                    summary.record_failure(AssetFailure {
                        path: String::new(),
                        kind: FailureKind::StoreWriteFailure,
                        message: e.to_string(),
                    });
                }
            }

            if let Some(callback) = &self.progress {
                callback(&SyncProgress {
                    library_id,
                    total,
                    processed,
                });
            }

            if !stopped && !lease.keep_alive(self.store.as_ref(), library_id).await {
                summary.cancelled = true;
                stopped = true;
            }
        }
    }

    /// Delete stored images no asset mapped to in this run
    async fn prune(
        &self,
        library_id: LibraryId,
        seen: &SeenAssets,
        summary: &mut SyncSummary,
    ) -> Result<()> {
        let stored = self.store.get_image_paths(library_id).await?;

        for (id, path) in stored {
            if seen.paths.contains(&path) || seen.failed_dirs.contains(info_dir(&path)) {
                continue;
            }

            match self.store.delete_image(id).await {
                Ok(true) => {
                    debug!("Pruned {}", path);
                    summary.deleted += 1;
                    summary.pruned += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("Failed to prune {}: {}", path, e);
                    summary.record_failure(AssetFailure {
                        path,
                        kind: FailureKind::StoreWriteFailure,
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

async fn read_manifest(root: PathBuf) -> Result<LibraryManifest> {
    let display = root.display().to_string();
    tokio::task::spawn_blocking(move || manifest::read_manifest(&root))
        .await
        .map_err(|e| ImportError::ManifestUnreadable {
            path: display,
            reason: e.to_string(),
        })?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_dir() {
        assert_eq!(info_dir("images/K1.info/cat.jpg"), "images/K1.info/");
        assert_eq!(info_dir("images/K1.info/"), "images/K1.info/");
        assert_eq!(info_dir("loose.jpg"), "loose.jpg");
    }
}
