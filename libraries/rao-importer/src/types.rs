//! Common types for the importer

use rao_core::types::{LibraryId, RunCounts, SyncRunId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Why an asset was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MetadataUnreadable,
    UnsupportedFormat,
    StoreWriteFailure,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::MetadataUnreadable => "metadata unreadable",
            Self::UnsupportedFormat => "unsupported format",
            Self::StoreWriteFailure => "store write failure",
        };
        f.write_str(name)
    }
}

/// A skipped asset, as listed in the run summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFailure {
    /// Path relative to the library root
    pub path: String,
    pub kind: FailureKind,
    pub message: String,
}

/// What reconciling one asset did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Created,
    Updated,
    Deleted,
    /// Stored row already matched, or deletion requested for an absent row
    Unchanged,
}

/// Folder phase counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderSyncStats {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl FolderSyncStats {
    pub fn writes(&self) -> usize {
        self.created + self.updated
    }
}

/// Tag phase counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSyncStats {
    pub groups_created: usize,
    pub groups_updated: usize,
    pub tags_created: usize,
    /// Groups whose membership rows were rewritten
    pub memberships_changed: usize,
}

impl TagSyncStats {
    pub fn writes(&self) -> usize {
        self.groups_created + self.groups_updated + self.tags_created + self.memberships_changed
    }
}

/// Result of one library sync run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSummary {
    pub library_id: LibraryId,
    pub run_id: SyncRunId,
    pub created: usize,
    pub updated: usize,
    /// Deleted by flag plus pruned
    pub deleted: usize,
    /// Subset of `deleted` removed because the asset vanished from disk
    pub pruned: usize,
    pub unchanged: usize,
    /// Assets that failed; each one has an entry in `failures`
    pub skipped: usize,
    pub folders: FolderSyncStats,
    pub tags: TagSyncStats,
    /// Stopped early through the cancellation token or a lost lease
    pub cancelled: bool,
    pub duration_ms: u64,
    pub failures: Vec<AssetFailure>,
}

impl SyncSummary {
    pub(crate) fn new(library_id: LibraryId, run_id: SyncRunId) -> Self {
        Self {
            library_id,
            run_id,
            ..Self::default()
        }
    }

    pub(crate) fn record(&mut self, outcome: ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Created => self.created += 1,
            ReconcileOutcome::Updated => self.updated += 1,
            ReconcileOutcome::Deleted => self.deleted += 1,
            ReconcileOutcome::Unchanged => self.unchanged += 1,
        }
    }

    pub(crate) fn record_failure(&mut self, failure: AssetFailure) {
        self.skipped += 1;
        self.failures.push(failure);
    }

    /// Number of assets that went through reconciliation
    pub fn processed(&self) -> usize {
        self.created + self.updated + self.deleted - self.pruned + self.unchanged + self.skipped
    }

    /// Total number of rows written across all phases
    pub fn writes(&self) -> usize {
        self.created + self.updated + self.deleted + self.folders.writes() + self.tags.writes()
    }

    pub fn run_counts(&self) -> RunCounts {
        RunCounts {
            created: self.created as i64,
            updated: self.updated as i64,
            deleted: self.deleted as i64,
            unchanged: self.unchanged as i64,
            skipped: self.skipped as i64,
        }
    }
}

/// Progress of the image phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProgress {
    pub library_id: LibraryId,
    /// Metadata files found by the scan
    pub total: usize,
    /// Assets finished so far, failed ones included
    pub processed: usize,
}

impl SyncProgress {
    pub fn percentage(&self) -> f32 {
        if self.total == 0 {
            return 100.0;
        }
        (self.processed as f32 / self.total as f32) * 100.0
    }
}

/// Called after every finished asset
pub type ProgressCallback = Arc<dyn Fn(&SyncProgress) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut summary = SyncSummary::new(1, 1);
        summary.record(ReconcileOutcome::Created);
        summary.record(ReconcileOutcome::Unchanged);
        summary.record_failure(AssetFailure {
            path: "images/X.info/metadata.json".to_string(),
            kind: FailureKind::UnsupportedFormat,
            message: "xyz".to_string(),
        });

        assert_eq!(summary.processed(), 3);
        assert_eq!(summary.writes(), 1);
        assert_eq!(summary.run_counts().skipped, 1);
    }

    #[test]
    fn test_progress_percentage() {
        let progress = SyncProgress {
            library_id: 1,
            total: 4,
            processed: 1,
        };
        assert!((progress.percentage() - 25.0).abs() < f32::EPSILON);
    }
}
