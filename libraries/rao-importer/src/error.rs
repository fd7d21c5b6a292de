//! Error types for the importer

use crate::types::FailureKind;
use rao_core::types::LibraryId;
use rao_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    /// Metadata file missing, corrupt, unstatable or missing required fields
    #[error("Unreadable metadata {path}: {reason}")]
    MetadataUnreadable { path: String, reason: String },

    /// Extension outside the configured allow-list
    #[error("Unsupported file format '{ext}': {path}")]
    UnsupportedFormat { path: String, ext: String },

    /// The store rejected a write for one asset
    #[error("Store write failed for {path}: {source}")]
    StoreWriteFailure {
        path: String,
        #[source]
        source: CoreError,
    },

    /// The task reconciling one asset panicked or was aborted
    #[error("Reconciling {path} did not finish: {reason}")]
    AssetTaskFailed { path: String, reason: String },

    /// Another run holds the library lease
    #[error("Library {0} is already being synced")]
    RunLockContention(LibraryId),

    #[error("Library not found: {0}")]
    LibraryNotFound(LibraryId),

    /// Library root manifest missing or corrupt
    #[error("Unreadable library manifest {path}: {reason}")]
    ManifestUnreadable { path: String, reason: String },

    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage error: {0}")]
    Storage(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ImportError {
    pub(crate) fn unreadable(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::MetadataUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// How this error is reported when it stops a single asset
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MetadataUnreadable { .. } | Self::Io(_) => FailureKind::MetadataUnreadable,
            Self::UnsupportedFormat { .. } => FailureKind::UnsupportedFormat,
            _ => FailureKind::StoreWriteFailure,
        }
    }
}
