//! Rao Pics Library Importer
//!
//! Imports an Eagle library (a directory of per-asset `metadata.json` files
//! plus a root manifest) into the relational store, and keeps it reconciled
//! on every re-run.
//!
//! # Architecture
//!
//! - `manifest`: Library root manifest (folder tree, tag groups)
//! - `scanner`: Finds the per-asset metadata files
//! - `metadata`: Reads one metadata file into a canonical record
//! - `folders`: Folder tree synchronization in parent-first order
//! - `tags`: Tag group and tag synchronization
//! - `reconciler`: Create / update / delete decision for one asset
//! - `sync`: Orchestration of a whole run under a per-library lease
//!
//! # Example
//!
//! ```rust,no_run
//! use rao_importer::{LibrarySync, SyncConfig};
//! use rao_storage::SqliteLibraryStore;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(pool: sqlx::SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SqliteLibraryStore::new(pool));
//! let sync = LibrarySync::new(store, SyncConfig::default());
//!
//! let summary = sync.sync_library(1, CancellationToken::new()).await?;
//! println!("{} created, {} updated", summary.created, summary.updated);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod types;

pub mod folders;
pub mod manifest;
pub mod metadata;
pub mod reconciler;
pub mod scanner;
pub mod sync;
pub mod tags;

pub use config::{SyncConfig, DEFAULT_EXTENSIONS};
pub use error::ImportError;
pub use reconciler::ImageReconciler;
pub use sync::LibrarySync;
pub use types::*;

/// Re-export commonly used types
pub type Result<T> = std::result::Result<T, ImportError>;
