//! Rao Pics Storage
//!
//! `SQLite` persistence for imported libraries: folders, tags, tag groups,
//! images with their colors, and the bookkeeping of sync runs.
//!
//! # Architecture
//!
//! - **Vertical Slicing**: Each entity owns its own queries and logic
//! - **Natural Keys**: Folders, tags and images are unique per library by the
//!   identifiers the external tool assigns, so upserts never duplicate rows
//! - **Atomic Images**: An image and all of its relations are written in one
//!   transaction
//!
//! # Example
//!
//! ```rust,no_run
//! use rao_storage::{create_pool, run_migrations, SqliteLibraryStore};
//! use rao_core::LibraryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool("sqlite://rao.db").await?;
//! run_migrations(&pool).await?;
//!
//! let store = SqliteLibraryStore::new(pool);
//! let library = store.get_library(1).await?;
//! # Ok(())
//! # }
//! ```

mod context;
mod error;

// Vertical slices
pub mod folders;
pub mod images;
pub mod libraries;
pub mod tag_groups;
pub mod tags;

// Sync bookkeeping
pub mod sync_leases;
pub mod sync_runs;

pub use context::SqliteLibraryStore;
pub use error::StorageError;

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
///
/// This should be called once when the application starts to ensure
/// the database schema is up to date.
///
/// # Errors
///
/// Returns an error if migrations fail to run
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `<sqlite://rao.db>`)
///
/// # Errors
///
/// Returns an error if the connection fails
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    tracing::debug!("Creating pool with URL: {}", database_url);

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true) // cascades from images to colors and links depend on this
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    tracing::debug!("Pool created");

    Ok(pool)
}

/// Current time as Unix epoch seconds
pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
