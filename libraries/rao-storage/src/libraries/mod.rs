//! Library registry storage
//!
//! Libraries are registered once per external collection and looked up by id
//! at the start of every sync run.
//!
//! # Example
//!
//! ```rust,no_run
//! use rao_storage::libraries;
//! use rao_core::types::{CreateLibrary, SourceType};
//!
//! # async fn example(pool: &sqlx::SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
//! let library = libraries::create(pool, &CreateLibrary {
//!     name: "Main".to_string(),
//!     path: "/photos/Main.library".to_string(),
//!     source_type: SourceType::Eagle,
//! }).await?;
//!
//! let all = libraries::get_all(pool).await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, StorageError};
use rao_core::types::{CreateLibrary, Library, LibraryId, SourceType};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

const COLUMNS: &str = "id, name, path, source_type, last_synced_at, created_at";

fn from_row(row: &SqliteRow) -> Result<Library> {
    let source_type: String = row.get("source_type");

    Ok(Library {
        id: row.get("id"),
        name: row.get("name"),
        path: row.get("path"),
        source_type: SourceType::from_str(&source_type).ok_or_else(|| {
            StorageError::InvalidValue(format!("unknown source type '{}'", source_type))
        })?,
        last_synced_at: row.get("last_synced_at"),
        created_at: row.get("created_at"),
    })
}

/// Get a library by ID
pub async fn get_by_id(pool: &SqlitePool, id: LibraryId) -> Result<Option<Library>> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM libraries WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(from_row).transpose()
}

/// Get a library by its root path
pub async fn get_by_path(pool: &SqlitePool, path: &str) -> Result<Option<Library>> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM libraries WHERE path = ?"))
        .bind(path)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(from_row).transpose()
}

/// Get all libraries
pub async fn get_all(pool: &SqlitePool) -> Result<Vec<Library>> {
    let rows = sqlx::query(&format!("SELECT {COLUMNS} FROM libraries ORDER BY name, id"))
        .fetch_all(pool)
        .await?;

    rows.iter().map(from_row).collect()
}

/// Register a new library
pub async fn create(pool: &SqlitePool, library: &CreateLibrary) -> Result<Library> {
    let now = crate::now();

    let result = sqlx::query(
        "INSERT INTO libraries (name, path, source_type, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&library.name)
    .bind(&library.path)
    .bind(library.source_type.as_str())
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Library {
        id: result.last_insert_rowid(),
        name: library.name.clone(),
        path: library.path.clone(),
        source_type: library.source_type,
        last_synced_at: None,
        created_at: now,
    })
}

/// Record the last completed sync
pub async fn set_last_synced_at(pool: &SqlitePool, id: LibraryId, synced_at: i64) -> Result<()> {
    let result = sqlx::query("UPDATE libraries SET last_synced_at = ? WHERE id = ?")
        .bind(synced_at)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StorageError::not_found("Library", id));
    }

    Ok(())
}

/// Delete a library and everything imported from it
pub async fn delete(pool: &SqlitePool, id: LibraryId) -> Result<bool> {
    let result = sqlx::query("DELETE FROM libraries WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
