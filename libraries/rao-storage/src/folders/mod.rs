//! Folder tree storage
//!
//! Folders are keyed by `(library_id, external_id)`. The caller upserts
//! parents before children, so `parent_id` always points at an existing row.

use crate::error::Result;
use rao_core::types::{Folder, FolderId, LibraryId, UpsertFolder, Upserted};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

fn from_row(row: &SqliteRow) -> Folder {
    Folder {
        id: row.get("id"),
        library_id: row.get("library_id"),
        external_id: row.get("external_id"),
        name: row.get("name"),
        parent_id: row.get("parent_id"),
    }
}

/// Get a folder by ID
pub async fn get_by_id(pool: &SqlitePool, id: FolderId) -> Result<Option<Folder>> {
    let row = sqlx::query(
        "SELECT id, library_id, external_id, name, parent_id FROM folders WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(from_row))
}

/// Find a folder by the identifier the external tool assigned
pub async fn find_by_external_id(
    pool: &SqlitePool,
    library_id: LibraryId,
    external_id: &str,
) -> Result<Option<Folder>> {
    let row = sqlx::query(
        "SELECT id, library_id, external_id, name, parent_id
         FROM folders
         WHERE library_id = ? AND external_id = ?",
    )
    .bind(library_id)
    .bind(external_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(from_row))
}

/// Get all folders of a library
pub async fn get_by_library(pool: &SqlitePool, library_id: LibraryId) -> Result<Vec<Folder>> {
    let rows = sqlx::query(
        "SELECT id, library_id, external_id, name, parent_id
         FROM folders
         WHERE library_id = ?
         ORDER BY id",
    )
    .bind(library_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(from_row).collect())
}

/// Get the direct children of a folder
pub async fn get_children(pool: &SqlitePool, parent_id: FolderId) -> Result<Vec<Folder>> {
    let rows = sqlx::query(
        "SELECT id, library_id, external_id, name, parent_id
         FROM folders
         WHERE parent_id = ?
         ORDER BY name",
    )
    .bind(parent_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(from_row).collect())
}

/// Create the folder if absent, otherwise update its name and parent
///
/// Rows are only written when something differs, so re-running with the
/// same input reports `Unchanged`.
pub async fn upsert(pool: &SqlitePool, folder: UpsertFolder) -> Result<Upserted<Folder>> {
    let now = crate::now();

    if let Some(existing) = find_by_external_id(pool, folder.library_id, &folder.external_id).await?
    {
        if existing.name == folder.name && existing.parent_id == folder.parent_id {
            return Ok(Upserted::Unchanged(existing));
        }

        sqlx::query("UPDATE folders SET name = ?, parent_id = ?, updated_at = ? WHERE id = ?")
            .bind(&folder.name)
            .bind(folder.parent_id)
            .bind(now)
            .bind(existing.id)
            .execute(pool)
            .await?;

        return Ok(Upserted::Updated(Folder {
            name: folder.name,
            parent_id: folder.parent_id,
            ..existing
        }));
    }

    let result = sqlx::query(
        "INSERT INTO folders (library_id, external_id, name, parent_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(folder.library_id)
    .bind(&folder.external_id)
    .bind(&folder.name)
    .bind(folder.parent_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Upserted::Created(Folder {
        id: result.last_insert_rowid(),
        library_id: folder.library_id,
        external_id: folder.external_id,
        name: folder.name,
        parent_id: folder.parent_id,
    }))
}

/// Count folders of a library
pub async fn count_by_library(pool: &SqlitePool, library_id: LibraryId) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM folders WHERE library_id = ?")
        .bind(library_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}
