//! Sync run history

use crate::error::{Result, StorageError};
use rao_core::types::{LibraryId, RunCounts, SyncRun, SyncRunId, SyncRunStatus};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

const COLUMNS: &str = "id, library_id, started_at, completed_at, status, \
                       created, updated, deleted, unchanged, skipped, error_message";

fn from_row(row: &SqliteRow) -> Result<SyncRun> {
    let status: String = row.get("status");

    Ok(SyncRun {
        id: row.get("id"),
        library_id: row.get("library_id"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        status: SyncRunStatus::from_str(&status)
            .ok_or_else(|| StorageError::InvalidValue(format!("unknown run status '{}'", status)))?,
        counts: RunCounts {
            created: row.get("created"),
            updated: row.get("updated"),
            deleted: row.get("deleted"),
            unchanged: row.get("unchanged"),
            skipped: row.get("skipped"),
        },
        error_message: row.get("error_message"),
    })
}

/// Record the start of a run
pub async fn start(pool: &SqlitePool, library_id: LibraryId) -> Result<SyncRunId> {
    let result = sqlx::query("INSERT INTO sync_runs (library_id, started_at, status) VALUES (?, ?, ?)")
        .bind(library_id)
        .bind(crate::now())
        .bind(SyncRunStatus::Running.as_str())
        .execute(pool)
        .await?;

    Ok(result.last_insert_rowid())
}

/// Record the end of a run
pub async fn finish(
    pool: &SqlitePool,
    id: SyncRunId,
    status: SyncRunStatus,
    counts: RunCounts,
    error_message: Option<&str>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE sync_runs SET
            completed_at = ?, status = ?,
            created = ?, updated = ?, deleted = ?, unchanged = ?, skipped = ?,
            error_message = ?
        WHERE id = ?
        "#,
    )
    .bind(crate::now())
    .bind(status.as_str())
    .bind(counts.created)
    .bind(counts.updated)
    .bind(counts.deleted)
    .bind(counts.unchanged)
    .bind(counts.skipped)
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StorageError::not_found("SyncRun", id));
    }

    Ok(())
}

/// Get a run by ID
pub async fn get_by_id(pool: &SqlitePool, id: SyncRunId) -> Result<Option<SyncRun>> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM sync_runs WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(from_row).transpose()
}

/// Get the most recent run of a library
pub async fn get_latest(pool: &SqlitePool, library_id: LibraryId) -> Result<Option<SyncRun>> {
    let row = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM sync_runs WHERE library_id = ? ORDER BY id DESC LIMIT 1"
    ))
    .bind(library_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(from_row).transpose()
}

/// Get every run of a library, newest first
pub async fn get_by_library(pool: &SqlitePool, library_id: LibraryId) -> Result<Vec<SyncRun>> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM sync_runs WHERE library_id = ? ORDER BY id DESC"
    ))
    .bind(library_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(from_row).collect()
}
