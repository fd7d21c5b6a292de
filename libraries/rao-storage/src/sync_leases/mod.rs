//! Per-library sync run leases
//!
//! At most one sync run holds a library at a time. A lease carries an expiry
//! so a run that crashed without releasing it stops blocking the library once
//! the TTL elapses. Acquisition is a single statement, two concurrent
//! acquirers can never both observe success.

use crate::error::Result;
use rao_core::types::LibraryId;
use sqlx::{Row, SqlitePool};

/// A lease row as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncLease {
    pub library_id: LibraryId,
    pub holder: String,
    /// Unix epoch seconds
    pub acquired_at: i64,
    /// Unix epoch seconds
    pub expires_at: i64,
}

/// Try to take the lease of a library
///
/// Succeeds when no lease exists or the existing one has expired. Returns
/// `false` while another holder owns an unexpired lease.
pub async fn acquire(
    pool: &SqlitePool,
    library_id: LibraryId,
    holder: &str,
    ttl_secs: i64,
) -> Result<bool> {
    acquire_at(pool, library_id, holder, ttl_secs, crate::now()).await
}

/// [`acquire`] with an explicit clock, used to exercise expiry
pub async fn acquire_at(
    pool: &SqlitePool,
    library_id: LibraryId,
    holder: &str,
    ttl_secs: i64,
    now: i64,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO sync_leases (library_id, holder, acquired_at, expires_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(library_id) DO UPDATE SET
            holder = excluded.holder,
            acquired_at = excluded.acquired_at,
            expires_at = excluded.expires_at
        WHERE sync_leases.expires_at <= excluded.acquired_at
        "#,
    )
    .bind(library_id)
    .bind(holder)
    .bind(now)
    .bind(now + ttl_secs)
    .execute(pool)
    .await?;

    let acquired = result.rows_affected() > 0;
    if !acquired {
        tracing::debug!(library_id, holder, "Sync lease held elsewhere");
    }

    Ok(acquired)
}

/// Push the expiry of a lease this holder owns
///
/// Returns `false` when the lease is no longer ours (expired and taken over).
pub async fn renew(
    pool: &SqlitePool,
    library_id: LibraryId,
    holder: &str,
    ttl_secs: i64,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE sync_leases SET expires_at = ? WHERE library_id = ? AND holder = ?",
    )
    .bind(crate::now() + ttl_secs)
    .bind(library_id)
    .bind(holder)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Release a lease this holder owns; leases of other holders are left alone
pub async fn release(pool: &SqlitePool, library_id: LibraryId, holder: &str) -> Result<()> {
    sqlx::query("DELETE FROM sync_leases WHERE library_id = ? AND holder = ?")
        .bind(library_id)
        .bind(holder)
        .execute(pool)
        .await?;

    Ok(())
}

/// Get the current lease of a library, expired or not
pub async fn get(pool: &SqlitePool, library_id: LibraryId) -> Result<Option<SyncLease>> {
    let row = sqlx::query(
        "SELECT library_id, holder, acquired_at, expires_at FROM sync_leases WHERE library_id = ?",
    )
    .bind(library_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| SyncLease {
        library_id: row.get("library_id"),
        holder: row.get("holder"),
        acquired_at: row.get("acquired_at"),
        expires_at: row.get("expires_at"),
    }))
}
