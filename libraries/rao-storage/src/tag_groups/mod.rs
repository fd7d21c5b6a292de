//! Tag group storage
//!
//! Groups are keyed by `(library_id, name)` and own an ordered membership
//! list in `tag_group_tags`.

use crate::error::Result;
use rao_core::types::{LibraryId, Tag, TagGroup, TagGroupId, TagId, UpsertTagGroup, Upserted};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

fn from_row(row: &SqliteRow) -> TagGroup {
    TagGroup {
        id: row.get("id"),
        library_id: row.get("library_id"),
        name: row.get("name"),
        color: row.get("color"),
    }
}

/// Find a group by name
pub async fn find_by_name(
    pool: &SqlitePool,
    library_id: LibraryId,
    name: &str,
) -> Result<Option<TagGroup>> {
    let row = sqlx::query(
        "SELECT id, library_id, name, color FROM tag_groups WHERE library_id = ? AND name = ?",
    )
    .bind(library_id)
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(from_row))
}

/// Get all groups of a library
pub async fn get_by_library(pool: &SqlitePool, library_id: LibraryId) -> Result<Vec<TagGroup>> {
    let rows = sqlx::query(
        "SELECT id, library_id, name, color FROM tag_groups WHERE library_id = ? ORDER BY name",
    )
    .bind(library_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(from_row).collect())
}

/// Create the group if absent, otherwise update its color
pub async fn upsert(pool: &SqlitePool, group: UpsertTagGroup) -> Result<Upserted<TagGroup>> {
    let now = crate::now();

    if let Some(existing) = find_by_name(pool, group.library_id, &group.name).await? {
        if existing.color == group.color {
            return Ok(Upserted::Unchanged(existing));
        }

        sqlx::query("UPDATE tag_groups SET color = ?, updated_at = ? WHERE id = ?")
            .bind(&group.color)
            .bind(now)
            .bind(existing.id)
            .execute(pool)
            .await?;

        return Ok(Upserted::Updated(TagGroup {
            color: group.color,
            ..existing
        }));
    }

    let result = sqlx::query(
        "INSERT INTO tag_groups (library_id, name, color, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(group.library_id)
    .bind(&group.name)
    .bind(&group.color)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Upserted::Created(TagGroup {
        id: result.last_insert_rowid(),
        library_id: group.library_id,
        name: group.name,
        color: group.color,
    }))
}

/// Get the ordered member tags of a group
pub async fn get_members(pool: &SqlitePool, group_id: TagGroupId) -> Result<Vec<Tag>> {
    let rows = sqlx::query(
        "SELECT t.id, t.library_id, t.name
         FROM tags t
         INNER JOIN tag_group_tags gt ON t.id = gt.tag_id
         WHERE gt.tag_group_id = ?
         ORDER BY gt.position",
    )
    .bind(group_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| Tag {
            id: row.get("id"),
            library_id: row.get("library_id"),
            name: row.get("name"),
        })
        .collect())
}

/// Make `tag_ids` the exact ordered membership of a group
///
/// Duplicate ids keep their first position. Returns `true` when the stored
/// membership changed.
pub async fn set_members(pool: &SqlitePool, group_id: TagGroupId, tag_ids: &[TagId]) -> Result<bool> {
    let mut wanted: Vec<TagId> = Vec::with_capacity(tag_ids.len());
    for id in tag_ids {
        if !wanted.contains(id) {
            wanted.push(*id);
        }
    }

    let current: Vec<TagId> = sqlx::query_scalar(
        "SELECT tag_id FROM tag_group_tags WHERE tag_group_id = ? ORDER BY position",
    )
    .bind(group_id)
    .fetch_all(pool)
    .await?;

    if current == wanted {
        return Ok(false);
    }

    // Write first so the transaction takes the write lock up front
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM tag_group_tags WHERE tag_group_id = ?")
        .bind(group_id)
        .execute(&mut *tx)
        .await?;

    for (position, tag_id) in wanted.iter().enumerate() {
        sqlx::query("INSERT INTO tag_group_tags (tag_group_id, tag_id, position) VALUES (?, ?, ?)")
            .bind(group_id)
            .bind(tag_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(true)
}
