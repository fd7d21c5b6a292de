//! Tag storage
//!
//! Tags are unique by name within a library. Creation is race-free: the
//! insert ignores an existing row and the id is read back afterwards, so two
//! assets introducing the same new tag concurrently end up sharing one row.

use crate::error::{Result, StorageError};
use rao_core::types::{ImageId, LibraryId, Tag, TagId, Upserted};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

fn from_row(row: &SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        library_id: row.get("library_id"),
        name: row.get("name"),
    }
}

/// Find a tag by name
pub async fn find_by_name(
    pool: &SqlitePool,
    library_id: LibraryId,
    name: &str,
) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, library_id, name FROM tags WHERE library_id = ? AND name = ?")
        .bind(library_id)
        .bind(name)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(from_row))
}

/// Get all tags of a library
pub async fn get_by_library(pool: &SqlitePool, library_id: LibraryId) -> Result<Vec<Tag>> {
    let rows = sqlx::query("SELECT id, library_id, name FROM tags WHERE library_id = ? ORDER BY name")
        .bind(library_id)
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(from_row).collect())
}

/// Create a tag if it does not exist yet
pub async fn upsert(pool: &SqlitePool, library_id: LibraryId, name: &str) -> Result<Upserted<Tag>> {
    let mut conn = pool.acquire().await?;
    upsert_with(&mut conn, library_id, name).await
}

/// Same as [`upsert`], on a connection or open transaction
pub async fn upsert_with(
    conn: &mut SqliteConnection,
    library_id: LibraryId,
    name: &str,
) -> Result<Upserted<Tag>> {
    let result = sqlx::query(
        "INSERT INTO tags (library_id, name) VALUES (?, ?)
         ON CONFLICT(library_id, name) DO NOTHING",
    )
    .bind(library_id)
    .bind(name)
    .execute(&mut *conn)
    .await?;

    let row = sqlx::query("SELECT id, library_id, name FROM tags WHERE library_id = ? AND name = ?")
        .bind(library_id)
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| StorageError::not_found("Tag", name))?;

    let tag = from_row(&row);
    if result.rows_affected() > 0 {
        Ok(Upserted::Created(tag))
    } else {
        Ok(Upserted::Unchanged(tag))
    }
}

/// Get the names of an image's tags, sorted
pub async fn get_names_by_image(conn: &mut SqliteConnection, image_id: ImageId) -> Result<Vec<String>> {
    let mut names: Vec<String> = sqlx::query_scalar(
        "SELECT t.name
         FROM tags t
         INNER JOIN image_tags it ON t.id = it.tag_id
         WHERE it.image_id = ?",
    )
    .bind(image_id)
    .fetch_all(&mut *conn)
    .await?;

    names.sort();
    Ok(names)
}

/// Replace an image's tag links with `names`, creating missing tags
pub async fn replace_image_tags(
    conn: &mut SqliteConnection,
    library_id: LibraryId,
    image_id: ImageId,
    names: &[String],
) -> Result<Vec<TagId>> {
    sqlx::query("DELETE FROM image_tags WHERE image_id = ?")
        .bind(image_id)
        .execute(&mut *conn)
        .await?;

    let mut tag_ids = Vec::with_capacity(names.len());
    for name in names {
        let tag = upsert_with(conn, library_id, name).await?.into_inner();

        sqlx::query("INSERT OR IGNORE INTO image_tags (image_id, tag_id) VALUES (?, ?)")
            .bind(image_id)
            .bind(tag.id)
            .execute(&mut *conn)
            .await?;

        tag_ids.push(tag.id);
    }

    Ok(tag_ids)
}

/// Count images linked to a tag
pub async fn count_images(pool: &SqlitePool, tag_id: TagId) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM image_tags WHERE tag_id = ?")
        .bind(tag_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}
