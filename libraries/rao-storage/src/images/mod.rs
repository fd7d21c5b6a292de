//! Image storage
//!
//! An image row owns three relation tables (`image_folders`, `image_tags`,
//! `colors`). Create and update write the row and every relation inside a
//! single transaction, so readers never observe an image whose colors were
//! replaced but whose scalar fields were not. Deleting the row cascades to
//! the relations through foreign keys, never to the folders or tags.

use crate::error::{Result, StorageError};
use crate::tags;
use rao_core::types::{FolderId, Image, ImageData, ImageId, LibraryId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

const COLUMNS: &str = "id, library_id, external_id, path, thumbnail_path, name, size, \
                       created_time, modified_time, ext, width, height, duration";

/// Build an image from its row plus the relation tables
async fn load(conn: &mut SqliteConnection, row: &SqliteRow) -> Result<Image> {
    let id: ImageId = row.get("id");

    let folder_ids: Vec<FolderId> = sqlx::query_scalar(
        "SELECT folder_id FROM image_folders WHERE image_id = ? ORDER BY folder_id",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let tags = tags::get_names_by_image(conn, id).await?;

    let colors: Vec<String> =
        sqlx::query_scalar("SELECT hex FROM colors WHERE image_id = ? ORDER BY position")
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;

    Ok(Image {
        id,
        library_id: row.get("library_id"),
        external_id: row.get("external_id"),
        path: row.get("path"),
        thumbnail_path: row.get("thumbnail_path"),
        name: row.get("name"),
        size: row.get("size"),
        created_time: row.get("created_time"),
        modified_time: row.get("modified_time"),
        ext: row.get("ext"),
        width: row.get("width"),
        height: row.get("height"),
        duration: row.get("duration"),
        folder_ids,
        tags,
        colors,
    })
}

async fn get_by_id_with(conn: &mut SqliteConnection, id: ImageId) -> Result<Option<Image>> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM images WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => Ok(Some(load(conn, &row).await?)),
        None => Ok(None),
    }
}

/// Get an image by ID
pub async fn get_by_id(pool: &SqlitePool, id: ImageId) -> Result<Option<Image>> {
    let mut conn = pool.acquire().await?;
    get_by_id_with(&mut conn, id).await
}

/// Find an image by its library-relative path
pub async fn find_by_path(
    pool: &SqlitePool,
    library_id: LibraryId,
    path: &str,
) -> Result<Option<Image>> {
    let mut conn = pool.acquire().await?;

    let row = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM images WHERE library_id = ? AND path = ?"
    ))
    .bind(library_id)
    .bind(path)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => Ok(Some(load(&mut conn, &row).await?)),
        None => Ok(None),
    }
}

/// Get `(id, path)` of every image in a library
pub async fn get_paths(pool: &SqlitePool, library_id: LibraryId) -> Result<Vec<(ImageId, String)>> {
    let rows = sqlx::query("SELECT id, path FROM images WHERE library_id = ? ORDER BY id")
        .bind(library_id)
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| (row.get("id"), row.get("path")))
        .collect())
}

/// Count images of a library
pub async fn count_by_library(pool: &SqlitePool, library_id: LibraryId) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM images WHERE library_id = ?")
        .bind(library_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Count color rows of an image
pub async fn count_colors(pool: &SqlitePool, image_id: ImageId) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM colors WHERE image_id = ?")
        .bind(image_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

async fn replace_folders(
    conn: &mut SqliteConnection,
    image_id: ImageId,
    folder_ids: &[FolderId],
) -> Result<()> {
    sqlx::query("DELETE FROM image_folders WHERE image_id = ?")
        .bind(image_id)
        .execute(&mut *conn)
        .await?;

    for folder_id in folder_ids {
        sqlx::query("INSERT INTO image_folders (image_id, folder_id) VALUES (?, ?)")
            .bind(image_id)
            .bind(folder_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

async fn replace_colors(conn: &mut SqliteConnection, image_id: ImageId, colors: &[String]) -> Result<()> {
    sqlx::query("DELETE FROM colors WHERE image_id = ?")
        .bind(image_id)
        .execute(&mut *conn)
        .await?;

    for (position, hex) in colors.iter().enumerate() {
        sqlx::query("INSERT INTO colors (image_id, position, hex) VALUES (?, ?, ?)")
            .bind(image_id)
            .bind(position as i64)
            .bind(hex)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Create an image with its folder links, tag links and colors
pub async fn create(pool: &SqlitePool, image: ImageData) -> Result<Image> {
    let image = image.normalized();
    let now = crate::now();

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO images (
            library_id, external_id, path, thumbnail_path, name, size,
            created_time, modified_time, ext, width, height, duration,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(image.library_id)
    .bind(&image.external_id)
    .bind(&image.path)
    .bind(&image.thumbnail_path)
    .bind(&image.name)
    .bind(image.size)
    .bind(image.created_time)
    .bind(image.modified_time)
    .bind(&image.ext)
    .bind(image.width)
    .bind(image.height)
    .bind(image.duration)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let id = result.last_insert_rowid();

    replace_folders(&mut tx, id, &image.folder_ids).await?;
    tags::replace_image_tags(&mut tx, image.library_id, id, &image.tags).await?;
    replace_colors(&mut tx, id, &image.colors).await?;

    let created = get_by_id_with(&mut tx, id)
        .await?
        .ok_or_else(|| StorageError::not_found("Image", id))?;

    tx.commit().await?;
    Ok(created)
}

/// Replace every field and relation of an existing image
///
/// Scalar fields are written first, then tag links are rebuilt from
/// `image.tags` (re-creating any tag row that disappeared), the color set is
/// replaced and folder links follow. All of it commits together.
pub async fn update(pool: &SqlitePool, id: ImageId, image: ImageData) -> Result<Image> {
    let image = image.normalized();
    let now = crate::now();

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        UPDATE images SET
            external_id = ?, path = ?, thumbnail_path = ?, name = ?, size = ?,
            created_time = ?, modified_time = ?, ext = ?, width = ?, height = ?,
            duration = ?, updated_at = ?
        WHERE id = ? AND library_id = ?
        "#,
    )
    .bind(&image.external_id)
    .bind(&image.path)
    .bind(&image.thumbnail_path)
    .bind(&image.name)
    .bind(image.size)
    .bind(image.created_time)
    .bind(image.modified_time)
    .bind(&image.ext)
    .bind(image.width)
    .bind(image.height)
    .bind(image.duration)
    .bind(now)
    .bind(id)
    .bind(image.library_id)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StorageError::not_found("Image", id));
    }

    tags::replace_image_tags(&mut tx, image.library_id, id, &image.tags).await?;
    replace_colors(&mut tx, id, &image.colors).await?;
    replace_folders(&mut tx, id, &image.folder_ids).await?;

    let updated = get_by_id_with(&mut tx, id)
        .await?
        .ok_or_else(|| StorageError::not_found("Image", id))?;

    tx.commit().await?;
    Ok(updated)
}

/// Delete an image; colors and links go with it
pub async fn delete(pool: &SqlitePool, id: ImageId) -> Result<bool> {
    let result = sqlx::query("DELETE FROM images WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
