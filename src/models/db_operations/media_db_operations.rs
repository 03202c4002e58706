use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{expect_changed, DbResult};
use crate::models::{MediaFile, MediaType, NewMediaFile, Pagination};

const MEDIA_COLUMNS: &str = "id, filename, original_name, mime_type, size, url, thumbnail_url, alt, \
     description, media_type, created_at, updated_at";

fn row_to_media(row: &Row) -> rusqlite::Result<MediaFile> {
    let media_type: String = row.get(9)?;
    Ok(MediaFile {
        id: row.get(0)?,
        filename: row.get(1)?,
        original_name: row.get(2)?,
        mime_type: row.get(3)?,
        size: row.get(4)?,
        url: row.get(5)?,
        thumbnail_url: row.get(6)?,
        alt: row.get(7)?,
        description: row.get(8)?,
        media_type: MediaType::parse(&media_type),
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

pub fn list_media(conn: &Connection, pagination: Pagination) -> DbResult<(Vec<MediaFile>, i64)> {
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM media_files", [], |row| row.get(0))?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM media_files ORDER BY created_at DESC LIMIT ?1 OFFSET ?2",
        MEDIA_COLUMNS
    ))?;
    let media = stmt
        .query_map(params![pagination.limit, pagination.offset()], row_to_media)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok((media, total))
}

pub fn list_images(conn: &Connection) -> DbResult<Vec<MediaFile>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM media_files WHERE media_type = 'image' ORDER BY created_at DESC",
        MEDIA_COLUMNS
    ))?;
    let media = stmt
        .query_map([], row_to_media)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(media)
}

pub fn read_media(conn: &Connection, id: &str) -> DbResult<Option<MediaFile>> {
    let media = conn
        .query_row(
            &format!("SELECT {} FROM media_files WHERE id = ?1", MEDIA_COLUMNS),
            [id],
            row_to_media,
        )
        .optional()?;
    Ok(media)
}

pub fn insert_media(conn: &Connection, new: &NewMediaFile) -> DbResult<MediaFile> {
    let now = Utc::now();
    let media = MediaFile {
        id: Uuid::new_v4().to_string(),
        filename: new.filename.clone(),
        original_name: new.original_name.clone(),
        mime_type: new.mime_type.clone(),
        size: new.size,
        url: new.url.clone(),
        thumbnail_url: new.thumbnail_url.clone(),
        alt: new.alt.clone(),
        description: new.description.clone(),
        media_type: new.media_type,
        created_at: now,
        updated_at: now,
    };
    conn.execute(
        &format!(
            "INSERT INTO media_files ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            MEDIA_COLUMNS
        ),
        params![
            media.id,
            media.filename,
            media.original_name,
            media.mime_type,
            media.size,
            media.url,
            media.thumbnail_url,
            media.alt,
            media.description,
            media.media_type.as_str(),
            media.created_at,
            media.updated_at,
        ],
    )?;
    Ok(media)
}

/// Updates the editable metadata. `None` leaves a column untouched.
pub fn update_media_metadata(
    conn: &Connection,
    id: &str,
    original_name: Option<&str>,
    alt: Option<&str>,
    description: Option<&str>,
) -> DbResult<()> {
    let changed = conn.execute(
        "UPDATE media_files SET
            original_name = COALESCE(?2, original_name),
            alt = COALESCE(?3, alt),
            description = COALESCE(?4, description),
            updated_at = ?5
         WHERE id = ?1",
        params![id, original_name, alt, description, Utc::now()],
    )?;
    expect_changed(changed, "Media file")
}

pub fn set_thumbnail_url(conn: &Connection, id: &str, thumbnail_url: &str) -> DbResult<()> {
    let changed = conn.execute(
        "UPDATE media_files SET thumbnail_url = ?1, updated_at = ?2 WHERE id = ?3",
        params![thumbnail_url, Utc::now(), id],
    )?;
    expect_changed(changed, "Media file")
}

pub fn delete_media(conn: &Connection, id: &str) -> DbResult<()> {
    let changed = conn.execute("DELETE FROM media_files WHERE id = ?1", [id])?;
    expect_changed(changed, "Media file")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::db_setup;

    fn sample(name: &str, mime: &str) -> NewMediaFile {
        NewMediaFile {
            filename: format!("{}-1.webp", name),
            original_name: format!("{}.png", name),
            mime_type: mime.to_string(),
            size: 42,
            url: format!("/uploads/{}-1.webp", name),
            thumbnail_url: None,
            alt: None,
            description: None,
            media_type: MediaType::from_mime(mime),
        }
    }

    #[test]
    fn insert_update_and_list_images() {
        let mut conn = Connection::open_in_memory().unwrap();
        db_setup::setup_database(&mut conn).unwrap();

        let image = insert_media(&conn, &sample("cat", "image/webp")).unwrap();
        insert_media(&conn, &sample("doc", "application/pdf")).unwrap();

        update_media_metadata(&conn, &image.id, None, Some("A cat"), None).unwrap();
        let stored = read_media(&conn, &image.id).unwrap().unwrap();
        assert_eq!(stored.alt.as_deref(), Some("A cat"));
        assert_eq!(stored.original_name, "cat.png");

        let images = list_images(&conn).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].media_type, MediaType::Image);

        let (_, total) = list_media(&conn, Pagination::from_query(None, None)).unwrap();
        assert_eq!(total, 2);
    }
}
