use rusqlite::{Connection, OptionalExtension, params};

use crate::models::MediaRow;
use crate::{CoreError, Database, new_id, now};

impl Database {
    pub fn media_by_blog(&self, blog_id: &str) -> Result<Vec<MediaRow>, CoreError> {
        self.with_conn(|conn| query_media_by_blog(conn, blog_id))
    }

    pub fn first_media_by_blog(&self, blog_id: &str) -> Result<MediaRow, CoreError> {
        self.with_conn(|conn| {
            query_media_by_blog(conn, blog_id)?
                .into_iter()
                .next()
                .ok_or_else(|| CoreError::not_found("Media not found"))
        })
    }

    pub fn media_by_id(&self, media_id: &str) -> Result<MediaRow, CoreError> {
        self.with_conn(|conn| {
            query_media_by_id(conn, media_id)?
                .ok_or_else(|| CoreError::not_found("Media not found"))
        })
    }
}

fn media_from_row(row: &rusqlite::Row) -> rusqlite::Result<MediaRow> {
    Ok(MediaRow {
        id: row.get(0)?,
        blog_id: row.get(1)?,
        url: row.get(2)?,
        media_type: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Insertion order is list order: media listings follow created_at.
pub fn query_media_by_blog(conn: &Connection, blog_id: &str) -> Result<Vec<MediaRow>, CoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, blog_id, url, media_type, created_at
         FROM media WHERE blog_id = ?1 ORDER BY created_at, id",
    )?;
    let rows = stmt
        .query_map([blog_id], media_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn query_media_by_id(conn: &Connection, id: &str) -> Result<Option<MediaRow>, CoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, blog_id, url, media_type, created_at FROM media WHERE id = ?1",
    )?;
    Ok(stmt.query_row([id], media_from_row).optional()?)
}

pub fn insert_media(
    conn: &Connection,
    blog_id: &str,
    url: &str,
    media_type: &str,
) -> Result<MediaRow, CoreError> {
    let row = MediaRow {
        id: new_id(),
        blog_id: blog_id.to_string(),
        url: url.to_string(),
        media_type: media_type.to_string(),
        created_at: now(),
    };
    conn.execute(
        "INSERT INTO media (id, blog_id, url, media_type, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![row.id, row.blog_id, row.url, row.media_type, row.created_at],
    )?;
    Ok(row)
}

pub fn delete_media_row(conn: &Connection, media_id: &str) -> Result<(), CoreError> {
    conn.execute("DELETE FROM media WHERE id = ?1", [media_id])?;
    Ok(())
}

/// Delete all media rows for a blog; returns the stored URLs so the caller
/// can remove the backing files after commit.
pub fn delete_media_rows_by_blog(
    conn: &Connection,
    blog_id: &str,
) -> Result<Vec<String>, CoreError> {
    let urls: Vec<String> = query_media_by_blog(conn, blog_id)?
        .into_iter()
        .map(|m| m.url)
        .collect();
    conn.execute("DELETE FROM media WHERE blog_id = ?1", [blog_id])?;
    Ok(urls)
}
