//! Ordered multi-table deletion. Implicit schema-level cascades hide ordering
//! and partial-failure behavior, so every dependency sweep here is an explicit
//! sequence of DELETEs, run inside one caller-owned transaction.
//!
//! File removal is not part of these functions: they return the stored media
//! URLs and the caller deletes the backing files best-effort after commit.

use rusqlite::Connection;

use crate::CoreError;
use crate::media::delete_media_rows_by_blog;

/// Remove every row depending on a blog, then the blog row itself.
/// Order: reports → likes → comments → notifications → media → blog.
pub fn delete_blog_rows(conn: &Connection, blog_id: &str) -> Result<Vec<String>, CoreError> {
    conn.execute("DELETE FROM reports WHERE blog_id = ?1", [blog_id])?;
    conn.execute("DELETE FROM likes WHERE blog_id = ?1", [blog_id])?;
    conn.execute("DELETE FROM comments WHERE blog_id = ?1", [blog_id])?;
    conn.execute("DELETE FROM notifications WHERE blog_id = ?1", [blog_id])?;
    let media_urls = delete_media_rows_by_blog(conn, blog_id)?;
    conn.execute("DELETE FROM blogs WHERE id = ?1", [blog_id])?;
    Ok(media_urls)
}

/// Remove a user and everything the user participates in: every owned blog
/// (full per-blog cascade), then the user's likes/comments on surviving blogs
/// (compensating those blogs' counters), follow edges in either direction,
/// notifications in either role, reports filed or received, and the user row.
pub fn delete_user_rows(conn: &Connection, user_id: &str) -> Result<Vec<String>, CoreError> {
    let owned: Vec<String> = {
        let mut stmt = conn.prepare("SELECT id FROM blogs WHERE user_id = ?1")?;
        stmt.query_map([user_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?
    };

    let mut media_urls = Vec::new();
    for blog_id in &owned {
        media_urls.extend(delete_blog_rows(conn, blog_id)?);
    }

    // Likes and comments on other users' blogs are about to disappear;
    // keep those blogs' counters equal to their remaining rows.
    conn.execute(
        "UPDATE blogs SET like_count = MAX(like_count - 1, 0)
         WHERE id IN (SELECT blog_id FROM likes WHERE user_id = ?1)",
        [user_id],
    )?;
    conn.execute(
        "UPDATE blogs
         SET comment_count = MAX(comment_count - (
             SELECT COUNT(*) FROM comments
             WHERE comments.blog_id = blogs.id AND comments.user_id = ?1
         ), 0)
         WHERE id IN (SELECT blog_id FROM comments WHERE user_id = ?1)",
        [user_id],
    )?;

    conn.execute("DELETE FROM likes WHERE user_id = ?1", [user_id])?;
    conn.execute("DELETE FROM comments WHERE user_id = ?1", [user_id])?;
    conn.execute(
        "DELETE FROM follows WHERE follower_id = ?1 OR followee_id = ?1",
        [user_id],
    )?;
    conn.execute(
        "DELETE FROM notifications WHERE recipient_id = ?1 OR actor_id = ?1",
        [user_id],
    )?;
    conn.execute(
        "DELETE FROM reports WHERE reporter_id = ?1 OR reported_user_id = ?1",
        [user_id],
    )?;
    conn.execute("DELETE FROM users WHERE id = ?1", [user_id])?;

    Ok(media_urls)
}
