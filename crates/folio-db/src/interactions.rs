use rusqlite::{Connection, OptionalExtension, params};

use crate::blogs::query_blog_by_id;
use crate::error::is_unique_violation;
use crate::models::{CommentRow, LikeRow};
use crate::notifications::{notify_comment, notify_like};
use crate::users::query_user_by_id;
use crate::{CoreError, Database, new_id, now};

#[derive(Debug, Clone, Copy)]
pub struct LikeStatus {
    pub liked: bool,
    pub like_count: i64,
}

impl Database {
    /// Like a blog. Row insert, counter increment, and the notification are
    /// one transaction; the counter moves via an atomic SQL update, never a
    /// read-modify-write in application memory.
    pub fn add_like(&self, blog_id: &str, user_id: &str) -> Result<LikeRow, CoreError> {
        self.with_tx(|tx| {
            let blog = query_blog_by_id(tx, blog_id)?
                .ok_or_else(|| CoreError::not_found("Blog not found"))?;
            let user = query_user_by_id(tx, user_id)?
                .ok_or_else(|| CoreError::not_found("User not found"))?;

            if query_like(tx, blog_id, user_id)?.is_some() {
                return Err(CoreError::conflict("Already liked"));
            }

            let row = LikeRow {
                id: new_id(),
                blog_id: blog_id.to_string(),
                user_id: user_id.to_string(),
                created_at: now(),
            };
            let inserted = tx.execute(
                "INSERT INTO likes (id, blog_id, user_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![row.id, row.blog_id, row.user_id, row.created_at],
            );
            match inserted {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => {
                    return Err(CoreError::conflict("Already liked"));
                }
                Err(e) => return Err(e.into()),
            }

            tx.execute(
                "UPDATE blogs SET like_count = like_count + 1 WHERE id = ?1",
                [blog_id],
            )?;

            notify_like(tx, &blog, &user)?;
            Ok(row)
        })
    }

    pub fn remove_like(&self, blog_id: &str, user_id: &str) -> Result<(), CoreError> {
        self.with_tx(|tx| {
            let like = query_like(tx, blog_id, user_id)?
                .ok_or_else(|| CoreError::not_found("Like not found"))?;

            tx.execute("DELETE FROM likes WHERE id = ?1", [&like.id])?;
            // Clamp at zero against already-corrupt counters.
            tx.execute(
                "UPDATE blogs SET like_count = MAX(like_count - 1, 0) WHERE id = ?1",
                [blog_id],
            )?;
            Ok(())
        })
    }

    pub fn add_comment(
        &self,
        blog_id: &str,
        user_id: &str,
        content: &str,
    ) -> Result<CommentRow, CoreError> {
        if content.trim().is_empty() {
            return Err(CoreError::bad_request("Comment content cannot be empty"));
        }

        self.with_tx(|tx| {
            let blog = query_blog_by_id(tx, blog_id)?
                .ok_or_else(|| CoreError::not_found("Blog not found"))?;
            let user = query_user_by_id(tx, user_id)?
                .ok_or_else(|| CoreError::not_found("User not found"))?;

            let row = CommentRow {
                id: new_id(),
                blog_id: blog_id.to_string(),
                user_id: user_id.to_string(),
                content: content.to_string(),
                created_at: now(),
                updated_at: None,
            };
            tx.execute(
                "INSERT INTO comments (id, blog_id, user_id, content, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![row.id, row.blog_id, row.user_id, row.content, row.created_at],
            )?;
            tx.execute(
                "UPDATE blogs SET comment_count = comment_count + 1 WHERE id = ?1",
                [blog_id],
            )?;

            notify_comment(tx, &blog, &user)?;
            Ok(row)
        })
    }

    pub fn remove_comment(&self, comment_id: &str) -> Result<(), CoreError> {
        self.with_tx(|tx| {
            let comment = query_comment_by_id(tx, comment_id)?
                .ok_or_else(|| CoreError::not_found("Comment not found"))?;

            tx.execute("DELETE FROM comments WHERE id = ?1", [comment_id])?;
            // The parent blog may already be gone (removed by a prior
            // cascade); the decrement then updates zero rows.
            tx.execute(
                "UPDATE blogs SET comment_count = MAX(comment_count - 1, 0) WHERE id = ?1",
                [&comment.blog_id],
            )?;
            Ok(())
        })
    }

    pub fn comment_by_id(&self, comment_id: &str) -> Result<CommentRow, CoreError> {
        self.with_conn(|conn| {
            query_comment_by_id(conn, comment_id)?
                .ok_or_else(|| CoreError::not_found("Comment not found"))
        })
    }

    pub fn comments_by_blog(&self, blog_id: &str) -> Result<Vec<CommentRow>, CoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, blog_id, user_id, content, created_at, updated_at
                 FROM comments WHERE blog_id = ?1 ORDER BY created_at, id",
            )?;
            let rows = stmt
                .query_map([blog_id], comment_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Pure read: whether the user liked the blog, plus the stored counter.
    pub fn like_status(&self, blog_id: &str, user_id: &str) -> Result<LikeStatus, CoreError> {
        self.with_conn(|conn| {
            let blog = query_blog_by_id(conn, blog_id)?
                .ok_or_else(|| CoreError::not_found("Blog not found"))?;
            let liked = query_like(conn, blog_id, user_id)?.is_some();
            Ok(LikeStatus {
                liked,
                like_count: blog.like_count,
            })
        })
    }
}

fn comment_from_row(row: &rusqlite::Row) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        blog_id: row.get(1)?,
        user_id: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn query_comment_by_id(conn: &Connection, id: &str) -> Result<Option<CommentRow>, CoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, blog_id, user_id, content, created_at, updated_at FROM comments WHERE id = ?1",
    )?;
    Ok(stmt.query_row([id], comment_from_row).optional()?)
}

fn query_like(
    conn: &Connection,
    blog_id: &str,
    user_id: &str,
) -> Result<Option<LikeRow>, CoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, blog_id, user_id, created_at FROM likes WHERE blog_id = ?1 AND user_id = ?2",
    )?;
    let row = stmt
        .query_row(params![blog_id, user_id], |row| {
            Ok(LikeRow {
                id: row.get(0)?,
                blog_id: row.get(1)?,
                user_id: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_types::models::BlogStatus;

    use crate::models::{BlogRow, UserRow};

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn user(db: &Database, name: &str) -> UserRow {
        db.register_user(name, "User", name, &format!("{name}@example.com"), "hash")
            .unwrap()
    }

    fn blog(db: &Database, author: &UserRow) -> BlogRow {
        db.create_blog(&author.id, "Title", "content", BlogStatus::Active)
            .unwrap()
    }

    fn stored_like_count(db: &Database, blog_id: &str) -> i64 {
        db.blog_by_id(blog_id).unwrap().like_count
    }

    fn actual_like_rows(db: &Database, blog_id: &str) -> i64 {
        db.with_conn(|conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM likes WHERE blog_id = ?1",
                [blog_id],
                |r| r.get(0),
            )?;
            Ok(n)
        })
        .unwrap()
    }

    #[test]
    fn like_count_matches_rows_through_any_sequence() {
        let db = db();
        let owner = user(&db, "owner");
        let fans: Vec<UserRow> = (0..3).map(|i| user(&db, &format!("fan{i}"))).collect();
        let blog = blog(&db, &owner);

        for fan in &fans {
            db.add_like(&blog.id, &fan.id).unwrap();
        }
        assert_eq!(stored_like_count(&db, &blog.id), 3);
        assert_eq!(actual_like_rows(&db, &blog.id), 3);

        db.remove_like(&blog.id, &fans[0].id).unwrap();
        db.remove_like(&blog.id, &fans[1].id).unwrap();
        assert_eq!(stored_like_count(&db, &blog.id), 1);
        assert_eq!(actual_like_rows(&db, &blog.id), 1);

        db.add_like(&blog.id, &fans[0].id).unwrap();
        assert_eq!(stored_like_count(&db, &blog.id), 2);
        assert_eq!(actual_like_rows(&db, &blog.id), 2);
    }

    #[test]
    fn double_like_conflicts_and_counts_once() {
        let db = db();
        let owner = user(&db, "owner");
        let fan = user(&db, "fan");
        let blog = blog(&db, &owner);

        db.add_like(&blog.id, &fan.id).unwrap();
        let again = db.add_like(&blog.id, &fan.id);
        assert!(matches!(again, Err(CoreError::Conflict(_))));
        assert_eq!(stored_like_count(&db, &blog.id), 1);
    }

    #[test]
    fn remove_like_without_like_is_not_found() {
        let db = db();
        let owner = user(&db, "owner");
        let fan = user(&db, "fan");
        let blog = blog(&db, &owner);

        let result = db.remove_like(&blog.id, &fan.id);
        assert!(matches!(result, Err(CoreError::NotFound(_))));
        assert_eq!(stored_like_count(&db, &blog.id), 0);
    }

    #[test]
    fn decrement_clamps_corrupt_counter_at_zero() {
        let db = db();
        let owner = user(&db, "owner");
        let fan = user(&db, "fan");
        let blog = blog(&db, &owner);

        db.add_like(&blog.id, &fan.id).unwrap();
        // Corrupt the counter below the row count.
        db.with_conn_mut(|conn| {
            conn.execute("UPDATE blogs SET like_count = 0 WHERE id = ?1", [&blog.id])?;
            Ok(())
        })
        .unwrap();

        db.remove_like(&blog.id, &fan.id).unwrap();
        assert_eq!(stored_like_count(&db, &blog.id), 0);
    }

    #[test]
    fn comment_count_follows_add_and_remove() {
        let db = db();
        let owner = user(&db, "owner");
        let fan = user(&db, "fan");
        let blog = blog(&db, &owner);

        let c1 = db.add_comment(&blog.id, &fan.id, "one").unwrap();
        db.add_comment(&blog.id, &fan.id, "two").unwrap();
        assert_eq!(db.blog_by_id(&blog.id).unwrap().comment_count, 2);

        db.remove_comment(&c1.id).unwrap();
        assert_eq!(db.blog_by_id(&blog.id).unwrap().comment_count, 1);

        let gone = db.remove_comment(&c1.id);
        assert!(matches!(gone, Err(CoreError::NotFound(_))));
    }

    #[test]
    fn blank_comment_is_rejected() {
        let db = db();
        let owner = user(&db, "owner");
        let blog = blog(&db, &owner);

        let result = db.add_comment(&blog.id, &owner.id, "   ");
        assert!(matches!(result, Err(CoreError::BadRequest(_))));
    }

    #[test]
    fn like_status_reads_without_side_effects() {
        let db = db();
        let owner = user(&db, "owner");
        let fan = user(&db, "fan");
        let blog = blog(&db, &owner);

        let before = db.like_status(&blog.id, &fan.id).unwrap();
        assert!(!before.liked);
        assert_eq!(before.like_count, 0);

        db.add_like(&blog.id, &fan.id).unwrap();
        let after = db.like_status(&blog.id, &fan.id).unwrap();
        assert!(after.liked);
        assert_eq!(after.like_count, 1);
        // a different viewer sees the same counter, not their own flag
        let other = db.like_status(&blog.id, &owner.id).unwrap();
        assert!(!other.liked);
        assert_eq!(other.like_count, 1);
    }

    #[test]
    fn like_on_missing_blog_or_user_is_not_found() {
        let db = db();
        let owner = user(&db, "owner");
        let blog = blog(&db, &owner);

        assert!(matches!(
            db.add_like("no-such-blog", &owner.id),
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            db.add_like(&blog.id, "no-such-user"),
            Err(CoreError::NotFound(_))
        ));
    }
}
