use rusqlite::{Connection, OptionalExtension, params};

use folio_types::models::BlogStatus;

use crate::models::BlogRow;
use crate::users::query_user_by_id;
use crate::{CoreError, Database, new_id, now};

const MAX_CONTENT_LENGTH: usize = 1000;
const MAX_PER_PAGE: u32 = 100;

impl Database {
    pub fn create_blog(
        &self,
        user_id: &str,
        title: &str,
        content: &str,
        status: BlogStatus,
    ) -> Result<BlogRow, CoreError> {
        validate_title_and_content(title, content)?;

        self.with_tx(|tx| {
            query_user_by_id(tx, user_id)?
                .ok_or_else(|| CoreError::not_found("User not found"))?;

            let row = BlogRow {
                id: new_id(),
                user_id: user_id.to_string(),
                title: title.to_string(),
                content: content.to_string(),
                status: status.as_str().to_string(),
                like_count: 0,
                comment_count: 0,
                created_at: now(),
                updated_at: None,
            };
            tx.execute(
                "INSERT INTO blogs (id, user_id, title, content, status, like_count, comment_count, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, ?6)",
                params![row.id, row.user_id, row.title, row.content, row.status, row.created_at],
            )?;
            Ok(row)
        })
    }

    pub fn update_blog(
        &self,
        blog_id: &str,
        title: Option<&str>,
        content: Option<&str>,
        status: Option<BlogStatus>,
    ) -> Result<BlogRow, CoreError> {
        if let Some(content) = content {
            validate_content_length(content)?;
        }

        self.with_tx(|tx| {
            let mut blog = query_blog_by_id(tx, blog_id)?
                .ok_or_else(|| CoreError::not_found("Blog not found"))?;

            if let Some(title) = title {
                blog.title = title.to_string();
            }
            if let Some(content) = content {
                blog.content = content.to_string();
            }
            if let Some(status) = status {
                blog.status = status.as_str().to_string();
            }
            blog.updated_at = Some(now());

            tx.execute(
                "UPDATE blogs SET title = ?1, content = ?2, status = ?3, updated_at = ?4 WHERE id = ?5",
                params![blog.title, blog.content, blog.status, blog.updated_at, blog.id],
            )?;
            Ok(blog)
        })
    }

    pub fn set_blog_status(&self, blog_id: &str, status: BlogStatus) -> Result<BlogRow, CoreError> {
        self.update_blog(blog_id, None, None, Some(status))
    }

    pub fn blog_by_id(&self, blog_id: &str) -> Result<BlogRow, CoreError> {
        self.with_conn(|conn| {
            query_blog_by_id(conn, blog_id)?.ok_or_else(|| CoreError::not_found("Blog not found"))
        })
    }

    /// Single fetch for the public surface: a hidden blog reads as absent.
    pub fn visible_blog(&self, blog_id: &str) -> Result<BlogRow, CoreError> {
        let blog = self.blog_by_id(blog_id)?;
        if blog.status == BlogStatus::Hidden.as_str() {
            return Err(CoreError::not_found("Blog not found"));
        }
        Ok(blog)
    }

    /// The viewer's feed: active blogs authored by the viewer or anyone the
    /// viewer follows, newest first. One query over the whole author set,
    /// never a per-author fan-out.
    pub fn feed(&self, viewer_id: &str, page: u32, per_page: u32) -> Result<Vec<BlogRow>, CoreError> {
        self.with_conn(|conn| {
            let mut author_ids = crate::social::query_following_ids(conn, viewer_id)?;
            author_ids.push(viewer_id.to_string());
            query_active_blogs_by_authors(conn, &author_ids, page, per_page)
        })
    }

    pub fn my_blogs(
        &self,
        viewer_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<BlogRow>, CoreError> {
        self.with_conn(|conn| {
            query_active_blogs_by_authors(conn, &[viewer_id.to_string()], page, per_page)
        })
    }

    pub fn my_blog_count(&self, viewer_id: &str) -> Result<i64, CoreError> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM blogs WHERE user_id = ?1 AND status = ?2",
                params![viewer_id, BlogStatus::Active.as_str()],
                |r| r.get(0),
            )?;
            Ok(count)
        })
    }
}

fn validate_title_and_content(title: &str, content: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() || content.trim().is_empty() {
        return Err(CoreError::bad_request("Blog content cannot be empty"));
    }
    validate_content_length(content)
}

fn validate_content_length(content: &str) -> Result<(), CoreError> {
    if content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(CoreError::bad_request(
            "Blog content cannot exceed 1000 characters",
        ));
    }
    Ok(())
}

const BLOG_COLUMNS: &str =
    "id, user_id, title, content, status, like_count, comment_count, created_at, updated_at";

fn blog_from_row(row: &rusqlite::Row) -> rusqlite::Result<BlogRow> {
    Ok(BlogRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        status: row.get(4)?,
        like_count: row.get(5)?,
        comment_count: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

pub fn query_blog_by_id(conn: &Connection, id: &str) -> Result<Option<BlogRow>, CoreError> {
    let mut stmt = conn.prepare(&format!("SELECT {BLOG_COLUMNS} FROM blogs WHERE id = ?1"))?;
    Ok(stmt.query_row([id], blog_from_row).optional()?)
}

fn query_active_blogs_by_authors(
    conn: &Connection,
    author_ids: &[String],
    page: u32,
    per_page: u32,
) -> Result<Vec<BlogRow>, CoreError> {
    if author_ids.is_empty() {
        return Ok(vec![]);
    }

    let per_page = per_page.clamp(1, MAX_PER_PAGE) as i64;
    let offset = page as i64 * per_page;

    let placeholders: Vec<String> = (1..=author_ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT {BLOG_COLUMNS} FROM blogs
         WHERE user_id IN ({}) AND status = ?{}
         ORDER BY created_at DESC, id DESC
         LIMIT ?{} OFFSET ?{}",
        placeholders.join(", "),
        author_ids.len() + 1,
        author_ids.len() + 2,
        author_ids.len() + 3,
    );

    let status = BlogStatus::Active.as_str().to_string();
    let mut params: Vec<&dyn rusqlite::types::ToSql> = author_ids
        .iter()
        .map(|id| id as &dyn rusqlite::types::ToSql)
        .collect();
    params.push(&status);
    params.push(&per_page);
    params.push(&offset);

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params.as_slice(), blog_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRow;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn user(db: &Database, name: &str) -> UserRow {
        db.register_user(name, "User", name, &format!("{name}@example.com"), "hash")
            .unwrap()
    }

    #[test]
    fn create_rejects_blank_and_oversized_content() {
        let db = db();
        let author = user(&db, "ada");

        let blank = db.create_blog(&author.id, "Title", "   ", BlogStatus::Active);
        assert!(matches!(blank, Err(CoreError::BadRequest(_))));

        let long = "x".repeat(1001);
        let oversized = db.create_blog(&author.id, "Title", &long, BlogStatus::Active);
        assert!(matches!(oversized, Err(CoreError::BadRequest(_))));

        let ok = db
            .create_blog(&author.id, "Title", &"x".repeat(1000), BlogStatus::Active)
            .unwrap();
        assert_eq!(ok.like_count, 0);
        assert_eq!(ok.comment_count, 0);
    }

    #[test]
    fn feed_covers_self_and_followed_authors_only() {
        let db = db();
        let a = user(&db, "a");
        let b = user(&db, "b");
        let c = user(&db, "c");

        let a_blog = db.create_blog(&a.id, "A1", "content", BlogStatus::Active).unwrap();
        let b_blog = db.create_blog(&b.id, "B1", "content", BlogStatus::Active).unwrap();
        let c_blog = db.create_blog(&c.id, "C1", "content", BlogStatus::Active).unwrap();

        db.follow(&a.id, &b.id).unwrap();

        let feed: Vec<String> = db.feed(&a.id, 0, 20).unwrap().into_iter().map(|b| b.id).collect();
        assert_eq!(feed.len(), 2);
        assert!(feed.contains(&a_blog.id));
        assert!(feed.contains(&b_blog.id));
        assert!(!feed.contains(&c_blog.id));

        db.unfollow(&a.id, &b.id).unwrap();
        let after: Vec<String> = db.feed(&a.id, 0, 20).unwrap().into_iter().map(|b| b.id).collect();
        assert_eq!(after, vec![a_blog.id]);
    }

    #[test]
    fn feed_orders_newest_first_and_paginates() {
        let db = db();
        let a = user(&db, "a");

        let first = db.create_blog(&a.id, "first", "content", BlogStatus::Active).unwrap();
        let second = db.create_blog(&a.id, "second", "content", BlogStatus::Active).unwrap();
        let third = db.create_blog(&a.id, "third", "content", BlogStatus::Active).unwrap();

        let page0: Vec<String> = db.feed(&a.id, 0, 2).unwrap().into_iter().map(|b| b.id).collect();
        let page1: Vec<String> = db.feed(&a.id, 1, 2).unwrap().into_iter().map(|b| b.id).collect();
        assert_eq!(page0, vec![third.id, second.id]);
        assert_eq!(page1, vec![first.id]);
    }

    #[test]
    fn hidden_blogs_stay_out_of_feed_and_public_fetch() {
        let db = db();
        let a = user(&db, "a");

        let blog = db.create_blog(&a.id, "T", "content", BlogStatus::Active).unwrap();
        db.set_blog_status(&blog.id, BlogStatus::Hidden).unwrap();

        assert!(db.feed(&a.id, 0, 20).unwrap().is_empty());
        assert!(matches!(db.visible_blog(&blog.id), Err(CoreError::NotFound(_))));
        // raw fetch still resolves, for owner/admin surfaces
        assert!(db.blog_by_id(&blog.id).is_ok());
    }

    #[test]
    fn my_blog_count_tracks_active_only() {
        let db = db();
        let a = user(&db, "a");
        let blog = db.create_blog(&a.id, "T", "c", BlogStatus::Active).unwrap();
        db.create_blog(&a.id, "T2", "c", BlogStatus::Active).unwrap();
        assert_eq!(db.my_blog_count(&a.id).unwrap(), 2);

        db.set_blog_status(&blog.id, BlogStatus::Hidden).unwrap();
        assert_eq!(db.my_blog_count(&a.id).unwrap(), 1);
    }
}
