//! Blog and user deletion. The row cascade commits as one transaction in
//! folio-db; the backing media files are removed after commit, best-effort.
//! These entry points live here because this crate is the only owner of
//! on-disk state; deleting files before a commit could destroy data for a
//! transaction that rolls back.

use folio_db::CoreError;
use folio_db::blogs::query_blog_by_id;
use folio_db::cascade::{delete_blog_rows, delete_user_rows};
use folio_db::users::query_user_by_id;
use tracing::info;

use crate::store::MediaStore;

impl MediaStore {
    /// Delete a blog and every row referencing it, then its media files.
    pub async fn delete_blog(&self, blog_id: &str) -> Result<(), CoreError> {
        let urls = self.db().with_tx(|tx| {
            query_blog_by_id(tx, blog_id)?
                .ok_or_else(|| CoreError::not_found("Blog not found"))?;
            delete_blog_rows(tx, blog_id)
        })?;

        self.remove_urls(&urls).await;
        info!("Deleted blog {} ({} media file(s))", blog_id, urls.len());
        Ok(())
    }

    /// Delete a user, every owned blog with its full cascade, and every row
    /// the user participates in, then all collected media files.
    pub async fn delete_user(&self, user_id: &str) -> Result<(), CoreError> {
        let urls = self.db().with_tx(|tx| {
            query_user_by_id(tx, user_id)?
                .ok_or_else(|| CoreError::not_found("User not found"))?;
            delete_user_rows(tx, user_id)
        })?;

        self.remove_urls(&urls).await;
        info!("Deleted user {} ({} media file(s))", user_id, urls.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use folio_db::Database;
    use folio_db::models::UserRow;
    use folio_db::reports::ReportTarget;
    use folio_types::models::{BlogStatus, ReportReason};

    use crate::storage::MediaStorage;
    use crate::store::{MediaStore, UploadFile};

    async fn store() -> (MediaStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::open_in_memory().unwrap());
        let storage = MediaStorage::new(dir.path().to_path_buf(), "http://localhost:8080")
            .await
            .unwrap();
        (MediaStore::new(db, storage), dir)
    }

    fn user(db: &Database, name: &str) -> UserRow {
        db.register_user(name, "User", name, &format!("{name}@example.com"), "hash")
            .unwrap()
    }

    fn count(db: &Database, sql: &str, id: &str) -> i64 {
        db.with_conn(|conn| {
            let n = conn.query_row(sql, [id], |r| r.get(0))?;
            Ok(n)
        })
        .unwrap()
    }

    fn jpg(name: &str) -> UploadFile {
        UploadFile {
            file_name: name.to_string(),
            content_type: Some("image/jpeg".to_string()),
            data: vec![9u8; 128],
        }
    }

    #[tokio::test]
    async fn blog_cascade_clears_every_dependent_table_and_the_file() {
        let (store, dir) = store().await;
        let db = store.db();

        let owner = user(db, "owner");
        let fan = user(db, "fan");
        let other = user(db, "other");
        let blog = db.create_blog(&owner.id, "T", "c", BlogStatus::Active).unwrap();

        db.add_comment(&blog.id, &fan.id, "one").unwrap();
        db.add_comment(&blog.id, &fan.id, "two").unwrap();
        db.add_comment(&blog.id, &other.id, "three").unwrap();
        db.add_like(&blog.id, &fan.id).unwrap();
        db.add_like(&blog.id, &other.id).unwrap();
        store
            .upload_to_blog(&blog.id, vec![jpg("pic.jpg")], true)
            .await
            .unwrap();
        db.create_report(
            &fan.id,
            ReportTarget::Blog(blog.id.clone()),
            ReportReason::Spam,
            None,
        )
        .unwrap();

        // likes + comments fanned out notifications to the owner
        assert_eq!(db.unread_count(&owner.id).unwrap(), 5);

        store.delete_blog(&blog.id).await.unwrap();

        for sql in [
            "SELECT COUNT(*) FROM comments WHERE blog_id = ?1",
            "SELECT COUNT(*) FROM likes WHERE blog_id = ?1",
            "SELECT COUNT(*) FROM notifications WHERE blog_id = ?1",
            "SELECT COUNT(*) FROM media WHERE blog_id = ?1",
            "SELECT COUNT(*) FROM reports WHERE blog_id = ?1",
            "SELECT COUNT(*) FROM blogs WHERE id = ?1",
        ] {
            assert_eq!(count(db, sql, &blog.id), 0, "{sql}");
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn deleting_a_missing_blog_is_not_found() {
        let (store, _dir) = store().await;
        let result = store.delete_blog("no-such-blog").await;
        assert!(matches!(result, Err(folio_db::CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn user_cascade_removes_owned_blogs_and_participation() {
        let (store, dir) = store().await;
        let db = store.db();

        let doomed = user(db, "doomed");
        let bystander = user(db, "bystander");

        // two owned blogs, each with foreign interaction
        let blog_a = db.create_blog(&doomed.id, "A", "c", BlogStatus::Active).unwrap();
        let blog_b = db.create_blog(&doomed.id, "B", "c", BlogStatus::Active).unwrap();
        db.add_like(&blog_a.id, &bystander.id).unwrap();
        db.add_comment(&blog_b.id, &bystander.id, "hi").unwrap();
        store
            .upload_to_blog(&blog_a.id, vec![jpg("a.jpg")], true)
            .await
            .unwrap();
        store
            .upload_to_blog(&blog_b.id, vec![jpg("b.jpg")], true)
            .await
            .unwrap();

        // participation in the other direction
        let survivor_blog = db
            .create_blog(&bystander.id, "S", "c", BlogStatus::Active)
            .unwrap();
        db.add_like(&survivor_blog.id, &doomed.id).unwrap();
        db.add_comment(&survivor_blog.id, &doomed.id, "bye").unwrap();
        db.follow(&doomed.id, &bystander.id).unwrap();
        db.follow(&bystander.id, &doomed.id).unwrap();
        db.create_report(
            &bystander.id,
            ReportTarget::User(doomed.id.clone()),
            ReportReason::Harassment,
            None,
        )
        .unwrap();

        store.delete_user(&doomed.id).await.unwrap();

        assert_eq!(count(db, "SELECT COUNT(*) FROM blogs WHERE user_id = ?1", &doomed.id), 0);
        assert_eq!(count(db, "SELECT COUNT(*) FROM likes WHERE user_id = ?1", &doomed.id), 0);
        assert_eq!(count(db, "SELECT COUNT(*) FROM comments WHERE user_id = ?1", &doomed.id), 0);
        assert_eq!(
            count(
                db,
                "SELECT COUNT(*) FROM follows WHERE follower_id = ?1 OR followee_id = ?1",
                &doomed.id
            ),
            0
        );
        assert_eq!(
            count(
                db,
                "SELECT COUNT(*) FROM notifications WHERE recipient_id = ?1 OR actor_id = ?1",
                &doomed.id
            ),
            0
        );
        assert_eq!(
            count(
                db,
                "SELECT COUNT(*) FROM reports WHERE reporter_id = ?1 OR reported_user_id = ?1",
                &doomed.id
            ),
            0
        );
        assert_eq!(count(db, "SELECT COUNT(*) FROM users WHERE id = ?1", &doomed.id), 0);

        // the survivor's blog counters track the removed like and comment
        let survivor = db.blog_by_id(&survivor_blog.id).unwrap();
        assert_eq!(survivor.like_count, 0);
        assert_eq!(survivor.comment_count, 0);

        // both media files went with the owned blogs
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        // the bystander is untouched
        assert!(db.user_by_id(&bystander.id).is_ok());
    }

    #[tokio::test]
    async fn user_cascade_tolerates_a_user_with_nothing() {
        let (store, _dir) = store().await;
        let db = store.db();
        let lonely = user(db, "lonely");

        store.delete_user(&lonely.id).await.unwrap();
        assert_eq!(count(db, "SELECT COUNT(*) FROM users WHERE id = ?1", &lonely.id), 0);
    }
}
