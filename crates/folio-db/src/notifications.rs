use rusqlite::{Connection, params};

use folio_types::models::NotificationKind;

use crate::models::{BlogRow, NotificationRow, UserRow};
use crate::{CoreError, Database, new_id, now};

/// Limit window for the recent-notifications read.
const MIN_LIMIT: u32 = 1;
const MAX_LIMIT: u32 = 50;

/// Fan-out writers. Each runs inside the transaction of the social write that
/// triggered it and is a silent no-op when the action targets its own actor.

pub(crate) fn notify_like(
    conn: &Connection,
    blog: &BlogRow,
    actor: &UserRow,
) -> Result<(), CoreError> {
    insert_blog_notification(
        conn,
        blog,
        actor,
        NotificationKind::Like,
        format!("{} liked your post.", actor.username),
    )
}

pub(crate) fn notify_comment(
    conn: &Connection,
    blog: &BlogRow,
    actor: &UserRow,
) -> Result<(), CoreError> {
    insert_blog_notification(
        conn,
        blog,
        actor,
        NotificationKind::Comment,
        format!("{} commented on your post.", actor.username),
    )
}

pub(crate) fn notify_follow(
    conn: &Connection,
    follower: &UserRow,
    followee: &UserRow,
) -> Result<(), CoreError> {
    if follower.id == followee.id {
        return Ok(());
    }
    conn.execute(
        "INSERT INTO notifications (id, recipient_id, actor_id, blog_id, kind, message, is_read, created_at)
         VALUES (?1, ?2, ?3, NULL, ?4, ?5, 0, ?6)",
        params![
            new_id(),
            followee.id,
            follower.id,
            NotificationKind::Follow.as_str(),
            format!("{} started following you.", follower.username),
            now(),
        ],
    )?;
    Ok(())
}

fn insert_blog_notification(
    conn: &Connection,
    blog: &BlogRow,
    actor: &UserRow,
    kind: NotificationKind,
    message: String,
) -> Result<(), CoreError> {
    // Self-action: no row, no error.
    if blog.user_id == actor.id {
        return Ok(());
    }
    conn.execute(
        "INSERT INTO notifications (id, recipient_id, actor_id, blog_id, kind, message, is_read, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
        params![
            new_id(),
            blog.user_id,
            actor.id,
            blog.id,
            kind.as_str(),
            message,
            now(),
        ],
    )?;
    Ok(())
}

impl Database {
    pub fn unread_count(&self, user_id: &str) -> Result<i64, CoreError> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE recipient_id = ?1 AND is_read = 0",
                [user_id],
                |r| r.get(0),
            )?;
            Ok(count)
        })
    }

    /// Newest first; `limit` clamped to [1, 50].
    pub fn recent_notifications(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<NotificationRow>, CoreError> {
        let limit = limit.clamp(MIN_LIMIT, MAX_LIMIT);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, recipient_id, actor_id, blog_id, kind, message, is_read, created_at
                 FROM notifications
                 WHERE recipient_id = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![user_id, limit], |row| {
                    Ok(NotificationRow {
                        id: row.get(0)?,
                        recipient_id: row.get(1)?,
                        actor_id: row.get(2)?,
                        blog_id: row.get(3)?,
                        kind: row.get(4)?,
                        message: row.get(5)?,
                        is_read: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Fails NotFound when the notification does not belong to the user.
    pub fn mark_notification_read(
        &self,
        user_id: &str,
        notification_id: &str,
    ) -> Result<(), CoreError> {
        self.with_conn_mut(|conn| {
            let updated = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND recipient_id = ?2",
                params![notification_id, user_id],
            )?;
            if updated == 0 {
                return Err(CoreError::not_found("Notification not found"));
            }
            Ok(())
        })
    }

    /// No-op when nothing is unread.
    pub fn mark_all_notifications_read(&self, user_id: &str) -> Result<(), CoreError> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE recipient_id = ?1 AND is_read = 0",
                [user_id],
            )?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_types::models::BlogStatus;

    use crate::models::UserRow;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn user(db: &Database, name: &str) -> UserRow {
        db.register_user(name, "User", name, &format!("{name}@example.com"), "hash")
            .unwrap()
    }

    #[test]
    fn liking_your_own_blog_creates_no_notification() {
        let db = db();
        let a = user(&db, "a");
        let blog = db.create_blog(&a.id, "T", "c", BlogStatus::Active).unwrap();

        db.add_like(&blog.id, &a.id).unwrap();
        assert_eq!(db.unread_count(&a.id).unwrap(), 0);
        assert!(db.recent_notifications(&a.id, 10).unwrap().is_empty());
    }

    #[test]
    fn like_comment_and_follow_notify_the_recipient() {
        let db = db();
        let owner = user(&db, "owner");
        let fan = user(&db, "fan");
        let blog = db.create_blog(&owner.id, "T", "c", BlogStatus::Active).unwrap();

        db.add_like(&blog.id, &fan.id).unwrap();
        db.add_comment(&blog.id, &fan.id, "nice").unwrap();
        db.follow(&fan.id, &owner.id).unwrap();

        assert_eq!(db.unread_count(&owner.id).unwrap(), 3);
        let recent = db.recent_notifications(&owner.id, 10).unwrap();
        assert_eq!(recent.len(), 3);
        // newest first
        assert_eq!(recent[0].kind, NotificationKind::Follow.as_str());
        assert_eq!(recent[0].message, "fan started following you.");
        assert_eq!(recent[2].message, "fan liked your post.");
        assert!(recent.iter().all(|n| !n.is_read));
    }

    #[test]
    fn recent_limit_is_clamped() {
        let db = db();
        let owner = user(&db, "owner");
        let fan = user(&db, "fan");
        for i in 0..3 {
            let blog = db
                .create_blog(&owner.id, &format!("T{i}"), "c", BlogStatus::Active)
                .unwrap();
            db.add_like(&blog.id, &fan.id).unwrap();
        }

        // limit 0 clamps up to 1
        assert_eq!(db.recent_notifications(&owner.id, 0).unwrap().len(), 1);
        assert_eq!(db.recent_notifications(&owner.id, 200).unwrap().len(), 3);
    }

    #[test]
    fn mark_read_enforces_ownership() {
        let db = db();
        let owner = user(&db, "owner");
        let fan = user(&db, "fan");
        let blog = db.create_blog(&owner.id, "T", "c", BlogStatus::Active).unwrap();
        db.add_like(&blog.id, &fan.id).unwrap();

        let note = &db.recent_notifications(&owner.id, 1).unwrap()[0];
        let wrong_owner = db.mark_notification_read(&fan.id, &note.id);
        assert!(matches!(wrong_owner, Err(CoreError::NotFound(_))));

        db.mark_notification_read(&owner.id, &note.id).unwrap();
        assert_eq!(db.unread_count(&owner.id).unwrap(), 0);
    }

    #[test]
    fn mark_all_read_is_idempotent() {
        let db = db();
        let owner = user(&db, "owner");
        let fan = user(&db, "fan");
        let blog = db.create_blog(&owner.id, "T", "c", BlogStatus::Active).unwrap();
        db.add_like(&blog.id, &fan.id).unwrap();

        db.mark_all_notifications_read(&owner.id).unwrap();
        assert_eq!(db.unread_count(&owner.id).unwrap(), 0);
        // nothing unread: still fine
        db.mark_all_notifications_read(&owner.id).unwrap();
    }
}
