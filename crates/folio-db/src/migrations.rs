use rusqlite::Connection;
use tracing::info;

use crate::CoreError;

pub fn run(conn: &Connection) -> Result<(), CoreError> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                first_name  TEXT NOT NULL,
                last_name   TEXT NOT NULL,
                bio         TEXT,
                avatar      TEXT,
                status      TEXT NOT NULL DEFAULT 'active',
                role        TEXT NOT NULL DEFAULT 'user',
                created_at  TEXT NOT NULL
            );

            CREATE TABLE blogs (
                id            TEXT PRIMARY KEY,
                user_id       TEXT NOT NULL REFERENCES users(id),
                title         TEXT NOT NULL,
                content       TEXT NOT NULL,
                status        TEXT NOT NULL DEFAULT 'active',
                like_count    INTEGER NOT NULL DEFAULT 0,
                comment_count INTEGER NOT NULL DEFAULT 0,
                created_at    TEXT NOT NULL,
                updated_at    TEXT
            );

            CREATE INDEX idx_blogs_author ON blogs(user_id, status, created_at);

            CREATE TABLE comments (
                id          TEXT PRIMARY KEY,
                blog_id     TEXT NOT NULL REFERENCES blogs(id),
                user_id     TEXT NOT NULL REFERENCES users(id),
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT
            );

            CREATE INDEX idx_comments_blog ON comments(blog_id, created_at);
            CREATE INDEX idx_comments_author ON comments(user_id);

            CREATE TABLE likes (
                id          TEXT PRIMARY KEY,
                blog_id     TEXT NOT NULL REFERENCES blogs(id),
                user_id     TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL,
                UNIQUE(blog_id, user_id)
            );

            CREATE INDEX idx_likes_author ON likes(user_id);

            CREATE TABLE follows (
                id          TEXT PRIMARY KEY,
                follower_id TEXT NOT NULL REFERENCES users(id),
                followee_id TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL,
                UNIQUE(follower_id, followee_id),
                CHECK (follower_id <> followee_id)
            );

            CREATE INDEX idx_follows_followee ON follows(followee_id);

            CREATE TABLE media (
                id          TEXT PRIMARY KEY,
                blog_id     TEXT NOT NULL REFERENCES blogs(id),
                url         TEXT NOT NULL,
                media_type  TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_media_blog ON media(blog_id, created_at);

            CREATE TABLE notifications (
                id           TEXT PRIMARY KEY,
                recipient_id TEXT NOT NULL REFERENCES users(id),
                actor_id     TEXT NOT NULL REFERENCES users(id),
                blog_id      TEXT,
                kind         TEXT NOT NULL,
                message      TEXT NOT NULL,
                is_read      INTEGER NOT NULL DEFAULT 0,
                created_at   TEXT NOT NULL,
                CHECK (recipient_id <> actor_id)
            );

            CREATE INDEX idx_notifications_recipient
                ON notifications(recipient_id, created_at);

            CREATE TABLE reports (
                id               TEXT PRIMARY KEY,
                reporter_id      TEXT NOT NULL REFERENCES users(id),
                blog_id          TEXT,
                reported_user_id TEXT,
                reason           TEXT NOT NULL,
                details          TEXT,
                created_at       TEXT NOT NULL,
                CHECK ((blog_id IS NULL) <> (reported_user_id IS NULL))
            );

            CREATE INDEX idx_reports_blog ON reports(blog_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    Ok(())
}
