//! Row-to-response mapping. Rows carry TEXT ids and timestamps; corrupt
//! values are logged and defaulted rather than failing the whole listing.

use std::collections::HashMap;

use tracing::warn;
use uuid::Uuid;

use folio_db::Database;
use folio_db::models::{BlogRow, CommentRow, MediaRow, NotificationRow};
use folio_types::api::{BlogResponse, CommentResponse, MediaResponse, NotificationResponse};
use folio_types::models::{BlogStatus, NotificationKind, parse_timestamp};

use crate::error::ApiError;

pub fn parse_id(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} id '{}': {}", what, raw, e);
        Uuid::default()
    })
}

pub fn media_response(row: MediaRow) -> MediaResponse {
    MediaResponse {
        id: parse_id(&row.id, "media"),
        url: row.url,
        media_type: row.media_type,
        created_at: parse_timestamp(&row.created_at),
    }
}

pub fn comment_response(row: CommentRow) -> CommentResponse {
    CommentResponse {
        id: parse_id(&row.id, "comment"),
        blog_id: parse_id(&row.blog_id, "blog"),
        author_id: parse_id(&row.user_id, "user"),
        content: row.content,
        created_at: parse_timestamp(&row.created_at),
    }
}

pub fn notification_response(row: NotificationRow) -> NotificationResponse {
    NotificationResponse {
        id: parse_id(&row.id, "notification"),
        actor_id: parse_id(&row.actor_id, "user"),
        blog_id: row.blog_id.as_deref().map(|id| parse_id(id, "blog")),
        kind: NotificationKind::parse(&row.kind).unwrap_or_else(|| {
            warn!("Corrupt notification kind '{}'", row.kind);
            NotificationKind::Like
        }),
        message: row.message,
        is_read: row.is_read,
        created_at: parse_timestamp(&row.created_at),
    }
}

pub fn blog_response(db: &Database, row: BlogRow) -> Result<BlogResponse, ApiError> {
    let mut responses = blog_responses(db, vec![row])?;
    responses
        .pop()
        .ok_or_else(|| ApiError::internal("Blog mapping produced no response"))
}

/// Map a page of blog rows, resolving each author's username once.
pub fn blog_responses(db: &Database, rows: Vec<BlogRow>) -> Result<Vec<BlogResponse>, ApiError> {
    let mut usernames: HashMap<String, String> = HashMap::new();

    rows.into_iter()
        .map(|row| {
            let author_username = match usernames.get(&row.user_id) {
                Some(name) => name.clone(),
                None => {
                    let name = db
                        .user_by_id(&row.user_id)
                        .map(|u| u.username)
                        .unwrap_or_else(|_| "unknown".to_string());
                    usernames.insert(row.user_id.clone(), name.clone());
                    name
                }
            };

            let media = db
                .media_by_blog(&row.id)?
                .into_iter()
                .map(media_response)
                .collect();

            Ok(BlogResponse {
                id: parse_id(&row.id, "blog"),
                title: row.title,
                content: row.content,
                status: BlogStatus::parse(&row.status).unwrap_or_else(|| {
                    warn!("Corrupt blog status '{}'", row.status);
                    BlogStatus::Active
                }),
                author_id: parse_id(&row.user_id, "user"),
                author_username,
                like_count: row.like_count,
                comment_count: row.comment_count,
                created_at: parse_timestamp(&row.created_at),
                updated_at: row.updated_at.as_deref().map(parse_timestamp),
                media,
            })
        })
        .collect()
}
