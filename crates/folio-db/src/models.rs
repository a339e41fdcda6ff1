/// Database row types — these map directly to SQLite rows.
/// Distinct from the folio-types API models to keep the DB layer independent.

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub status: String,
    pub role: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct BlogRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub status: String,
    pub like_count: i64,
    pub comment_count: i64,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: String,
    pub blog_id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LikeRow {
    pub id: String,
    pub blog_id: String,
    pub user_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct MediaRow {
    pub id: String,
    pub blog_id: String,
    pub url: String,
    pub media_type: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NotificationRow {
    pub id: String,
    pub recipient_id: String,
    pub actor_id: String,
    pub blog_id: Option<String>,
    pub kind: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
}
