use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{BlogStatus, NotificationKind, ReportReason, UserRole};

// ── Auth ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email or username.
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub token: String,
}

// ── Blogs ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBlogRequest {
    pub title: String,
    pub content: String,
    pub status: Option<BlogStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBlogRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<BlogStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBlogStatusRequest {
    pub status: BlogStatus,
}

#[derive(Debug, Serialize)]
pub struct BlogResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub status: BlogStatus,
    pub author_id: Uuid,
    pub author_username: String,
    pub like_count: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub media: Vec<MediaResponse>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_per_page() -> u32 {
    20
}

// ── Media ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct MediaResponse {
    pub id: Uuid,
    pub url: String,
    pub media_type: String,
    pub created_at: DateTime<Utc>,
}

// ── Interactions ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub blog_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LikeStatusResponse {
    pub liked: bool,
    pub like_count: i64,
}

// ── Social graph ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct FollowCountsResponse {
    pub followers: i64,
    pub following: i64,
}

// ── Notifications ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default = "default_notification_limit")]
    pub limit: u32,
}

fn default_notification_limit() -> u32 {
    20
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub blog_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread: i64,
}

// ── Reports ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateReportRequest {
    pub blog_id: Option<Uuid>,
    pub reported_user_id: Option<Uuid>,
    pub reason: ReportReason,
    pub details: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateReportResponse {
    pub report_id: Uuid,
}
