use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use folio_types::api::{NotificationQuery, UnreadCountResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::Claims;
use crate::view;

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<NotificationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state
        .db
        .recent_notifications(&claims.user_id(), query.limit)?;
    let notifications: Vec<_> = rows.into_iter().map(view::notification_response).collect();
    Ok(Json(notifications))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let unread = state.db.unread_count(&claims.user_id())?;
    Ok(Json(UnreadCountResponse { unread }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .db
        .mark_notification_read(&claims.user_id(), &notification_id.to_string())?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    state.db.mark_all_notifications_read(&claims.user_id())?;
    Ok(StatusCode::NO_CONTENT)
}
