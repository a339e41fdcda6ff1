use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use folio_types::api::{AddCommentRequest, LikeStatusResponse};

use crate::auth::AppState;
use crate::blogs::ensure_owner_or_admin;
use crate::error::ApiError;
use crate::middleware::Claims;
use crate::view;

pub async fn like_blog(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(blog_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let blog_id = blog_id.to_string();
    state.db.add_like(&blog_id, &claims.user_id())?;
    let status = state.db.like_status(&blog_id, &claims.user_id())?;
    Ok((
        StatusCode::CREATED,
        Json(LikeStatusResponse {
            liked: status.liked,
            like_count: status.like_count,
        }),
    ))
}

pub async fn unlike_blog(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(blog_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .db
        .remove_like(&blog_id.to_string(), &claims.user_id())?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn like_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(blog_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state
        .db
        .like_status(&blog_id.to_string(), &claims.user_id())?;
    Ok(Json(LikeStatusResponse {
        liked: status.liked,
        like_count: status.like_count,
    }))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(blog_id): Path<Uuid>,
    Json(req): Json<AddCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .add_comment(&blog_id.to_string(), &claims.user_id(), &req.content)?;
    Ok((StatusCode::CREATED, Json(view::comment_response(row))))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(blog_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let blog_id = blog_id.to_string();
    state.db.blog_by_id(&blog_id)?;
    let comments: Vec<_> = state
        .db
        .comments_by_blog(&blog_id)?
        .into_iter()
        .map(view::comment_response)
        .collect();
    Ok(Json(comments))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(comment_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let comment_id = comment_id.to_string();
    let comment = state.db.comment_by_id(&comment_id)?;
    ensure_owner_or_admin(&claims, &comment.user_id)?;

    state.db.remove_comment(&comment_id)?;
    Ok(StatusCode::NO_CONTENT)
}
