use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use folio_types::api::FollowCountsResponse;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::Claims;

pub async fn follow_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.db.follow(&claims.user_id(), &user_id.to_string())?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unfollow_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.db.unfollow(&claims.user_id(), &user_id.to_string())?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn follow_counts(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user_id.to_string();
    state.db.user_by_id(&user_id)?;
    Ok(Json(FollowCountsResponse {
        followers: state.db.follower_count(&user_id)?,
        following: state.db.following_count(&user_id)?,
    }))
}
