use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::Claims;

/// Remove an account and everything it touches. Allowed for the account
/// itself and for admins.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = user_id.to_string();
    if claims.user_id() != user_id && !claims.is_admin() {
        return Err(ApiError::forbidden());
    }

    state.media.delete_user(&user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
