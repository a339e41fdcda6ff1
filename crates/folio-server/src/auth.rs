use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};

use folio_db::Database;
use folio_db::models::UserRow;
use folio_media::MediaStore;
use folio_types::api::{AuthResponse, LoginRequest, RegisterRequest};
use folio_types::models::UserRole;

use crate::error::ApiError;
use crate::middleware::Claims;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub media: MediaStore,
    pub jwt_secret: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(ApiError::bad_request(
            "Username must be between 3 and 32 characters",
        ));
    }
    if req.password.len() < 8 {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters",
        ));
    }
    if !req.email.contains('@') {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    if req.first_name.trim().is_empty() || req.last_name.trim().is_empty() {
        return Err(ApiError::bad_request("Name cannot be empty"));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|_| ApiError::internal("Failed to hash password"))?
        .to_string();

    let user = state.db.register_user(
        &req.first_name,
        &req.last_name,
        &req.username,
        &req.email,
        &password_hash,
    )?;

    let response = auth_response(&state.jwt_secret, &user)?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .user_by_identifier(&req.identifier)?
        .ok_or_else(|| ApiError::bad_request("Invalid credentials"))?;

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|_| ApiError::internal("Corrupt password hash"))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::bad_request("Invalid credentials"))?;

    let response = auth_response(&state.jwt_secret, &user)?;
    Ok(Json(response))
}

fn auth_response(secret: &str, user: &UserRow) -> Result<AuthResponse, ApiError> {
    let user_id = user
        .id
        .parse()
        .map_err(|_| ApiError::internal("Corrupt user id"))?;
    let role = UserRole::parse(&user.role).unwrap_or(UserRole::User);

    let claims = Claims {
        sub: user_id,
        username: user.username.clone(),
        role,
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| ApiError::internal("Failed to issue token"))?;

    Ok(AuthResponse {
        user_id,
        username: user.username.clone(),
        role,
        token,
    })
}
