use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::warn;
use uuid::Uuid;

use folio_media::UploadFile;
use folio_types::api::{CreateBlogRequest, PageQuery, UpdateBlogRequest, UpdateBlogStatusRequest};
use folio_types::models::BlogStatus;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::Claims;
use crate::view;

pub async fn create_blog(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateBlogRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status = req.status.unwrap_or(BlogStatus::Active);
    let row = state
        .db
        .create_blog(&claims.user_id(), &req.title, &req.content, status)?;
    Ok((
        StatusCode::CREATED,
        Json(view::blog_response(&state.db, row)?),
    ))
}

/// Publish a blog and its media in one operation. If the media batch fails,
/// the freshly created blog is deleted again so the operation stays
/// all-or-nothing from the client's perspective.
pub async fn create_blog_with_media(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let parts = read_multipart(multipart).await?;
    let title = parts
        .title
        .ok_or_else(|| ApiError::bad_request("Blog title is required"))?;
    let content = parts
        .content
        .ok_or_else(|| ApiError::bad_request("Blog content is required"))?;
    let status = parts.status.unwrap_or(BlogStatus::Active);

    let row = state
        .db
        .create_blog(&claims.user_id(), &title, &content, status)?;

    if let Err(e) = state.media.upload_to_blog(&row.id, parts.files, false).await {
        if let Err(cleanup) = state.media.delete_blog(&row.id).await {
            warn!("Failed to roll back blog {} after media error: {}", row.id, cleanup);
        }
        return Err(e.into());
    }

    let row = state.db.blog_by_id(&row.id)?;
    Ok((
        StatusCode::CREATED,
        Json(view::blog_response(&state.db, row)?),
    ))
}

pub async fn get_blog(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(blog_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state.db.blog_by_id(&blog_id.to_string())?;
    // A hidden blog reads as absent for everyone but its owner and admins.
    if row.status == BlogStatus::Hidden.as_str()
        && row.user_id != claims.user_id()
        && !claims.is_admin()
    {
        return Err(ApiError::from(folio_db::CoreError::not_found(
            "Blog not found",
        )));
    }
    Ok(Json(view::blog_response(&state.db, row)?))
}

pub async fn update_blog(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(blog_id): Path<Uuid>,
    Json(req): Json<UpdateBlogRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let blog_id = blog_id.to_string();
    let existing = state.db.blog_by_id(&blog_id)?;
    ensure_owner_or_admin(&claims, &existing.user_id)?;

    let row = state.db.update_blog(
        &blog_id,
        req.title.as_deref(),
        req.content.as_deref(),
        req.status,
    )?;
    Ok(Json(view::blog_response(&state.db, row)?))
}

pub async fn delete_blog(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(blog_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let blog_id = blog_id.to_string();
    let existing = state.db.blog_by_id(&blog_id)?;
    ensure_owner_or_admin(&claims, &existing.user_id)?;

    state.media.delete_blog(&blog_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_blog_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(blog_id): Path<Uuid>,
    Json(req): Json<UpdateBlogStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !claims.is_admin() {
        return Err(ApiError::forbidden());
    }
    let row = state.db.set_blog_status(&blog_id.to_string(), req.status)?;
    Ok(Json(view::blog_response(&state.db, row)?))
}

pub async fn feed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state
        .db
        .feed(&claims.user_id(), query.page, query.per_page)?;
    Ok(Json(view::blog_responses(&state.db, rows)?))
}

pub async fn my_blogs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state
        .db
        .my_blogs(&claims.user_id(), query.page, query.per_page)?;
    Ok(Json(view::blog_responses(&state.db, rows)?))
}

pub async fn my_blog_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let count = state.db.my_blog_count(&claims.user_id())?;
    Ok(Json(serde_json::json!({ "count": count })))
}

pub async fn list_media(
    State(state): State<AppState>,
    Path(blog_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let blog_id = blog_id.to_string();
    state.db.blog_by_id(&blog_id)?;
    let media: Vec<_> = state
        .db
        .media_by_blog(&blog_id)?
        .into_iter()
        .map(view::media_response)
        .collect();
    Ok(Json(media))
}

pub async fn upload_media(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(blog_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let blog_id = blog_id.to_string();
    let existing = state.db.blog_by_id(&blog_id)?;
    ensure_owner_or_admin(&claims, &existing.user_id)?;

    let parts = read_multipart(multipart).await?;
    let rows = state.media.upload_to_blog(&blog_id, parts.files, true).await?;
    let media: Vec<_> = rows.into_iter().map(view::media_response).collect();
    Ok((StatusCode::CREATED, Json(media)))
}

/// Remove one media item from a blog (owner or admin).
pub async fn delete_media(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(media_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let media_id = media_id.to_string();
    let media = state.db.media_by_id(&media_id)?;
    let blog = state.db.blog_by_id(&media.blog_id)?;
    ensure_owner_or_admin(&claims, &blog.user_id)?;

    state.media.delete_media(&media_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn ensure_owner_or_admin(claims: &Claims, owner_id: &str) -> Result<(), ApiError> {
    if claims.is_admin() || claims.user_id() == owner_id {
        Ok(())
    } else {
        Err(ApiError::forbidden())
    }
}

pub struct MultipartParts {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<BlogStatus>,
    pub files: Vec<UploadFile>,
}

pub async fn read_multipart(mut multipart: Multipart) -> Result<MultipartParts, ApiError> {
    let mut parts = MultipartParts {
        title: None,
        content: None,
        status: None,
        files: Vec::new(),
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("Malformed multipart body"))?
    {
        match field.name().unwrap_or("") {
            "title" => {
                parts.title = Some(
                    field
                        .text()
                        .await
                        .map_err(|_| ApiError::bad_request("Malformed multipart body"))?,
                );
            }
            "content" => {
                parts.content = Some(
                    field
                        .text()
                        .await
                        .map_err(|_| ApiError::bad_request("Malformed multipart body"))?,
                );
            }
            "status" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("Malformed multipart body"))?;
                parts.status = Some(
                    BlogStatus::parse(&raw)
                        .ok_or_else(|| ApiError::bad_request("Invalid blog status"))?,
                );
            }
            "files" => {
                let file_name = field.file_name().unwrap_or("file").to_string();
                let content_type = field.content_type().map(|ct| ct.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::bad_request("Malformed multipart body"))?
                    .to_vec();
                parts.files.push(UploadFile {
                    file_name,
                    content_type,
                    data,
                });
            }
            other => {
                warn!("Ignoring unknown multipart field '{}'", other);
            }
        }
    }

    Ok(parts)
}
