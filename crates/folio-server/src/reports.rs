use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use folio_db::reports::ReportTarget;
use folio_types::api::{CreateReportRequest, CreateReportResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::Claims;
use crate::view;

pub async fn create_report(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let target = match (req.blog_id, req.reported_user_id) {
        (Some(blog_id), None) => ReportTarget::Blog(blog_id.to_string()),
        (None, Some(user_id)) => ReportTarget::User(user_id.to_string()),
        _ => {
            return Err(ApiError::bad_request(
                "Report must target exactly one of a blog or a user",
            ));
        }
    };

    let report_id = state.db.create_report(
        &claims.user_id(),
        target,
        req.reason,
        req.details.as_deref(),
    )?;

    Ok((
        StatusCode::CREATED,
        Json(CreateReportResponse {
            report_id: view::parse_id(&report_id, "report"),
        }),
    ))
}
