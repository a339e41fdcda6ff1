use rusqlite::params;

use folio_types::models::ReportReason;

use crate::blogs::query_blog_by_id;
use crate::users::query_user_by_id;
use crate::{CoreError, Database, new_id, now};

const MAX_DETAILS_LENGTH: usize = 500;

/// What a report points at: exactly one of a blog or a user.
#[derive(Debug, Clone)]
pub enum ReportTarget {
    Blog(String),
    User(String),
}

impl Database {
    pub fn create_report(
        &self,
        reporter_id: &str,
        target: ReportTarget,
        reason: ReportReason,
        details: Option<&str>,
    ) -> Result<String, CoreError> {
        let details = match details.map(str::trim) {
            Some(d) if d.chars().count() > MAX_DETAILS_LENGTH => {
                return Err(CoreError::bad_request(
                    "Additional details cannot exceed 500 characters",
                ));
            }
            Some("") | None => None,
            Some(d) => Some(d.to_string()),
        };

        self.with_tx(|tx| {
            query_user_by_id(tx, reporter_id)?
                .ok_or_else(|| CoreError::not_found("User not found"))?;

            let (blog_id, reported_user_id) = match &target {
                ReportTarget::Blog(blog_id) => {
                    let blog = query_blog_by_id(tx, blog_id)?
                        .ok_or_else(|| CoreError::not_found("Blog not found"))?;
                    if blog.user_id == reporter_id {
                        return Err(CoreError::bad_request("You cannot report your own post"));
                    }
                    (Some(blog_id.clone()), None)
                }
                ReportTarget::User(user_id) => {
                    query_user_by_id(tx, user_id)?
                        .ok_or_else(|| CoreError::not_found("User not found"))?;
                    if user_id == reporter_id {
                        return Err(CoreError::bad_request("You cannot report yourself"));
                    }
                    (None, Some(user_id.clone()))
                }
            };

            let id = new_id();
            tx.execute(
                "INSERT INTO reports (id, reporter_id, blog_id, reported_user_id, reason, details, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    reporter_id,
                    blog_id,
                    reported_user_id,
                    reason.as_str(),
                    details,
                    now(),
                ],
            )?;
            Ok(id)
        })
    }
}
