use rusqlite::{Connection, OptionalExtension, params};

use folio_types::models::{UserRole, UserStatus};

use crate::error::is_unique_violation;
use crate::models::UserRow;
use crate::{CoreError, Database, new_id, now};

impl Database {
    /// Register a new user. The password arrives pre-hashed from the boundary
    /// layer. The first registered user becomes admin, decided from the row
    /// count inside the same transaction as the insert.
    pub fn register_user(
        &self,
        first_name: &str,
        last_name: &str,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<UserRow, CoreError> {
        self.with_tx(|tx| {
            if query_user_by_email(tx, email)?.is_some() {
                return Err(CoreError::conflict("Email already used"));
            }
            if query_user_by_username(tx, username)?.is_some() {
                return Err(CoreError::conflict("Username already used"));
            }

            let existing: i64 = tx.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
            let role = if existing == 0 {
                UserRole::Admin
            } else {
                UserRole::User
            };

            let row = UserRow {
                id: new_id(),
                username: username.to_string(),
                email: email.to_string(),
                password: password_hash.to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                bio: None,
                avatar: None,
                status: UserStatus::Active.as_str().to_string(),
                role: role.as_str().to_string(),
                created_at: now(),
            };

            let inserted = tx.execute(
                "INSERT INTO users (id, username, email, password, first_name, last_name, status, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    row.id,
                    row.username,
                    row.email,
                    row.password,
                    row.first_name,
                    row.last_name,
                    row.status,
                    row.role,
                    row.created_at,
                ],
            );
            match inserted {
                Ok(_) => Ok(row),
                Err(e) if is_unique_violation(&e) => {
                    Err(CoreError::conflict("Username or email already used"))
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn user_by_id(&self, id: &str) -> Result<UserRow, CoreError> {
        self.with_conn(|conn| {
            query_user_by_id(conn, id)?.ok_or_else(|| CoreError::not_found("User not found"))
        })
    }

    /// Login lookup by email or username.
    pub fn user_by_identifier(&self, identifier: &str) -> Result<Option<UserRow>, CoreError> {
        self.with_conn(|conn| {
            if let Some(user) = query_user_by_email(conn, identifier)? {
                return Ok(Some(user));
            }
            query_user_by_username(conn, identifier)
        })
    }
}

const USER_COLUMNS: &str =
    "id, username, email, password, first_name, last_name, bio, avatar, status, role, created_at";

fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        first_name: row.get(4)?,
        last_name: row.get(5)?,
        bio: row.get(6)?,
        avatar: row.get(7)?,
        status: row.get(8)?,
        role: row.get(9)?,
        created_at: row.get(10)?,
    })
}

pub fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>, CoreError> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?;
    Ok(stmt.query_row([id], user_from_row).optional()?)
}

pub fn query_user_by_username(
    conn: &Connection,
    username: &str,
) -> Result<Option<UserRow>, CoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = ?1"
    ))?;
    Ok(stmt.query_row([username], user_from_row).optional()?)
}

pub fn query_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>, CoreError> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"))?;
    Ok(stmt.query_row([email], user_from_row).optional()?)
}
