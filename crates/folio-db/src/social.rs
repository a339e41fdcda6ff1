use rusqlite::{Connection, params};

use crate::error::is_unique_violation;
use crate::notifications::notify_follow;
use crate::users::query_user_by_id;
use crate::{CoreError, Database, new_id, now};

impl Database {
    pub fn follow(&self, follower_id: &str, followee_id: &str) -> Result<(), CoreError> {
        if follower_id == followee_id {
            return Err(CoreError::bad_request("You cannot follow yourself"));
        }

        self.with_tx(|tx| {
            let follower = query_user_by_id(tx, follower_id)?
                .ok_or_else(|| CoreError::not_found("User not found"))?;
            let followee = query_user_by_id(tx, followee_id)?
                .ok_or_else(|| CoreError::not_found("User not found"))?;

            let exists: i64 = tx.query_row(
                "SELECT COUNT(*) FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
                params![follower_id, followee_id],
                |r| r.get(0),
            )?;
            if exists > 0 {
                return Err(CoreError::conflict("Already following"));
            }

            let inserted = tx.execute(
                "INSERT INTO follows (id, follower_id, followee_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![new_id(), follower_id, followee_id, now()],
            );
            match inserted {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => {
                    return Err(CoreError::conflict("Already following"));
                }
                Err(e) => return Err(e.into()),
            }

            notify_follow(tx, &follower, &followee)?;
            Ok(())
        })
    }

    /// Remove-if-present: unfollowing someone you don't follow is a no-op.
    pub fn unfollow(&self, follower_id: &str, followee_id: &str) -> Result<(), CoreError> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
                params![follower_id, followee_id],
            )?;
            Ok(())
        })
    }

    pub fn following_ids(&self, user_id: &str) -> Result<Vec<String>, CoreError> {
        self.with_conn(|conn| query_following_ids(conn, user_id))
    }

    pub fn follower_count(&self, user_id: &str) -> Result<i64, CoreError> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM follows WHERE followee_id = ?1",
                [user_id],
                |r| r.get(0),
            )?;
            Ok(count)
        })
    }

    pub fn following_count(&self, user_id: &str) -> Result<i64, CoreError> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM follows WHERE follower_id = ?1",
                [user_id],
                |r| r.get(0),
            )?;
            Ok(count)
        })
    }
}

/// IDs the user follows, in edge-insertion order (stable within a call).
pub fn query_following_ids(conn: &Connection, user_id: &str) -> Result<Vec<String>, CoreError> {
    let mut stmt = conn.prepare(
        "SELECT followee_id FROM follows WHERE follower_id = ?1 ORDER BY created_at, id",
    )?;
    let ids = stmt
        .query_map([user_id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}
