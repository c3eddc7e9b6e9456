use crate::database::models::UserRecord;
use anyhow::Result;
use rusqlite::{params, Connection};

use super::users::user_from_row;

// Qualified to disambiguate from the join's created_at column.
const USER_COLUMNS: &str = "users.id, users.name, users.email, users.username, users.bio, \
     users.avatar, users.password_hash, users.email_verified_at, users.created_at, users.updated_at";

pub(super) struct SqliteFollowRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::FollowRepository for SqliteFollowRepository<'conn> {
    /// Idempotent attach: re-following is a no-op, never an error.
    fn follow(&self, follower_id: i64, followee_id: i64, created_at: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO follows (follower_id, followee_id, created_at) VALUES (?1, ?2, ?3)",
            params![follower_id, followee_id, created_at],
        )?;
        Ok(())
    }

    /// Idempotent detach: unfollowing an absent pair is a no-op.
    fn unfollow(&self, follower_id: i64, followee_id: i64) -> Result<()> {
        self.conn.execute(
            "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
            params![follower_id, followee_id],
        )?;
        Ok(())
    }

    fn is_following(&self, follower_id: i64, followee_id: i64) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
            params![follower_id, followee_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn followers_count(&self, user_id: i64) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM follows WHERE followee_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?)
    }

    fn following_count(&self, user_id: i64) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?)
    }

    fn list_followers(&self, user_id: i64, limit: i64, offset: i64) -> Result<Vec<UserRecord>> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            JOIN follows f ON f.follower_id = users.id
            WHERE f.followee_id = ?1
            ORDER BY datetime(f.created_at) DESC, users.id DESC
            LIMIT ?2 OFFSET ?3
            "#
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id, limit, offset], user_from_row)?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    fn list_following(&self, user_id: i64, limit: i64, offset: i64) -> Result<Vec<UserRecord>> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            JOIN follows f ON f.followee_id = users.id
            WHERE f.follower_id = ?1
            ORDER BY datetime(f.created_at) DESC, users.id DESC
            LIMIT ?2 OFFSET ?3
            "#
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id, limit, offset], user_from_row)?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }
}
