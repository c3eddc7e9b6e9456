use crate::database::models::UserRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use super::users::{user_from_row, USER_COLUMNS};

pub(super) struct SqliteTokenRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::TokenRepository for SqliteTokenRepository<'conn> {
    fn insert(&self, user_id: i64, token_hash: &str, created_at: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO api_tokens (user_id, token_hash, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, token_hash, created_at],
        )?;
        Ok(())
    }

    fn find_user(&self, token_hash: &str) -> Result<Option<UserRecord>> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE id = (SELECT user_id FROM api_tokens WHERE token_hash = ?1)
            "#
        );
        Ok(self
            .conn
            .query_row(&sql, params![token_hash], user_from_row)
            .optional()?)
    }

    fn revoke(&self, token_hash: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM api_tokens WHERE token_hash = ?1",
            params![token_hash],
        )?;
        Ok(())
    }
}
