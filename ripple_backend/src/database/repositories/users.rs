use crate::database::models::UserRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqliteUserRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

pub(super) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        username: row.get(3)?,
        bio: row.get(4)?,
        avatar: row.get(5)?,
        password_hash: row.get(6)?,
        email_verified_at: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

pub(super) const USER_COLUMNS: &str =
    "id, name, email, username, bio, avatar, password_hash, email_verified_at, created_at, updated_at";

impl<'conn> super::UserRepository for SqliteUserRepository<'conn> {
    fn create(&self, record: &UserRecord) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO users (name, email, username, bio, avatar, password_hash, email_verified_at, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                record.name,
                record.email,
                record.username,
                record.bio,
                record.avatar,
                record.password_hash,
                record.email_verified_at,
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: i64) -> Result<Option<UserRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()?)
    }

    fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                user_from_row,
            )
            .optional()?)
    }

    fn email_exists(&self, email: &str, exclude_id: Option<i64>) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1 AND id != COALESCE(?2, -1)",
            params![email, exclude_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn username_exists(&self, username: &str, exclude_id: Option<i64>) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1 AND id != COALESCE(?2, -1)",
            params![username, exclude_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn update_profile(&self, record: &UserRecord) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE users
            SET name = ?2, email = ?3, username = ?4, bio = ?5, updated_at = ?6
            WHERE id = ?1
            "#,
            params![
                record.id,
                record.name,
                record.email,
                record.username,
                record.bio,
                record.updated_at,
            ],
        )?;
        Ok(())
    }

    fn set_avatar(&self, id: i64, avatar: &str, updated_at: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE users SET avatar = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, avatar, updated_at],
        )?;
        Ok(())
    }
}
