use crate::database::models::CommentRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqliteCommentRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

const COMMENT_COLUMNS: &str = "id, user_id, post_id, parent_id, body, created_at, updated_at";

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<CommentRecord> {
    Ok(CommentRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        post_id: row.get(2)?,
        parent_id: row.get(3)?,
        body: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

impl<'conn> super::CommentRepository for SqliteCommentRepository<'conn> {
    fn create(&self, record: &CommentRecord) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO comments (user_id, post_id, parent_id, body, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.user_id,
                record.post_id,
                record.parent_id,
                record.body,
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: i64) -> Result<Option<CommentRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"),
                params![id],
                comment_from_row,
            )
            .optional()?)
    }

    fn delete(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM comments WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Top-level comments for a post, newest first.
    fn list_top_level(&self, post_id: i64) -> Result<Vec<CommentRecord>> {
        let sql = format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comments
            WHERE post_id = ?1 AND parent_id IS NULL
            ORDER BY datetime(created_at) DESC, id DESC
            "#
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![post_id], comment_from_row)?;
        let mut comments = Vec::new();
        for row in rows {
            comments.push(row?);
        }
        Ok(comments)
    }

    /// Replies to a comment, oldest first.
    fn list_replies(&self, parent_id: i64) -> Result<Vec<CommentRecord>> {
        let sql = format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comments
            WHERE parent_id = ?1
            ORDER BY datetime(created_at) ASC, id ASC
            "#
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![parent_id], comment_from_row)?;
        let mut replies = Vec::new();
        for row in rows {
            replies.push(row?);
        }
        Ok(replies)
    }

    fn replies_count(&self, comment_id: i64) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM comments WHERE parent_id = ?1",
            params![comment_id],
            |row| row.get(0),
        )?)
    }

    fn count_for_post(&self, post_id: i64) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM comments WHERE post_id = ?1",
            params![post_id],
            |row| row.get(0),
        )?)
    }
}
