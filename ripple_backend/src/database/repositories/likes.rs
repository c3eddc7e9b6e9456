use anyhow::Result;
use rusqlite::{params, Connection};

pub(super) struct SqliteLikeRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::LikeRepository for SqliteLikeRepository<'conn> {
    /// Flips the like state for (user, post) in one transaction. The UNIQUE
    /// constraint on the pair makes the insert attempt the existence check:
    /// a no-op insert means the row was already there, so it gets deleted.
    fn toggle_post_like(&self, user_id: i64, post_id: i64, created_at: &str) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO likes (user_id, post_id, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, post_id, created_at],
        )?;
        let liked = if inserted == 1 {
            true
        } else {
            tx.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND post_id = ?2",
                params![user_id, post_id],
            )?;
            false
        };
        tx.commit()?;
        Ok(liked)
    }

    fn toggle_comment_like(&self, user_id: i64, comment_id: i64, created_at: &str) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO comment_likes (user_id, comment_id, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, comment_id, created_at],
        )?;
        let liked = if inserted == 1 {
            true
        } else {
            tx.execute(
                "DELETE FROM comment_likes WHERE user_id = ?1 AND comment_id = ?2",
                params![user_id, comment_id],
            )?;
            false
        };
        tx.commit()?;
        Ok(liked)
    }

    fn count_for_post(&self, post_id: i64) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM likes WHERE post_id = ?1",
            params![post_id],
            |row| row.get(0),
        )?)
    }

    fn count_for_comment(&self, comment_id: i64) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM comment_likes WHERE comment_id = ?1",
            params![comment_id],
            |row| row.get(0),
        )?)
    }

    fn post_liked_by(&self, post_id: i64, user_id: i64) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM likes WHERE post_id = ?1 AND user_id = ?2",
            params![post_id, user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn comment_liked_by(&self, comment_id: i64, user_id: i64) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM comment_likes WHERE comment_id = ?1 AND user_id = ?2",
            params![comment_id, user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
