use crate::database::models::PostRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqlitePostRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

const POST_COLUMNS: &str =
    "id, user_id, title, slug, content, excerpt, status, published_at, created_at, updated_at";

/// Visibility predicate for public listings: published status with a
/// publication timestamp that is not in the future.
const PUBLISHED: &str =
    "status = 'published' AND published_at IS NOT NULL AND datetime(published_at) <= datetime('now')";

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRecord> {
    Ok(PostRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        slug: row.get(3)?,
        content: row.get(4)?,
        excerpt: row.get(5)?,
        status: row.get(6)?,
        published_at: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn like_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{s}%"))
}

impl<'conn> super::PostRepository for SqlitePostRepository<'conn> {
    fn create(&self, record: &PostRecord) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO posts (user_id, title, slug, content, excerpt, status, published_at, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                record.user_id,
                record.title,
                record.slug,
                record.content,
                record.excerpt,
                record.status,
                record.published_at,
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&self, record: &PostRecord) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE posts
            SET title = ?2, slug = ?3, content = ?4, excerpt = ?5, status = ?6,
                published_at = ?7, updated_at = ?8
            WHERE id = ?1
            "#,
            params![
                record.id,
                record.title,
                record.slug,
                record.content,
                record.excerpt,
                record.status,
                record.published_at,
                record.updated_at,
            ],
        )?;
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM posts WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn get(&self, id: i64) -> Result<Option<PostRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
                params![id],
                post_from_row,
            )
            .optional()?)
    }

    fn get_by_slug(&self, slug: &str) -> Result<Option<PostRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {POST_COLUMNS} FROM posts WHERE slug = ?1"),
                params![slug],
                post_from_row,
            )
            .optional()?)
    }

    fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM posts WHERE slug = ?1 AND id != COALESCE(?2, -1)",
            params![slug, exclude_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn list_published(&self, search: Option<&str>, limit: i64, offset: i64) -> Result<Vec<PostRecord>> {
        let pattern = like_pattern(search);
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            WHERE {PUBLISHED}
              AND (?1 IS NULL OR title LIKE ?1 OR content LIKE ?1 OR excerpt LIKE ?1)
            ORDER BY datetime(published_at) DESC, id DESC
            LIMIT ?2 OFFSET ?3
            "#
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![pattern, limit, offset], post_from_row)?;
        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }

    fn count_published(&self, search: Option<&str>) -> Result<i64> {
        let pattern = like_pattern(search);
        let sql = format!(
            r#"
            SELECT COUNT(*)
            FROM posts
            WHERE {PUBLISHED}
              AND (?1 IS NULL OR title LIKE ?1 OR content LIKE ?1 OR excerpt LIKE ?1)
            "#
        );
        Ok(self
            .conn
            .query_row(&sql, params![pattern], |row| row.get(0))?)
    }

    fn list_for_user(
        &self,
        user_id: i64,
        published_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostRecord>> {
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            WHERE user_id = ?1 AND (?2 = 0 OR ({PUBLISHED}))
            ORDER BY datetime(created_at) DESC, id DESC
            LIMIT ?3 OFFSET ?4
            "#
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![user_id, published_only as i64, limit, offset],
            post_from_row,
        )?;
        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }

    fn count_for_user(&self, user_id: i64, published_only: bool) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM posts WHERE user_id = ?1 AND (?2 = 0 OR ({PUBLISHED}))"
        );
        Ok(self
            .conn
            .query_row(&sql, params![user_id, published_only as i64], |row| {
                row.get(0)
            })?)
    }

    /// Published posts from the trailing window, ordered by live like count
    /// then comment count.
    fn popular_since(&self, window: &str, limit: i64) -> Result<Vec<PostRecord>> {
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS},
                (SELECT COUNT(*) FROM likes l WHERE l.post_id = posts.id) AS likes_count,
                (SELECT COUNT(*) FROM comments c WHERE c.post_id = posts.id) AS comments_count
            FROM posts
            WHERE {PUBLISHED}
              AND datetime(published_at) >= datetime('now', ?1)
            ORDER BY likes_count DESC, comments_count DESC, datetime(published_at) DESC
            LIMIT ?2
            "#
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![window, limit], post_from_row)?;
        let mut posts = Vec::new();
        for row in rows {
            posts.push(row?);
        }
        Ok(posts)
    }
}
