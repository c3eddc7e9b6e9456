use crate::database::models::TagRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqliteTagRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

const TAG_COLUMNS: &str = "id, name, slug, created_at";

fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<TagRecord> {
    Ok(TagRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        created_at: row.get(3)?,
    })
}

impl<'conn> super::TagRepository for SqliteTagRepository<'conn> {
    fn create(&self, record: &TagRecord) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO tags (name, slug, created_at) VALUES (?1, ?2, ?3)",
            params![record.name, record.slug, record.created_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&self, record: &TagRecord) -> Result<()> {
        self.conn.execute(
            "UPDATE tags SET name = ?2, slug = ?3 WHERE id = ?1",
            params![record.id, record.name, record.slug],
        )?;
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM tags WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn get_by_slug(&self, slug: &str) -> Result<Option<TagRecord>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {TAG_COLUMNS} FROM tags WHERE slug = ?1"),
                params![slug],
                tag_from_row,
            )
            .optional()?)
    }

    /// Case-sensitive exact match; "Rust" and "rust" are distinct tags.
    fn name_exists(&self, name: &str, exclude_id: Option<i64>) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tags WHERE name = ?1 AND id != COALESCE(?2, -1)",
            params![name, exclude_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn list(&self) -> Result<Vec<TagRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {TAG_COLUMNS} FROM tags ORDER BY name ASC"))?;
        let rows = stmt.query_map([], tag_from_row)?;
        let mut tags = Vec::new();
        for row in rows {
            tags.push(row?);
        }
        Ok(tags)
    }

    /// Idempotent attach: repeating an attach never raises a duplicate error.
    fn attach(&self, tag_id: i64, post_id: i64) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO post_tag (post_id, tag_id) VALUES (?1, ?2)",
            params![post_id, tag_id],
        )?;
        Ok(())
    }

    /// No-op when the pair is not attached.
    fn detach(&self, tag_id: i64, post_id: i64) -> Result<()> {
        self.conn.execute(
            "DELETE FROM post_tag WHERE post_id = ?1 AND tag_id = ?2",
            params![post_id, tag_id],
        )?;
        Ok(())
    }

    fn list_for_post(&self, post_id: i64) -> Result<Vec<TagRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT t.id, t.name, t.slug, t.created_at
            FROM tags t
            JOIN post_tag pt ON pt.tag_id = t.id
            WHERE pt.post_id = ?1
            ORDER BY t.name ASC
            "#,
        )?;
        let rows = stmt.query_map(params![post_id], tag_from_row)?;
        let mut tags = Vec::new();
        for row in rows {
            tags.push(row?);
        }
        Ok(tags)
    }

    /// Tags ranked by how many posts were published inside the trailing
    /// window; tags with no such posts are excluded by the inner join.
    fn trending(&self, window: &str, limit: i64) -> Result<Vec<(TagRecord, i64)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT t.id, t.name, t.slug, t.created_at, COUNT(p.id) AS posts_count
            FROM tags t
            JOIN post_tag pt ON pt.tag_id = t.id
            JOIN posts p ON p.id = pt.post_id
            WHERE p.status = 'published'
              AND p.published_at IS NOT NULL
              AND datetime(p.published_at) <= datetime('now')
              AND datetime(p.published_at) >= datetime('now', ?1)
            GROUP BY t.id
            ORDER BY posts_count DESC, t.name ASC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![window, limit], |row| {
            Ok((tag_from_row(row)?, row.get::<_, i64>(4)?))
        })?;
        let mut tags = Vec::new();
        for row in rows {
            tags.push(row?);
        }
        Ok(tags)
    }
}
