use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub password_hash: String,
    pub email_verified_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    /// 'draft' or 'published'
    pub status: String,
    pub published_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl PostRecord {
    /// Mirrors the SQL visibility predicate: published status with a
    /// publication timestamp that is not in the future.
    pub fn is_published(&self) -> bool {
        if self.status != "published" {
            return false;
        }
        match self.published_at.as_deref() {
            Some(ts) => DateTime::parse_from_rfc3339(ts)
                .map(|dt| dt.with_timezone(&Utc) <= Utc::now())
                .unwrap_or(false),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: i64,
    pub user_id: i64,
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub body: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::now_utc_iso;

    fn post(status: &str, published_at: Option<String>) -> PostRecord {
        PostRecord {
            id: 1,
            user_id: 1,
            title: "t".into(),
            slug: "t".into(),
            content: "c".into(),
            excerpt: "c".into(),
            status: status.into(),
            published_at,
            created_at: now_utc_iso(),
            updated_at: now_utc_iso(),
        }
    }

    #[test]
    fn future_dated_posts_are_not_published_yet() {
        assert!(post("published", Some(now_utc_iso())).is_published());

        let tomorrow = (Utc::now() + chrono::Duration::days(1)).to_rfc3339();
        assert!(!post("published", Some(tomorrow)).is_published());

        assert!(!post("published", None).is_published());
        assert!(!post("draft", Some(now_utc_iso())).is_published());
        assert!(!post("published", Some("not a timestamp".into())).is_published());
    }
}
