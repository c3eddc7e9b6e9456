mod comments;
mod follows;
mod likes;
mod posts;
mod tags;
mod tokens;
mod users;

use super::models::{CommentRecord, PostRecord, TagRecord, UserRecord};
use anyhow::Result;
use rusqlite::Connection;

pub trait UserRepository {
    fn create(&self, record: &UserRecord) -> Result<i64>;
    fn get(&self, id: i64) -> Result<Option<UserRecord>>;
    fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>>;
    fn email_exists(&self, email: &str, exclude_id: Option<i64>) -> Result<bool>;
    fn username_exists(&self, username: &str, exclude_id: Option<i64>) -> Result<bool>;
    fn update_profile(&self, record: &UserRecord) -> Result<()>;
    fn set_avatar(&self, id: i64, avatar: &str, updated_at: &str) -> Result<()>;
}

pub trait TokenRepository {
    fn insert(&self, user_id: i64, token_hash: &str, created_at: &str) -> Result<()>;
    fn find_user(&self, token_hash: &str) -> Result<Option<UserRecord>>;
    fn revoke(&self, token_hash: &str) -> Result<()>;
}

pub trait PostRepository {
    fn create(&self, record: &PostRecord) -> Result<i64>;
    fn update(&self, record: &PostRecord) -> Result<()>;
    fn delete(&self, id: i64) -> Result<()>;
    fn get(&self, id: i64) -> Result<Option<PostRecord>>;
    fn get_by_slug(&self, slug: &str) -> Result<Option<PostRecord>>;
    fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;
    fn list_published(&self, search: Option<&str>, limit: i64, offset: i64)
        -> Result<Vec<PostRecord>>;
    fn count_published(&self, search: Option<&str>) -> Result<i64>;
    fn list_for_user(
        &self,
        user_id: i64,
        published_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostRecord>>;
    fn count_for_user(&self, user_id: i64, published_only: bool) -> Result<i64>;
    fn popular_since(&self, window: &str, limit: i64) -> Result<Vec<PostRecord>>;
}

pub trait CommentRepository {
    fn create(&self, record: &CommentRecord) -> Result<i64>;
    fn get(&self, id: i64) -> Result<Option<CommentRecord>>;
    fn delete(&self, id: i64) -> Result<()>;
    fn list_top_level(&self, post_id: i64) -> Result<Vec<CommentRecord>>;
    fn list_replies(&self, parent_id: i64) -> Result<Vec<CommentRecord>>;
    fn replies_count(&self, comment_id: i64) -> Result<i64>;
    fn count_for_post(&self, post_id: i64) -> Result<i64>;
}

pub trait LikeRepository {
    fn toggle_post_like(&self, user_id: i64, post_id: i64, created_at: &str) -> Result<bool>;
    fn toggle_comment_like(&self, user_id: i64, comment_id: i64, created_at: &str)
        -> Result<bool>;
    fn count_for_post(&self, post_id: i64) -> Result<i64>;
    fn count_for_comment(&self, comment_id: i64) -> Result<i64>;
    fn post_liked_by(&self, post_id: i64, user_id: i64) -> Result<bool>;
    fn comment_liked_by(&self, comment_id: i64, user_id: i64) -> Result<bool>;
}

pub trait FollowRepository {
    fn follow(&self, follower_id: i64, followee_id: i64, created_at: &str) -> Result<()>;
    fn unfollow(&self, follower_id: i64, followee_id: i64) -> Result<()>;
    fn is_following(&self, follower_id: i64, followee_id: i64) -> Result<bool>;
    fn followers_count(&self, user_id: i64) -> Result<i64>;
    fn following_count(&self, user_id: i64) -> Result<i64>;
    fn list_followers(&self, user_id: i64, limit: i64, offset: i64) -> Result<Vec<UserRecord>>;
    fn list_following(&self, user_id: i64, limit: i64, offset: i64) -> Result<Vec<UserRecord>>;
}

pub trait TagRepository {
    fn create(&self, record: &TagRecord) -> Result<i64>;
    fn update(&self, record: &TagRecord) -> Result<()>;
    fn delete(&self, id: i64) -> Result<()>;
    fn get_by_slug(&self, slug: &str) -> Result<Option<TagRecord>>;
    fn name_exists(&self, name: &str, exclude_id: Option<i64>) -> Result<bool>;
    fn list(&self) -> Result<Vec<TagRecord>>;
    fn attach(&self, tag_id: i64, post_id: i64) -> Result<()>;
    fn detach(&self, tag_id: i64, post_id: i64) -> Result<()>;
    fn list_for_post(&self, post_id: i64) -> Result<Vec<TagRecord>>;
    fn trending(&self, window: &str, limit: i64) -> Result<Vec<(TagRecord, i64)>>;
}

/// Borrow-scoped access to the rusqlite-backed repository set.
pub struct SqliteRepositories<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRepositories<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn users(&self) -> impl UserRepository + '_ {
        users::SqliteUserRepository { conn: self.conn }
    }

    pub fn tokens(&self) -> impl TokenRepository + '_ {
        tokens::SqliteTokenRepository { conn: self.conn }
    }

    pub fn posts(&self) -> impl PostRepository + '_ {
        posts::SqlitePostRepository { conn: self.conn }
    }

    pub fn comments(&self) -> impl CommentRepository + '_ {
        comments::SqliteCommentRepository { conn: self.conn }
    }

    pub fn likes(&self) -> impl LikeRepository + '_ {
        likes::SqliteLikeRepository { conn: self.conn }
    }

    pub fn follows(&self) -> impl FollowRepository + '_ {
        follows::SqliteFollowRepository { conn: self.conn }
    }

    pub fn tags(&self) -> impl TagRepository + '_ {
        tags::SqliteTagRepository { conn: self.conn }
    }
}
