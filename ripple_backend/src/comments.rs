//! Threaded comments. Top-level comments list newest first, replies oldest
//! first, and a reply always lands on its parent's post.

use crate::auth::can_mutate;
use crate::content::UserSummary;
use crate::database::models::{CommentRecord, UserRecord};
use crate::database::repositories::{
    CommentRepository, LikeRepository, PostRepository, SqliteRepositories, UserRepository,
};
use crate::database::Database;
use crate::error::{FieldErrors, RippleError};
use crate::utils::now_utc_iso;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};

const MAX_BODY_LENGTH: usize = 1000;
/// Reply chains below this depth are not expanded inline; `replies_count`
/// still reports them, so clients can fetch deeper levels on demand.
const MAX_THREAD_DEPTH: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub user_id: i64,
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub body: String,
    pub created_at: String,
    pub updated_at: String,
    pub likes_count: i64,
    pub replies_count: i64,
    pub is_liked: bool,
    pub user: UserSummary,
    pub replies: Vec<CommentView>,
}

fn comment_view(
    repos: &SqliteRepositories<'_>,
    record: &CommentRecord,
    viewer: Option<i64>,
    depth: usize,
) -> anyhow::Result<CommentView> {
    let author = repos
        .users()
        .get(record.user_id)?
        .ok_or_else(|| anyhow!("comment {} has no author row", record.id))?;
    let likes_count = repos.likes().count_for_comment(record.id)?;
    let replies_count = repos.comments().replies_count(record.id)?;
    let is_liked = match viewer {
        Some(user_id) => repos.likes().comment_liked_by(record.id, user_id)?,
        None => false,
    };
    let replies = if depth > 0 {
        let mut replies = Vec::new();
        for reply in repos.comments().list_replies(record.id)? {
            replies.push(comment_view(repos, &reply, viewer, depth - 1)?);
        }
        replies
    } else {
        Vec::new()
    };
    Ok(CommentView {
        id: record.id,
        user_id: record.user_id,
        post_id: record.post_id,
        parent_id: record.parent_id,
        body: record.body.clone(),
        created_at: record.created_at.clone(),
        updated_at: record.updated_at.clone(),
        likes_count,
        replies_count,
        is_liked,
        user: UserSummary::from_record(&author),
        replies,
    })
}

/// Full comment tree for a post: top-level comments with their reply chains.
pub(crate) fn views_for_post(
    repos: &SqliteRepositories<'_>,
    post_id: i64,
    viewer: Option<i64>,
) -> anyhow::Result<Vec<CommentView>> {
    let mut views = Vec::new();
    for record in repos.comments().list_top_level(post_id)? {
        views.push(comment_view(repos, &record, viewer, MAX_THREAD_DEPTH)?);
    }
    Ok(views)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCommentInput {
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

#[derive(Clone)]
pub struct CommentService {
    database: Database,
}

impl CommentService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn list_for_post(
        &self,
        post_slug: &str,
        viewer: Option<i64>,
    ) -> Result<Vec<CommentView>, RippleError> {
        let views = self.database.with_repositories(|repos| {
            let post = repos.posts().get_by_slug(post_slug)?;
            Ok(match post {
                Some(post) => Some(views_for_post(&repos, post.id, viewer)?),
                None => None,
            })
        })?;
        views.ok_or_else(|| RippleError::NotFound("Post not found.".into()))
    }

    pub fn create(
        &self,
        author: &UserRecord,
        post_slug: &str,
        input: CreateCommentInput,
    ) -> Result<CommentView, RippleError> {
        let post = self
            .database
            .with_repositories(|repos| repos.posts().get_by_slug(post_slug))?
            .ok_or_else(|| RippleError::NotFound("Post not found.".into()))?;

        let body = validate_body(&input.body)?;
        if let Some(parent_id) = input.parent_id {
            let parent = self
                .database
                .with_repositories(|repos| repos.comments().get(parent_id))?;
            // A parent on another post would splice threads together.
            match parent {
                Some(parent) if parent.post_id == post.id => {}
                _ => {
                    return Err(FieldErrors::single(
                        "parent_id",
                        "The selected parent id is invalid.",
                    ))
                }
            }
        }

        self.insert(author, post.id, input.parent_id, body)
    }

    /// Reply addressed by parent comment id; the post is inherited from the
    /// parent.
    pub fn create_reply(
        &self,
        author: &UserRecord,
        parent_id: i64,
        body: &str,
    ) -> Result<CommentView, RippleError> {
        let parent = self
            .database
            .with_repositories(|repos| repos.comments().get(parent_id))?
            .ok_or_else(|| RippleError::NotFound("Comment not found.".into()))?;
        let body = validate_body(body)?;
        self.insert(author, parent.post_id, Some(parent.id), body)
    }

    pub fn delete(&self, actor: &UserRecord, comment_id: i64) -> Result<(), RippleError> {
        let record = self
            .database
            .with_repositories(|repos| repos.comments().get(comment_id))?
            .ok_or_else(|| RippleError::NotFound("Comment not found.".into()))?;
        if !can_mutate(Some(actor), record.user_id) {
            return Err(RippleError::Forbidden(
                "You are not allowed to delete this comment.".into(),
            ));
        }
        self.database
            .with_repositories(|repos| repos.comments().delete(record.id))?;
        tracing::info!(comment_id = record.id, post_id = record.post_id, "comment deleted");
        Ok(())
    }

    fn insert(
        &self,
        author: &UserRecord,
        post_id: i64,
        parent_id: Option<i64>,
        body: String,
    ) -> Result<CommentView, RippleError> {
        let now = now_utc_iso();
        let record = CommentRecord {
            id: 0,
            user_id: author.id,
            post_id,
            parent_id,
            body,
            created_at: now.clone(),
            updated_at: now,
        };
        let view = self.database.with_repositories(|repos| {
            let id = repos.comments().create(&record)?;
            let stored = repos
                .comments()
                .get(id)?
                .ok_or_else(|| anyhow!("created comment {id} missing"))?;
            comment_view(&repos, &stored, Some(author.id), 0)
        })?;
        Ok(view)
    }
}

fn validate_body(body: &str) -> Result<String, RippleError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(FieldErrors::single("body", "The body field is required."));
    }
    if trimmed.chars().count() > MAX_BODY_LENGTH {
        return Err(FieldErrors::single(
            "body",
            "The body may not be greater than 1000 characters.",
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthService, RegisterInput};
    use crate::content::{CreatePostInput, PostService};
    use rusqlite::Connection;

    fn setup() -> (Database, UserRecord, String) {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let db = Database::from_connection(conn, true);
        db.ensure_migrations().expect("migrations");
        let auth = AuthService::new(db.clone());
        let (_, token) = auth
            .register(RegisterInput {
                name: "Author".into(),
                email: "author@example.com".into(),
                password: "password123".into(),
                password_confirmation: None,
            })
            .expect("register");
        let user = auth.resolve_token(&token).unwrap().unwrap();
        let post = PostService::new(db.clone())
            .create(
                &user,
                CreatePostInput {
                    title: "Commentable".into(),
                    content: "body".into(),
                    status: Some("published".into()),
                    ..Default::default()
                },
            )
            .expect("create post");
        (db, user, post.slug)
    }

    fn comment_input(body: &str) -> CreateCommentInput {
        CreateCommentInput {
            body: body.into(),
            parent_id: None,
        }
    }

    #[test]
    fn top_level_comments_list_newest_first() {
        let (db, user, slug) = setup();
        let service = CommentService::new(db);
        let first = service.create(&user, &slug, comment_input("first")).unwrap();
        let second = service.create(&user, &slug, comment_input("second")).unwrap();

        let listed = service.list_for_post(&slug, None).unwrap();
        assert_eq!(listed.len(), 2);
        // Same-second timestamps fall back to id ordering.
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[test]
    fn replies_nest_under_parent_oldest_first() {
        let (db, user, slug) = setup();
        let service = CommentService::new(db);
        let parent = service.create(&user, &slug, comment_input("parent")).unwrap();
        let first = service.create_reply(&user, parent.id, "first reply").unwrap();
        let second = service.create_reply(&user, parent.id, "second reply").unwrap();
        assert_eq!(first.post_id, parent.post_id);
        assert_eq!(first.parent_id, Some(parent.id));

        let listed = service.list_for_post(&slug, None).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].replies_count, 2);
        assert_eq!(listed[0].replies[0].id, first.id);
        assert_eq!(listed[0].replies[1].id, second.id);
    }

    #[test]
    fn deep_reply_chains_stop_expanding_at_the_depth_cap() {
        let (db, user, slug) = setup();
        let service = CommentService::new(db);
        let root = service.create(&user, &slug, comment_input("root")).unwrap();
        let mut parent_id = root.id;
        for i in 0..(MAX_THREAD_DEPTH + 2) {
            parent_id = service
                .create_reply(&user, parent_id, &format!("level {i}"))
                .unwrap()
                .id;
        }

        let listed = service.list_for_post(&slug, None).unwrap();
        let mut cursor = &listed[0];
        let mut expanded = 0;
        while let Some(next) = cursor.replies.first() {
            cursor = next;
            expanded += 1;
        }
        assert_eq!(expanded, MAX_THREAD_DEPTH);
        // The deepest expanded node still advertises its hidden children.
        assert_eq!(cursor.replies_count, 1);
        assert!(cursor.replies.is_empty());
    }

    #[test]
    fn parent_from_another_post_is_rejected() {
        let (db, user, slug) = setup();
        let other_post = PostService::new(db.clone())
            .create(
                &user,
                CreatePostInput {
                    title: "Other Post".into(),
                    content: "body".into(),
                    status: Some("published".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        let service = CommentService::new(db);
        let parent = service
            .create(&user, &other_post.slug, comment_input("elsewhere"))
            .unwrap();

        let err = service
            .create(
                &user,
                &slug,
                CreateCommentInput {
                    body: "crossing threads".into(),
                    parent_id: Some(parent.id),
                },
            )
            .unwrap_err();
        let RippleError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.contains("parent_id"));
    }

    #[test]
    fn body_validation_bounds() {
        let (db, user, slug) = setup();
        let service = CommentService::new(db);
        assert!(matches!(
            service.create(&user, &slug, comment_input("  ")),
            Err(RippleError::Validation(_))
        ));
        let long = "x".repeat(1001);
        assert!(matches!(
            service.create(&user, &slug, comment_input(&long)),
            Err(RippleError::Validation(_))
        ));
        assert!(service
            .create(&user, &slug, comment_input(&"x".repeat(1000)))
            .is_ok());
    }

    #[test]
    fn only_the_author_deletes_a_comment() {
        let (db, user, slug) = setup();
        let auth = AuthService::new(db.clone());
        let (_, token) = auth
            .register(RegisterInput {
                name: "Other".into(),
                email: "other@example.com".into(),
                password: "password123".into(),
                password_confirmation: None,
            })
            .unwrap();
        let other = auth.resolve_token(&token).unwrap().unwrap();

        let service = CommentService::new(db);
        let comment = service.create(&user, &slug, comment_input("mine")).unwrap();
        assert!(matches!(
            service.delete(&other, comment.id),
            Err(RippleError::Forbidden(_))
        ));
        service.delete(&user, comment.id).unwrap();
        assert!(matches!(
            service.delete(&user, comment.id),
            Err(RippleError::NotFound(_))
        ));
    }

    #[test]
    fn missing_post_and_parent_yield_not_found() {
        let (db, user, _) = setup();
        let service = CommentService::new(db);
        assert!(matches!(
            service.create(&user, "no-such-post", comment_input("hi")),
            Err(RippleError::NotFound(_))
        ));
        assert!(matches!(
            service.create_reply(&user, 9999, "hi"),
            Err(RippleError::NotFound(_))
        ));
    }
}
