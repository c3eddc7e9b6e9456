//! Likes and follows. Toggles and follow edges are idempotent: repeating an
//! action converges on a state instead of erroring.

use crate::database::models::UserRecord;
use crate::database::repositories::{
    CommentRepository, FollowRepository, LikeRepository, PostRepository, UserRepository,
};
use crate::database::Database;
use crate::error::RippleError;
use crate::utils::now_utc_iso;
use serde::Serialize;

/// Outcome of a like toggle: the new state plus the live count.
#[derive(Debug, Clone, Serialize)]
pub struct LikeOutcome {
    pub liked: bool,
    pub likes_count: i64,
}

/// Follower totals for the followee after a follow or unfollow.
#[derive(Debug, Clone, Serialize)]
pub struct FollowCounts {
    pub followers_count: i64,
    pub following_count: i64,
}

#[derive(Clone)]
pub struct EngagementService {
    database: Database,
}

impl EngagementService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn toggle_post_like(
        &self,
        user: &UserRecord,
        post_slug: &str,
    ) -> Result<LikeOutcome, RippleError> {
        let outcome = self.database.with_repositories(|repos| {
            let post = repos.posts().get_by_slug(post_slug)?;
            let Some(post) = post else {
                return Ok(None);
            };
            let liked = repos
                .likes()
                .toggle_post_like(user.id, post.id, &now_utc_iso())?;
            let likes_count = repos.likes().count_for_post(post.id)?;
            Ok(Some(LikeOutcome { liked, likes_count }))
        })?;
        outcome.ok_or_else(|| RippleError::NotFound("Post not found.".into()))
    }

    pub fn toggle_comment_like(
        &self,
        user: &UserRecord,
        comment_id: i64,
    ) -> Result<LikeOutcome, RippleError> {
        let outcome = self.database.with_repositories(|repos| {
            let comment = repos.comments().get(comment_id)?;
            let Some(comment) = comment else {
                return Ok(None);
            };
            let liked = repos
                .likes()
                .toggle_comment_like(user.id, comment.id, &now_utc_iso())?;
            let likes_count = repos.likes().count_for_comment(comment.id)?;
            Ok(Some(LikeOutcome { liked, likes_count }))
        })?;
        outcome.ok_or_else(|| RippleError::NotFound("Comment not found.".into()))
    }

    pub fn follow(
        &self,
        follower: &UserRecord,
        followee_id: i64,
    ) -> Result<FollowCounts, RippleError> {
        if follower.id == followee_id {
            return Err(RippleError::BadRequest("You cannot follow yourself.".into()));
        }
        let counts = self.database.with_repositories(|repos| {
            let followee = repos.users().get(followee_id)?;
            let Some(followee) = followee else {
                return Ok(None);
            };
            repos
                .follows()
                .follow(follower.id, followee.id, &now_utc_iso())?;
            Ok(Some(FollowCounts {
                followers_count: repos.follows().followers_count(followee.id)?,
                following_count: repos.follows().following_count(followee.id)?,
            }))
        })?;
        counts.ok_or_else(|| RippleError::NotFound("User not found.".into()))
    }

    pub fn unfollow(
        &self,
        follower: &UserRecord,
        followee_id: i64,
    ) -> Result<FollowCounts, RippleError> {
        let counts = self.database.with_repositories(|repos| {
            let followee = repos.users().get(followee_id)?;
            let Some(followee) = followee else {
                return Ok(None);
            };
            repos.follows().unfollow(follower.id, followee.id)?;
            Ok(Some(FollowCounts {
                followers_count: repos.follows().followers_count(followee.id)?,
                following_count: repos.follows().following_count(followee.id)?,
            }))
        })?;
        counts.ok_or_else(|| RippleError::NotFound("User not found.".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthService, RegisterInput};
    use crate::comments::{CommentService, CreateCommentInput};
    use crate::content::{CreatePostInput, PostService};
    use rusqlite::Connection;

    fn register(db: &Database, email: &str) -> UserRecord {
        let auth = AuthService::new(db.clone());
        let (_, token) = auth
            .register(RegisterInput {
                name: "User".into(),
                email: email.into(),
                password: "password123".into(),
                password_confirmation: None,
            })
            .expect("register");
        auth.resolve_token(&token).unwrap().unwrap()
    }

    fn setup() -> (Database, UserRecord, String) {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let db = Database::from_connection(conn, true);
        db.ensure_migrations().expect("migrations");
        let user = register(&db, "author@example.com");
        let post = PostService::new(db.clone())
            .create(
                &user,
                CreatePostInput {
                    title: "Likeable".into(),
                    content: "body".into(),
                    status: Some("published".into()),
                    ..Default::default()
                },
            )
            .expect("create post");
        (db, user, post.slug)
    }

    #[test]
    fn post_like_toggles_with_live_count() {
        let (db, user, slug) = setup();
        let other = register(&db, "other@example.com");
        let service = EngagementService::new(db);

        let first = service.toggle_post_like(&user, &slug).unwrap();
        assert!(first.liked);
        assert_eq!(first.likes_count, 1);

        let second = service.toggle_post_like(&other, &slug).unwrap();
        assert!(second.liked);
        assert_eq!(second.likes_count, 2);

        let third = service.toggle_post_like(&user, &slug).unwrap();
        assert!(!third.liked);
        assert_eq!(third.likes_count, 1);
    }

    #[test]
    fn comment_like_toggles() {
        let (db, user, slug) = setup();
        let comment = CommentService::new(db.clone())
            .create(
                &user,
                &slug,
                CreateCommentInput {
                    body: "likeable comment".into(),
                    parent_id: None,
                },
            )
            .unwrap();
        let service = EngagementService::new(db);

        let liked = service.toggle_comment_like(&user, comment.id).unwrap();
        assert!(liked.liked);
        assert_eq!(liked.likes_count, 1);
        let unliked = service.toggle_comment_like(&user, comment.id).unwrap();
        assert!(!unliked.liked);
        assert_eq!(unliked.likes_count, 0);
    }

    #[test]
    fn simultaneous_toggles_leave_at_most_one_like() {
        let (db, user, slug) = setup();
        let service = EngagementService::new(db.clone());

        let mut handles = Vec::new();
        for _ in 0..4 {
            let service = service.clone();
            let user = user.clone();
            let slug = slug.clone();
            handles.push(std::thread::spawn(move || {
                service.toggle_post_like(&user, &slug).unwrap()
            }));
        }
        for handle in handles {
            let outcome = handle.join().unwrap();
            // A single user can never account for more than one like.
            assert!(outcome.likes_count <= 1);
        }

        let final_count = db
            .with_repositories(|repos| {
                let post = repos.posts().get_by_slug(&slug)?.expect("post exists");
                repos.likes().count_for_post(post.id)
            })
            .unwrap();
        assert!(final_count <= 1);
    }

    #[test]
    fn like_targets_must_exist() {
        let (db, user, _) = setup();
        let service = EngagementService::new(db);
        assert!(matches!(
            service.toggle_post_like(&user, "missing"),
            Err(RippleError::NotFound(_))
        ));
        assert!(matches!(
            service.toggle_comment_like(&user, 9999),
            Err(RippleError::NotFound(_))
        ));
    }

    #[test]
    fn follow_is_idempotent_and_self_follow_is_rejected() {
        let (db, user, _) = setup();
        let other = register(&db, "other@example.com");
        let service = EngagementService::new(db);

        let counts = service.follow(&user, other.id).unwrap();
        assert_eq!(counts.followers_count, 1);
        let again = service.follow(&user, other.id).unwrap();
        assert_eq!(again.followers_count, 1);

        assert!(matches!(
            service.follow(&user, user.id),
            Err(RippleError::BadRequest(_))
        ));
        assert!(matches!(
            service.follow(&user, 9999),
            Err(RippleError::NotFound(_))
        ));
    }

    #[test]
    fn unfollow_tolerates_missing_edge() {
        let (db, user, _) = setup();
        let other = register(&db, "other@example.com");
        let service = EngagementService::new(db);

        service.follow(&user, other.id).unwrap();
        let counts = service.unfollow(&user, other.id).unwrap();
        assert_eq!(counts.followers_count, 0);
        let again = service.unfollow(&user, other.id).unwrap();
        assert_eq!(again.followers_count, 0);
    }
}
