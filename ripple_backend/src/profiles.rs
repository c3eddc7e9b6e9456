//! Public profiles and the authenticated user's own profile surface:
//! follower counts, post listings, partial profile updates, and avatar
//! uploads sniffed for an actual image payload.

use crate::auth::{email_pattern, AuthUserView};
use crate::config::RipplePaths;
use crate::content::{normalize_page, post_view, Pagination, PostView, UserSummary, PER_PAGE};
use crate::database::models::UserRecord;
use crate::database::repositories::{FollowRepository, PostRepository, UserRepository};
use crate::database::Database;
use crate::error::{FieldErrors, RippleError};
use crate::utils::now_utc_iso;
use anyhow::Context;
use serde::{Deserialize, Serialize};

const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub id: i64,
    pub name: String,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub created_at: String,
    pub followers_count: i64,
    pub following_count: i64,
    pub posts_count: i64,
    pub is_following: bool,
    pub is_own_profile: bool,
    pub posts: Vec<PostView>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

#[derive(Clone)]
pub struct ProfileService {
    database: Database,
    paths: RipplePaths,
}

impl ProfileService {
    pub fn new(database: Database, paths: RipplePaths) -> Self {
        Self { database, paths }
    }

    /// Profile page payload: live counts plus the first page of the user's
    /// posts. Non-owners only ever see published posts.
    pub fn show(&self, user_id: i64, viewer: Option<i64>) -> Result<ProfileView, RippleError> {
        let is_own_profile = viewer == Some(user_id);
        let view = self.database.with_repositories(|repos| {
            let Some(user) = repos.users().get(user_id)? else {
                return Ok(None);
            };
            let published_only = !is_own_profile;
            let followers_count = repos.follows().followers_count(user.id)?;
            let following_count = repos.follows().following_count(user.id)?;
            let posts_count = repos.posts().count_for_user(user.id, published_only)?;
            let is_following = match viewer {
                Some(viewer_id) if viewer_id != user.id => {
                    repos.follows().is_following(viewer_id, user.id)?
                }
                _ => false,
            };
            let records = repos
                .posts()
                .list_for_user(user.id, published_only, PER_PAGE, 0)?;
            let mut posts = Vec::with_capacity(records.len());
            for record in &records {
                posts.push(post_view(&repos, record, viewer, false)?);
            }
            Ok(Some(ProfileView {
                id: user.id,
                name: user.name,
                username: user.username,
                bio: user.bio,
                avatar: user.avatar,
                created_at: user.created_at,
                followers_count,
                following_count,
                posts_count,
                is_following,
                is_own_profile,
                posts,
            }))
        })?;
        view.ok_or_else(|| RippleError::NotFound("User not found.".into()))
    }

    pub fn posts(
        &self,
        user_id: i64,
        page: Option<i64>,
        viewer: Option<i64>,
    ) -> Result<(Vec<PostView>, Pagination), RippleError> {
        let page = normalize_page(page);
        let published_only = viewer != Some(user_id);
        let result = self.database.with_repositories(|repos| {
            let Some(user) = repos.users().get(user_id)? else {
                return Ok(None);
            };
            let total = repos.posts().count_for_user(user.id, published_only)?;
            let pagination = Pagination::new(page, PER_PAGE, total);
            let records = repos.posts().list_for_user(
                user.id,
                published_only,
                pagination.per_page,
                pagination.offset(),
            )?;
            let mut views = Vec::with_capacity(records.len());
            for record in &records {
                views.push(post_view(&repos, record, viewer, false)?);
            }
            Ok(Some((views, pagination)))
        })?;
        result.ok_or_else(|| RippleError::NotFound("User not found.".into()))
    }

    pub fn followers(
        &self,
        user_id: i64,
        page: Option<i64>,
    ) -> Result<(Vec<UserSummary>, Pagination), RippleError> {
        self.follow_page(user_id, page, false)
    }

    pub fn following(
        &self,
        user_id: i64,
        page: Option<i64>,
    ) -> Result<(Vec<UserSummary>, Pagination), RippleError> {
        self.follow_page(user_id, page, true)
    }

    fn follow_page(
        &self,
        user_id: i64,
        page: Option<i64>,
        outgoing: bool,
    ) -> Result<(Vec<UserSummary>, Pagination), RippleError> {
        let page = normalize_page(page);
        let result = self.database.with_repositories(|repos| {
            let Some(user) = repos.users().get(user_id)? else {
                return Ok(None);
            };
            let follows = repos.follows();
            let total = if outgoing {
                follows.following_count(user.id)?
            } else {
                follows.followers_count(user.id)?
            };
            let pagination = Pagination::new(page, PER_PAGE, total);
            let records = if outgoing {
                follows.list_following(user.id, pagination.per_page, pagination.offset())?
            } else {
                follows.list_followers(user.id, pagination.per_page, pagination.offset())?
            };
            let users = records.iter().map(UserSummary::from_record).collect();
            Ok(Some((users, pagination)))
        })?;
        result.ok_or_else(|| RippleError::NotFound("User not found.".into()))
    }

    /// Partial update: absent fields keep their stored values.
    pub fn update_profile(
        &self,
        actor: &UserRecord,
        input: UpdateProfileInput,
    ) -> Result<AuthUserView, RippleError> {
        let mut record = actor.clone();
        let mut errors = FieldErrors::new();

        if let Some(name) = &input.name {
            let name = name.trim();
            if name.is_empty() {
                errors.push("name", "The name field is required.");
            } else if name.chars().count() > 255 {
                errors.push("name", "The name may not be greater than 255 characters.");
            } else {
                record.name = name.to_string();
            }
        }

        if let Some(username) = &input.username {
            let username = username.trim();
            if username.is_empty() {
                record.username = None;
            } else if username.chars().count() > 255 {
                errors.push(
                    "username",
                    "The username may not be greater than 255 characters.",
                );
            } else if self.database.with_repositories(|repos| {
                repos.users().username_exists(username, Some(actor.id))
            })? {
                errors.push("username", "The username has already been taken.");
            } else {
                record.username = Some(username.to_string());
            }
        }

        if let Some(email) = &input.email {
            let email = email.trim();
            if !email_pattern().is_match(email) {
                errors.push("email", "The email must be a valid email address.");
            } else if self
                .database
                .with_repositories(|repos| repos.users().email_exists(email, Some(actor.id)))?
            {
                errors.push("email", "The email has already been taken.");
            } else {
                record.email = email.to_string();
            }
        }

        if let Some(bio) = &input.bio {
            let bio = bio.trim();
            record.bio = (!bio.is_empty()).then(|| bio.to_string());
        }

        errors.into_result()?;
        record.updated_at = now_utc_iso();
        self.database
            .with_repositories(|repos| repos.users().update_profile(&record))?;
        Ok(AuthUserView::from_record(record))
    }

    /// Stores an uploaded avatar. The payload must sniff as an image and
    /// stay under 5MB; any previous avatar file for the user is removed.
    pub fn save_avatar(&self, actor: &UserRecord, bytes: &[u8]) -> Result<String, RippleError> {
        if bytes.is_empty() {
            return Err(FieldErrors::single("avatar", "The avatar field is required."));
        }
        if bytes.len() > MAX_AVATAR_BYTES {
            return Err(FieldErrors::single(
                "avatar",
                "The avatar may not be greater than 5120 kilobytes.",
            ));
        }
        let kind = infer::get(bytes).filter(|kind| kind.mime_type().starts_with("image/"));
        let Some(kind) = kind else {
            return Err(FieldErrors::single("avatar", "The avatar must be an image."));
        };

        std::fs::create_dir_all(&self.paths.avatars_dir)
            .context("creating avatars directory")
            .map_err(RippleError::Internal)?;
        let file_name = format!("user_{}.{}", actor.id, kind.extension());
        let target = self.paths.avatars_dir.join(&file_name);
        std::fs::write(&target, bytes)
            .with_context(|| format!("writing avatar {}", target.display()))
            .map_err(RippleError::Internal)?;

        // A re-upload with a different format leaves the old file behind
        // unless it is removed explicitly.
        if let Some(previous) = &actor.avatar {
            if previous != &format!("avatars/{file_name}") {
                if let Some(old_name) = previous.strip_prefix("avatars/") {
                    let _ = std::fs::remove_file(self.paths.avatars_dir.join(old_name));
                }
            }
        }

        let stored = format!("avatars/{file_name}");
        self.database.with_repositories(|repos| {
            repos.users().set_avatar(actor.id, &stored, &now_utc_iso())
        })?;
        tracing::info!(user_id = actor.id, avatar = %stored, "avatar updated");
        Ok(stored)
    }
}
