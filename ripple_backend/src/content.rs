//! Post authoring and retrieval. Slugs and excerpts are derived server-side,
//! publication visibility is enforced here, and every view carries live
//! engagement counts computed at serialization time.

use crate::auth::can_mutate;
use crate::comments::{self, CommentView};
use crate::database::models::{PostRecord, UserRecord};
use crate::database::repositories::{
    CommentRepository, LikeRepository, PostRepository, SqliteRepositories, TagRepository,
    UserRepository,
};
use crate::database::Database;
use crate::error::{FieldErrors, RippleError};
use crate::tags::TagView;
use crate::utils::{derive_excerpt, now_utc_iso, slugify};
use anyhow::anyhow;
use serde::{Deserialize, Serialize};

pub const PER_PAGE: i64 = 10;
pub const EXCERPT_LIMIT: usize = 150;

const STATUS_DRAFT: &str = "draft";
const STATUS_PUBLISHED: &str = "published";

/// Offset pagination metadata; `last_page` is never below 1, even for an
/// empty result set.
#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub current_page: i64,
    pub last_page: i64,
    pub per_page: i64,
    pub total: i64,
}

impl Pagination {
    pub fn new(current_page: i64, per_page: i64, total: i64) -> Self {
        let last_page = ((total + per_page - 1) / per_page).max(1);
        Self {
            current_page,
            last_page,
            per_page,
            total,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.current_page - 1) * self.per_page
    }
}

/// Clamp a requested page number to something usable.
pub fn normalize_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub avatar: Option<String>,
}

impl UserSummary {
    pub fn from_record(record: &UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            avatar: record.avatar.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub status: String,
    pub published_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub likes_count: i64,
    pub comments_count: i64,
    pub is_liked: bool,
    pub user: UserSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagView>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostDetailView {
    #[serde(flatten)]
    pub post: PostView,
    pub comments: Vec<CommentView>,
}

/// Builds the serialized form of a post, with counts and the viewer's like
/// state read live from the database.
pub(crate) fn post_view(
    repos: &SqliteRepositories<'_>,
    record: &PostRecord,
    viewer: Option<i64>,
    with_tags: bool,
) -> anyhow::Result<PostView> {
    let author = repos
        .users()
        .get(record.user_id)?
        .ok_or_else(|| anyhow!("post {} has no author row", record.id))?;
    let likes_count = repos.likes().count_for_post(record.id)?;
    let comments_count = repos.comments().count_for_post(record.id)?;
    let is_liked = match viewer {
        Some(user_id) => repos.likes().post_liked_by(record.id, user_id)?,
        None => false,
    };
    let tags = if with_tags {
        Some(
            repos
                .tags()
                .list_for_post(record.id)?
                .iter()
                .map(TagView::from_record)
                .collect(),
        )
    } else {
        None
    };
    Ok(PostView {
        id: record.id,
        user_id: record.user_id,
        title: record.title.clone(),
        slug: record.slug.clone(),
        content: record.content.clone(),
        excerpt: record.excerpt.clone(),
        status: record.status.clone(),
        published_at: record.published_at.clone(),
        created_at: record.created_at.clone(),
        updated_at: record.updated_at.clone(),
        likes_count,
        comments_count,
        is_liked,
        user: UserSummary::from_record(&author),
        tags,
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePostInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePostInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Clone)]
pub struct PostService {
    database: Database,
}

impl PostService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn create(
        &self,
        author: &UserRecord,
        input: CreatePostInput,
    ) -> Result<PostView, RippleError> {
        let mut errors = FieldErrors::new();
        let title = input.title.trim().to_string();
        if title.is_empty() {
            errors.push("title", "The title field is required.");
        } else if title.chars().count() > 255 {
            errors.push("title", "The title may not be greater than 255 characters.");
        }
        if input.content.trim().is_empty() {
            errors.push("content", "The content field is required.");
        }
        let status = match input.status.as_deref() {
            None | Some("") => STATUS_DRAFT.to_string(),
            Some(s @ (STATUS_DRAFT | STATUS_PUBLISHED)) => s.to_string(),
            Some(_) => {
                errors.push("status", "The selected status is invalid.");
                STATUS_DRAFT.to_string()
            }
        };

        let slug = match input.slug.as_deref().map(str::trim) {
            Some(explicit) if !explicit.is_empty() => slugify(explicit),
            _ => slugify(&title),
        };
        if slug.is_empty() {
            errors.push("slug", "The slug field is required.");
        } else if self
            .database
            .with_repositories(|repos| repos.posts().slug_exists(&slug, None))?
        {
            errors.push("slug", "The slug has already been taken.");
        }
        errors.into_result()?;

        let excerpt = match input.excerpt.as_deref().map(str::trim) {
            Some(explicit) if !explicit.is_empty() => explicit.to_string(),
            _ => derive_excerpt(&input.content, EXCERPT_LIMIT),
        };

        let now = now_utc_iso();
        let published_at = (status == STATUS_PUBLISHED).then(|| now.clone());
        let record = PostRecord {
            id: 0,
            user_id: author.id,
            title,
            slug,
            content: input.content,
            excerpt,
            status,
            published_at,
            created_at: now.clone(),
            updated_at: now,
        };

        let view = self.database.with_repositories(|repos| {
            let id = repos.posts().create(&record)?;
            let stored = repos
                .posts()
                .get(id)?
                .ok_or_else(|| anyhow!("created post {id} missing"))?;
            post_view(&repos, &stored, Some(author.id), true)
        })?;
        tracing::info!(post_id = view.id, slug = %view.slug, "post created");
        Ok(view)
    }

    pub fn update(
        &self,
        actor: &UserRecord,
        slug: &str,
        input: UpdatePostInput,
    ) -> Result<PostView, RippleError> {
        let mut record = self.fetch_owned(actor, slug)?;
        let mut errors = FieldErrors::new();

        if let Some(title) = &input.title {
            let title = title.trim();
            if title.is_empty() {
                errors.push("title", "The title field is required.");
            } else if title.chars().count() > 255 {
                errors.push("title", "The title may not be greater than 255 characters.");
            } else {
                record.title = title.to_string();
            }
        }

        let mut content_changed = false;
        if let Some(content) = &input.content {
            if content.trim().is_empty() {
                errors.push("content", "The content field is required.");
            } else if *content != record.content {
                record.content = content.clone();
                content_changed = true;
            }
        }

        if let Some(new_slug) = input.slug.as_deref().map(str::trim) {
            if !new_slug.is_empty() {
                let candidate = slugify(new_slug);
                if candidate.is_empty() {
                    errors.push("slug", "The slug field is required.");
                } else if candidate != record.slug
                    && self
                        .database
                        .with_repositories(|repos| repos.posts().slug_exists(&candidate, Some(record.id)))?
                {
                    errors.push("slug", "The slug has already been taken.");
                } else {
                    record.slug = candidate;
                }
            }
        }

        if let Some(status) = input.status.as_deref() {
            match status {
                STATUS_DRAFT => record.status = STATUS_DRAFT.to_string(),
                STATUS_PUBLISHED => {
                    record.status = STATUS_PUBLISHED.to_string();
                    // First publication stamps the timestamp; republishing
                    // after a draft round-trip keeps the original one.
                    if record.published_at.is_none() {
                        record.published_at = Some(now_utc_iso());
                    }
                }
                _ => errors.push("status", "The selected status is invalid."),
            }
        }
        errors.into_result()?;

        match input.excerpt.as_deref().map(str::trim) {
            Some(explicit) if !explicit.is_empty() => record.excerpt = explicit.to_string(),
            _ => {
                if content_changed {
                    record.excerpt = derive_excerpt(&record.content, EXCERPT_LIMIT);
                }
            }
        }

        record.updated_at = now_utc_iso();
        let view = self.database.with_repositories(|repos| {
            repos.posts().update(&record)?;
            post_view(&repos, &record, Some(actor.id), true)
        })?;
        tracing::info!(post_id = record.id, slug = %record.slug, "post updated");
        Ok(view)
    }

    pub fn delete(&self, actor: &UserRecord, slug: &str) -> Result<(), RippleError> {
        let record = self.fetch_owned(actor, slug)?;
        self.database
            .with_repositories(|repos| repos.posts().delete(record.id))?;
        tracing::info!(post_id = record.id, slug = %record.slug, "post deleted");
        Ok(())
    }

    /// Public listing: published posts only, newest first, optionally
    /// filtered by a search term over title, content and excerpt.
    pub fn list_published(
        &self,
        search: Option<&str>,
        page: Option<i64>,
        viewer: Option<i64>,
    ) -> Result<(Vec<PostView>, Pagination), RippleError> {
        let page = normalize_page(page);
        let (views, pagination) = self.database.with_repositories(|repos| {
            let total = repos.posts().count_published(search)?;
            let pagination = Pagination::new(page, PER_PAGE, total);
            let records = repos
                .posts()
                .list_published(search, pagination.per_page, pagination.offset())?;
            let mut views = Vec::with_capacity(records.len());
            for record in &records {
                views.push(post_view(&repos, record, viewer, false)?);
            }
            Ok((views, pagination))
        })?;
        Ok((views, pagination))
    }

    /// A single post with its tags and full comment tree. Drafts and
    /// scheduled posts are visible to their author only.
    pub fn get_detail(
        &self,
        slug: &str,
        viewer: Option<i64>,
    ) -> Result<PostDetailView, RippleError> {
        let detail = self.database.with_repositories(|repos| {
            let record = repos.posts().get_by_slug(slug)?;
            let Some(record) = record else {
                return Ok(None);
            };
            if !record.is_published() && viewer != Some(record.user_id) {
                return Ok(None);
            }
            let post = post_view(&repos, &record, viewer, true)?;
            let comments = comments::views_for_post(&repos, record.id, viewer)?;
            Ok(Some(PostDetailView { post, comments }))
        })?;
        detail.ok_or_else(|| RippleError::NotFound("Post not found.".into()))
    }

    fn fetch_owned(&self, actor: &UserRecord, slug: &str) -> Result<PostRecord, RippleError> {
        let record = self
            .database
            .with_repositories(|repos| repos.posts().get_by_slug(slug))?
            .ok_or_else(|| RippleError::NotFound("Post not found.".into()))?;
        if !can_mutate(Some(actor), record.user_id) {
            return Err(RippleError::Forbidden(
                "You are not allowed to modify this post.".into(),
            ));
        }
        Ok(record)
    }
}
