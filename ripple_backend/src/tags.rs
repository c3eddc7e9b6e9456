//! Global tag vocabulary. Any authenticated user manages tags; attaching a
//! tag to a post is gated by post ownership instead.

use crate::auth::can_mutate;
use crate::database::models::{TagRecord, UserRecord};
use crate::database::repositories::{PostRepository, SqliteRepositories, TagRepository};
use crate::database::Database;
use crate::error::{FieldErrors, RippleError};
use crate::utils::{now_utc_iso, slugify};
use anyhow::anyhow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct TagView {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl TagView {
    pub fn from_record(record: &TagRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            slug: record.slug.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendingTagView {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub posts_count: i64,
}

impl TrendingTagView {
    pub fn from_record(record: &TagRecord, posts_count: i64) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            slug: record.slug.clone(),
            posts_count,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagInput {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagTargetInput {
    pub post_id: i64,
}

#[derive(Clone)]
pub struct TagService {
    database: Database,
}

impl TagService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn list(&self) -> Result<Vec<TagView>, RippleError> {
        let tags = self
            .database
            .with_repositories(|repos| repos.tags().list())?;
        Ok(tags.iter().map(TagView::from_record).collect())
    }

    pub fn get(&self, slug: &str) -> Result<TagView, RippleError> {
        let record = self
            .database
            .with_repositories(|repos| repos.tags().get_by_slug(slug))?
            .ok_or_else(|| RippleError::NotFound("Tag not found.".into()))?;
        Ok(TagView::from_record(&record))
    }

    pub fn create(&self, input: TagInput) -> Result<TagView, RippleError> {
        let name = self.validate_name(&input.name, None)?;
        let slug = slugify(&name);
        let record = TagRecord {
            id: 0,
            name,
            slug,
            created_at: now_utc_iso(),
        };
        let view = self.database.with_repositories(|repos| {
            let id = repos.tags().create(&record)?;
            Ok(TagView::from_record(&TagRecord { id, ..record.clone() }))
        })?;
        Ok(view)
    }

    pub fn update(&self, slug: &str, input: TagInput) -> Result<TagView, RippleError> {
        let mut record = self
            .database
            .with_repositories(|repos| repos.tags().get_by_slug(slug))?
            .ok_or_else(|| RippleError::NotFound("Tag not found.".into()))?;
        record.name = self.validate_name(&input.name, Some(record.id))?;
        record.slug = slugify(&record.name);
        self.database
            .with_repositories(|repos| repos.tags().update(&record))?;
        Ok(TagView::from_record(&record))
    }

    pub fn delete(&self, slug: &str) -> Result<(), RippleError> {
        let record = self
            .database
            .with_repositories(|repos| repos.tags().get_by_slug(slug))?
            .ok_or_else(|| RippleError::NotFound("Tag not found.".into()))?;
        self.database
            .with_repositories(|repos| repos.tags().delete(record.id))?;
        Ok(())
    }

    pub fn attach(
        &self,
        actor: &UserRecord,
        tag_slug: &str,
        post_id: i64,
    ) -> Result<Vec<TagView>, RippleError> {
        self.with_owned_pair(actor, tag_slug, post_id, |repos, tag_id, post_id| {
            repos.tags().attach(tag_id, post_id)
        })
    }

    pub fn detach(
        &self,
        actor: &UserRecord,
        tag_slug: &str,
        post_id: i64,
    ) -> Result<Vec<TagView>, RippleError> {
        self.with_owned_pair(actor, tag_slug, post_id, |repos, tag_id, post_id| {
            repos.tags().detach(tag_id, post_id)
        })
    }

    /// Resolves the (tag, post) pair, enforces post ownership, applies the
    /// mutation, and returns the post's resulting tag list.
    fn with_owned_pair<F>(
        &self,
        actor: &UserRecord,
        tag_slug: &str,
        post_id: i64,
        apply: F,
    ) -> Result<Vec<TagView>, RippleError>
    where
        F: FnOnce(&SqliteRepositories<'_>, i64, i64) -> anyhow::Result<()>,
    {
        enum Outcome {
            Ok(Vec<TagView>),
            TagMissing,
            PostMissing,
            NotOwner,
        }
        let outcome = self.database.with_repositories(|repos| {
            let Some(tag) = repos.tags().get_by_slug(tag_slug)? else {
                return Ok(Outcome::TagMissing);
            };
            let Some(post) = repos.posts().get(post_id)? else {
                return Ok(Outcome::PostMissing);
            };
            if !can_mutate(Some(actor), post.user_id) {
                return Ok(Outcome::NotOwner);
            }
            apply(&repos, tag.id, post.id)?;
            let tags = repos.tags().list_for_post(post.id)?;
            Ok(Outcome::Ok(tags.iter().map(TagView::from_record).collect()))
        })?;
        match outcome {
            Outcome::Ok(tags) => Ok(tags),
            Outcome::TagMissing => Err(RippleError::NotFound("Tag not found.".into())),
            Outcome::PostMissing => Err(RippleError::NotFound("Post not found.".into())),
            Outcome::NotOwner => Err(RippleError::Forbidden(
                "You are not allowed to tag this post.".into(),
            )),
        }
    }

    fn validate_name(&self, name: &str, exclude_id: Option<i64>) -> Result<String, RippleError> {
        let name = name.trim().to_string();
        let mut errors = FieldErrors::new();
        if name.is_empty() {
            errors.push("name", "The name field is required.");
        } else if name.chars().count() > 255 {
            errors.push("name", "The name may not be greater than 255 characters.");
        } else {
            let slug = slugify(&name);
            let taken = self.database.with_repositories(|repos| {
                if repos.tags().name_exists(&name, exclude_id)? {
                    return Ok(true);
                }
                // Names are case-sensitive but slugs are not, so a distinct
                // name can still collide on the derived slug.
                match repos.tags().get_by_slug(&slug)? {
                    Some(existing) => Ok(Some(existing.id) != exclude_id),
                    None => Ok(false),
                }
            })?;
            if taken {
                errors.push("name", "The name has already been taken.");
            }
        }
        errors.into_result()?;
        Ok(name)
    }
}
