//! Derived read views: the public feed, the popular window, and trending
//! tags. All three are computed live from the base tables.

use crate::content::{normalize_page, post_view, Pagination, PostView, PER_PAGE};
use crate::database::repositories::{PostRepository, TagRepository};
use crate::database::Database;
use crate::error::RippleError;
use crate::tags::TrendingTagView;

const TRENDING_WINDOW: &str = "-7 days";
const TOP_LIMIT: i64 = 10;

#[derive(Clone)]
pub struct FeedService {
    database: Database,
}

impl FeedService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Published posts, newest first, with optional search over title,
    /// content and excerpt.
    pub fn feed(
        &self,
        search: Option<&str>,
        page: Option<i64>,
        viewer: Option<i64>,
    ) -> Result<(Vec<PostView>, Pagination), RippleError> {
        let page = normalize_page(page);
        let result = self.database.with_repositories(|repos| {
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
        Ok(result)
    }

    /// Top posts published inside the trailing week, ranked by like count
    /// and then comment count.
    pub fn popular(&self, viewer: Option<i64>) -> Result<Vec<PostView>, RippleError> {
        let views = self.database.with_repositories(|repos| {
            let records = repos.posts().popular_since(TRENDING_WINDOW, TOP_LIMIT)?;
            let mut views = Vec::with_capacity(records.len());
            for record in &records {
                views.push(post_view(&repos, record, viewer, false)?);
            }
            Ok(views)
        })?;
        Ok(views)
    }

    /// Tags ranked by posts published inside the trailing week; tags with
    /// no qualifying posts never appear.
    pub fn trending_tags(&self) -> Result<Vec<TrendingTagView>, RippleError> {
        let ranked = self
            .database
            .with_repositories(|repos| repos.tags().trending(TRENDING_WINDOW, TOP_LIMIT))?;
        Ok(ranked
            .iter()
            .map(|(record, count)| TrendingTagView::from_record(record, *count))
            .collect())
    }
}
