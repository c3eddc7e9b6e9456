use super::{AppState, ApiResult, Envelope, MaybeUser};
use crate::content::{Pagination, PostView};
use crate::feed::FeedService;
use crate::tags::TrendingTagView;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct FeedQuery {
    search: Option<String>,
    page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct FeedResponse {
    posts: Vec<PostView>,
    pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub(crate) struct PopularResponse {
    posts: Vec<PostView>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TrendingTagsResponse {
    tags: Vec<TrendingTagView>,
}

pub(crate) async fn get_feed(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Query(query): Query<FeedQuery>,
) -> ApiResult<FeedResponse> {
    let (posts, pagination) = FeedService::new(state.database.clone()).feed(
        query.search.as_deref(),
        query.page,
        viewer.map(|user| user.id),
    )?;
    Ok(Envelope::data(FeedResponse { posts, pagination }))
}

pub(crate) async fn get_popular(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
) -> ApiResult<PopularResponse> {
    let posts = FeedService::new(state.database.clone()).popular(viewer.map(|user| user.id))?;
    Ok(Envelope::data(PopularResponse { posts }))
}

pub(crate) async fn get_trending_tags(State(state): State<AppState>) -> ApiResult<TrendingTagsResponse> {
    let tags = FeedService::new(state.database.clone()).trending_tags()?;
    Ok(Envelope::data(TrendingTagsResponse { tags }))
}
