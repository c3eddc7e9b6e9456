use super::{AppState, ApiResult, CurrentUser, Envelope, MaybeUser};
use crate::content::{
    CreatePostInput, Pagination, PostDetailView, PostService, PostView, UpdatePostInput,
};
use crate::engagement::{EngagementService, LikeOutcome};
use crate::error::RippleError;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct ListPostsQuery {
    search: Option<String>,
    page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PostListResponse {
    posts: Vec<PostView>,
    pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub(crate) struct PostResponse {
    post: PostView,
}

#[derive(Debug, Serialize)]
pub(crate) struct PostDetailResponse {
    post: PostDetailView,
}

pub(crate) async fn list_posts(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Query(query): Query<ListPostsQuery>,
) -> ApiResult<PostListResponse> {
    let (posts, pagination) = PostService::new(state.database.clone()).list_published(
        query.search.as_deref(),
        query.page,
        viewer.map(|user| user.id),
    )?;
    Ok(Envelope::data(PostListResponse { posts, pagination }))
}

pub(crate) async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreatePostInput>,
) -> Result<(StatusCode, Json<Envelope<PostResponse>>), RippleError> {
    let post = PostService::new(state.database.clone()).create(&user, payload)?;
    Ok((
        StatusCode::CREATED,
        Envelope::with_message("Post created successfully.", PostResponse { post }),
    ))
}

pub(crate) async fn get_post(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(slug): Path<String>,
) -> ApiResult<PostDetailResponse> {
    let post = PostService::new(state.database.clone())
        .get_detail(&slug, viewer.map(|user| user.id))?;
    Ok(Envelope::data(PostDetailResponse { post }))
}

pub(crate) async fn update_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
    Json(payload): Json<UpdatePostInput>,
) -> ApiResult<PostResponse> {
    let post = PostService::new(state.database.clone()).update(&user, &slug, payload)?;
    Ok(Envelope::with_message(
        "Post updated successfully.",
        PostResponse { post },
    ))
}

pub(crate) async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
) -> ApiResult<()> {
    PostService::new(state.database.clone()).delete(&user, &slug)?;
    Ok(Envelope::message("Post deleted successfully."))
}

pub(crate) async fn toggle_like(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
) -> ApiResult<LikeOutcome> {
    let outcome = EngagementService::new(state.database.clone()).toggle_post_like(&user, &slug)?;
    Ok(Envelope::data(outcome))
}
