use super::{AppState, ApiResult, CurrentUser, Envelope};
use crate::error::RippleError;
use crate::tags::{TagInput, TagService, TagTargetInput, TagView};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct TagResponse {
    tag: TagView,
}

#[derive(Debug, Serialize)]
pub(crate) struct PostTagsResponse {
    tags: Vec<TagView>,
}

pub(crate) async fn list_tags(State(state): State<AppState>) -> ApiResult<Vec<TagView>> {
    let tags = TagService::new(state.database.clone()).list()?;
    Ok(Envelope::data(tags))
}

pub(crate) async fn get_tag(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<TagResponse> {
    let tag = TagService::new(state.database.clone()).get(&slug)?;
    Ok(Envelope::data(TagResponse { tag }))
}

pub(crate) async fn create_tag(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Json(payload): Json<TagInput>,
) -> Result<(StatusCode, Json<Envelope<TagResponse>>), RippleError> {
    let tag = TagService::new(state.database.clone()).create(payload)?;
    Ok((
        StatusCode::CREATED,
        Envelope::with_message("Tag created successfully.", TagResponse { tag }),
    ))
}

pub(crate) async fn update_tag(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(slug): Path<String>,
    Json(payload): Json<TagInput>,
) -> ApiResult<TagResponse> {
    let tag = TagService::new(state.database.clone()).update(&slug, payload)?;
    Ok(Envelope::with_message(
        "Tag updated successfully.",
        TagResponse { tag },
    ))
}

pub(crate) async fn delete_tag(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(slug): Path<String>,
) -> ApiResult<()> {
    TagService::new(state.database.clone()).delete(&slug)?;
    Ok(Envelope::message("Tag deleted successfully."))
}

pub(crate) async fn attach_tag(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
    Json(payload): Json<TagTargetInput>,
) -> ApiResult<PostTagsResponse> {
    let tags = TagService::new(state.database.clone()).attach(&user, &slug, payload.post_id)?;
    Ok(Envelope::with_message(
        "Tag attached successfully.",
        PostTagsResponse { tags },
    ))
}

pub(crate) async fn detach_tag(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
    Json(payload): Json<TagTargetInput>,
) -> ApiResult<PostTagsResponse> {
    let tags = TagService::new(state.database.clone()).detach(&user, &slug, payload.post_id)?;
    Ok(Envelope::with_message(
        "Tag detached successfully.",
        PostTagsResponse { tags },
    ))
}
