use super::{AppState, ApiResult, CurrentUser, Envelope, MaybeUser};
use crate::comments::{CommentService, CommentView, CreateCommentInput};
use crate::engagement::{EngagementService, LikeOutcome};
use crate::error::RippleError;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct CommentListResponse {
    comments: Vec<CommentView>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CommentResponse {
    comment: CommentView,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReplyRequest {
    #[serde(default)]
    body: String,
}

pub(crate) async fn list_comments(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(slug): Path<String>,
) -> ApiResult<CommentListResponse> {
    let comments = CommentService::new(state.database.clone())
        .list_for_post(&slug, viewer.map(|user| user.id))?;
    Ok(Envelope::data(CommentListResponse { comments }))
}

pub(crate) async fn create_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
    Json(payload): Json<CreateCommentInput>,
) -> Result<(StatusCode, Json<Envelope<CommentResponse>>), RippleError> {
    let comment = CommentService::new(state.database.clone()).create(&user, &slug, payload)?;
    Ok((
        StatusCode::CREATED,
        Envelope::with_message("Comment created successfully.", CommentResponse { comment }),
    ))
}

pub(crate) async fn create_reply(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<ReplyRequest>,
) -> Result<(StatusCode, Json<Envelope<CommentResponse>>), RippleError> {
    let comment =
        CommentService::new(state.database.clone()).create_reply(&user, id, &payload.body)?;
    Ok((
        StatusCode::CREATED,
        Envelope::with_message("Reply created successfully.", CommentResponse { comment }),
    ))
}

pub(crate) async fn delete_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    CommentService::new(state.database.clone()).delete(&user, id)?;
    Ok(Envelope::message("Comment deleted successfully."))
}

pub(crate) async fn toggle_like(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<LikeOutcome> {
    let outcome = EngagementService::new(state.database.clone()).toggle_comment_like(&user, id)?;
    Ok(Envelope::data(outcome))
}
