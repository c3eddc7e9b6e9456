use super::{AppState, ApiResult, CurrentUser, Envelope, MaybeUser};
use crate::auth::AuthUserView;
use crate::content::{Pagination, PostView, UserSummary};
use crate::engagement::{EngagementService, FollowCounts};
use crate::error::{FieldErrors, RippleError};
use crate::profiles::{ProfileService, ProfileView, UpdateProfileInput};
use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct PageQuery {
    page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UserPostsResponse {
    posts: Vec<PostView>,
    pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub(crate) struct FollowersResponse {
    users: Vec<UserSummary>,
    pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub(crate) struct AvatarResponse {
    avatar: String,
}

fn profile_service(state: &AppState) -> ProfileService {
    ProfileService::new(state.database.clone(), state.config.paths.clone())
}

pub(crate) async fn show_profile(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<i64>,
) -> ApiResult<ProfileView> {
    let profile = profile_service(&state).show(id, viewer.map(|user| user.id))?;
    Ok(Envelope::data(profile))
}

pub(crate) async fn list_user_posts(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> ApiResult<UserPostsResponse> {
    let (posts, pagination) =
        profile_service(&state).posts(id, query.page, viewer.map(|user| user.id))?;
    Ok(Envelope::data(UserPostsResponse { posts, pagination }))
}

pub(crate) async fn list_followers(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> ApiResult<FollowersResponse> {
    let (users, pagination) = profile_service(&state).followers(id, query.page)?;
    Ok(Envelope::data(FollowersResponse { users, pagination }))
}

pub(crate) async fn list_following(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> ApiResult<FollowersResponse> {
    let (users, pagination) = profile_service(&state).following(id, query.page)?;
    Ok(Envelope::data(FollowersResponse { users, pagination }))
}

pub(crate) async fn follow(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<FollowCounts> {
    let counts = EngagementService::new(state.database.clone()).follow(&user, id)?;
    Ok(Envelope::with_message("Followed successfully.", counts))
}

pub(crate) async fn unfollow(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<FollowCounts> {
    let counts = EngagementService::new(state.database.clone()).unfollow(&user, id)?;
    Ok(Envelope::with_message("Unfollowed successfully.", counts))
}

pub(crate) async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<UpdateProfileInput>,
) -> ApiResult<AuthUserView> {
    let updated = profile_service(&state).update_profile(&user, payload)?;
    Ok(Envelope::with_message("Profile updated successfully.", updated))
}

pub(crate) async fn upload_avatar(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> ApiResult<AvatarResponse> {
    let mut bytes = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| RippleError::BadRequest(format!("invalid multipart body: {err}")))?
    {
        if field.name() == Some("avatar") {
            let data = field
                .bytes()
                .await
                .map_err(|err| RippleError::BadRequest(format!("failed to read upload: {err}")))?;
            bytes = Some(data);
            break;
        }
    }
    let Some(bytes) = bytes else {
        return Err(FieldErrors::single("avatar", "The avatar field is required."));
    };

    let avatar = profile_service(&state).save_avatar(&user, &bytes)?;
    Ok(Envelope::with_message(
        "Avatar uploaded successfully.",
        AvatarResponse { avatar },
    ))
}
