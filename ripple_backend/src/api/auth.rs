use super::{bearer_token, AppState, ApiResult, CurrentUser, Envelope};
use crate::auth::{AuthService, AuthUserView, LoginInput, RegisterInput};
use crate::error::RippleError;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct SessionResponse {
    user: AuthUserView,
    token: String,
}

pub(crate) async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterInput>,
) -> Result<(StatusCode, Json<Envelope<SessionResponse>>), RippleError> {
    let (user, token) = AuthService::new(state.database.clone()).register(payload)?;
    tracing::info!(user_id = user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Envelope::with_message("User registered successfully.", SessionResponse { user, token }),
    ))
}

pub(crate) async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginInput>,
) -> ApiResult<SessionResponse> {
    let (user, token) = AuthService::new(state.database.clone()).login(payload)?;
    Ok(Envelope::with_message(
        "Logged in successfully.",
        SessionResponse { user, token },
    ))
}

pub(crate) async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    CurrentUser(_user): CurrentUser,
) -> ApiResult<()> {
    // CurrentUser already proved the token resolves; revoke exactly it.
    if let Some(token) = bearer_token(&headers) {
        AuthService::new(state.database.clone()).revoke(token)?;
    }
    Ok(Envelope::message("Logged out successfully."))
}

pub(crate) async fn current_user(CurrentUser(user): CurrentUser) -> ApiResult<AuthUserView> {
    Ok(Envelope::data(AuthUserView::from_record(user)))
}
