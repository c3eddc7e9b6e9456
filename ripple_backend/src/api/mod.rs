mod auth;
mod comments;
mod feed;
mod posts;
mod tags;
mod users;

use crate::auth::AuthService;
use crate::config::RippleConfig;
use crate::database::models::UserRecord;
use crate::database::Database;
use crate::error::{FieldErrors, RippleError};
use anyhow::Result;
use axum::extract::{DefaultBodyLimit, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

// Avatar uploads top out at 5MB; the extra megabyte covers multipart
// framing overhead.
const MAX_BODY_BYTES: usize = 6 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: RippleConfig,
    pub database: Database,
}

pub(crate) type ApiResult<T> = Result<Json<Envelope<T>>, RippleError>;

/// Uniform response envelope. `message` and `data` are omitted rather than
/// serialized as null.
#[derive(Debug, Serialize)]
pub(crate) struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn data(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: None,
            data: Some(data),
        })
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        })
    }
}

impl Envelope<()> {
    pub fn message(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data: None,
        })
    }
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<FieldErrors>,
}

impl IntoResponse for RippleError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            RippleError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "The given data was invalid.".to_string(),
                Some(errors),
            ),
            RippleError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "Unauthenticated.".to_string(), None)
            }
            RippleError::Forbidden(message) => (StatusCode::FORBIDDEN, message, None),
            RippleError::NotFound(message) => (StatusCode::NOT_FOUND, message, None),
            RippleError::BadRequest(message) => (StatusCode::BAD_REQUEST, message, None),
            RippleError::Internal(err) => {
                tracing::error!(error = ?err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error.".to_string(),
                    None,
                )
            }
        };
        let body = ErrorEnvelope {
            success: false,
            message,
            errors,
        };
        (status, Json(body)).into_response()
    }
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Extractor for endpoints that require authentication; rejects with 401.
pub(crate) struct CurrentUser(pub UserRecord);

/// Extractor for endpoints where auth is optional; an invalid or absent
/// token degrades to an anonymous viewer.
pub(crate) struct MaybeUser(pub Option<UserRecord>);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = RippleError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let MaybeUser(user) = MaybeUser::from_request_parts(parts, state).await?;
        user.map(CurrentUser).ok_or(RippleError::Unauthenticated)
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = RippleError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers) else {
            return Ok(MaybeUser(None));
        };
        let user = AuthService::new(state.database.clone()).resolve_token(token)?;
        Ok(MaybeUser(user))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/user", get(auth::current_user))
        .route("/user/profile", put(users::update_profile))
        .route("/user/avatar", post(users::upload_avatar))
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/posts/:slug",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route(
            "/posts/:slug/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route("/posts/:slug/like", post(posts::toggle_like))
        .route("/comments/:id", delete(comments::delete_comment))
        .route("/comments/:id/replies", post(comments::create_reply))
        .route("/comments/:id/like", post(comments::toggle_like))
        .route("/tags", get(tags::list_tags).post(tags::create_tag))
        .route(
            "/tags/:slug",
            get(tags::get_tag).put(tags::update_tag).delete(tags::delete_tag),
        )
        .route("/tags/:slug/attach", post(tags::attach_tag))
        .route("/tags/:slug/detach", post(tags::detach_tag))
        .route("/users/:id", get(users::show_profile))
        .route("/users/:id/posts", get(users::list_user_posts))
        .route("/users/:id/followers", get(users::list_followers))
        .route("/users/:id/following", get(users::list_following))
        .route(
            "/users/:id/follow",
            post(users::follow).delete(users::unfollow),
        )
        .route("/feed", get(feed::get_feed))
        .route("/feed/popular", get(feed::get_popular))
        .route("/feed/trending-tags", get(feed::get_trending_tags))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn health_handler() -> ApiResult<()> {
    Ok(Envelope::message("ok"))
}

/// Tries to bind to the given port, or finds the next available port
async fn find_available_port(start_port: u16) -> Result<(TcpListener, u16)> {
    const MAX_PORT_ATTEMPTS: u16 = 100;

    for offset in 0..MAX_PORT_ATTEMPTS {
        let port = start_port + offset;
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok((listener, port)),
            Err(e) => {
                if offset == 0 {
                    tracing::debug!(port, error = %e, "Port in use, trying next port");
                }
                continue;
            }
        }
    }

    anyhow::bail!(
        "Could not find available port in range {}-{}",
        start_port,
        start_port + MAX_PORT_ATTEMPTS - 1
    )
}

pub async fn serve_http(config: RippleConfig, database: Database) -> Result<()> {
    let requested_port = config.api_port;
    let state = AppState { config, database };
    let router = router(state);

    let (listener, actual_port) = find_available_port(requested_port).await?;
    let addr = SocketAddr::from(([0, 0, 0, 0], actual_port));

    if actual_port != requested_port {
        tracing::warn!(
            requested_port,
            actual_port,
            "Configured port was in use, bound to next available port"
        );
    }

    tracing::info!(?addr, "HTTP server listening");
    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}
