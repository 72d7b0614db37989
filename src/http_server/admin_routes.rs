//! Admin HTTP Routes
//!
//! Roster and switch management. Every route except `/login` requires the
//! `x-admin-secret` header to match the configured secret.

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::warn;

use super::errors::{ApiError, ApiResult};
use super::extract::ApiJson;
use super::server::AppState;
use crate::store::{Artist, NewArtist, StoreError};

/// Header carrying the admin shared secret
pub const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

/// Admin routes with shared state
pub fn admin_routes(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/artists", post(add_artist_handler))
        .route("/artists/:id", delete(delete_artist_handler))
        .route("/artists/:id/blocked", post(set_blocked_handler))
        .route("/global-voting", post(global_voting_handler))
        .route("/reset-votes", post(reset_votes_handler))
        .route("/force-reset", post(force_reset_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/login", post(login_handler))
        .merge(protected)
        .with_state(state)
}

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "pin")]
    pub secret: String,
}

#[derive(Debug, Deserialize)]
pub struct BlockedRequest {
    #[serde(alias = "isBlocked")]
    pub is_blocked: bool,
}

#[derive(Debug, Deserialize)]
pub struct GlobalVotingRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

impl SuccessResponse {
    fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BlockedResponse {
    pub success: bool,
    pub is_blocked: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GlobalVotingResponse {
    pub success: bool,
    pub enabled: bool,
}

// ==================
// Secret Check
// ==================

/// Constant-time comparison of the configured and provided secrets
pub fn secret_matches(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

fn provided_secret(headers: &HeaderMap) -> Option<&str> {
    headers.get(ADMIN_SECRET_HEADER).and_then(|v| v.to_str().ok())
}

async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = provided_secret(request.headers())
        .map(|secret| secret_matches(&state.admin_secret, secret))
        .unwrap_or(false);

    if authorized {
        next.run(request).await
    } else {
        warn!(path = %request.uri().path(), "ADMIN_REQUEST_UNAUTHORIZED");
        ApiError::unauthorized().into_response()
    }
}

// ==================
// Handlers
// ==================

async fn login_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    if secret_matches(&state.admin_secret, &request.secret) {
        Ok(SuccessResponse::ok("Authenticated"))
    } else {
        warn!("ADMIN_LOGIN_FAILED");
        Err(ApiError::unauthorized())
    }
}

async fn add_artist_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<NewArtist>,
) -> ApiResult<(StatusCode, Json<Artist>)> {
    let artist = state.service.add_artist(request).await?;
    Ok((StatusCode::CREATED, Json(artist)))
}

async fn delete_artist_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse>> {
    if state.service.delete_artist(id.clone()).await? {
        Ok(SuccessResponse::ok(format!("Artist {} deleted", id)))
    } else {
        Err(StoreError::NotFound(id).into())
    }
}

async fn set_blocked_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<BlockedRequest>,
) -> ApiResult<Json<BlockedResponse>> {
    if state
        .service
        .set_artist_blocked(id.clone(), request.is_blocked)
        .await?
    {
        Ok(Json(BlockedResponse {
            success: true,
            is_blocked: request.is_blocked,
        }))
    } else {
        Err(StoreError::NotFound(id).into())
    }
}

async fn global_voting_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<GlobalVotingRequest>,
) -> ApiResult<Json<GlobalVotingResponse>> {
    let enabled = state.service.set_global_voting(request.enabled).await?;
    Ok(Json(GlobalVotingResponse {
        success: true,
        enabled,
    }))
}

async fn reset_votes_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<SuccessResponse>> {
    state.service.reset_votes().await?;
    Ok(SuccessResponse::ok("Votes reset"))
}

async fn force_reset_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<SuccessResponse>> {
    state.service.force_reset().await?;
    Ok(SuccessResponse::ok("State reset to seed"))
}
