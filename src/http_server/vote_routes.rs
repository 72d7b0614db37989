//! Voter-facing HTTP Routes
//!
//! Full-state reads, vote history and batch vote submission.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::ApiResult;
use super::extract::ApiJson;
use super::server::AppState;
use crate::service::VoteBallot;
use crate::store::{StateSnapshot, VoteRecord};

/// Anti-cache headers applied to every state read
const NO_CACHE_HEADERS: [(header::HeaderName, &str); 3] = [
    (
        header::CACHE_CONTROL,
        "no-store, no-cache, must-revalidate, proxy-revalidate",
    ),
    (header::PRAGMA, "no-cache"),
    (header::EXPIRES, "0"),
];

/// Vote routes with shared state
pub fn vote_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/state", get(state_handler))
        .route("/history", get(history_handler))
        .route("/votes", post(submit_votes_handler))
        .with_state(state)
}

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<VoteRecord>,
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct SubmitVotesRequest {
    /// Artist id to option title; non-string values never match an option
    pub votes: BTreeMap<String, Value>,
    #[serde(default, alias = "userAgent")]
    pub user_agent: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitVotesResponse {
    pub success: bool,
    pub processed: usize,
    pub rejected: usize,
    pub message: String,
    pub timestamp: i64,
}

// ==================
// Handlers
// ==================

async fn state_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot: StateSnapshot = state.service.fetch_state();
    (NO_CACHE_HEADERS, Json(snapshot))
}

async fn history_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let history = state.service.fetch_history();
    let count = history.len();
    (NO_CACHE_HEADERS, Json(HistoryResponse { history, count }))
}

async fn submit_votes_handler(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<SubmitVotesRequest>,
) -> ApiResult<impl IntoResponse> {
    let user_agent = request
        .user_agent
        .or_else(|| header_str(&headers, header::USER_AGENT.as_str()))
        .unwrap_or_default();
    let client_ip = client_ip(&headers, peer.map(|ConnectInfo(addr)| addr));

    let ballot: VoteBallot = request
        .votes
        .into_iter()
        .map(|(artist_id, option)| (artist_id, option.as_str().unwrap_or_default().to_string()))
        .collect();

    let receipt = state
        .service
        .submit_votes(ballot, user_agent, client_ip)
        .await?;

    let response = SubmitVotesResponse {
        success: true,
        processed: receipt.processed,
        rejected: receipt.rejected,
        message: format!("{} votes recorded", receipt.processed),
        timestamp: receipt.timestamp,
    };
    Ok(([(header::CACHE_CONTROL, "no-store")], Json(response)))
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// First `x-forwarded-for` hop, else the peer address
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty())
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        let peer: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        assert_eq!(
            client_ip(&headers, Some(peer)),
            Some("203.0.113.9".to_string())
        );
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let peer: SocketAddr = "192.0.2.4:4000".parse().unwrap();
        assert_eq!(
            client_ip(&HeaderMap::new(), Some(peer)),
            Some("192.0.2.4".to_string())
        );
        assert_eq!(client_ip(&HeaderMap::new(), None), None);
    }

    #[test]
    fn test_request_accepts_camel_case_user_agent() {
        let request: SubmitVotesRequest =
            serde_json::from_str(r#"{"votes":{"1":"Rapture"},"userAgent":"kiosk"}"#).unwrap();
        assert_eq!(request.user_agent.as_deref(), Some("kiosk"));
        assert_eq!(request.votes.len(), 1);
    }
}
