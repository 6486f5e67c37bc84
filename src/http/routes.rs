//! HTTP route definitions

use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{MatchHandle, MatchSetup, MatchSnapshot, SessionSnapshot};
use crate::http::middleware::rate_limit;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let match_routes = Router::new()
        .route("/matches", post(create_match_handler))
        .route(
            "/matches/:id",
            get(get_match_handler).delete(close_match_handler),
        )
        .route("/matches/:id/toss", post(toss_handler))
        .route("/matches/:id/reset", post(reset_handler))
        .route("/matches/:id/ws", get(ws_handler));

    let stats_routes = Router::new()
        .route("/stats", get(stats_handler))
        .route("/stats/reset", post(stats_reset_handler));

    Router::new()
        .route("/health", get(health_handler))
        .merge(match_routes)
        .merge(stats_routes)
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn find_match(state: &AppState, id: Uuid) -> Result<MatchHandle, AppError> {
    state
        .engine
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("match {}", id)))
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_matches: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_matches: state.engine.active_matches(),
    })
}

// ============================================================================
// Match endpoints
// ============================================================================

#[derive(Serialize)]
struct CreateMatchResponse {
    match_id: Uuid,
    warnings: Vec<String>,
    snapshot: MatchSnapshot,
}

async fn create_match_handler(
    State(state): State<AppState>,
    payload: Result<Json<MatchSetup>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateMatchResponse>), AppError> {
    let Json(setup) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let (handle, warnings) = state.engine.start_match(setup);

    Ok((
        StatusCode::CREATED,
        Json(CreateMatchResponse {
            match_id: handle.id(),
            warnings: warnings.iter().map(ToString::to_string).collect(),
            snapshot: handle.snapshot(),
        }),
    ))
}

async fn get_match_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchSnapshot>, AppError> {
    let handle = find_match(&state, id)?;
    Ok(Json(handle.snapshot()))
}

#[derive(Serialize)]
struct TossResponse {
    /// False when a toss was already running or the match is over
    accepted: bool,
    snapshot: MatchSnapshot,
}

async fn toss_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<TossResponse>), AppError> {
    let handle = find_match(&state, id)?;
    let accepted = handle.try_request_toss();

    Ok((
        StatusCode::ACCEPTED,
        Json(TossResponse {
            accepted,
            snapshot: handle.snapshot(),
        }),
    ))
}

async fn reset_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchSnapshot>, AppError> {
    let handle = find_match(&state, id)?;
    handle.reset();
    Ok(Json(handle.snapshot()))
}

async fn close_match_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.engine.close_match(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("match {}", id)))
    }
}

// ============================================================================
// Session stats endpoints
// ============================================================================

async fn stats_handler(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.engine.session().snapshot())
}

async fn stats_reset_handler(State(state): State<AppState>) -> Json<SessionSnapshot> {
    let session = state.engine.session();
    session.reset();
    Json(session.snapshot())
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Too many requests")]
    TooManyRequests,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::TooManyRequests => {
                (StatusCode::TOO_MANY_REQUESTS, "Too many requests".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
