//! Request rate limiting middleware

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::app::AppState;
use crate::http::routes::AppError;

/// Middleware that rejects requests beyond the global budget
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.request_limiter.check().is_err() {
        warn!(
            method = %request.method(),
            path = %request.uri().path(),
            "Request rate limit exceeded"
        );
        return AppError::TooManyRequests.into_response();
    }

    next.run(request).await
}
