//! Admin authentication middleware.
//!
//! Admin routes are protected by a single operator key supplied in the
//! `X-Admin-Key` header and checked against the sha256 digest in config.
//! Only the digest is ever stored or logged.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use shared::crypto::sha256_hex;

use crate::app::AppState;

/// Middleware for admin-only routes.
///
/// Rejects requests when the configured digest is empty (admin interface
/// disabled) or the presented key does not hash to it.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let expected = state.config.security.admin_key_hash.trim();
    if expected.is_empty() {
        return forbidden_response("Admin interface is disabled");
    }

    let presented = req
        .headers()
        .get("X-Admin-Key")
        .and_then(|v| v.to_str().ok());

    match presented {
        Some(key) if sha256_hex(key) == expected.to_lowercase() => next.run(req).await,
        Some(_) => unauthorized_response("Invalid admin key"),
        None => unauthorized_response("Missing admin key"),
    }
}

/// Helper to create unauthorized response.
fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "unauthorized",
            "message": message
        })),
    )
        .into_response()
}

/// Helper to create forbidden response.
fn forbidden_response(message: &str) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": "forbidden",
            "message": message
        })),
    )
        .into_response()
}
