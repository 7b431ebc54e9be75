use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// API Router Module
///
/// JSON endpoints consumed by the browser client. None of them is gated by a layer:
/// `/api/session` and `/api/navigation` answer for anonymous callers too, and `/api/me`
/// relies on the `AuthUser` extractor to reject them.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /api/session
        // The caller's session snapshot (anonymous, authenticated, or errored).
        .route("/api/session", get(handlers::get_session))
        // GET /api/me
        // Profile of the signed-in user, including the landing path of their role-space.
        .route("/api/me", get(handlers::get_me))
        // GET /api/navigation?path=...
        // Guard outcome and document title for a path, for client-side routing.
        .route("/api/navigation", get(handlers::resolve_navigation))
}
