use axum::{Router, extract::FromRef, http::HeaderName};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Navigation rules: the decision engine shared by the server and the client controller.
pub mod guard;
pub mod portal;
pub mod redirector;
pub mod title;

// Session state: per-request resolution (auth) and the client-side provider (session).
pub mod auth;
pub mod session;

pub mod config;
pub mod handlers;
pub mod models;
pub mod navigation;
pub mod repository;

// Route table plus the page and API routers built from it.
pub mod routes;
use routes::{api, pages};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use portal::Portal;
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for the JSON endpoints, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::get_session, handlers::get_me, handlers::resolve_navigation),
    components(
        schemas(
            models::Session, models::UserIdentity, models::Role, models::ErrorInfo,
            models::NavigationResponse, models::GuardOutcome, models::Redirect,
            models::RedirectState, models::Location, models::RetryAction, models::UserProfile,
        )
    ),
    tags(
        (name = "aula-portal", description = "E-learning portal session and navigation API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, immutable container shared by every request: the profile store, the
/// configuration, and the portal's navigation rules.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub config: AppConfig,
    pub portal: Arc<Portal>,
}

// --- Axum FromRef Extractor Implementations ---

// Let extractors pull single components out of the AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the page and API routers, the documentation, and the observability layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api::api_routes())
        // Page shells, each request gated by the page guard.
        .merge(pages::page_routes(&state))
        .fallback(handlers::not_found_page)
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for every request, carrying the `x-request-id` so log lines of one request
/// correlate.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
