use crate::{
    AppState,
    auth::CurrentSession,
    handlers,
    models::{GuardOutcome, Location},
    routes::axum_path,
};
use axum::{
    Router,
    extract::{Request, State},
    http::Uri,
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};

/// Pages Router Module
///
/// Registers an HTML shell for every pattern in the route table. All of them sit behind
/// `page_guard`, which lets public routes through and runs the Access Guard and Role
/// Redirector for guarded ones.
pub fn page_routes(state: &AppState) -> Router<AppState> {
    let router = state
        .portal
        .routes
        .routes()
        .iter()
        .fold(Router::new(), |router, route| {
            router.route(&axum_path(&route.pattern), get(handlers::render_page))
        });

    router.route_layer(middleware::from_fn_with_state(state.clone(), page_guard))
}

/// page_guard
///
/// Middleware executing the portal's navigation decision for a page request. Redirects
/// become `303 See Other`; the location the user asked for travels in the `from` query
/// parameter so the sign-in page can send them back.
async fn page_guard(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    request: Request,
    next: Next,
) -> Response {
    let location = location_of(request.uri());
    let resolution = state.portal.resolve(&session, &location);

    match resolution.outcome {
        GuardOutcome::Render => next.run(request).await,
        GuardOutcome::Redirect(redirect) => Redirect::to(&redirect.href()).into_response(),
        GuardOutcome::Loading => {
            handlers::loading_page(&state.portal.document_title(&resolution.navigation))
        }
        GuardOutcome::Error { message, .. } => handlers::error_page(
            &state.portal.document_title(&resolution.navigation),
            &message,
        ),
    }
}

pub fn location_of(uri: &Uri) -> Location {
    Location {
        pathname: uri.path().to_string(),
        search: uri.query().map(|query| format!("?{query}")).unwrap_or_default(),
    }
}
