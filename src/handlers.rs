use crate::{
    AppState,
    auth::{AuthUser, CurrentSession},
    models::{Location, NavigationResponse, Session, UserProfile},
};
use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

// --- Query Structs ---

/// NavigationQuery
///
/// Query parameters of GET /api/navigation.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct NavigationQuery {
    /// The path to evaluate, optionally with a query string.
    pub path: String,
}

/// PageQuery
///
/// Query parameters every page shell understands. `from` is set by sign-in redirects.
#[derive(Deserialize, Default)]
pub struct PageQuery {
    pub from: Option<String>,
}

// --- API Handlers ---

/// get_session
///
/// [Public Route] Returns the caller's session snapshot. Answers 503 (with the errored
/// snapshot as body) when the profile store could not be reached, so clients can tell a
/// failed resolution from a signed-out caller.
#[utoipa::path(
    get,
    path = "/api/session",
    responses(
        (status = 200, description = "Session snapshot", body = Session),
        (status = 503, description = "Session could not be resolved", body = Session)
    )
)]
pub async fn get_session(CurrentSession(session): CurrentSession) -> (StatusCode, Json<Session>) {
    let status = if session.error.is_some() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(session))
}

/// get_me
///
/// [Authenticated Route] The signed-in user's profile and role-space landing path.
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn get_me(user: AuthUser, State(state): State<AppState>) -> Json<UserProfile> {
    let home = state
        .portal
        .redirector
        .spaces()
        .home(user.role)
        .map(str::to_string);

    Json(UserProfile {
        id: user.id,
        email: user.email,
        display_name: user.display_name,
        role: user.role,
        home,
    })
}

/// resolve_navigation
///
/// [Public Route] Evaluates a path for the caller's session: the guard outcome the page
/// router would apply and the document title it would set.
#[utoipa::path(
    get,
    path = "/api/navigation",
    params(NavigationQuery),
    responses((status = 200, description = "Navigation outcome", body = NavigationResponse))
)]
pub async fn resolve_navigation(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Query(query): Query<NavigationQuery>,
) -> Json<NavigationResponse> {
    let location = Location::parse(&query.path);
    let resolution = state.portal.resolve(&session, &location);
    let title = state.portal.document_title(&resolution.navigation);

    Json(NavigationResponse {
        pathname: resolution.navigation.pathname,
        title,
        outcome: resolution.outcome,
    })
}

// --- Page Handlers ---

/// render_page
///
/// Serves the HTML shell of a portal route. By the time this runs the page guard has
/// already let the request through.
pub async fn render_page(
    State(state): State<AppState>,
    uri: Uri,
    Query(query): Query<PageQuery>,
) -> Html<String> {
    let navigation = state.portal.routes.navigation(uri.path());
    let title = state.portal.document_title(&navigation);
    Html(page_shell(&title, &navigation.pathname, query.from.as_deref()))
}

/// not_found_page
///
/// Fallback for paths outside the route table.
pub async fn not_found_page(State(state): State<AppState>, uri: Uri) -> Response {
    let navigation = state.portal.routes.navigation(uri.path());
    let title = state.portal.document_title(&navigation);
    (
        StatusCode::NOT_FOUND,
        Html(page_shell(&title, &navigation.pathname, None)),
    )
        .into_response()
}

/// Shown when the session could not be resolved. Retrying is a full reload.
pub fn error_page(title: &str, message: &str) -> Response {
    let body = format!(
        "<!doctype html>\n<html lang=\"es\">\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n<main role=\"alert\">\n<p>{}</p>\n<button type=\"button\" onclick=\"window.location.reload()\">Reintentar</button>\n</main>\n</body>\n</html>\n",
        escape_html(title),
        escape_html(message),
    );
    (StatusCode::SERVICE_UNAVAILABLE, Html(body)).into_response()
}

/// Neutral placeholder while the session is still resolving.
pub fn loading_page(title: &str) -> Response {
    let body = format!(
        "<!doctype html>\n<html lang=\"es\">\n<head><meta charset=\"utf-8\"><meta http-equiv=\"refresh\" content=\"1\"><title>{}</title></head>\n<body><main aria-busy=\"true\">Cargando…</main></body>\n</html>\n",
        escape_html(title),
    );
    (StatusCode::ACCEPTED, Html(body)).into_response()
}

/// The document every route serves: the resolved title plus the mount point the
/// client bundle renders into.
pub fn page_shell(title: &str, pathname: &str, return_to: Option<&str>) -> String {
    let return_to = return_to
        .map(|from| format!(" data-return-to=\"{}\"", escape_html(from)))
        .unwrap_or_default();
    format!(
        "<!doctype html>\n<html lang=\"es\">\n<head>\n<meta charset=\"utf-8\">\n<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n<title>{}</title>\n</head>\n<body>\n<div id=\"app\" data-route=\"{}\"{}></div>\n<script type=\"module\" src=\"/assets/app.js\"></script>\n</body>\n</html>\n",
        escape_html(title),
        escape_html(pathname),
        return_to,
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
