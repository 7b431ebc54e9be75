use async_trait::async_trait;
use aula_portal::{
    AppState, InMemoryRepository, Portal,
    auth::{Claims, DEV_USER_HEADER},
    config::AppConfig,
    create_router,
    models::User,
    repository::{DEMO_ADMIN_ID, DEMO_STUDENT_ID, DEMO_TEACHER_ID, Repository, RepositoryError, RepositoryState},
};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::{sync::Arc, time::SystemTime};
use tower::ServiceExt;
use uuid::Uuid;

// --- Helpers ---

struct FailingRepo;

#[async_trait]
impl Repository for FailingRepo {
    async fn get_user(&self, _id: Uuid) -> Result<Option<User>, RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }
}

fn app_with(repo: RepositoryState) -> Router {
    let config = AppConfig::default();
    let portal = Portal::from_config(&config).unwrap();
    create_router(AppState {
        repo,
        config,
        portal: Arc::new(portal),
    })
}

fn app() -> Router {
    app_with(Arc::new(InMemoryRepository::with_demo_profiles()))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_as(uri: &str, user_id: Uuid) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(DEV_USER_HEADER, user_id.to_string())
        .body(Body::empty())
        .unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// --- Tests ---

#[tokio::test]
async fn test_anonymous_guarded_page_redirects_to_sign_in() {
    let response = app().oneshot(get("/dashboard")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login?from=%2Fdashboard");
}

#[tokio::test]
async fn test_sign_in_redirect_keeps_query() {
    let response = app().oneshot(get("/payments?plan=anual")).await.unwrap();

    assert_eq!(location(&response), "/login?from=%2Fpayments%3Fplan%3Danual");
}

#[tokio::test]
async fn test_student_sees_dashboard() {
    let response = app()
        .oneshot(get_as("/dashboard", DEMO_STUDENT_ID))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("<title>Mi panel | Aula Virtual</title>"));
}

#[tokio::test]
async fn test_teacher_on_admin_page_is_not_authorized() {
    let response = app().oneshot(get_as("/admin", DEMO_TEACHER_ID)).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/unauthorized");
}

#[tokio::test]
async fn test_teacher_dashboard_landing_goes_to_teacher_home() {
    let response = app()
        .oneshot(get_as("/dashboard", DEMO_TEACHER_ID))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/teacher/dashboard");
}

#[tokio::test]
async fn test_admin_dashboard_landing_goes_to_admin_home() {
    let response = app()
        .oneshot(get_as("/dashboard", DEMO_ADMIN_ID))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin");
}

#[tokio::test]
async fn test_admin_sees_admin_pages() {
    let response = app()
        .oneshot(get_as("/admin/users", DEMO_ADMIN_ID))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Usuarios | Aula Virtual"));
}

#[tokio::test]
async fn test_public_parameterized_page() {
    let response = app().oneshot(get("/courses/42")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Detalles del curso | Aula Virtual"));
}

#[tokio::test]
async fn test_unknown_page_is_not_found() {
    let response = app().oneshot(get("/nope")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_store_failure_shows_error_page() {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;
    let claims = Claims {
        sub: DEMO_STUDENT_ID,
        iat: now,
        exp: now + 3600,
    };
    let secret = AppConfig::default().jwt_secret;
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap();

    let request = Request::builder()
        .uri("/dashboard")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app_with(Arc::new(FailingRepo)).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(body_text(response).await.contains("Reintentar"));
}

#[tokio::test]
async fn test_sign_in_page_carries_return_path() {
    let response = app().oneshot(get("/login?from=%2Fdashboard")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("data-return-to=\"/dashboard\""));
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let response = app().oneshot(get("/about")).await.unwrap();

    assert!(response.headers().contains_key("x-request-id"));
}
