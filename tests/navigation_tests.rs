use aula_portal::{
    AppConfig, Portal,
    models::{
        Credentials, ErrorInfo, Location, RedirectState, RetryAction, Role, Session,
        UserIdentity,
    },
    navigation::{History, MAX_REDIRECTS, MemoryHistory, NavigationController, View},
    routes::{RouteSpec, RouteTable},
    session::{DEMO_PASSWORD, MockAuthService, SessionContext},
    title::TitleResolver,
};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

// --- Helpers ---

fn portal() -> Arc<Portal> {
    Arc::new(Portal::from_config(&AppConfig::default()).expect("portal routes"))
}

fn user(role: Role) -> UserIdentity {
    UserIdentity {
        id: Uuid::new_v4(),
        role,
        display_name: "Prueba".to_string(),
        email: "prueba@aula.test".to_string(),
    }
}

fn controller(
    session: Session,
) -> (watch::Sender<Session>, NavigationController<MemoryHistory>) {
    let (tx, rx) = watch::channel(session);
    let controller = NavigationController::new(portal(), rx, MemoryHistory::new("/"));
    (tx, controller)
}

fn page(pattern: &str, pathname: &str) -> View {
    View::Page {
        pattern: pattern.to_string(),
        pathname: pathname.to_string(),
    }
}

// --- Tests ---

#[test]
fn test_anonymous_user_is_sent_to_sign_in() {
    let (_tx, mut nav) = controller(Session::anonymous());

    let view = nav.navigate("/dashboard").clone();

    assert_eq!(view, page("/login", "/login"));
    assert_eq!(nav.location().pathname, "/login");
    assert_eq!(nav.document_title(), "Iniciar sesión | Aula Virtual");

    // The guard replaced the /dashboard entry and remembered where the user was going.
    let entry = nav.history().current_entry();
    assert_eq!(entry.state.as_ref().unwrap().from.pathname, "/dashboard");
    assert_eq!(nav.history().entries().len(), 2);
}

#[test]
fn test_authorized_student_sees_dashboard() {
    let (_tx, mut nav) = controller(Session::authenticated(user(Role::Student)));

    assert_eq!(nav.navigate("/dashboard"), &page("/dashboard", "/dashboard"));
    assert_eq!(nav.document_title(), "Mi panel | Aula Virtual");
}

#[test]
fn test_student_on_teacher_route_is_not_authorized() {
    let (_tx, mut nav) = controller(Session::authenticated(user(Role::Student)));

    assert_eq!(
        nav.navigate("/teacher/dashboard"),
        &page("/unauthorized", "/unauthorized")
    );
}

#[test]
fn test_parameterized_teacher_route() {
    let (_tx, mut nav) = controller(Session::authenticated(user(Role::Teacher)));

    assert_eq!(
        nav.navigate("/teacher/courses/9"),
        &page("/teacher/courses/:id", "/teacher/courses/9")
    );
    assert_eq!(nav.document_title(), "Editar curso | Aula Virtual");
}

#[test]
fn test_public_route_for_anyone() {
    let (_tx, mut nav) = controller(Session::anonymous());

    assert_eq!(nav.navigate("/courses/42"), &page("/courses/:id", "/courses/42"));
    assert_eq!(nav.document_title(), "Detalles del curso | Aula Virtual");
}

#[test]
fn test_loading_session_holds_the_navigation() {
    let (_tx, mut nav) = controller(Session::initial());

    assert_eq!(nav.navigate("/payments"), &View::Loading);
    assert_eq!(nav.location().pathname, "/payments");
}

#[test]
fn test_session_error_offers_reload() {
    let (_tx, mut nav) = controller(Session::failed(ErrorInfo::new("sin conexión")));

    assert_eq!(
        nav.navigate("/payments"),
        &View::Error {
            message: "sin conexión".to_string(),
            retry: RetryAction::Reload,
        }
    );
}

#[test]
fn test_unknown_path_is_not_found_with_default_title() {
    let (_tx, mut nav) = controller(Session::anonymous());

    assert_eq!(
        nav.navigate("/does/not/exist"),
        &View::NotFound {
            pathname: "/does/not/exist".to_string()
        }
    );
    assert_eq!(nav.document_title(), "Plataforma de aprendizaje | Aula Virtual");
}

#[test]
fn test_teacher_landing_on_dashboard_goes_home() {
    let (_tx, mut nav) = controller(Session::authenticated(user(Role::Teacher)));

    assert_eq!(
        nav.navigate("/dashboard"),
        &page("/teacher/dashboard", "/teacher/dashboard")
    );
    assert_eq!(nav.document_title(), "Panel del profesor | Aula Virtual");
}

#[test]
fn test_admin_landing_on_dashboard_goes_home() {
    let (_tx, mut nav) = controller(Session::authenticated(user(Role::Admin)));

    assert_eq!(nav.navigate("/dashboard"), &page("/admin", "/admin"));
}

#[test]
fn test_role_redirector_runs_after_guard() {
    // A shared route both teachers and admins may open, outside the teacher space.
    let routes = RouteTable::new(vec![
        RouteSpec::guarded("/reports", "Reportes", &["teacher", "admin"]).unwrap(),
        RouteSpec::guarded("/teacher/dashboard", "Panel del profesor", &["teacher"]).unwrap(),
        RouteSpec::public("/login", "Iniciar sesión"),
    ])
    .unwrap();
    let titles = TitleResolver::new(routes.title_table().unwrap(), "Aula", "Aula Virtual");
    let portal = Arc::new(Portal::new(routes, titles));

    let (_tx, rx) = watch::channel(Session::authenticated(user(Role::Teacher)));
    let mut nav = NavigationController::new(portal, rx, MemoryHistory::new("/"));

    assert_eq!(
        nav.navigate("/reports"),
        &page("/teacher/dashboard", "/teacher/dashboard")
    );
}

#[test]
fn test_redirect_loop_is_cut() {
    // A sign-in route that itself requires a role loops forever for anonymous users.
    let routes =
        RouteTable::new(vec![RouteSpec::guarded("/login", "Entrar", &["student"]).unwrap()])
            .unwrap();
    let titles = TitleResolver::new(routes.title_table().unwrap(), "Aula", "Aula Virtual");
    let portal = Arc::new(Portal::new(routes, titles));

    let (_tx, rx) = watch::channel(Session::anonymous());
    let mut nav = NavigationController::new(portal, rx, MemoryHistory::new("/"));

    assert!(matches!(nav.navigate("/login"), View::Error { .. }));
}

/// Counts the redirects executed on top of an in-memory history.
struct CountingHistory {
    inner: MemoryHistory,
    replaced: usize,
}

impl History for CountingHistory {
    fn current(&self) -> &Location {
        self.inner.current()
    }

    fn push(&mut self, location: Location, state: Option<RedirectState>) {
        self.inner.push(location, state);
    }

    fn replace(&mut self, location: Location, state: Option<RedirectState>) {
        self.replaced += 1;
        self.inner.replace(location, state);
    }
}

#[test]
fn test_redirect_loop_executes_at_most_the_cap() {
    let routes =
        RouteTable::new(vec![RouteSpec::guarded("/login", "Entrar", &["student"]).unwrap()])
            .unwrap();
    let titles = TitleResolver::new(routes.title_table().unwrap(), "Aula", "Aula Virtual");
    let portal = Arc::new(Portal::new(routes, titles));

    let (_tx, rx) = watch::channel(Session::anonymous());
    let history = CountingHistory {
        inner: MemoryHistory::new("/"),
        replaced: 0,
    };
    let mut nav = NavigationController::new(portal, rx, history);

    assert!(matches!(nav.navigate("/login"), View::Error { .. }));
    assert_eq!(nav.history().replaced, MAX_REDIRECTS);
}

#[test]
fn test_unmount_restores_default_title() {
    let (_tx, mut nav) = controller(Session::anonymous());
    nav.navigate("/about");
    assert_eq!(nav.document_title(), "Acerca de | Aula Virtual");

    nav.unmount();

    assert_eq!(nav.document_title(), "Plataforma de aprendizaje | Aula Virtual");
}

#[tokio::test]
async fn test_session_change_reevaluates_mounted_route() {
    let (tx, mut nav) = controller(Session::initial());
    assert_eq!(nav.navigate("/dashboard"), &View::Loading);

    tx.send(Session::authenticated(user(Role::Student))).unwrap();

    let view = nav.session_changed().await.cloned();
    assert_eq!(view, Some(page("/dashboard", "/dashboard")));
}

#[tokio::test]
async fn test_sign_out_moves_user_to_sign_in() {
    let (tx, mut nav) = controller(Session::authenticated(user(Role::Student)));
    nav.navigate("/payments");

    tx.send(Session::anonymous()).unwrap();
    nav.session_changed().await;

    assert_eq!(nav.location().pathname, "/login");
    let entry = nav.history().current_entry();
    assert_eq!(entry.state.as_ref().unwrap().from.pathname, "/payments");
}

#[tokio::test]
async fn test_session_provider_gone_ends_the_loop() {
    let (tx, mut nav) = controller(Session::anonymous());
    drop(tx);

    assert!(nav.session_changed().await.is_none());
}

#[tokio::test]
async fn test_end_to_end_with_session_context() {
    let session = SessionContext::new(Arc::new(MockAuthService::with_demo_accounts()));
    let mut nav = NavigationController::new(portal(), session.subscribe(), MemoryHistory::new("/"));

    session.init(None).await;
    nav.evaluate();
    nav.navigate("/teacher/courses");
    assert_eq!(nav.location().pathname, "/login");

    session
        .login(&Credentials::new("profesor@aula.test", DEMO_PASSWORD))
        .await
        .expect("demo teacher signs in");
    nav.evaluate();

    // Sign-in returns the user to where they were headed.
    let from = nav.history().current_entry().state.clone().unwrap().from;
    assert_eq!(
        nav.navigate(&from.href()),
        &page("/teacher/courses", "/teacher/courses")
    );

    session.logout().await;
    nav.evaluate();
    assert_eq!(nav.location().pathname, "/login");
}

#[test]
fn test_memory_history_push_truncates_forward_entries() {
    let mut history = MemoryHistory::new("/");
    history.push(Location::new("/a"), None);
    history.push(Location::new("/b"), None);

    assert!(history.back());
    history.push(Location::new("/c"), None);

    let paths: Vec<&str> = history
        .entries()
        .iter()
        .map(|entry| entry.location.pathname.as_str())
        .collect();
    assert_eq!(paths, vec!["/", "/a", "/c"]);
    assert_eq!(history.current().pathname, "/c");
}
