//! Router Module Index
//!
//! Holds the portal's route table (every navigable pattern, its title, and who may see
//! it) and the two axum surfaces built on top of it:
//!
//! - `pages`: the HTML page shells, each request gated by the page guard middleware.
//! - `api`: the JSON endpoints used by the browser client.
use thiserror::Error;

use crate::{
    models::{NavigationState, Role, UnknownRole, normalize_path},
    title::{PARAM_MARKER, RouteTitleTable, TitleError, pattern_matches, validate_pattern},
};

/// Page shells served for every route in the table.
pub mod pages;

/// Session, profile and navigation endpoints.
pub mod api;

#[derive(Debug, Error)]
pub enum RouteConfigError {
    #[error("route `{0}` is declared more than once")]
    DuplicateRoute(String),
    #[error("route `{pattern}`: {source}")]
    UnknownRole {
        pattern: String,
        #[source]
        source: UnknownRole,
    },
    #[error(transparent)]
    Title(#[from] TitleError),
}

/// Who may view a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Public,
    Roles(Vec<Role>),
}

/// RouteSpec
///
/// One navigable route record.
#[derive(Debug, Clone)]
pub struct RouteSpec {
    pub pattern: String,
    pub title: String,
    pub access: Access,
}

impl RouteSpec {
    pub fn public(pattern: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            title: title.into(),
            access: Access::Public,
        }
    }

    /// A route gated by an allow-list. Role names are parsed strictly (trimmed,
    /// case-insensitive); an unknown name is a configuration error.
    pub fn guarded(
        pattern: impl Into<String>,
        title: impl Into<String>,
        roles: &[&str],
    ) -> Result<Self, RouteConfigError> {
        let pattern = pattern.into();
        let allowed = roles
            .iter()
            .map(|name| name.parse::<Role>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| RouteConfigError::UnknownRole {
                pattern: pattern.clone(),
                source,
            })?;
        Ok(Self {
            pattern,
            title: title.into(),
            access: Access::Roles(allowed),
        })
    }

    /// The allow-list, or `None` for public routes.
    pub fn allowed_roles(&self) -> Option<&[Role]> {
        match &self.access {
            Access::Public => None,
            Access::Roles(roles) => Some(roles),
        }
    }
}

/// RouteTable
///
/// The set of route records the portal knows about, in declaration order.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RouteSpec>,
}

impl RouteTable {
    pub fn new(routes: Vec<RouteSpec>) -> Result<Self, RouteConfigError> {
        for (index, route) in routes.iter().enumerate() {
            validate_pattern(&route.pattern)?;
            if routes[..index].iter().any(|other| other.pattern == route.pattern) {
                return Err(RouteConfigError::DuplicateRoute(route.pattern.clone()));
            }
        }
        Ok(Self { routes })
    }

    /// The e-learning portal's routes.
    pub fn portal() -> Result<Self, RouteConfigError> {
        const STUDENT: &[&str] = &["student"];
        const TEACHER: &[&str] = &["teacher"];
        const ADMIN: &[&str] = &["admin"];
        // Post-login landing for every role; the Role Redirector sends each to its home.
        const SIGNED_IN: &[&str] = &["student", "teacher", "admin"];

        Self::new(vec![
            // Marketing & authentication
            RouteSpec::public("/", "Inicio"),
            RouteSpec::public("/about", "Acerca de"),
            RouteSpec::public("/contact", "Contacto"),
            RouteSpec::public("/courses", "Cursos"),
            RouteSpec::public("/courses/:id", "Detalles del curso"),
            RouteSpec::public("/login", "Iniciar sesión"),
            RouteSpec::public("/register", "Crear cuenta"),
            RouteSpec::public("/forgot-password", "Recuperar contraseña"),
            RouteSpec::public("/unauthorized", "Acceso no autorizado"),
            // Student area
            RouteSpec::guarded("/dashboard", "Mi panel", SIGNED_IN)?,
            RouteSpec::guarded("/my-courses", "Mis cursos", STUDENT)?,
            RouteSpec::guarded("/my-courses/:id", "Contenido del curso", STUDENT)?,
            RouteSpec::guarded("/payments", "Pagos", STUDENT)?,
            RouteSpec::guarded("/profile", "Mi perfil", STUDENT)?,
            // Teacher area
            RouteSpec::guarded("/teacher/dashboard", "Panel del profesor", TEACHER)?,
            RouteSpec::guarded("/teacher/courses", "Cursos del profesor", TEACHER)?,
            RouteSpec::guarded("/teacher/courses/new", "Nuevo curso", TEACHER)?,
            RouteSpec::guarded("/teacher/courses/:id", "Editar curso", TEACHER)?,
            RouteSpec::guarded("/teacher/students", "Estudiantes", TEACHER)?,
            // Administration
            RouteSpec::guarded("/admin", "Administración", ADMIN)?,
            RouteSpec::guarded("/admin/users", "Usuarios", ADMIN)?,
            RouteSpec::guarded("/admin/courses", "Gestión de cursos", ADMIN)?,
            RouteSpec::guarded("/admin/reports", "Reportes", ADMIN)?,
        ])
    }

    pub fn routes(&self) -> &[RouteSpec] {
        &self.routes
    }

    pub fn get(&self, pattern: &str) -> Option<&RouteSpec> {
        self.routes.iter().find(|route| route.pattern == pattern)
    }

    /// Every pattern matching the whole path, least specific first. Specificity is the
    /// number of literal segments; ties keep declaration order.
    pub fn navigation(&self, path: &str) -> NavigationState {
        let pathname = normalize_path(path);
        let segments: Vec<&str> = pathname.split('/').collect();
        let mut matched: Vec<&RouteSpec> = self
            .routes
            .iter()
            .filter(|route| pattern_matches(&route.pattern, &segments).unwrap_or(false))
            .collect();
        matched.sort_by_key(|route| literal_segments(&route.pattern));
        let matched = matched.into_iter().map(|route| route.pattern.clone()).collect();
        NavigationState::new(&pathname, matched)
    }

    /// The most specific route record of a navigation.
    pub fn route(&self, navigation: &NavigationState) -> Option<&RouteSpec> {
        navigation
            .matched
            .last()
            .and_then(|pattern| self.get(pattern))
    }

    pub fn title_table(&self) -> Result<RouteTitleTable, TitleError> {
        RouteTitleTable::new(
            self.routes
                .iter()
                .map(|route| (route.pattern.clone(), route.title.clone())),
        )
    }
}

fn literal_segments(pattern: &str) -> usize {
    pattern
        .split('/')
        .filter(|segment| !segment.is_empty() && !segment.starts_with(PARAM_MARKER))
        .count()
}

/// Converts `/courses/:id` into axum's `/courses/{id}` path syntax.
pub fn axum_path(pattern: &str) -> String {
    pattern
        .split('/')
        .map(|segment| match segment.strip_prefix(PARAM_MARKER) {
            Some(name) => format!("{{{name}}}"),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}
