use crate::{
    guard::SIGN_IN_PATH,
    models::{Location, Redirect, Role, Session, normalize_path},
};

/// RoleSpaces
///
/// The path prefixes that make up each role's home territory, plus the landing path a
/// user is sent to when found outside of it.
#[derive(Debug, Clone)]
pub struct RoleSpaces {
    pub teacher_root: String,
    pub teacher_home: String,
    pub admin_root: String,
    pub student_home: String,
    pub student_prefixes: Vec<String>,
}

impl Default for RoleSpaces {
    fn default() -> Self {
        Self {
            teacher_root: "/teacher".to_string(),
            teacher_home: "/teacher/dashboard".to_string(),
            admin_root: "/admin".to_string(),
            student_home: "/dashboard".to_string(),
            student_prefixes: ["/dashboard", "/my-courses", "/payments", "/profile", "/courses"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl RoleSpaces {
    /// Landing path for a role. Guests have none.
    pub fn home(&self, role: Role) -> Option<&str> {
        match role {
            Role::Teacher => Some(self.teacher_home.as_str()),
            Role::Admin => Some(self.admin_root.as_str()),
            Role::Student => Some(self.student_home.as_str()),
            Role::Guest => None,
        }
    }

    /// Whether `path` lies in the role's space. Roles without a space contain everything.
    pub fn contains(&self, role: Role, path: &str) -> bool {
        let path = normalize_path(path);
        match role {
            Role::Teacher => within(&path, &self.teacher_root),
            Role::Admin => within(&path, &self.admin_root),
            Role::Student => self
                .student_prefixes
                .iter()
                .any(|prefix| within(&path, prefix)),
            Role::Guest => true,
        }
    }
}

/// Segment-aware prefix test: `/teacher` covers `/teacher` and `/teacher/x`, not `/teachers`.
pub fn within(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    prefix.is_empty()
        || path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// RoleRedirector
///
/// Keeps an authenticated user inside their role-space. Runs after the Access Guard and
/// does not re-check authentication beyond the presence of a user.
#[derive(Debug, Clone)]
pub struct RoleRedirector {
    sign_in: String,
    spaces: RoleSpaces,
}

impl Default for RoleRedirector {
    fn default() -> Self {
        Self::new(SIGN_IN_PATH, RoleSpaces::default())
    }
}

impl RoleRedirector {
    pub fn new(sign_in: impl Into<String>, spaces: RoleSpaces) -> Self {
        Self {
            sign_in: sign_in.into(),
            spaces,
        }
    }

    pub fn spaces(&self) -> &RoleSpaces {
        &self.spaces
    }

    /// `None` means the location already belongs to the user's role-space.
    pub fn check(&self, session: &Session, location: &Location) -> Option<Redirect> {
        let Some(user) = &session.user else {
            return Some(Redirect::replace_to(&self.sign_in).with_from(location.clone()));
        };

        if user.role == Role::Guest {
            tracing::debug!(path = %location.pathname, "no role-space for guest, passing through");
            return None;
        }

        if self.spaces.contains(user.role, &location.pathname) {
            return None;
        }

        let home = self.spaces.home(user.role)?;
        tracing::debug!(path = %location.pathname, role = %user.role, %home, "outside role-space");
        Some(Redirect::replace_to(home))
    }
}
