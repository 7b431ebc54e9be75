use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use thiserror::Error;
use ts_rs::TS;
use url::form_urlencoded;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Identity & Roles ---

/// Role
///
/// The closed set of roles known to the portal. External role strings (profile rows,
/// provider claims, route configuration) are parsed into this enum once, at the boundary,
/// so nothing downstream compares free-form strings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Student,
    Teacher,
    Admin,
    /// Minimal privileges. Also the landing value for absent or unrecognized roles.
    #[default]
    Guest,
}

/// Returned by the strict role parser used for route configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 4] = [Role::Student, Role::Teacher, Role::Admin, Role::Guest];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
            Role::Guest => "guest",
        }
    }

    /// Lenient parse for identity data: missing or unrecognized values fail closed to `Guest`.
    pub fn from_claim(raw: Option<&str>) -> Role {
        raw.and_then(|value| value.parse().ok())
            .unwrap_or(Role::Guest)
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    /// Trims and compares case-insensitively.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            "admin" => Ok(Role::Admin),
            "guest" => Ok(Role::Guest),
            _ => Err(UnknownRole(raw.trim().to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User
///
/// Raw profile record as stored in the `public.profiles` table. The `role` column is
/// free text; use [`User::identity`] to obtain the typed snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
}

impl User {
    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            id: self.id,
            role: Role::from_claim(Some(&self.role)),
            display_name: self.display_name.clone(),
            email: self.email.clone(),
        }
    }
}

/// UserIdentity
///
/// Immutable snapshot of the signed-in user, replaced wholesale on every session update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserIdentity {
    pub id: Uuid,
    pub role: Role,
    pub display_name: String,
    pub email: String,
}

/// Credentials
///
/// Sign-in form payload forwarded to the authentication service.
#[derive(Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

// Never print the password.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

// --- Session ---

/// ErrorInfo
///
/// Why the session provider could not determine the authentication state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorInfo {
    pub message: String,
    #[ts(type = "string")]
    pub occurred_at: DateTime<Utc>,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            occurred_at: Utc::now(),
        }
    }
}

/// Session
///
/// The authentication state consumed by the Access Guard and the Role Redirector.
/// A single writer (the session provider, or the per-request resolver on the server)
/// produces whole snapshots; guards only read them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Session {
    pub is_authenticated: bool,
    pub user: Option<UserIdentity>,
    pub loading: bool,
    pub error: Option<ErrorInfo>,
}

impl Session {
    /// State at process start: nobody signed in yet, resolution pending.
    pub fn initial() -> Self {
        Self {
            is_authenticated: false,
            user: None,
            loading: true,
            error: None,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            loading: false,
            ..Self::initial()
        }
    }

    pub fn authenticated(user: UserIdentity) -> Self {
        Self {
            is_authenticated: true,
            user: Some(user),
            loading: false,
            error: None,
        }
    }

    pub fn failed(error: ErrorInfo) -> Self {
        Self {
            error: Some(error),
            ..Self::anonymous()
        }
    }

    /// The session's role. Absent users are guests.
    pub fn role(&self) -> Role {
        self.user.as_ref().map_or(Role::Guest, |user| user.role)
    }
}

// --- Navigation ---

/// Location
///
/// A navigated location as the router sees it. `search` keeps its leading `?`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Location {
    pub pathname: String,
    #[serde(default)]
    pub search: String,
}

impl Location {
    pub fn new(pathname: impl Into<String>) -> Self {
        Self {
            pathname: pathname.into(),
            search: String::new(),
        }
    }

    /// Splits `"/path?query"` into pathname and search. A `#fragment` is dropped.
    pub fn parse(target: &str) -> Self {
        let target = target.split('#').next().unwrap_or_default();
        match target.split_once('?') {
            Some((pathname, query)) => Self {
                pathname: pathname.to_string(),
                search: format!("?{query}"),
            },
            None => Self::new(target),
        }
    }

    pub fn href(&self) -> String {
        format!("{}{}", self.pathname, self.search)
    }
}

/// State payload attached to a redirect so the target can send the user back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RedirectState {
    pub from: Location,
}

/// Redirect
///
/// A navigation the router must perform instead of rendering the requested route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Redirect {
    pub to: String,
    /// Replace the current history entry instead of pushing a new one.
    pub replace: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<RedirectState>,
}

impl Redirect {
    pub fn replace_to(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            replace: true,
            state: None,
        }
    }

    pub fn with_from(mut self, from: Location) -> Self {
        self.state = Some(RedirectState { from });
        self
    }

    /// The redirect as a URL an HTTP client can follow. The `from` state travels as the
    /// `from` query parameter.
    pub fn href(&self) -> String {
        match &self.state {
            Some(RedirectState { from }) => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair("from", &from.href())
                    .finish();
                format!("{}?{}", self.to, query)
            }
            None => self.to.clone(),
        }
    }
}

/// NavigationState
///
/// What the router knows about the current navigation: the normalized pathname and every
/// route pattern it matched, least specific first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct NavigationState {
    pub pathname: String,
    pub matched: Vec<String>,
}

impl NavigationState {
    pub fn new(pathname: &str, matched: Vec<String>) -> Self {
        Self {
            pathname: normalize_path(pathname),
            matched,
        }
    }
}

/// Strips query, fragment and trailing slash; the empty path becomes `/`.
pub fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// The manual recovery offered next to a session error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum RetryAction {
    /// Full page reload.
    Reload,
}

/// GuardOutcome
///
/// Result of evaluating a navigation against the session. Decisions are pure data; the
/// router (client controller or HTTP middleware) executes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "kind", rename_all = "lowercase")]
#[ts(export)]
pub enum GuardOutcome {
    Error { message: String, retry: RetryAction },
    Loading,
    Redirect(Redirect),
    Render,
}

// --- API Schemas (Output) ---

/// NavigationResponse
///
/// Output of GET /api/navigation: the document title and outcome for a path, evaluated
/// against the caller's session.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NavigationResponse {
    pub pathname: String,
    pub title: String,
    pub outcome: GuardOutcome,
}

/// UserProfile
///
/// Output schema for the authenticated user's profile (GET /api/me), including the
/// landing path of the user's role-space.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub home: Option<String>,
}
