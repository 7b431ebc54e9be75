use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    models::{ErrorInfo, Role, Session},
    repository::RepositoryState,
};

/// Cookie carrying the session token for plain page navigations.
pub const SESSION_COOKIE: &str = "aula_session";

/// Header accepted in `Env::Local` in place of a token.
pub const DEV_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// Payload expected inside a session JWT, signed with the provider's secret.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the profile UUID used to look up the user's role.
    pub sub: Uuid,
    /// Expiration Time (exp): validated on every request.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// CurrentSession Extractor
///
/// Resolves the caller's [`Session`] for a request. Never rejects: a missing, invalid or
/// expired token yields an anonymous session, and a profile store failure yields an
/// errored session. Deciding what to do with it is the guards' job.
///
/// Resolution order:
/// 1. Local bypass: in `Env::Local`, an `x-user-id` header naming an existing profile.
/// 2. Token: `Authorization: Bearer <jwt>` or the `aula_session` cookie.
/// 3. Profile lookup in the repository, which supplies the current role.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);
        Ok(CurrentSession(resolve_session(parts, &repo, &config).await))
    }
}

pub async fn resolve_session(parts: &Parts, repo: &RepositoryState, config: &AppConfig) -> Session {
    if config.env == Env::Local {
        if let Some(user_id) = dev_user_id(parts) {
            // Fall through to the token flow when the bypass names nobody.
            if let Ok(Some(user)) = repo.get_user(user_id).await {
                return Session::authenticated(user.identity());
            }
        }
    }

    let Some(user_id) = session_token(parts).and_then(|token| decode_subject(&token, config)) else {
        return Session::anonymous();
    };

    match repo.get_user(user_id).await {
        Ok(Some(user)) => Session::authenticated(user.identity()),
        Ok(None) => {
            tracing::debug!(%user_id, "token subject has no profile");
            Session::anonymous()
        }
        Err(error) => {
            tracing::error!(%error, %user_id, "profile lookup failed");
            Session::failed(ErrorInfo::new(
                "No pudimos verificar tu sesión. Inténtalo de nuevo.",
            ))
        }
    }
}

fn dev_user_id(parts: &Parts) -> Option<Uuid> {
    parts
        .headers
        .get(DEV_USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| Uuid::parse_str(raw).ok())
}

/// Bearer token first, then the session cookie.
fn session_token(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    if let Some(token) = bearer {
        return Some(token.trim().to_string());
    }

    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

fn decode_subject(token: &str, config: &AppConfig) -> Option<Uuid> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => Some(data.claims.sub),
        Err(error) => {
            match error.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("session token expired"),
                _ => tracing::debug!(%error, "session token rejected"),
            }
            None
        }
    }
}

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated API request. Rejects with 401 for anonymous
/// callers and 503 when the session could not be resolved.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
    pub email: String,
    pub display_name: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);
        let session = resolve_session(parts, &repo, &config).await;

        if session.error.is_some() {
            return Err(StatusCode::SERVICE_UNAVAILABLE);
        }

        match session.user {
            Some(user) if session.is_authenticated => Ok(AuthUser {
                id: user.id,
                role: user.role,
                email: user.email,
                display_name: user.display_name,
            }),
            _ => Err(StatusCode::UNAUTHORIZED),
        }
    }
}
