use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    models::{Credentials, ErrorInfo, Session, User, UserIdentity},
    repository::demo_profiles,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("session token was rejected")]
    Unauthenticated,
    #[error("could not reach the authentication service: {0}")]
    Transport(String),
    #[error("authentication service answered with status {status}")]
    Provider { status: u16 },
}

impl SessionError {
    /// The provider could not determine the auth state at all, as opposed to answering no.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(self, SessionError::Transport(_) | SessionError::Provider { .. })
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(error: reqwest::Error) -> Self {
        SessionError::Transport(error.to_string())
    }
}

// 1. AuthService Contract
/// AuthService
///
/// The authentication collaborator behind the session provider. Swapping the mock for the
/// REST client changes nothing for the guards.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Exchanges credentials for a session token.
    async fn sign_in(&self, credentials: &Credentials) -> Result<String, SessionError>;

    /// Resolves the identity behind a token.
    async fn current_user(&self, token: &str) -> Result<UserIdentity, SessionError>;

    /// Invalidates a token on the provider side.
    async fn sign_out(&self, token: &str) -> Result<(), SessionError>;
}

/// AuthState
///
/// The concrete type used to share the authentication service.
pub type AuthState = Arc<dyn AuthService>;

// 2. The Session Provider
/// SessionContext
///
/// The single process-wide holder of the session. It is the only writer; guards and the
/// navigation controller read snapshots or subscribe to changes. Every transition
/// replaces the whole snapshot, so subscribers never observe a partial update.
pub struct SessionContext {
    auth: AuthState,
    state: watch::Sender<Session>,
    token: Mutex<Option<String>>,
}

impl SessionContext {
    /// Starts unauthenticated with resolution pending; call [`SessionContext::init`].
    pub fn new(auth: AuthState) -> Self {
        let (state, _) = watch::channel(Session::initial());
        Self {
            auth,
            state,
            token: Mutex::new(None),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn token(&self) -> Option<String> {
        self.lock_token().clone()
    }

    /// Startup transition. Without a stored token the session settles as anonymous.
    pub async fn init(&self, stored_token: Option<String>) -> Session {
        match stored_token {
            Some(token) => {
                *self.lock_token() = Some(token);
                self.refresh().await
            }
            None => {
                self.publish(Session::anonymous());
                self.snapshot()
            }
        }
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<UserIdentity, SessionError> {
        self.begin();
        let result = async {
            let token = self.auth.sign_in(credentials).await?;
            let user = self.auth.current_user(&token).await?;
            Ok::<_, SessionError>((token, user))
        }
        .await;

        match result {
            Ok((token, user)) => {
                *self.lock_token() = Some(token);
                tracing::info!(role = %user.role, "signed in");
                self.publish(Session::authenticated(user.clone()));
                Ok(user)
            }
            Err(error) => {
                self.settle_failure(&error);
                Err(error)
            }
        }
    }

    /// Re-validates the stored token.
    pub async fn refresh(&self) -> Session {
        let Some(token) = self.token() else {
            self.publish(Session::anonymous());
            return self.snapshot();
        };

        self.begin();
        match self.auth.current_user(&token).await {
            Ok(user) => self.publish(Session::authenticated(user)),
            Err(error) => self.settle_failure(&error),
        }
        self.snapshot()
    }

    /// Teardown transition. Provider sign-out is best effort; the local session is
    /// cleared regardless.
    pub async fn logout(&self) {
        let token = self.lock_token().take();
        if let Some(token) = token {
            if let Err(error) = self.auth.sign_out(&token).await {
                tracing::warn!(%error, "provider sign-out failed");
            }
        }
        tracing::info!("signed out");
        self.publish(Session::anonymous());
    }

    fn begin(&self) {
        self.state.send_modify(|session| {
            session.loading = true;
            session.error = None;
        });
    }

    fn settle_failure(&self, error: &SessionError) {
        if error.is_resolution_failure() {
            tracing::error!(%error, "session resolution failed");
            self.publish(Session::failed(ErrorInfo::new(error.to_string())));
        } else {
            tracing::info!(%error, "session rejected");
            self.lock_token().take();
            self.publish(Session::anonymous());
        }
    }

    fn publish(&self, session: Session) {
        self.state.send_replace(session);
    }

    fn lock_token(&self) -> MutexGuard<'_, Option<String>> {
        self.token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// 3. The Real Implementation (Supabase + portal API)
/// RestAuthService
///
/// Signs in with the Supabase password grant and resolves identities through the
/// portal's own `GET /api/session`, so the role always comes from the profiles store.
#[derive(Clone)]
pub struct RestAuthService {
    client: reqwest::Client,
    auth_url: String,
    api_key: String,
    portal_url: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl RestAuthService {
    pub fn new(
        auth_url: impl Into<String>,
        api_key: impl Into<String>,
        portal_url: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            auth_url: auth_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            portal_url: portal_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AuthService for RestAuthService {
    async fn sign_in(&self, credentials: &Credentials) -> Result<String, SessionError> {
        let response = self
            .client
            .post(format!("{}/auth/v1/token?grant_type=password", self.auth_url))
            .header("apikey", &self.api_key)
            .json(credentials)
            .send()
            .await?;

        match response.status().as_u16() {
            400 | 401 => return Err(SessionError::InvalidCredentials),
            status if !response.status().is_success() => {
                return Err(SessionError::Provider { status });
            }
            _ => {}
        }

        let body: TokenResponse = response.json().await?;
        Ok(body.access_token)
    }

    async fn current_user(&self, token: &str) -> Result<UserIdentity, SessionError> {
        let response = self
            .client
            .get(format!("{}/api/session", self.portal_url))
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SessionError::Provider {
                status: response.status().as_u16(),
            });
        }

        let session: Session = response.json().await?;
        session
            .user
            .filter(|_| session.is_authenticated)
            .ok_or(SessionError::Unauthenticated)
    }

    async fn sign_out(&self, token: &str) -> Result<(), SessionError> {
        let response = self
            .client
            .post(format!("{}/auth/v1/logout", self.auth_url))
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await?;

        // An already invalid token is as signed out as it gets.
        let status = response.status();
        if status.is_success() || status.as_u16() == 401 {
            Ok(())
        } else {
            Err(SessionError::Provider {
                status: status.as_u16(),
            })
        }
    }
}

// 4. The Mock Implementation
/// MockAccount
///
/// A sign-in the mock service accepts.
#[derive(Debug, Clone)]
pub struct MockAccount {
    pub email: String,
    pub password: String,
    pub user: UserIdentity,
}

pub const DEMO_PASSWORD: &str = "aula-demo";

/// MockAuthService
///
/// In-memory authentication with an optional artificial delay, for local development and
/// tests. `set_offline(true)` makes every call fail as a transport error.
pub struct MockAuthService {
    accounts: Vec<MockAccount>,
    tokens: Mutex<HashMap<String, UserIdentity>>,
    delay: Duration,
    offline: AtomicBool,
}

impl MockAuthService {
    pub fn new(accounts: Vec<MockAccount>) -> Self {
        Self {
            accounts,
            tokens: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
            offline: AtomicBool::new(false),
        }
    }

    /// The demo profiles, all with [`DEMO_PASSWORD`].
    pub fn with_demo_accounts() -> Self {
        Self::new(
            demo_profiles()
                .iter()
                .map(|user: &User| MockAccount {
                    email: user.email.clone(),
                    password: DEMO_PASSWORD.to_string(),
                    user: user.identity(),
                })
                .collect(),
        )
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Registers a token directly, as if issued by an earlier sign-in.
    pub fn issue_token(&self, user: UserIdentity) -> String {
        let token = format!("mock-{}", Uuid::new_v4());
        self.lock_tokens().insert(token.clone(), user);
        token
    }

    async fn simulate_network(&self) -> Result<(), SessionError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(SessionError::Transport(
                "mock auth service is offline".to_string(),
            ));
        }
        Ok(())
    }

    fn lock_tokens(&self) -> MutexGuard<'_, HashMap<String, UserIdentity>> {
        self.tokens
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AuthService for MockAuthService {
    async fn sign_in(&self, credentials: &Credentials) -> Result<String, SessionError> {
        self.simulate_network().await?;
        let account = self
            .accounts
            .iter()
            .find(|account| {
                account.email.eq_ignore_ascii_case(credentials.email.trim())
                    && account.password == credentials.password
            })
            .ok_or(SessionError::InvalidCredentials)?;
        Ok(self.issue_token(account.user.clone()))
    }

    async fn current_user(&self, token: &str) -> Result<UserIdentity, SessionError> {
        self.simulate_network().await?;
        self.lock_tokens()
            .get(token)
            .cloned()
            .ok_or(SessionError::Unauthenticated)
    }

    async fn sign_out(&self, token: &str) -> Result<(), SessionError> {
        self.simulate_network().await?;
        self.lock_tokens().remove(token);
        Ok(())
    }
}
