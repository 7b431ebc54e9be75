use crate::models::{GuardOutcome, Location, Redirect, RetryAction, Role, Session};

/// Canonical sign-in route. Both the guard and the redirector send users here.
pub const SIGN_IN_PATH: &str = "/login";
pub const NOT_AUTHORIZED_PATH: &str = "/unauthorized";

/// AccessGuard
///
/// Decides, per navigation, whether a session may view a route with a given allow-list.
/// States are checked in order and the first match wins: error, loading, unauthenticated,
/// unauthorized, authorized.
#[derive(Debug, Clone)]
pub struct AccessGuard {
    sign_in: String,
    not_authorized: String,
}

impl Default for AccessGuard {
    fn default() -> Self {
        Self::new(SIGN_IN_PATH, NOT_AUTHORIZED_PATH)
    }
}

impl AccessGuard {
    pub fn new(sign_in: impl Into<String>, not_authorized: impl Into<String>) -> Self {
        Self {
            sign_in: sign_in.into(),
            not_authorized: not_authorized.into(),
        }
    }

    pub fn sign_in(&self) -> &str {
        &self.sign_in
    }

    pub fn not_authorized(&self) -> &str {
        &self.not_authorized
    }

    pub fn decide(&self, session: &Session, allowed: &[Role], location: &Location) -> GuardOutcome {
        if let Some(error) = &session.error {
            tracing::debug!(path = %location.pathname, error = %error.message, "session error, offering retry");
            return GuardOutcome::Error {
                message: error.message.clone(),
                retry: RetryAction::Reload,
            };
        }

        if session.loading {
            return GuardOutcome::Loading;
        }

        // An authenticated flag without a user record is ambiguous; treat it as signed out.
        if !session.is_authenticated || session.user.is_none() {
            tracing::debug!(path = %location.pathname, "unauthenticated, redirecting to sign-in");
            return GuardOutcome::Redirect(
                Redirect::replace_to(&self.sign_in).with_from(location.clone()),
            );
        }

        let role = session.role();
        if !allowed.contains(&role) {
            tracing::debug!(path = %location.pathname, %role, "role not allowed on route");
            return GuardOutcome::Redirect(Redirect::replace_to(&self.not_authorized));
        }

        GuardOutcome::Render
    }
}
