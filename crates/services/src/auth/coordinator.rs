use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use study_core::model::{RegistrationDraft, User};
use tracing::{debug, error, info, warn};

use super::api::{AuthApi, AuthPayload};
use super::single_flight::SingleFlight;
use crate::error::AuthError;
use crate::transport::{ApiRequest, Transport};

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct SessionState {
    access_token: Option<String>,
    user: Option<User>,
    auth_checked: bool,
    /// Bumped by every logout so a refresh that started before it cannot
    /// resurrect the session when it lands.
    epoch: u64,
}

impl SessionState {
    fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    fn apply(&mut self, payload: AuthPayload) {
        self.access_token = Some(payload.access_token);
        if let Some(user) = payload.user {
            self.user = Some(user);
        }
        self.auth_checked = true;
    }

    fn snapshot(&self, refreshing: bool) -> SessionSnapshot {
        SessionSnapshot {
            access_token: self.access_token.clone(),
            user: self.user.clone(),
            auth_checked: self.auth_checked,
            refreshing,
        }
    }
}

/// Point-in-time copy of the session, safe to hand to the view layer.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    access_token: Option<String>,
    user: Option<User>,
    auth_checked: bool,
    refreshing: bool,
}

impl SessionSnapshot {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn auth_checked(&self) -> bool {
        self.auth_checked
    }

    #[must_use]
    pub fn refreshing(&self) -> bool {
        self.refreshing
    }
}

impl fmt::Debug for SessionSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSnapshot")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user)
            .field("auth_checked", &self.auth_checked)
            .field("refreshing", &self.refreshing)
            .finish()
    }
}

//
// ─── COORDINATOR ───────────────────────────────────────────────────────────────
//

struct Inner {
    auth: AuthApi,
    state: Mutex<SessionState>,
    refresh: SingleFlight<Result<SessionSnapshot, AuthError>>,
}

/// Sole owner and writer of the access token and signed-in user.
///
/// Cheap to clone; clones share one session. Token refreshes are
/// single-flight: callers that arrive while a refresh is pending await that
/// refresh instead of issuing another request.
#[derive(Clone)]
pub struct SessionCoordinator {
    inner: Arc<Inner>,
}

impl SessionCoordinator {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                auth: AuthApi::new(transport),
                state: Mutex::new(SessionState::default()),
                refresh: SingleFlight::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let refreshing = self.inner.refresh.in_flight();
        self.state().snapshot(refreshing)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.state().user.clone()
    }

    #[must_use]
    pub fn auth_checked(&self) -> bool {
        self.state().auth_checked
    }

    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.inner.refresh.in_flight()
    }

    /// Navigation-guard decision: should a route be redirected to login?
    #[must_use]
    pub fn requires_login(&self, route_requires_auth: bool) -> bool {
        route_requires_auth && !self.is_authenticated()
    }

    /// Attach the current token to `request`.
    ///
    /// Returns whether a token was attached, i.e. whether the request is
    /// being sent by an authenticated session.
    pub fn authorize(&self, request: &mut ApiRequest) -> bool {
        match self.state().access_token.as_deref() {
            Some(token) => {
                request.set_bearer(token);
                true
            }
            None => false,
        }
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Rejected` for bad credentials, or the transport
    /// failure. Either way the session is marked as checked and stays empty.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionSnapshot, AuthError> {
        match self.inner.auth.login(email, password).await {
            Ok(payload) => {
                let mut state = self.state();
                state.apply(payload);
                info!(user = ?state.user.as_ref().map(|u| u.id), "logged in");
                Ok(state.snapshot(false))
            }
            Err(err) => {
                error!(%err, "login failed");
                self.state().auth_checked = true;
                Err(err)
            }
        }
    }

    /// Create an account. Does not sign in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Rejected` when the server refuses the registration.
    pub async fn register(&self, draft: &RegistrationDraft) -> Result<User, AuthError> {
        self.inner.auth.register(draft).await
    }

    /// Exchange the refresh credential for a new access token.
    ///
    /// Concurrent calls share a single request and all resolve to its result.
    /// A failed refresh logs the session out before the error reaches waiters.
    ///
    /// # Errors
    ///
    /// - `AuthError::NotAuthenticated` if the session is known to be signed out.
    /// - `AuthError::Refresh` if the server rejected the refresh credential.
    /// - `AuthError::Transport` for network failures.
    pub async fn refresh(&self) -> Result<SessionSnapshot, AuthError> {
        {
            let state = self.state();
            if state.auth_checked && !state.is_authenticated() {
                warn!("refresh skipped: user is not authenticated");
                return Err(AuthError::NotAuthenticated);
            }
        }

        let this = self.clone();
        self.inner
            .refresh
            .run(move || async move { this.refresh_once().await }.boxed())
            .await
    }

    async fn refresh_once(&self) -> Result<SessionSnapshot, AuthError> {
        let (epoch, token) = {
            let state = self.state();
            (state.epoch, state.access_token.clone())
        };
        debug!("refreshing access token");

        match self.inner.auth.refresh(token.as_deref()).await {
            Ok(payload) => {
                let mut state = self.state();
                if state.epoch != epoch {
                    warn!("discarding refresh result: session ended while it was pending");
                    return Err(AuthError::NotAuthenticated);
                }
                state.apply(payload);
                Ok(state.snapshot(false))
            }
            Err(err) => {
                if self.state().epoch != epoch {
                    warn!(%err, "ignoring failed refresh: session ended while it was pending");
                    return Err(err);
                }
                error!(%err, "failed to refresh access token");
                self.logout().await;
                Err(err)
            }
        }
    }

    /// Startup check: try one silent refresh unless the session state is
    /// already known. Failures are logged, never returned.
    pub async fn check_auth(&self) {
        if self.auth_checked() {
            return;
        }
        if let Err(err) = self.refresh().await {
            warn!(%err, "auth check failed, continuing signed out");
        }
    }

    /// End the session.
    ///
    /// The server call is best effort; local state is cleared regardless.
    pub async fn logout(&self) {
        let token = self.state().access_token.clone();
        if let Some(token) = token {
            if let Err(err) = self.inner.auth.logout(&token).await {
                warn!(%err, "server logout failed");
            }
        }
        self.clear();
        info!("logged out");
    }

    fn clear(&self) {
        {
            let mut state = self.state();
            state.access_token = None;
            state.user = None;
            state.auth_checked = true;
            state.epoch += 1;
        }
        self.inner.refresh.clear();
    }

    pub(crate) fn set_user(&self, user: Option<User>) {
        self.state().user = user;
    }
}

impl fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("session", &self.snapshot())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
