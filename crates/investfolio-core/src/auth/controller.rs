//! Session controller: owns the authentication state machine and publishes
//! every transition to subscribers.
//!
//! ```text
//! Initializing ──(no token / me() fails)──▶ Unauthenticated
//! Initializing ──(me() ok)────────────────▶ Authenticated
//! Unauthenticated ─login/register─▶ Authenticating ─▶ Authenticated | Error
//! Authenticated ─logout─▶ Authenticating ─▶ Unauthenticated
//! Error ─clear_error─▶ Unauthenticated
//! ```
//!
//! Calls are not queued. If the caller starts a second session-mutating
//! call before the first resolves, whichever finishes last decides the
//! final state.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::auth::{AuthState, Credential, Session, TokenStore};
use crate::models::{RegisterRequest, UserProfile};
use crate::navigation::{self, Navigator};

pub struct AuthController {
    api: ApiClient,
    tokens: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    state: Arc<watch::Sender<AuthState>>,
}

impl AuthController {
    /// The controller shares the API client's token store. A 401 seen by
    /// the client while signed in also ends the session here, before the
    /// client's own unauthorized hook runs.
    pub fn new(api: ApiClient, navigator: Arc<dyn Navigator>) -> Self {
        let tokens = api.token_store().clone();
        let state = Arc::new(watch::channel(AuthState::Initializing).0);

        let expired = state.clone();
        let previous = api.unauthorized_hook();
        let api = api.on_unauthorized(Arc::new(move || {
            expired.send_if_modified(|s| {
                if s.is_authenticated() {
                    *s = AuthState::Unauthenticated;
                    true
                } else {
                    false
                }
            });
            previous();
        }));

        Self {
            api,
            tokens,
            navigator,
            state,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Receive every state transition. Use `Session::from(&*rx.borrow())`
    /// for the view-facing snapshot.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn session(&self) -> Session {
        Session::from(&*self.state.borrow())
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    fn transition(&self, next: AuthState) {
        let previous = self.state.send_replace(next);
        let current = self.state.borrow();
        debug!(from = previous.name(), to = current.name(), "Auth state transition");
    }

    fn discard_credential(&self) {
        if let Err(e) = self.tokens.clear() {
            warn!(error = %e, "Failed to clear stored credential");
        }
    }

    // =========================================================================
    // Startup
    // =========================================================================

    /// Rebuild the session from the stored credential.
    pub async fn initialize(&self) -> Session {
        self.transition(AuthState::Initializing);

        if self.tokens.get().is_none() {
            debug!("No stored credential");
            self.transition(AuthState::Unauthenticated);
            return self.session();
        }

        match self.api.me().await {
            Ok(user) => {
                info!(user_id = user.id, "Session restored");
                self.transition(AuthState::Authenticated(user));
            }
            Err(e) => {
                warn!(error = %e, "Stored credential rejected, discarding");
                self.discard_credential();
                self.transition(AuthState::Unauthenticated);
            }
        }
        self.session()
    }

    // =========================================================================
    // Login / register / logout
    // =========================================================================

    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        self.begin_authentication();
        self.authenticate(email, password).await
    }

    /// A new login replaces whatever session was stored before it, even if
    /// the attempt fails.
    fn begin_authentication(&self) {
        if self.tokens.get().is_some() {
            debug!("Discarding previous credential");
            self.discard_credential();
        }
        self.transition(AuthState::Authenticating);
    }

    /// Create the account, then log in with the same credentials. Nothing
    /// is stored unless both steps succeed.
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile, ApiError> {
        self.begin_authentication();

        match self.api.register(request).await {
            Ok(user) => info!(user_id = user.id, "Account created"),
            Err(e) => {
                warn!(error = %e, "Registration failed");
                self.transition(AuthState::Error(e.to_string()));
                return Err(e);
            }
        }

        self.authenticate(&request.email, &request.password).await
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<UserProfile, ApiError> {
        match self.api.login(email, password).await {
            Ok(response) => {
                if let Err(e) = self.tokens.set(&Credential::new(response.access_token)) {
                    warn!(error = %e, "Failed to persist credential");
                    self.discard_credential();
                    let err = ApiError::CredentialStorage(format!("{:#}", e));
                    self.transition(AuthState::Error(err.to_string()));
                    return Err(err);
                }
                let user = response.user;
                info!(user_id = user.id, "Login successful");
                self.transition(AuthState::Authenticated(user.clone()));
                self.navigator.navigate(navigation::HOME);
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.transition(AuthState::Error(e.to_string()));
                Err(e)
            }
        }
    }

    /// End the session. Always succeeds locally, whatever the server says.
    pub async fn logout(&self) {
        self.transition(AuthState::Authenticating);

        if let Err(e) = self.api.logout().await {
            warn!(error = %e, "Logout request failed, clearing session anyway");
        }

        self.discard_credential();
        self.transition(AuthState::Unauthenticated);
        info!("Logged out");
        self.navigator.navigate(navigation::LOGIN);
    }

    /// Drop the failure message, keeping authentication as it is.
    pub fn clear_error(&self) {
        self.state.send_if_modified(|state| {
            if matches!(state, AuthState::Error(_)) {
                *state = AuthState::Unauthenticated;
                true
            } else {
                false
            }
        });
    }

    /// Re-fetch the profile of the signed-in user.
    ///
    /// A rejected credential ends the session; other failures leave it as
    /// it was.
    pub async fn refresh_user(&self) -> Result<UserProfile, ApiError> {
        match self.api.me().await {
            Ok(user) => {
                if self.is_authenticated() {
                    self.transition(AuthState::Authenticated(user.clone()));
                }
                Ok(user)
            }
            Err(e) => {
                if e.is_unauthorized() {
                    self.transition(AuthState::Unauthenticated);
                }
                Err(e)
            }
        }
    }
}
