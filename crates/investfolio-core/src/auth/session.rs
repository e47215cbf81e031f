use serde::Serialize;

use crate::models::UserProfile;

/// Where the session controller is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    /// Startup, before the stored credential has been checked.
    Initializing,
    Unauthenticated,
    /// A login, register or logout round-trip is in flight.
    Authenticating,
    Authenticated(UserProfile),
    /// The last login or register failed. Not authenticated.
    Error(String),
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, AuthState::Initializing | AuthState::Authenticating)
    }

    pub fn user(&self) -> Option<&UserProfile> {
        match self {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AuthState::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Short label for logs
    pub fn name(&self) -> &'static str {
        match self {
            AuthState::Initializing => "initializing",
            AuthState::Unauthenticated => "unauthenticated",
            AuthState::Authenticating => "authenticating",
            AuthState::Authenticated(_) => "authenticated",
            AuthState::Error(_) => "error",
        }
    }
}

/// Snapshot handed to the view layer. Derived from `AuthState`, never
/// stored on its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Session {
    pub user: Option<UserProfile>,
    pub authenticated: bool,
    pub loading: bool,
    pub error: Option<String>,
}

impl From<&AuthState> for Session {
    fn from(state: &AuthState) -> Self {
        Self {
            user: state.user().cloned(),
            authenticated: state.is_authenticated(),
            loading: state.is_loading(),
            error: state.error().map(str::to_string),
        }
    }
}
