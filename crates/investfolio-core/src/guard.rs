//! Route guard: may the current view render for this session?

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::auth::AuthState;
use crate::navigation::{self, Navigator, Router};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Session not known yet; render nothing rather than flash the
    /// protected view.
    Withhold,
    Redirect(&'static str),
}

/// Decide what to do with `path` given the controller's state.
pub fn evaluate(path: &str, state: &AuthState) -> GuardDecision {
    if navigation::is_public(path) {
        return GuardDecision::Allow;
    }
    match state {
        AuthState::Authenticated(_) => GuardDecision::Allow,
        AuthState::Initializing | AuthState::Authenticating => GuardDecision::Withhold,
        AuthState::Unauthenticated | AuthState::Error(_) => {
            GuardDecision::Redirect(navigation::LOGIN)
        }
    }
}

/// Evaluate and carry out a redirect through `navigator`.
pub fn enforce(path: &str, state: &AuthState, navigator: &dyn Navigator) -> GuardDecision {
    let decision = evaluate(path, state);
    if let GuardDecision::Redirect(target) = decision {
        debug!(from = path, to = target, "Guard redirect");
        navigator.navigate(target);
    }
    decision
}

/// Re-check the router's current path after every state change until the
/// controller goes away.
pub async fn follow(mut states: watch::Receiver<AuthState>, router: Arc<Router>) {
    while states.changed().await.is_ok() {
        let state = states.borrow_and_update().clone();
        enforce(&router.current(), &state, router.as_ref());
    }
}
