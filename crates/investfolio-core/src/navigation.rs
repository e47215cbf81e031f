//! View routes and the navigation side effects the session layer triggers.

use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

/// Home / dashboard view
pub const HOME: &str = "/";
pub const LOGIN: &str = "/login";
pub const REGISTER: &str = "/register";
pub const PORTFOLIO: &str = "/portfolio";
pub const STOCK_REGISTRATION: &str = "/stock-registration";
pub const TRANSACTIONS: &str = "/transactions";

/// Paths that render without a session.
pub const PUBLIC_PATHS: [&str; 2] = [LOGIN, REGISTER];

pub fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
}

/// Receives navigation requests from the controller, the API client and
/// the route guard.
pub trait Navigator: Send + Sync {
    /// Soft in-app transition.
    fn navigate(&self, path: &str);

    /// Hard redirect that interrupts whatever view is current.
    fn force_reload(&self, path: &str);
}

#[derive(Debug, Clone, Default)]
struct RouterState {
    current: String,
    history: Vec<String>,
    hard_reloads: usize,
}

/// In-process navigator: remembers where the user is and where they have
/// been.
#[derive(Debug, Default)]
pub struct Router {
    state: Mutex<RouterState>,
}

impl Router {
    pub fn new(initial: &str) -> Self {
        Self {
            state: Mutex::new(RouterState {
                current: initial.to_string(),
                history: vec![initial.to_string()],
                hard_reloads: 0,
            }),
        }
    }

    pub fn current(&self) -> String {
        self.lock().current.clone()
    }

    /// Every path visited, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    pub fn hard_reloads(&self) -> usize {
        self.lock().hard_reloads
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RouterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn go(&self, path: &str) {
        let mut state = self.lock();
        state.current = path.to_string();
        state.history.push(path.to_string());
    }
}

impl Navigator for Router {
    fn navigate(&self, path: &str) {
        debug!(path, "Navigate");
        self.go(path);
    }

    fn force_reload(&self, path: &str) {
        info!(path, "Forced reload");
        self.go(path);
        self.lock().hard_reloads += 1;
    }
}
