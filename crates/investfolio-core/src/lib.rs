//! Core library for the InvestFolio client.
//!
//! Session handling, the REST client and the route guard live here so the
//! CLI (and any other front end) only has to render.

pub mod api;
pub mod auth;
pub mod config;
pub mod forms;
pub mod guard;
pub mod models;
pub mod navigation;
pub mod utils;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthController, AuthState, Session, TokenStore};
pub use config::{Config, TokenBackend};
pub use guard::GuardDecision;
pub use navigation::{Navigator, Router};
