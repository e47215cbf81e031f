//! Authentication module for the client session.
//!
//! This module provides:
//! - `TokenStore`: where the bearer credential lives (memory, file, keychain)
//! - `AuthState` / `Session`: the state machine and its view-facing snapshot
//! - `AuthController`: login, register, logout and session restore
//!
//! The credential is opaque; the server decides when it expires.

pub mod controller;
pub mod session;
pub mod token_store;

pub use controller::AuthController;
pub use session::{AuthState, Session};
pub use token_store::{
    Credential, FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore, TOKEN_KEY,
};
