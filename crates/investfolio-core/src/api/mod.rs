//! REST API client module for the InvestFolio service.
//!
//! This module provides the `ApiClient` for the auth and holdings
//! endpoints, the `ApiError` taxonomy, and the `HttpTransport` seam the
//! client sends through.
//!
//! Authenticated endpoints use a bearer token read from the configured
//! `TokenStore` at request time.

pub mod client;
pub mod error;
pub mod transport;

pub use client::{ApiClient, UnauthorizedHook};
pub use error::ApiError;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
