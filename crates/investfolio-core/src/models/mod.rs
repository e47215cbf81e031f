//! Data models exchanged with the InvestFolio API.
//!
//! - `UserProfile` and the login/register payloads
//! - `UserStock` holdings and the create request
//! - `HealthStatus`, `ExchangeRate` for the dashboard

pub mod market;
pub mod stock;
pub mod user;

pub use market::{ExchangeRate, HealthStatus};
pub use stock::{CreateUserStockRequest, RecordId, UserStock};
pub use user::{LoginRequest, LoginResponse, RegisterRequest, UserProfile};
