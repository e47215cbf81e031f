//! Client-side checks run before a form is submitted.
//!
//! These mirror the server's rules closely enough to catch the common
//! mistakes without a round-trip; the server stays authoritative.

use thiserror::Error;

use crate::models::{CreateUserStockRequest, RegisterRequest};

/// Shortest password the server accepts.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Longest password / full name the server accepts.
const MAX_FIELD_LENGTH: usize = 100;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Please enter your name")]
    NameRequired,
    #[error("Please enter your email address")]
    EmailRequired,
    #[error("Please enter a password")]
    PasswordRequired,
    #[error("Password must be at least 8 characters")]
    PasswordTooShort,
    #[error("Password must be at most 100 characters")]
    PasswordTooLong,
    #[error("Password must contain at least one uppercase letter")]
    PasswordNeedsUppercase,
    #[error("Password must contain at least one lowercase letter")]
    PasswordNeedsLowercase,
    #[error("Password must contain at least one digit")]
    PasswordNeedsDigit,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Name must be at most 100 characters")]
    NameTooLong,
    #[error("Please enter a ticker symbol")]
    TickerRequired,
    #[error("Quantity must be 1 or more")]
    QuantityNotPositive,
    #[error("Acquisition price must be greater than 0")]
    PriceNotPositive,
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FormError> {
        if self.email.trim().is_empty() {
            return Err(FormError::EmailRequired);
        }
        if self.password.is_empty() {
            return Err(FormError::PasswordRequired);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationForm {
    /// Check every field and build the register payload. The username is
    /// the part of the email before `@`.
    pub fn validate(&self) -> Result<RegisterRequest, FormError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(FormError::NameRequired);
        }
        if name.chars().count() > MAX_FIELD_LENGTH {
            return Err(FormError::NameTooLong);
        }

        let email = self.email.trim();
        if email.is_empty() {
            return Err(FormError::EmailRequired);
        }

        validate_password(&self.password)?;
        if self.password != self.confirm_password {
            return Err(FormError::PasswordMismatch);
        }

        Ok(RegisterRequest {
            username: username_from_email(email),
            email: email.to_string(),
            password: self.password.clone(),
            full_name: name.to_string(),
        })
    }
}

pub fn validate_password(password: &str) -> Result<(), FormError> {
    if password.is_empty() {
        return Err(FormError::PasswordRequired);
    }
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(FormError::PasswordTooShort);
    }
    if len > MAX_FIELD_LENGTH {
        return Err(FormError::PasswordTooLong);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(FormError::PasswordNeedsUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(FormError::PasswordNeedsLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(FormError::PasswordNeedsDigit);
    }
    Ok(())
}

pub fn username_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or_default().to_string()
}

#[derive(Debug, Clone, Default)]
pub struct StockForm {
    pub ticker_symbol: String,
    pub quantity: i64,
    pub acquisition_price: f64,
}

impl StockForm {
    pub fn validate(&self) -> Result<CreateUserStockRequest, FormError> {
        let ticker = self.ticker_symbol.trim();
        if ticker.is_empty() {
            return Err(FormError::TickerRequired);
        }
        if self.quantity <= 0 {
            return Err(FormError::QuantityNotPositive);
        }
        if !self.acquisition_price.is_finite() || self.acquisition_price <= 0.0 {
            return Err(FormError::PriceNotPositive);
        }
        Ok(CreateUserStockRequest {
            ticker_symbol: ticker.to_uppercase(),
            quantity: self.quantity,
            acquisition_price: self.acquisition_price,
        })
    }
}
