//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::{json, Value};

use crate::api::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::api::ApiError;

/// Transport that replays queued responses in order and records every
/// request it receives.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, ApiError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: HttpResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn push_json(&self, status: u16, body: Value) {
        self.push(response(status, body.to_string()));
    }

    pub fn push_network_error(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(ApiError::Network(message.to_string())));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Paths requested, in order, without the base URL.
    pub fn paths(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| {
                let after_scheme = r.url.split_once("://").map_or(r.url.as_str(), |(_, rest)| rest);
                after_scheme
                    .find('/')
                    .map_or_else(String::new, |i| after_scheme[i..].to_string())
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Network("no scripted response".to_string())))
    }
}

pub fn response(status: u16, body: impl Into<String>) -> HttpResponse {
    HttpResponse::new(status, body)
}

pub fn user_json(id: i64) -> Value {
    json!({
        "id": id,
        "user_id": id,
        "username": format!("user{}", id),
        "email": format!("user{}@example.com", id),
        "full_name": "Test User",
        "is_active": true,
        "is_verified": false,
        "created_at": "2024-06-01T10:00:00",
        "updated_at": "2024-06-01T10:00:00"
    })
}

pub fn login_response_json(token: &str, user_id: i64) -> Value {
    json!({
        "access_token": token,
        "token_type": "bearer",
        "user": user_json(user_id)
    })
}

pub fn user_stock_json(id: i64, ticker: &str) -> Value {
    json!({
        "id": id,
        "user_id": 1,
        "ticker_symbol": ticker,
        "quantity": 2,
        "acquisition_price": 180.0,
        "created_at": "2024-06-01T10:00:00",
        "updated_at": null
    })
}
