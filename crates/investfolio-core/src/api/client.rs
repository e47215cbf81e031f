//! API client for the InvestFolio REST API.
//!
//! Every call goes through one request path: resolve the URL, attach the
//! bearer token when the endpoint requires it, send, then either decode
//! the body or turn the error body into an `ApiError`. A 401 on an
//! authenticated call clears the stored credential and fires the
//! unauthorized hook.

use std::sync::Arc;

use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::TokenStore;
use crate::config::Config;
use crate::models::{
    CreateUserStockRequest, ExchangeRate, HealthStatus, LoginRequest, LoginResponse,
    RegisterRequest, UserProfile, UserStock,
};
use crate::navigation::{self, Navigator};

use super::transport::{HttpRequest, HttpTransport, ReqwestTransport};
use super::ApiError;

// ============================================================================
// Endpoints
// ============================================================================

const LOGIN_PATH: &str = "/api/auth/login";
const REGISTER_PATH: &str = "/api/auth/register";
const ME_PATH: &str = "/api/auth/me";
const LOGOUT_PATH: &str = "/api/auth/logout";
const USER_STOCKS_PATH: &str = "/api/user-stocks/";
const HEALTH_PATH: &str = "/health";
const USD_JPY_PATH: &str = "/api/exchange-rates/usd-jpy";

/// Message used when a failed response carries no usable `detail`.
const GENERIC_FAILURE: &str = "Request failed";

/// Side effect run when an authenticated call comes back 401.
pub type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

/// Clone is cheap - transport, token store and hook are all shared.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn HttpTransport>,
    tokens: Arc<dyn TokenStore>,
    on_unauthorized: UnauthorizedHook,
}

impl ApiClient {
    /// Create a client over HTTP using the configured base URL and timeout.
    pub fn new(config: &Config, tokens: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config.request_timeout())?;
        Ok(Self::with_transport(config.api_base_url(), Arc::new(transport), tokens))
    }

    /// Create a client over an arbitrary transport.
    pub fn with_transport(
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            transport,
            tokens,
            on_unauthorized: Arc::new(|| warn!("Session rejected by server")),
        }
    }

    /// Replace the hook run after a 401 on an authenticated call.
    pub fn on_unauthorized(mut self, hook: UnauthorizedHook) -> Self {
        self.on_unauthorized = hook;
        self
    }

    /// Force a hard reload of the login view whenever the server rejects
    /// the session.
    pub fn redirect_on_unauthorized(self, navigator: Arc<dyn Navigator>) -> Self {
        self.on_unauthorized(Arc::new(move || navigator.force_reload(navigation::LOGIN)))
    }

    pub fn unauthorized_hook(&self) -> UnauthorizedHook {
        self.on_unauthorized.clone()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    // ===== Request pipeline =====

    /// Send a request and return the raw success body.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        require_auth: bool,
        fallback: &str,
    ) -> Result<String, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let bearer = if require_auth {
            self.tokens.get().map(|c| c.as_str().to_string())
        } else {
            None
        };

        debug!(%method, path, require_auth, has_token = bearer.is_some(), "API request");

        let response = self
            .transport
            .send(HttpRequest {
                method: method.clone(),
                url,
                bearer,
                body,
            })
            .await
            .inspect_err(|e| warn!(%method, path, error = %e, "API request failed"))?;

        if response.is_success() {
            return Ok(response.body);
        }

        let unauthorized = require_auth && response.status == 401;
        if unauthorized {
            warn!(path, "Unauthorized response, clearing credential");
            if let Err(e) = self.tokens.clear() {
                warn!(error = %e, "Failed to clear credential");
            }
            (self.on_unauthorized)();
        } else {
            debug!(
                %method,
                path,
                status = response.status,
                body = %ApiError::truncate_body(&response.body),
                "API error response"
            );
        }

        Err(ApiError::from_status(
            response.status,
            &response.body,
            fallback,
            unauthorized,
        ))
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        require_auth: bool,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let text = self.send(method, path, body, require_auth, fallback).await?;
        serde_json::from_str(&text).map_err(|e| {
            warn!(path, error = %e, "Failed to parse response body");
            ApiError::InvalidResponse(format!("{} returned unexpected data: {}", path, e))
        })
    }

    fn encode<B: Serialize>(body: &B) -> Result<serde_json::Value, ApiError> {
        serde_json::to_value(body).map_err(|e| ApiError::Encode(e.to_string()))
    }

    /// Generic call for endpoints without a named operation.
    pub async fn call<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        require_auth: bool,
    ) -> Result<T, ApiError> {
        let body = body.map(Self::encode).transpose()?;
        self.request(method, path, body, require_auth, GENERIC_FAILURE).await
    }

    // ===== Auth =====

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = Self::encode(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;
        self.request(Method::POST, LOGIN_PATH, Some(body), false, "Login failed")
            .await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile, ApiError> {
        let body = Self::encode(request)?;
        self.request(Method::POST, REGISTER_PATH, Some(body), false, "Registration failed")
            .await
    }

    pub async fn me(&self) -> Result<UserProfile, ApiError> {
        self.request(Method::GET, ME_PATH, None, true, "Failed to get user info")
            .await
    }

    /// Tell the server the session is over. The response body is ignored.
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.send(Method::POST, LOGOUT_PATH, None, true, "Logout failed")
            .await
            .map(|_| ())
    }

    // ===== Holdings =====

    pub async fn list_user_stocks(&self) -> Result<Vec<UserStock>, ApiError> {
        self.request(Method::GET, USER_STOCKS_PATH, None, true, GENERIC_FAILURE)
            .await
    }

    pub async fn create_user_stock(
        &self,
        request: &CreateUserStockRequest,
    ) -> Result<UserStock, ApiError> {
        let body = Self::encode(request)?;
        self.request(Method::POST, USER_STOCKS_PATH, Some(body), true, GENERIC_FAILURE)
            .await
    }

    // ===== Service =====

    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.request(Method::GET, HEALTH_PATH, None, false, "Health check failed")
            .await
    }

    pub async fn usd_jpy_rate(&self) -> Result<ExchangeRate, ApiError> {
        self.request(Method::GET, USD_JPY_PATH, None, false, "Exchange rate unavailable")
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::auth::{Credential, MemoryTokenStore};
    use crate::navigation::Router;
    use crate::testing::{self, ScriptedTransport};

    fn client_with(
        transport: Arc<ScriptedTransport>,
        token: Option<&str>,
    ) -> (ApiClient, Arc<MemoryTokenStore>) {
        let tokens = Arc::new(match token {
            Some(t) => MemoryTokenStore::with_credential(Credential::new(t)),
            None => MemoryTokenStore::new(),
        });
        let client = ApiClient::with_transport("http://api.test/", transport, tokens.clone());
        (client, tokens)
    }

    #[tokio::test]
    async fn test_authenticated_call_attaches_bearer() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(200, serde_json::json!([]));
        let (client, _) = client_with(transport.clone(), Some("tok-1"));

        let stocks = client.list_user_stocks().await.unwrap();
        assert!(stocks.is_empty());

        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, Method::GET);
        assert_eq!(sent[0].url, "http://api.test/api/user-stocks/");
        assert_eq!(sent[0].bearer.as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn test_unauthenticated_call_never_sends_token() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(200, testing::login_response_json("tok-new", 1));
        let (client, _) = client_with(transport.clone(), Some("old-token"));

        let resp = client.login("a@b.com", "Secret123").await.unwrap();
        assert_eq!(resp.access_token, "tok-new");

        let sent = transport.requests();
        assert!(sent[0].bearer.is_none());
        assert_eq!(sent[0].url, "http://api.test/api/auth/login");
        let body = sent[0].body.as_ref().expect("login has a body");
        assert_eq!(body["email"], "a@b.com");
        assert_eq!(body["password"], "Secret123");
    }

    #[tokio::test]
    async fn test_missing_token_sends_no_header() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(401, serde_json::json!({"detail": "Not authenticated"}));
        let (client, _) = client_with(transport.clone(), None);

        let err = client.me().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(transport.requests()[0].bearer.is_none());
    }

    #[tokio::test]
    async fn test_401_on_authenticated_call_clears_token_and_redirects() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(401, serde_json::json!({"detail": "Token expired"}));
        let (client, tokens) = client_with(transport, Some("stale"));
        let router = Arc::new(Router::new(navigation::PORTFOLIO));
        let client = client.redirect_on_unauthorized(router.clone());

        let err = client.list_user_stocks().await.unwrap_err();

        assert_eq!(err, ApiError::Unauthorized("Token expired".to_string()));
        assert!(tokens.get().is_none());
        assert_eq!(router.current(), "/login");
        assert_eq!(router.hard_reloads(), 1);
    }

    #[tokio::test]
    async fn test_401_on_login_does_not_fire_hook() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(401, serde_json::json!({"detail": "invalid credentials"}));
        let (client, tokens) = client_with(transport, Some("keep-me"));
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let client = client.on_unauthorized(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let err = client.login("a@b.com", "x").await.unwrap_err();

        assert_eq!(err.to_string(), "invalid credentials");
        assert_eq!(err.status(), Some(401));
        assert!(!err.is_unauthorized());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(tokens.get(), Some(Credential::new("keep-me")));
    }

    #[tokio::test]
    async fn test_register_validation_error_is_flattened() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(
            422,
            serde_json::json!({"detail": [{"loc": ["body", "email"], "msg": "invalid"}]}),
        );
        let (client, _) = client_with(transport, None);

        let err = client
            .register(&RegisterRequest {
                username: "a".to_string(),
                email: "bad".to_string(),
                password: "Secret123".to_string(),
                full_name: "A".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "body.email: invalid");
    }

    #[tokio::test]
    async fn test_operation_fallback_messages() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(testing::response(500, "Internal Server Error"));
        transport.push(testing::response(503, ""));
        let (client, _) = client_with(transport, Some("t"));

        assert_eq!(client.me().await.unwrap_err().to_string(), "Failed to get user info");
        assert_eq!(
            client.list_user_stocks().await.unwrap_err().to_string(),
            "Request failed"
        );
    }

    #[tokio::test]
    async fn test_network_failure_surfaces_once() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_network_error("connection refused");
        let (client, tokens) = client_with(transport.clone(), Some("t"));

        let err = client.list_user_stocks().await.unwrap_err();

        assert!(matches!(err, ApiError::Network(_)));
        assert_eq!(transport.requests().len(), 1);
        assert!(tokens.get().is_some());
    }

    #[tokio::test]
    async fn test_create_user_stock_posts_body() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(
            201,
            serde_json::json!({
                "id": "s-1", "user_id": "1", "ticker_symbol": "7974",
                "quantity": 100, "acquisition_price": 6000.0
            }),
        );
        let (client, _) = client_with(transport.clone(), Some("t"));

        let created = client
            .create_user_stock(&CreateUserStockRequest {
                ticker_symbol: "7974".to_string(),
                quantity: 100,
                acquisition_price: 6000.0,
            })
            .await
            .unwrap();

        assert_eq!(created.ticker_symbol, "7974");
        let sent = transport.requests();
        assert_eq!(sent[0].method, Method::POST);
        assert_eq!(sent[0].body.as_ref().unwrap()["quantity"], 100);
    }

    #[tokio::test]
    async fn test_logout_ignores_body() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(testing::response(200, "not json at all"));
        let (client, _) = client_with(transport, Some("t"));

        client.logout().await.unwrap();
    }

    #[tokio::test]
    async fn test_unexpected_success_body_is_invalid_response() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(200, serde_json::json!({"unexpected": true}));
        let (client, _) = client_with(transport, Some("t"));

        let err = client.me().await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_call_with_auth_sends_body_and_bearer() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(201, testing::user_stock_json(7, "AAPL"));
        let (client, _) = client_with(transport.clone(), Some("tok"));
        let request = CreateUserStockRequest {
            ticker_symbol: "AAPL".to_string(),
            quantity: 2,
            acquisition_price: 180.0,
        };

        let stock: UserStock = client
            .call(Method::POST, USER_STOCKS_PATH, Some(&request), true)
            .await
            .unwrap();

        assert_eq!(stock.ticker_symbol, "AAPL");
        let sent = &transport.requests()[0];
        assert_eq!(sent.method, Method::POST);
        assert_eq!(sent.bearer.as_deref(), Some("tok"));
        let body = sent.body.as_ref().unwrap();
        assert_eq!(body["ticker_symbol"], "AAPL");
        assert_eq!(body["quantity"], 2);
    }

    #[tokio::test]
    async fn test_call_without_auth_omits_bearer() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(
            200,
            serde_json::json!({"status": "healthy", "service": "api", "timestamp": "2024-01-01T00:00:00"}),
        );
        let (client, _) = client_with(transport.clone(), Some("tok"));

        let health: HealthStatus = client
            .call::<_, ()>(Method::GET, HEALTH_PATH, None, false)
            .await
            .unwrap();

        assert!(health.is_healthy());
        let sent = &transport.requests()[0];
        assert!(sent.bearer.is_none());
        assert!(sent.body.is_none());
    }

    #[tokio::test]
    async fn test_call_401_with_auth_forces_reauth() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(testing::response(401, ""));
        let (client, tokens) = client_with(transport, Some("stale"));
        let router = Arc::new(Router::new(navigation::PORTFOLIO));
        let client = client.redirect_on_unauthorized(router.clone());

        let err = client
            .call::<UserProfile, ()>(Method::GET, ME_PATH, None, true)
            .await
            .unwrap_err();

        assert_eq!(err, ApiError::Unauthorized("Request failed".to_string()));
        assert!(tokens.get().is_none());
        assert_eq!(router.hard_reloads(), 1);
    }

    #[tokio::test]
    async fn test_call_401_without_auth_keeps_token() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(401, serde_json::json!({"detail": "invalid credentials"}));
        let (client, tokens) = client_with(transport, Some("kept"));
        let router = Arc::new(Router::new(navigation::LOGIN));
        let client = client.redirect_on_unauthorized(router.clone());
        let body = LoginRequest {
            email: "a@b.com".to_string(),
            password: "x".to_string(),
        };

        let err = client
            .call::<LoginResponse, _>(Method::POST, LOGIN_PATH, Some(&body), false)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ApiError::Api {
                status: 401,
                message: "invalid credentials".to_string()
            }
        );
        assert_eq!(tokens.get(), Some(Credential::new("kept")));
        assert_eq!(router.hard_reloads(), 0);
    }
}
