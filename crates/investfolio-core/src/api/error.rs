use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Failure of a single API call.
///
/// The `Display` text of every variant is the message shown to the user,
/// so server-provided details are rendered verbatim.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Unable to reach the server: {0}")]
    Network(String),

    /// 401 on a call that required a credential.
    #[error("{0}")]
    Unauthorized(String),

    /// 422 with field-level detail, flattened to one line.
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Failed to encode request: {0}")]
    Encode(String),

    /// The server accepted the login but the credential could not be kept.
    #[error("Could not save your session: {0}")]
    CredentialStorage(String),
}

/// Maximum length for error response bodies in log output
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Shape of an error body. Anything else falls back to the operation's
/// generic message.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<Value>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let cut = (0..=MAX_ERROR_BODY_LENGTH)
                .rev()
                .find(|i| body.is_char_boundary(*i))
                .unwrap_or(0);
            format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
        }
    }

    /// Build the typed failure for a non-2xx response.
    ///
    /// `unauthorized` is set by the caller when the request carried a
    /// credential and the server answered 401.
    pub fn from_status(status: u16, body: &str, fallback: &str, unauthorized: bool) -> Self {
        let message = Self::detail_message(body).unwrap_or_else(|| fallback.to_string());
        match status {
            401 if unauthorized => ApiError::Unauthorized(message),
            422 => ApiError::Validation(message),
            _ => ApiError::Api { status, message },
        }
    }

    /// Extract the user-facing message from a `{"detail": ...}` body.
    fn detail_message(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        match parsed.detail? {
            Value::String(s) if !s.is_empty() => Some(s),
            Value::Array(items) if !items.is_empty() => Some(flatten_validation(&items)),
            _ => None,
        }
    }

    /// HTTP status when the server answered, `None` for transport failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Validation(_) => Some(422),
            ApiError::Api { status, .. } => Some(*status),
            ApiError::Network(_)
            | ApiError::InvalidResponse(_)
            | ApiError::Encode(_)
            | ApiError::CredentialStorage(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}

/// Join `[{loc, msg}, ...]` into `loc.path: msg, loc.path: msg`.
fn flatten_validation(items: &[Value]) -> String {
    items
        .iter()
        .map(|item| {
            let field = item
                .get("loc")
                .and_then(Value::as_array)
                .map(|loc| {
                    loc.iter()
                        .map(|part| match part {
                            Value::String(s) => s.clone(),
                            Value::Null => String::new(),
                            other => other.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(".")
                })
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| "field".to_string());
            let msg = item.get("msg").and_then(Value::as_str).unwrap_or_default();
            format!("{}: {}", field, msg)
        })
        .collect::<Vec<_>>()
        .join(", ")
}
