//! # Error Taxonomy
//!
//! Typed errors for every way a client operation can fail, plus the mapping
//! from HTTP outcomes to those errors and to the messages shown to the user.
//!
//! The 401 policy (session reset + sign-in-required) is applied globally by
//! the dispatch path in [`super::ApiClient`]; everything else surfaces to
//! the initiating view, which decides whether the user retries. Nothing here
//! is fatal to the process.

use reqwest::StatusCode;
use thiserror::Error;

/// Maximum characters of a response body echoed into an error message.
const BODY_PREVIEW_CHAR_LIMIT: usize = 160;

/// Failure modes of a client operation.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 401: the session has been reset; the user must sign in again
    #[error("unauthorized")]
    Unauthorized,

    /// 403
    #[error("forbidden: {message}")]
    Forbidden { message: String },

    /// 404
    #[error("not found: {message}")]
    NotFound { message: String },

    /// 5xx
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Any other non-success status
    #[error("request failed ({status}): {message}")]
    Request { status: u16, message: String },

    /// No response at all: connect failure, or the flat per-request timeout
    #[error("network error: {message}")]
    Network { message: String },

    /// The response body did not match the typed contract
    #[error("decode error: {message}")]
    Decode { message: String },

    /// The operation requires a stored token and none is present
    #[error("no active session")]
    NoSession,

    /// Local session state could not be persisted
    #[error("storage error: {message}")]
    Storage { message: String },

    /// Form-level input rejected by the view before submission
    #[error("validation error: {0}")]
    Validation(String),

    /// A newer fetch of the same list was started; this response is discarded
    #[error("request superseded by a newer one")]
    Superseded,
}

impl ApiError {
    /// The message shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized => {
                "Your session has expired. Please log in again.".to_string()
            }
            ApiError::Forbidden { .. } => {
                "You do not have permission to access this resource.".to_string()
            }
            ApiError::NotFound { .. } => "The requested resource does not exist.".to_string(),
            ApiError::Server { .. } => "Server error, please try again later.".to_string(),
            ApiError::Request { message, .. } if !message.is_empty() => message.clone(),
            ApiError::Request { .. } => "Request failed.".to_string(),
            ApiError::Network { .. } => {
                "Network error, please check your connection.".to_string()
            }
            ApiError::Decode { .. } => {
                "The server returned an unexpected response.".to_string()
            }
            ApiError::NoSession => "You are not logged in.".to_string(),
            ApiError::Storage { .. } => "Failed to save session state.".to_string(),
            ApiError::Validation(message) => message.clone(),
            ApiError::Superseded => "Request superseded by a newer one.".to_string(),
        }
    }

    /// Whether this failure means the user has no usable session.
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::Unauthorized | ApiError::NoSession)
    }
}

/// Map a non-success HTTP status and its body to the error taxonomy.
///
/// 401 is intentionally absent: the dispatch path handles it before this
/// mapping runs, because it mutates session state.
pub(crate) fn map_status_error(status: StatusCode, body: &[u8]) -> ApiError {
    let message = extract_error_message(body);
    match status {
        StatusCode::FORBIDDEN => ApiError::Forbidden { message },
        StatusCode::NOT_FOUND => ApiError::NotFound { message },
        s if s.is_server_error() => ApiError::Server {
            status: s.as_u16(),
            message,
        },
        s => ApiError::Request {
            status: s.as_u16(),
            message,
        },
    }
}

/// Map a reqwest transport failure (connect error, timeout, body read
/// failure) to the taxonomy.
pub(crate) fn map_transport_error(error: reqwest::Error) -> ApiError {
    let message = if error.is_timeout() {
        format!("request timed out: {error}")
    } else {
        error.to_string()
    };
    ApiError::Network { message }
}

/// Pull the human-readable message out of an error body.
///
/// The backend answers errors as `{"error": "..."}` and occasionally
/// `{"message": "..."}`; anything else falls back to a trimmed preview of
/// the raw body.
fn extract_error_message(body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        for key in ["error", "message"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                if !text.is_empty() {
                    return text.to_string();
                }
            }
        }
    }
    body_preview(body)
}

fn body_preview(body: &[u8]) -> String {
    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact
        .chars()
        .take(BODY_PREVIEW_CHAR_LIMIT)
        .collect::<String>();
    if compact.chars().count() > BODY_PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
