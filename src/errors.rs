//! Typed error hierarchy for the smartfarm client.
//!
//! One enum per layer:
//! - `ValidationError`: client-side checks that block a network call
//! - `GatewayError`: outbound HTTP failures
//! - `SessionError`: durable session store failures
//! - `AuthError`: login and signup flows
//! - `DraftError`: transitions of a single device row
//! - `FormError`: form controller failures (validation, transitions, gateway)

use thiserror::Error;

/// Shown when a request got no response at all.
pub const MSG_SERVER_UNREACHABLE: &str = "서버와 통신 중 오류가 발생했습니다.";

/// Client-side validation failures. The `Display` text is the message shown
/// to the user, so it is kept in the product's language.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("디바이스 시리얼을 입력해주세요.")]
    EmptySerial,

    #[error("모든 디바이스를 조회하고 등록해주세요.")]
    UnverifiedDevices,

    #[error("{field}을(를) 입력해주세요.")]
    MissingField { field: &'static str },

    #[error("이름은 2자 이상 입력해주세요.")]
    NameTooShort,

    #[error("올바른 이메일 형식이 아닙니다.")]
    MalformedEmail,

    #[error("비밀번호는 8자 이상 입력해주세요.")]
    PasswordTooShort,

    #[error("비밀번호가 일치하지 않습니다.")]
    PasswordMismatch,
}

/// Failures surfaced by the API gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No response reached the client.
    #[error("Request to {path} failed: {source}")]
    Network {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status.
    #[error("Server returned {status} for {path}")]
    Http {
        path: String,
        status: u16,
        body: Option<String>,
    },

    /// A 2xx body could not be decoded.
    #[error("Invalid response from {path}: {message}")]
    InvalidResponse { path: String, message: String },

    #[error("Invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl GatewayError {
    /// True when no response reached the client.
    pub fn is_network(&self) -> bool {
        matches!(self, GatewayError::Network { .. })
    }

    /// HTTP status, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Text the server sent that should be shown to the user verbatim.
    ///
    /// Plain-text bodies are returned as-is. JSON bodies only count when they
    /// are an object with a non-empty `message` string; framework error
    /// envelopes without one yield `None`.
    pub fn server_message(&self) -> Option<String> {
        let GatewayError::Http {
            body: Some(body), ..
        } = self
        else {
            return None;
        };
        extract_server_message(body)
    }

    /// Server text if present, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message().unwrap_or_else(|| fallback.to_string())
    }
}

pub(crate) fn extract_server_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Object(map)) => map
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string),
        // A bare JSON string is still text meant for a person.
        Ok(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        Ok(_) => None,
        Err(_) => Some(trimmed.to_string()),
    }
}

/// Failures of the login and signup flows. `Display` is user-facing.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("이메일 또는 비밀번호가 일치하지 않습니다.")]
    InvalidCredentials,

    /// The server refused the request; carries its text or a fallback.
    #[error("{0}")]
    Rejected(String),

    #[error("서버와 통신 중 오류가 발생했습니다.")]
    Unreachable,

    #[error("Failed to save session: {0}")]
    Session(#[from] SessionError),
}

/// Errors from the durable session store.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to read session store at {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write session store at {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Session store at {path} is corrupt: {source}")]
    Corrupt {
        path: std::path::PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Rejected operations on a single device row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Cannot {action} a device that is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("Verified devices can no longer be edited")]
    Locked,
}

/// Errors from the farm creation form controller.
#[derive(Debug, Error)]
pub enum FormError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Device row {index} does not exist")]
    RowOutOfRange { index: usize },

    #[error("Device row {index} is verified and can no longer be edited")]
    RowLocked { index: usize },

    #[error("Cannot {action} device row {index} while it is {state}")]
    InvalidTransition {
        index: usize,
        action: &'static str,
        state: &'static str,
    },

    #[error("Address lookup failed: {0}")]
    AddressLookup(#[source] anyhow::Error),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl FormError {
    /// Attach the row index to a row-level failure.
    pub fn for_row(index: usize, err: DraftError) -> Self {
        match err {
            DraftError::Validation(v) => FormError::Validation(v),
            DraftError::InvalidTransition { action, state } => FormError::InvalidTransition {
                index,
                action,
                state,
            },
            DraftError::Locked => FormError::RowLocked { index },
        }
    }

    /// Message suitable for an error notice.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            FormError::Validation(v) => v.to_string(),
            FormError::Gateway(g) => g.user_message(fallback),
            other => other.to_string(),
        }
    }
}
