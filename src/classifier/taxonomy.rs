use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::messages::{message_for, ErrorMessage};

/// Closed set of failure kinds a caller can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    RateLimit,
    NotFound,
    Unauthorized,
    Forbidden,
    NetworkError,
    Timeout,
    InvalidInput,
    EmptyInput,
    Unknown,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 9] = [
        ErrorKind::RateLimit,
        ErrorKind::NotFound,
        ErrorKind::Unauthorized,
        ErrorKind::Forbidden,
        ErrorKind::NetworkError,
        ErrorKind::Timeout,
        ErrorKind::InvalidInput,
        ErrorKind::EmptyInput,
        ErrorKind::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RateLimit => "RATE_LIMIT",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::EmptyInput => "EMPTY_INPUT",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }

    /// Only transport hiccups are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorKind::NetworkError | ErrorKind::Timeout)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The only error shape that leaves the analyzer.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Description of the underlying cause, not meant for end users.
    pub message: String,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn user_message(&self) -> &'static ErrorMessage {
        message_for(self.kind)
    }

    pub fn is_rate_limit(&self) -> bool {
        self.kind == ErrorKind::RateLimit
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    pub fn should_retry(&self) -> bool {
        self.kind.is_transient()
    }
}

/// An upstream failure as observed at the transport boundary, before
/// classification.
#[derive(Debug, Clone, PartialEq)]
pub enum RawFailure {
    /// Already classified; passes through untouched.
    Classified(ClassifiedError),
    /// The server answered with a non-success status.
    Http {
        status: u16,
        message: String,
        /// Raw `x-ratelimit-remaining` header value, if the response had one.
        rate_limit_remaining: Option<String>,
    },
    /// The request never got a response.
    Network {
        message: String,
        code: Option<String>,
    },
    /// The per-request deadline elapsed.
    Timeout { message: String },
    /// Anything else with a message: decode failures, local errors.
    Generic { message: String },
    /// A value with no structure at all.
    Opaque(String),
}

impl RawFailure {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        RawFailure::Http {
            status,
            message: message.into(),
            rate_limit_remaining: None,
        }
    }

    pub fn generic(message: impl Into<String>) -> Self {
        RawFailure::Generic {
            message: message.into(),
        }
    }
}

impl fmt::Display for RawFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawFailure::Classified(e) => write!(f, "{}", e),
            RawFailure::Http {
                status, message, ..
            } => write!(f, "HTTP {}: {}", status, message),
            RawFailure::Network { message, code } => match code {
                Some(code) => write!(f, "network failure ({}): {}", code, message),
                None => write!(f, "network failure: {}", message),
            },
            RawFailure::Timeout { message } => write!(f, "timed out: {}", message),
            RawFailure::Generic { message } => f.write_str(message),
            RawFailure::Opaque(value) => f.write_str(value),
        }
    }
}

impl From<ClassifiedError> for RawFailure {
    fn from(err: ClassifiedError) -> Self {
        RawFailure::Classified(err)
    }
}

impl From<reqwest::Error> for RawFailure {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            RawFailure::Timeout { message }
        } else if let Some(status) = err.status() {
            RawFailure::http(status.as_u16(), message)
        } else if err.is_connect() || err.is_request() {
            RawFailure::Network {
                message,
                code: io_error_code(&err),
            }
        } else {
            RawFailure::Generic { message }
        }
    }
}

fn io_error_code(err: &(dyn std::error::Error + 'static)) -> Option<String> {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            let code = match io.kind() {
                std::io::ErrorKind::ConnectionRefused => "ECONNREFUSED",
                std::io::ErrorKind::ConnectionReset => "ECONNRESET",
                std::io::ErrorKind::TimedOut => "ETIMEDOUT",
                _ => return None,
            };
            return Some(code.to_string());
        }
        source = cause.source();
    }
    None
}

impl From<serde_json::Error> for RawFailure {
    fn from(err: serde_json::Error) -> Self {
        RawFailure::generic(format!("Failed to parse response: {}", err))
    }
}

impl From<crate::error::Error> for RawFailure {
    fn from(err: crate::error::Error) -> Self {
        match err {
            crate::error::Error::HttpClient(e) => e.into(),
            other => RawFailure::generic(other.to_string()),
        }
    }
}
