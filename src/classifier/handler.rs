use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::taxonomy::{ClassifiedError, ErrorKind, RawFailure};

const DEFAULT_HTTP_MESSAGE: &str = "GitHub API request failed";
const RATE_LIMIT_PHRASES: &[&str] = &["rate limit", "api rate"];
const NETWORK_PHRASES: &[&str] = &["network", "fetch", "connection"];

static REPO_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+$").expect("repository pattern is valid")
});

/// Maps any upstream failure onto exactly one [`ClassifiedError`].
pub fn classify(raw: impl Into<RawFailure>) -> ClassifiedError {
    match raw.into() {
        RawFailure::Classified(err) => err,
        RawFailure::Http {
            status,
            message,
            rate_limit_remaining,
        } => classify_http(status, message, rate_limit_remaining.as_deref()),
        RawFailure::Network { message, .. } => ClassifiedError::new(ErrorKind::NetworkError, message),
        RawFailure::Timeout { message } => ClassifiedError::new(ErrorKind::Timeout, message),
        RawFailure::Generic { message } => {
            if has_network_signature(&message) {
                ClassifiedError::new(ErrorKind::NetworkError, message)
            } else {
                ClassifiedError::new(ErrorKind::Unknown, message)
            }
        }
        RawFailure::Opaque(value) => ClassifiedError::new(ErrorKind::Unknown, value),
    }
}

fn classify_http(status: u16, message: String, remaining: Option<&str>) -> ClassifiedError {
    let message = if message.trim().is_empty() {
        DEFAULT_HTTP_MESSAGE.to_string()
    } else {
        message
    };

    let kind = match status {
        401 => ErrorKind::Unauthorized,
        403 if signals_rate_limit(&message, remaining) => ErrorKind::RateLimit,
        403 => ErrorKind::Forbidden,
        404 => ErrorKind::NotFound,
        408 | 504 => ErrorKind::Timeout,
        _ => ErrorKind::Unknown,
    };

    ClassifiedError::new(kind, message).with_status(status)
}

/// A 403 is a rate limit when the quota header reads zero or the message
/// says so.
pub fn signals_rate_limit(message: &str, remaining: Option<&str>) -> bool {
    let exhausted = remaining
        .and_then(|r| r.trim().parse::<u64>().ok())
        .map(|r| r == 0)
        .unwrap_or(false);
    if exhausted {
        return true;
    }

    let message = message.to_lowercase();
    RATE_LIMIT_PHRASES.iter().any(|p| message.contains(p))
}

fn has_network_signature(message: &str) -> bool {
    let lowered = message.to_lowercase();
    NETWORK_PHRASES.iter().any(|p| lowered.contains(p))
}

pub fn is_rate_limit(raw: &RawFailure) -> bool {
    classify(raw.clone()).is_rate_limit()
}

pub fn is_not_found(raw: &RawFailure) -> bool {
    classify(raw.clone()).is_not_found()
}

pub fn should_retry(raw: &RawFailure) -> bool {
    classify(raw.clone()).should_retry()
}

/// Checks a combined `owner/repo` string before any request is made.
pub fn validate_repo_input(input: &str) -> Result<(), ClassifiedError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ClassifiedError::new(
            ErrorKind::EmptyInput,
            "Repository input is empty",
        ));
    }

    if !REPO_PATTERN.is_match(trimmed) {
        return Err(ClassifiedError::new(
            ErrorKind::InvalidInput,
            format!("Invalid repository format: {:?}", trimmed),
        ));
    }

    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub title: &'static str,
    pub message: &'static str,
    pub action: &'static str,
}

pub fn error_info(err: &ClassifiedError) -> ErrorInfo {
    let entry = err.user_message();
    ErrorInfo {
        kind: err.kind,
        title: entry.title,
        message: entry.message,
        action: entry.action,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http_with_remaining(status: u16, remaining: &str) -> RawFailure {
        RawFailure::Http {
            status,
            message: "Forbidden".to_string(),
            rate_limit_remaining: Some(remaining.to_string()),
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(classify(RawFailure::http(401, "Bad credentials")).kind, ErrorKind::Unauthorized);
        assert_eq!(classify(RawFailure::http(404, "Not Found")).kind, ErrorKind::NotFound);
        assert_eq!(classify(RawFailure::http(408, "")).kind, ErrorKind::Timeout);
        assert_eq!(classify(RawFailure::http(504, "Gateway Timeout")).kind, ErrorKind::Timeout);
        assert_eq!(classify(RawFailure::http(403, "Forbidden")).kind, ErrorKind::Forbidden);

        let other = classify(RawFailure::http(500, "Server Error"));
        assert_eq!(other.kind, ErrorKind::Unknown);
        assert_eq!(other.status, Some(500));
    }

    #[test]
    fn test_forbidden_with_zero_remaining_is_rate_limit() {
        let err = classify(http_with_remaining(403, "0"));
        assert_eq!(err.kind, ErrorKind::RateLimit);
        assert_eq!(err.status, Some(403));

        assert_eq!(classify(http_with_remaining(403, "12")).kind, ErrorKind::Forbidden);
    }

    #[test]
    fn test_forbidden_with_rate_limit_message() {
        let err = classify(RawFailure::http(403, "API rate limit exceeded for 1.2.3.4"));
        assert_eq!(err.kind, ErrorKind::RateLimit);
    }

    #[test]
    fn test_empty_http_message_gets_default() {
        let err = classify(RawFailure::http(404, "  "));
        assert_eq!(err.message, DEFAULT_HTTP_MESSAGE);
    }

    #[test]
    fn test_network_signatures() {
        assert_eq!(classify(RawFailure::generic("fetch failed")).kind, ErrorKind::NetworkError);
        assert_eq!(
            classify(RawFailure::generic("Connection reset by peer")).kind,
            ErrorKind::NetworkError
        );
        let refused = RawFailure::Network {
            message: "connect error".to_string(),
            code: Some("ECONNREFUSED".to_string()),
        };
        assert_eq!(classify(refused).kind, ErrorKind::NetworkError);
    }

    #[test]
    fn test_unknown_fallbacks() {
        let generic = classify(RawFailure::generic("something odd"));
        assert_eq!(generic.kind, ErrorKind::Unknown);
        assert_eq!(generic.message, "something odd");

        let opaque = classify(RawFailure::Opaque("42".to_string()));
        assert_eq!(opaque.kind, ErrorKind::Unknown);
        assert_eq!(opaque.message, "42");
    }

    #[test]
    fn test_classify_is_idempotent() {
        let first = classify(RawFailure::http(404, "Not Found"));
        let second = classify(first.clone());
        assert_eq!(first, second);
    }

    #[test]
    fn test_predicates() {
        assert!(is_rate_limit(&http_with_remaining(403, "0")));
        assert!(is_not_found(&RawFailure::http(404, "Not Found")));
        assert!(should_retry(&RawFailure::Timeout {
            message: "deadline".to_string()
        }));
        assert!(should_retry(&RawFailure::generic("network down")));
        assert!(!should_retry(&RawFailure::http(404, "Not Found")));
        assert!(!should_retry(&RawFailure::http(500, "boom")));

        let retryable: Vec<_> = ErrorKind::ALL.into_iter().filter(|k| k.is_transient()).collect();
        assert_eq!(retryable, vec![ErrorKind::NetworkError, ErrorKind::Timeout]);
    }

    #[test]
    fn test_validate_repo_input() {
        assert_eq!(validate_repo_input("").unwrap_err().kind, ErrorKind::EmptyInput);
        assert_eq!(validate_repo_input("   ").unwrap_err().kind, ErrorKind::EmptyInput);
        assert_eq!(validate_repo_input("bad input").unwrap_err().kind, ErrorKind::InvalidInput);
        assert_eq!(validate_repo_input("a/b/c").unwrap_err().kind, ErrorKind::InvalidInput);
        assert_eq!(validate_repo_input("/react").unwrap_err().kind, ErrorKind::InvalidInput);
        assert!(validate_repo_input("facebook/react").is_ok());
        assert!(validate_repo_input("rust-lang/rust.vim").is_ok());
    }

    #[test]
    fn test_error_info_never_fails() {
        for kind in ErrorKind::ALL {
            let info = error_info(&ClassifiedError::new(kind, "x"));
            assert_eq!(info.kind, kind);
            assert!(!info.title.is_empty());
        }
    }
}
