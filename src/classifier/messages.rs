use serde::Serialize;

use super::taxonomy::ErrorKind;

/// What a presentation layer shows for a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ErrorMessage {
    pub title: &'static str,
    pub message: &'static str,
    pub action: &'static str,
}

pub const GENERIC_MESSAGE: ErrorMessage = ErrorMessage {
    title: "Operation failed",
    message: "An unknown error occurred. Please try again later; if the problem persists, contact support.",
    action: "Retry",
};

static MESSAGES: &[(ErrorKind, ErrorMessage)] = &[
    (
        ErrorKind::RateLimit,
        ErrorMessage {
            title: "API rate limit reached",
            message: "You have used up the GitHub API quota. Configure a GitHub token to raise the limit, or wait for the limit to reset.",
            action: "View configuration guide",
        },
    ),
    (
        ErrorKind::NotFound,
        ErrorMessage {
            title: "Repository not found",
            message: "The requested GitHub repository does not exist. Check the repository address.",
            action: "Re-enter",
        },
    ),
    (
        ErrorKind::Unauthorized,
        ErrorMessage {
            title: "Authentication failed",
            message: "The GitHub token is invalid or expired. Configure a valid token.",
            action: "Configure token",
        },
    ),
    (
        ErrorKind::Forbidden,
        ErrorMessage {
            title: "Access denied",
            message: "You do not have access to this repository; it may be private.",
            action: "Go back",
        },
    ),
    (
        ErrorKind::NetworkError,
        ErrorMessage {
            title: "Network connection failed",
            message: "Could not reach the GitHub servers. Check your network connection.",
            action: "Retry",
        },
    ),
    (
        ErrorKind::Timeout,
        ErrorMessage {
            title: "Request timed out",
            message: "The request took too long to complete. Please try again shortly.",
            action: "Retry",
        },
    ),
    (
        ErrorKind::InvalidInput,
        ErrorMessage {
            title: "Invalid input format",
            message: "Enter a GitHub repository in the form owner/repo.",
            action: "Fix input",
        },
    ),
    (
        ErrorKind::EmptyInput,
        ErrorMessage {
            title: "Enter a repository",
            message: "The repository address cannot be empty. Enter the GitHub repository to analyze.",
            action: "Enter repository",
        },
    ),
];

/// Never fails: kinds without a dedicated entry get the generic one.
pub fn message_for(kind: ErrorKind) -> &'static ErrorMessage {
    MESSAGES
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, m)| m)
        .unwrap_or(&GENERIC_MESSAGE)
}
