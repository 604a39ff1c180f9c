//! Normalizes heterogeneous upstream failures into a closed set of kinds with
//! stable, user-facing wording.

pub mod taxonomy;
pub mod messages;
pub mod handler;

pub use taxonomy::{ClassifiedError, ErrorKind, RawFailure};
pub use messages::{message_for, ErrorMessage};
pub use handler::{
    classify, error_info, is_not_found, is_rate_limit, should_retry, validate_repo_input,
    ErrorInfo,
};
