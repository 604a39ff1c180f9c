pub mod api;
pub mod client;
pub mod credentials;
pub mod rate_limiter;

pub use api::{FetchResult, HostingApi, ReadmeProbe};
pub use client::GitHubClient;
pub use credentials::{forget_token, persist_token, resolve_token, PERSISTED_TOKEN_KEY};
pub use rate_limiter::RateLimitTracker;
