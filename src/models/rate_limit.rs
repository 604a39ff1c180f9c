use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    /// Epoch seconds at which the window resets.
    pub reset: u64,
    pub used: u32,
}

impl RateLimitStatus {
    /// A zero limit never comes from a healthy upstream response.
    pub fn is_anomalous(&self) -> bool {
        self.limit == 0
    }

    pub fn is_exhausted(&self) -> bool {
        !self.is_anomalous() && self.remaining == 0
    }
}

/// Envelope of `GET /rate_limit`. Newer responses carry `resources.core`,
/// older ones only the top-level `rate`.
#[derive(Debug, Deserialize)]
pub(crate) struct RateLimitResponse {
    #[serde(default)]
    pub resources: Option<RateLimitResources>,
    #[serde(default)]
    pub rate: Option<RateLimitStatus>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RateLimitResources {
    pub core: Option<RateLimitStatus>,
}

impl RateLimitResponse {
    pub fn core(self) -> Option<RateLimitStatus> {
        self.resources.and_then(|r| r.core).or(self.rate)
    }
}
