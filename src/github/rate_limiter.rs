use std::sync::Mutex;

use reqwest::header::HeaderMap;

use crate::models::RateLimitStatus;

/// Remembers the quota GitHub reported on the most recent response.
#[derive(Debug, Default)]
pub struct RateLimitTracker {
    state: Mutex<Option<RateLimitStatus>>,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_from_headers(&self, headers: &HeaderMap) {
        let Some(remaining) = header_value::<u32>(headers, "x-ratelimit-remaining") else {
            return;
        };

        let status = RateLimitStatus {
            limit: header_value(headers, "x-ratelimit-limit").unwrap_or(0),
            remaining,
            reset: header_value(headers, "x-ratelimit-reset").unwrap_or(0),
            used: header_value(headers, "x-ratelimit-used").unwrap_or(0),
        };

        if let Ok(mut state) = self.state.lock() {
            *state = Some(status);
        }
    }

    pub fn last_observed(&self) -> Option<RateLimitStatus> {
        self.state.lock().ok().and_then(|s| *s)
    }
}

fn header_value<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_records_quota_headers() {
        let tracker = RateLimitTracker::new();
        assert_eq!(tracker.last_observed(), None);

        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", HeaderValue::from_static("60"));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("7"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1714521600"));
        headers.insert("x-ratelimit-used", HeaderValue::from_static("53"));
        tracker.update_from_headers(&headers);

        assert_eq!(
            tracker.last_observed(),
            Some(RateLimitStatus {
                limit: 60,
                remaining: 7,
                reset: 1714521600,
                used: 53,
            })
        );
    }

    #[test]
    fn test_ignores_responses_without_quota() {
        let tracker = RateLimitTracker::new();
        tracker.update_from_headers(&HeaderMap::new());
        assert_eq!(tracker.last_observed(), None);
    }
}
