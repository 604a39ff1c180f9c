use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-key async locks so that at most one fetch per cache key runs at a
/// time. Later callers wait for the first and then read its cache entry.
#[derive(Debug, Default)]
pub struct InFlight {
    slots: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of one fetch.
pub struct FlightGuard {
    _guard: OwnedMutexGuard<()>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: &str) -> FlightGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            // only the map itself still references an idle slot
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots.entry(key.to_string()).or_default().clone()
        };

        FlightGuard {
            _guard: slot.lock_owned().await,
        }
    }

    pub fn active_keys(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.values().filter(|slot| Arc::strong_count(slot) > 1).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let flights = InFlight::new();
        let first = flights.acquire("k").await;
        assert_eq!(flights.active_keys(), 1);

        let waiting = tokio::time::timeout(Duration::from_millis(20), flights.acquire("k")).await;
        assert!(waiting.is_err());

        drop(first);
        let again = tokio::time::timeout(Duration::from_millis(20), flights.acquire("k")).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let flights = InFlight::new();
        let _a = flights.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_millis(20), flights.acquire("b")).await;
        assert!(b.is_ok());
    }
}
