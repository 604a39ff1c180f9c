use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::cache::kv::KeyValueStore;
use crate::error::{Error, Result};

/// In-process medium, optionally capped at a byte quota (keys plus values).
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            quota: Some(bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn used_bytes(entries: &BTreeMap<String, String>) -> usize {
        entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|_| Error::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| Error::Poisoned)?;

        if let Some(quota) = self.quota {
            let replaced = entries.get(key).map(|old| key.len() + old.len()).unwrap_or(0);
            let used = Self::used_bytes(&entries) - replaced;
            let needed = key.len() + value.len();
            if used + needed > quota {
                return Err(Error::QuotaExceeded {
                    needed,
                    available: quota.saturating_sub(used),
                });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| Error::Poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.entries.lock().map_err(|_| Error::Poisoned)?;
        Ok(entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_rejects_oversized_write() {
        let store = MemoryStore::with_quota(10);
        store.set("ab", "cdef").unwrap();
        let err = store.set("gh", "ijklmn").unwrap_err();
        assert!(err.is_quota());
        assert_eq!(store.get("gh").unwrap(), None);
    }

    #[test]
    fn test_overwrite_counts_only_new_value() {
        let store = MemoryStore::with_quota(10);
        store.set("k", "123456789").unwrap();
        store.set("k", "987654321").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("987654321"));
    }

    #[test]
    fn test_keys_with_prefix() {
        let store = MemoryStore::new();
        store.set("a_1", "x").unwrap();
        store.set("a_2", "y").unwrap();
        store.set("b_1", "z").unwrap();
        assert_eq!(store.keys_with_prefix("a_").unwrap(), vec!["a_1", "a_2"]);
    }
}
