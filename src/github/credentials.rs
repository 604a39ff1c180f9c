use crate::cache::KeyValueStore;
use crate::error::Result;

/// Unprefixed key under which a user-supplied token is kept in the shared
/// medium.
pub const PERSISTED_TOKEN_KEY: &str = "github_token";

/// Picks the credential to send: explicit, then persisted, then configured.
/// `None` means unauthenticated requests.
pub fn resolve_token(
    explicit: Option<&str>,
    persisted: Option<&dyn KeyValueStore>,
    configured: Option<&str>,
) -> Option<String> {
    if let Some(token) = non_blank(explicit) {
        return Some(token.to_string());
    }

    if let Some(store) = persisted {
        match store.get(PERSISTED_TOKEN_KEY) {
            Ok(Some(token)) if !token.trim().is_empty() => return Some(token.trim().to_string()),
            Ok(_) => {}
            Err(e) => tracing::warn!("Could not read persisted token: {}", e),
        }
    }

    non_blank(configured).map(str::to_string)
}

fn non_blank(token: Option<&str>) -> Option<&str> {
    token.map(str::trim).filter(|t| !t.is_empty())
}

pub fn persist_token(store: &dyn KeyValueStore, token: &str) -> Result<()> {
    store.set(PERSISTED_TOKEN_KEY, token.trim())
}

pub fn forget_token(store: &dyn KeyValueStore) -> Result<()> {
    store.remove(PERSISTED_TOKEN_KEY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;

    #[test]
    fn test_precedence() {
        let store = MemoryStore::new();
        persist_token(&store, "persisted").unwrap();

        assert_eq!(
            resolve_token(Some("explicit"), Some(&store), Some("configured")).as_deref(),
            Some("explicit")
        );
        assert_eq!(
            resolve_token(None, Some(&store), Some("configured")).as_deref(),
            Some("persisted")
        );
        assert_eq!(
            resolve_token(Some("  "), None, Some("configured")).as_deref(),
            Some("configured")
        );
        assert_eq!(resolve_token(None, None, None), None);
    }

    #[test]
    fn test_forget_falls_back_to_configured() {
        let store = MemoryStore::new();
        persist_token(&store, "persisted").unwrap();
        forget_token(&store).unwrap();
        assert_eq!(
            resolve_token(None, Some(&store), Some("configured")).as_deref(),
            Some("configured")
        );
    }
}
