pub mod kv;
pub mod memory;
pub mod sqlite;
pub mod store;

pub use kv::KeyValueStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::{CacheEntry, CacheStore};

/// Resource-kind segment of analysis cache keys.
pub const REPO_ANALYSIS: &str = "repo_analysis";
/// Resource-kind segment of search cache keys.
pub const SEARCH_RESULTS: &str = "search_results";

pub fn analysis_key(owner: &str, repo: &str) -> String {
    format!("{}_{}_{}", REPO_ANALYSIS, owner, repo)
}

pub fn search_key(query: &str, per_page: u32) -> String {
    format!("{}_{}_{}", SEARCH_RESULTS, query, per_page)
}
