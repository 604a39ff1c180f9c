pub mod config;
pub mod error;
pub mod clock;
pub mod models;
pub mod github;
pub mod classifier;
pub mod cache;
pub mod analysis;

pub use config::{AnalyzerConfig, ClientConfig, Config};
pub use error::{Error, Result};
pub use clock::{Clock, ManualClock, SystemClock};
pub use github::{GitHubClient, HostingApi};
pub use classifier::{classify, error_info, validate_repo_input, ClassifiedError, ErrorKind};
pub use cache::{CacheStore, KeyValueStore, MemoryStore, SqliteStore};
pub use analysis::Analyzer;
