pub mod repository;
pub mod commit;
pub mod analysis;
pub mod rate_limit;

pub use repository::*;
pub use commit::*;
pub use analysis::*;
pub use rate_limit::RateLimitStatus;
