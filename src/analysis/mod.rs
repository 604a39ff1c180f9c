pub mod orchestrator;
pub mod scoring;
pub mod single_flight;

pub use orchestrator::Analyzer;
pub use scoring::{HealthScorer, ScoreInput, ScoreWeights};
pub use single_flight::InFlight;
