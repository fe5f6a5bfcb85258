pub mod anchors;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fsio;
pub mod judge;
pub mod model;
pub mod providers;
pub mod report;
pub mod scoring;

pub use config::PipelineConfig;
pub use errors::{JudgeError, PipelineError, PipelineResult, ScoringError};
