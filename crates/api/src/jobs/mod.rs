//! Job pipeline: turning one request into one worker run and delivering its
//! result.

pub mod orchestrator;
pub mod sink;

pub use orchestrator::JobOrchestrator;
