//! Analysis workflow: gates, endpoint fallback, and the per-screen instance

pub mod instance;
pub mod orchestrator;

pub use instance::AnalyzerWorkflow;
pub use orchestrator::{Prompts, SubmissionOrchestrator, Trigger};
