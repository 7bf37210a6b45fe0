//! glow-analyzer - skin analysis client core
//!
//! Capture-Analyze-Render workflow: acquire a face image from the camera or a
//! file, pass the consent and sign-in gates, submit to a ranked list of
//! analysis endpoints, and always come back with a report (live or the fixed
//! fallback) unless the user stops the flow.

pub mod capture;
pub mod config;
pub mod consent;
pub mod console;
pub mod error;
pub mod events;
pub mod models;
pub mod preferences;
pub mod services;
pub mod session;
pub mod workflow;

pub use config::{AnalyzerConfig, EndpointDescriptor};
pub use error::{AbortReason, Aborted};
pub use events::{AnalyzerEvent, AnalyzerEventBus};
pub use models::{AnalysisReport, ReportSource, ScoreBand};
pub use preferences::PreferenceStore;
pub use workflow::{AnalyzerWorkflow, Prompts, SubmissionOrchestrator, Trigger};
