//! HTTP clients for the remote backend

pub mod admin_client;
pub mod analysis_client;
pub mod history_client;

pub use admin_client::{AdminClient, DashboardPoller};
pub use analysis_client::AnalysisClient;
pub use history_client::HistoryClient;
