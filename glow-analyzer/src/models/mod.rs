//! Data models for glow-analyzer

pub mod dashboard;
pub mod report;

pub use dashboard::{
    DashboardSnapshot, RegistrationRange, RegistrationSeries, UserRow, UserSummary,
};
pub use report::{
    parse_analysis_body, AnalysisReport, ParseFailure, Product, ReportSource, ScoreBand,
    StoredAnalysis,
};
