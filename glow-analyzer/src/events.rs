//! Workflow events broadcast to the presentation layer

use crate::error::AbortReason;
use crate::models::ReportSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type AnalyzerEventBus = glow_common::events::EventBus<AnalyzerEvent>;

/// Progress of one analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AnalyzerEvent {
    /// One-time capture tips shown to the user
    TipPresented { request_id: Uuid },

    /// Consent prompt opened; the request is suspended
    ConsentRequested { request_id: Uuid },

    /// All consent flags granted and persisted
    ConsentGranted { request_id: Uuid },

    /// Consent prompt declined; request discarded
    ConsentDeclined { request_id: Uuid },

    /// Sign-in requested from the session collaborator
    SignInRequested { request_id: Uuid },

    /// About to call an endpoint
    EndpointAttempt {
        request_id: Uuid,
        endpoint: String,
    },

    /// Endpoint failed; the next one will be tried
    EndpointFailed {
        request_id: Uuid,
        endpoint: String,
        reason: String,
    },

    /// A report is ready for rendering
    ReportReady {
        request_id: Uuid,
        source: ReportSource,
        timestamp: DateTime<Utc>,
    },

    /// Request stopped without a report
    Aborted {
        request_id: Uuid,
        reason: AbortReason,
    },
}
