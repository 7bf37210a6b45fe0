//! Error types for glow-analyzer
//!
//! Capture and consent errors reach the caller. Endpoint errors stay inside
//! the orchestrator: they only decide whether the next endpoint is tried.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Media acquisition errors
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No stream support, no device, or permission denied
    #[error("No camera available: {0}")]
    NoCameraAvailable(String),

    /// File is not one of the accepted raster formats
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Bytes claimed a supported format but did not decode
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Snapshot could not be encoded for transmission
    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// The stream was already released
    #[error("Camera session already closed")]
    SessionClosed,
}

/// Consent gate errors
#[derive(Debug, Error)]
pub enum ConsentError {
    /// accept/decline called while no prompt is open
    #[error("Consent prompt is not open")]
    NotConsenting,

    /// accept called without the acknowledgment control checked
    #[error("Consent requires explicit acknowledgment")]
    NotAcknowledged,

    /// Flags could not be written to the settings store
    #[error("Failed to persist consent: {0}")]
    Persistence(#[from] glow_common::Error),
}

/// Session collaborator errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No user is signed in")]
    NotSignedIn,

    #[error("Bearer token unavailable: {0}")]
    TokenUnavailable(String),
}

/// Single remote endpoint failure
///
/// Never surfaced to the user; the orchestrator logs it and moves on.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// Transport-level failure (connect, TLS, reset)
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded the configured per-attempt timeout
    #[error("Request timed out")]
    Timeout,

    /// Non-success HTTP status
    #[error("API error {0}: {1}")]
    Status(u16, String),

    /// Body was not valid JSON
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// JSON parsed but did not match the report schema
    #[error("Response failed validation: {0}")]
    Schema(String),

    /// Credential required but not obtainable
    #[error("Credential unavailable: {0}")]
    Credential(#[from] SessionError),
}

impl EndpointError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            EndpointError::Timeout
        } else if err.is_decode() {
            EndpointError::Malformed(err.to_string())
        } else {
            EndpointError::Network(err.to_string())
        }
    }
}

/// Why an analysis stopped without producing a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// User declined the consent prompt
    DeclinedConsent,
    /// User accepted but the consent flags could not be stored
    ConsentNotSaved,
    /// User cancelled the sign-in request
    CancelledLogin,
    /// User dismissed the one-time capture tips
    DismissedTip,
    /// Another analysis is still running on this workflow instance
    AlreadyInFlight,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            AbortReason::DeclinedConsent => "declined-consent",
            AbortReason::ConsentNotSaved => "consent-not-saved",
            AbortReason::CancelledLogin => "cancelled-login",
            AbortReason::DismissedTip => "dismissed-tip",
            AbortReason::AlreadyInFlight => "already-in-flight",
        };
        f.write_str(text)
    }
}

/// The only error `analyze` can return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Analysis aborted: {0}")]
pub struct Aborted(pub AbortReason);

impl Aborted {
    pub fn reason(&self) -> AbortReason {
        self.0
    }
}

/// History and admin client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}
