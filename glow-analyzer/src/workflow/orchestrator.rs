//! Submission orchestrator
//!
//! # Steps
//! 1. Manual submissions show the one-time capture tips
//! 2. Consent gate: suspend on the consent prompt until accept/decline
//! 3. Session: suspend on sign-in when nobody is signed in
//! 4. Endpoints in rank order, first success wins; a failure moves on to the
//!    next endpoint, never back to the same one
//! 5. All endpoints failed: the fixed fallback report
//!
//! Only steps 1-3 can end without a report (`Aborted`).

use crate::capture::CapturedImage;
use crate::config::{AnalyzerConfig, EndpointDescriptor};
use crate::consent::{ConsentDecision, ConsentGate, ConsentGateState, ConsentPrompt, TipDecision, TipGate, TipPrompt};
use crate::error::{AbortReason, Aborted, ConsentError, EndpointError};
use crate::events::{AnalyzerEvent, AnalyzerEventBus};
use crate::models::{AnalysisReport, ReportSource};
use crate::preferences::PreferenceStore;
use crate::services::AnalysisClient;
use crate::session::{SessionProvider, SignInOutcome};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// How the analysis was started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// User pressed Analyze
    Manual,
    /// Started by code with an image in hand; never shows the tips
    Programmatic,
}

/// Presentation collaborators the orchestrator suspends on
#[derive(Clone)]
pub struct Prompts {
    pub consent: Arc<dyn ConsentPrompt>,
    pub tip: Arc<dyn TipPrompt>,
}

/// Clears the in-flight flag on every exit path
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives one workflow instance's submissions
pub struct SubmissionOrchestrator {
    endpoints: Vec<EndpointDescriptor>,
    client: AnalysisClient,
    gate: Mutex<ConsentGate>,
    tips: TipGate,
    session: Arc<dyn SessionProvider>,
    prompts: Prompts,
    events: AnalyzerEventBus,
    in_flight: AtomicBool,
}

impl SubmissionOrchestrator {
    pub fn new(
        endpoints: Vec<EndpointDescriptor>,
        client: AnalysisClient,
        preferences: Arc<PreferenceStore>,
        session: Arc<dyn SessionProvider>,
        prompts: Prompts,
        events: AnalyzerEventBus,
    ) -> Self {
        Self {
            endpoints,
            client,
            gate: Mutex::new(ConsentGate::new(preferences.clone())),
            tips: TipGate::new(preferences),
            session,
            prompts,
            events,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Endpoints and timeout taken from config
    pub fn from_config(
        config: &AnalyzerConfig,
        preferences: Arc<PreferenceStore>,
        session: Arc<dyn SessionProvider>,
        prompts: Prompts,
        events: AnalyzerEventBus,
    ) -> Result<Self, EndpointError> {
        let client = AnalysisClient::new(config.request_timeout())?;
        Ok(Self::new(
            config.endpoints.clone(),
            client,
            preferences,
            session,
            prompts,
            events,
        ))
    }

    pub fn endpoints(&self) -> &[EndpointDescriptor] {
        &self.endpoints
    }

    /// True while an analysis is running; the Analyze trigger is disabled
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn consent_state(&self) -> ConsentGateState {
        self.gate.lock().await.state().await
    }

    /// Analyze `image`; always yields a report unless the user stops it
    pub async fn analyze(&self, image: &CapturedImage, trigger: Trigger) -> Result<AnalysisReport, Aborted> {
        let request_id = Uuid::new_v4();

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            return Err(self.abort(request_id, AbortReason::AlreadyInFlight));
        };

        info!(%request_id, ?trigger, source = ?image.source(), "Analysis requested");

        if trigger == Trigger::Manual {
            self.present_tips(request_id).await?;
        }
        self.ensure_consent(request_id).await?;
        self.ensure_session(request_id).await?;

        Ok(self.submit(request_id, image).await)
    }

    async fn present_tips(&self, request_id: Uuid) -> Result<(), Aborted> {
        if !self.tips.should_present().await {
            return Ok(());
        }

        self.events.emit_lossy(AnalyzerEvent::TipPresented { request_id });
        match self.prompts.tip.present().await {
            TipDecision::Proceed => {
                if let Err(e) = self.tips.acknowledge().await {
                    // The analysis continues; the tips may show again next time
                    warn!("Failed to persist tip marker: {}", e);
                }
                Ok(())
            }
            TipDecision::Dismiss => Err(self.abort(request_id, AbortReason::DismissedTip)),
        }
    }

    async fn ensure_consent(&self, request_id: Uuid) -> Result<(), Aborted> {
        let mut gate = self.gate.lock().await;
        if gate.request().await == ConsentGateState::Consented {
            return Ok(());
        }

        self.events.emit_lossy(AnalyzerEvent::ConsentRequested { request_id });
        debug!(%request_id, "Suspended on consent prompt");

        let reason = match self.prompts.consent.present().await {
            ConsentDecision::Accept { acknowledged } => match gate.accept(acknowledged).await {
                Ok(()) => {
                    self.events.emit_lossy(AnalyzerEvent::ConsentGranted { request_id });
                    return Ok(());
                }
                Err(ConsentError::Persistence(e)) => {
                    error!(%request_id, "Consent accepted but not saved: {}", e);
                    AbortReason::ConsentNotSaved
                }
                Err(e) => {
                    warn!(%request_id, "Consent not granted: {}", e);
                    AbortReason::DeclinedConsent
                }
            },
            ConsentDecision::Decline => AbortReason::DeclinedConsent,
        };

        // Still Consenting after a failed accept or a decline
        let _ = gate.decline();
        if reason == AbortReason::DeclinedConsent {
            self.events.emit_lossy(AnalyzerEvent::ConsentDeclined { request_id });
        }
        Err(self.abort(request_id, reason))
    }

    async fn ensure_session(&self, request_id: Uuid) -> Result<(), Aborted> {
        if self.session.current_user().is_some() {
            return Ok(());
        }

        self.events.emit_lossy(AnalyzerEvent::SignInRequested { request_id });
        debug!(%request_id, "Suspended on sign-in");

        match self.session.sign_in().await {
            SignInOutcome::Completed(user) => {
                info!(%request_id, uid = %user.uid, "Sign-in completed; resuming analysis");
                Ok(())
            }
            SignInOutcome::Cancelled => Err(self.abort(request_id, AbortReason::CancelledLogin)),
        }
    }

    async fn submit(&self, request_id: Uuid, image: &CapturedImage) -> AnalysisReport {
        for endpoint in &self.endpoints {
            self.events.emit_lossy(AnalyzerEvent::EndpointAttempt {
                request_id,
                endpoint: endpoint.name.clone(),
            });

            match self.attempt(endpoint, image).await {
                Ok(report) => {
                    info!(
                        %request_id,
                        endpoint = %endpoint.name,
                        score = report.portrait_score,
                        "Analysis report received"
                    );
                    self.report_ready(request_id, ReportSource::Live);
                    return report;
                }
                Err(e) => {
                    warn!(%request_id, endpoint = %endpoint.name, "Endpoint failed: {}", e);
                    self.events.emit_lossy(AnalyzerEvent::EndpointFailed {
                        request_id,
                        endpoint: endpoint.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        warn!(
            %request_id,
            endpoints = self.endpoints.len(),
            "All endpoints failed; using fallback report"
        );
        self.report_ready(request_id, ReportSource::Fallback);
        AnalysisReport::fallback()
    }

    async fn attempt(&self, endpoint: &EndpointDescriptor, image: &CapturedImage) -> Result<AnalysisReport, EndpointError> {
        let bearer = if endpoint.requires_auth {
            Some(self.session.id_token().await?)
        } else {
            None
        };
        self.client.submit(endpoint, image, bearer.as_deref()).await
    }

    fn report_ready(&self, request_id: Uuid, source: ReportSource) {
        self.events.emit_lossy(AnalyzerEvent::ReportReady {
            request_id,
            source,
            timestamp: Utc::now(),
        });
    }

    fn abort(&self, request_id: Uuid, reason: AbortReason) -> Aborted {
        info!(%request_id, %reason, "Analysis aborted");
        self.events.emit_lossy(AnalyzerEvent::Aborted { request_id, reason });
        Aborted(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_guard_is_exclusive() {
        let flag = AtomicBool::new(false);
        let guard = InFlightGuard::acquire(&flag).unwrap();
        assert!(InFlightGuard::acquire(&flag).is_none());
        drop(guard);
        assert!(InFlightGuard::acquire(&flag).is_some());
    }
}
