//! Consent gate
//!
//! # States
//! Unconsented → (request) → Consenting → (accept) → Consented
//!                           Consenting → (decline) → Unconsented
//!
//! `Consented` is not stored on the gate: it is read from the shared
//! `ConsentState` every time, so revoking any flag elsewhere re-blocks the
//! next submission.
//!
//! The one-time capture tips marker is a separate gate with its own prompt.

use crate::error::ConsentError;
use crate::preferences::PreferenceStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Observable gate state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentGateState {
    Unconsented,
    Consenting,
    Consented,
}

/// User answer to the consent prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentDecision {
    /// Accept button pressed; `acknowledged` is the checkbox state
    Accept { acknowledged: bool },
    Decline,
}

/// User answer to the capture tips advisory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TipDecision {
    Proceed,
    Dismiss,
}

/// Presentation collaborator showing the consent prompt
#[async_trait]
pub trait ConsentPrompt: Send + Sync {
    /// Show the prompt and wait for the user
    async fn present(&self) -> ConsentDecision;
}

/// Presentation collaborator showing the capture tips advisory
#[async_trait]
pub trait TipPrompt: Send + Sync {
    async fn present(&self) -> TipDecision;
}

/// Per-workflow consent state machine over the shared preferences
#[derive(Debug)]
pub struct ConsentGate {
    preferences: Arc<PreferenceStore>,
    consenting: bool,
}

impl ConsentGate {
    pub fn new(preferences: Arc<PreferenceStore>) -> Self {
        Self {
            preferences,
            consenting: false,
        }
    }

    pub async fn state(&self) -> ConsentGateState {
        if self.consenting {
            ConsentGateState::Consenting
        } else if self.preferences.consent().await.all_granted() {
            ConsentGateState::Consented
        } else {
            ConsentGateState::Unconsented
        }
    }

    /// Open the prompt; no-op when already consented or consenting
    pub async fn request(&mut self) -> ConsentGateState {
        if self.state().await == ConsentGateState::Unconsented {
            debug!("Consent gate: Unconsented -> Consenting");
            self.consenting = true;
        }
        self.state().await
    }

    /// Grant and persist all three flags
    pub async fn accept(&mut self, acknowledged: bool) -> Result<(), ConsentError> {
        if !self.consenting {
            return Err(ConsentError::NotConsenting);
        }
        if !acknowledged {
            return Err(ConsentError::NotAcknowledged);
        }

        self.preferences.grant_all_consent().await?;
        self.consenting = false;
        info!("Consent granted and persisted");
        Ok(())
    }

    /// Close the prompt; flags are left untouched
    pub fn decline(&mut self) -> Result<(), ConsentError> {
        if !self.consenting {
            return Err(ConsentError::NotConsenting);
        }
        self.consenting = false;
        debug!("Consent gate: Consenting -> Unconsented");
        Ok(())
    }
}

/// One-time capture tips gate
///
/// Only manual submissions consult it; the marker is written once the user
/// proceeds past the advisory.
#[derive(Debug, Clone)]
pub struct TipGate {
    preferences: Arc<PreferenceStore>,
}

impl TipGate {
    pub fn new(preferences: Arc<PreferenceStore>) -> Self {
        Self { preferences }
    }

    pub async fn should_present(&self) -> bool {
        !self.preferences.tip_shown().await
    }

    pub async fn acknowledge(&self) -> glow_common::Result<()> {
        self.preferences.mark_tip_shown().await
    }
}
