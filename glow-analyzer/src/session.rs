//! Session collaborator seam
//!
//! The identity provider is opaque. The workflow only needs to know who is
//! signed in, to get a fresh bearer token, and to ask the user to sign in.

use crate::error::SessionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

/// Signed-in user as seen by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Result of a sign-in request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    Completed(SessionUser),
    Cancelled,
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Current-user stream; the receiver always holds the latest value
    fn subscribe(&self) -> watch::Receiver<Option<SessionUser>>;

    fn current_user(&self) -> Option<SessionUser> {
        self.subscribe().borrow().clone()
    }

    /// Fresh bearer token for the current user
    async fn id_token(&self) -> Result<String, SessionError>;

    /// Ask the user to sign in and wait for completion or cancellation
    async fn sign_in(&self) -> SignInOutcome;

    async fn sign_out(&self);
}

/// Source of credentials for `StaticSession::sign_in`
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// `None` means the user cancelled
    async fn request_credentials(&self) -> Option<(SessionUser, String)>;
}

/// Session backed by a token obtained up front (environment, console, tests)
pub struct StaticSession {
    user_tx: watch::Sender<Option<SessionUser>>,
    token: Mutex<Option<String>>,
    credentials: Option<Box<dyn CredentialSource>>,
}

impl StaticSession {
    /// Already signed in
    pub fn signed_in(user: SessionUser, token: impl Into<String>) -> Self {
        let (user_tx, _) = watch::channel(Some(user));
        Self {
            user_tx,
            token: Mutex::new(Some(token.into())),
            credentials: None,
        }
    }

    /// Signed out; `sign_in` asks `credentials`, or cancels when there is none
    pub fn signed_out(credentials: Option<Box<dyn CredentialSource>>) -> Self {
        let (user_tx, _) = watch::channel(None);
        Self {
            user_tx,
            token: Mutex::new(None),
            credentials,
        }
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    fn subscribe(&self) -> watch::Receiver<Option<SessionUser>> {
        self.user_tx.subscribe()
    }

    async fn id_token(&self) -> Result<String, SessionError> {
        if self.user_tx.borrow().is_none() {
            return Err(SessionError::NotSignedIn);
        }
        self.token
            .lock()
            .await
            .clone()
            .ok_or_else(|| SessionError::TokenUnavailable("no token for session".to_string()))
    }

    async fn sign_in(&self) -> SignInOutcome {
        let Some(source) = &self.credentials else {
            debug!("No credential source; sign-in cancelled");
            return SignInOutcome::Cancelled;
        };

        match source.request_credentials().await {
            Some((user, token)) => {
                *self.token.lock().await = Some(token);
                info!(uid = %user.uid, "Signed in");
                self.user_tx.send_replace(Some(user.clone()));
                SignInOutcome::Completed(user)
            }
            None => SignInOutcome::Cancelled,
        }
    }

    async fn sign_out(&self) {
        *self.token.lock().await = None;
        self.user_tx.send_replace(None);
        info!("Signed out");
    }
}
