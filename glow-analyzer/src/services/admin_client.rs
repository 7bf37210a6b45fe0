//! Admin dashboard client and poller

use crate::error::ClientError;
use crate::models::{
    DashboardSnapshot, RegistrationRange, RegistrationSeries, UserRow, UserSummary,
};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct AdminClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl AdminClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Admin request");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClientError::Api(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    pub async fn summary(&self) -> Result<UserSummary, ClientError> {
        self.get_json("/summary").await
    }

    pub async fn users(&self) -> Result<Vec<UserRow>, ClientError> {
        self.get_json("/users").await
    }

    /// Users active today with at least one analysis today
    pub async fn today_users(&self) -> Result<Vec<UserRow>, ClientError> {
        self.get_json("/today-users").await
    }

    pub async fn registrations(&self, range: RegistrationRange) -> Result<RegistrationSeries, ClientError> {
        self.get_json(&format!("/registrations?range={}", range.as_query()))
            .await
    }

    /// One full dashboard refresh
    pub async fn snapshot(&self, range: RegistrationRange) -> Result<DashboardSnapshot, ClientError> {
        let (summary, users, today_users, registrations) = tokio::try_join!(
            self.summary(),
            self.users(),
            self.today_users(),
            self.registrations(range),
        )?;

        Ok(DashboardSnapshot::collect(summary, users, today_users, registrations))
    }
}

/// Periodic dashboard refresh until cancelled
///
/// Failed refreshes are logged and keep the previous snapshot visible.
/// `stop` does not wait for an in-flight refresh.
pub struct DashboardPoller {
    snapshots: watch::Receiver<Option<DashboardSnapshot>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl DashboardPoller {
    pub fn spawn(client: AdminClient, range: RegistrationRange, period: Duration) -> Self {
        let (tx, snapshots) = watch::channel(None);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        // A refresh in progress is abandoned on cancel
                        let result = tokio::select! {
                            _ = token.cancelled() => break,
                            result = client.snapshot(range) => result,
                        };
                        match result {
                            Ok(snapshot) => {
                                tx.send_replace(Some(snapshot));
                            }
                            Err(e) => warn!("Dashboard refresh failed: {}", e),
                        }
                    }
                }
            }
            debug!("Dashboard poller stopped");
        });

        Self {
            snapshots,
            cancel,
            task,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<DashboardSnapshot>> {
        self.snapshots.clone()
    }

    /// Stop polling and wait for the task to finish
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!("Dashboard poller task failed: {}", e);
        }
    }
}
