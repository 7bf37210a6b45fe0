//! Analysis history client
//!
//! Fetches a persisted analysis by id for the history detail view. Storing
//! analyses is the backend's job; this side only reads.

use crate::error::ClientError;
use crate::models::report::StoredAnalysisBody;
use crate::models::StoredAnalysis;
use crate::session::SessionProvider;
use reqwest::{StatusCode, Url};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct HistoryClient {
    http_client: reqwest::Client,
    base_url: String,
    session: Arc<dyn SessionProvider>,
}

impl HistoryClient {
    pub fn new(
        base_url: impl Into<String>,
        session: Arc<dyn SessionProvider>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        })
    }

    /// GET `/api/ml/analysis/{id}` with a fresh bearer token
    pub async fn fetch_analysis(&self, analysis_id: &str) -> Result<StoredAnalysis, ClientError> {
        let token = self.session.id_token().await?;
        let url = self.detail_url(analysis_id)?;

        debug!(analysis_id, url = %url, "Fetching analysis detail");

        let response = self
            .http_client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(analysis_id.to_string()));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClientError::Api(status.as_u16(), error_text));
        }

        let body: StoredAnalysisBody = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;
        let analysis = StoredAnalysis::from_body(analysis_id, body);

        info!(
            analysis_id = %analysis.id,
            score = analysis.report.portrait_score,
            "Analysis detail loaded"
        );
        Ok(analysis)
    }

    /// The id always lands in a single escaped path segment
    fn detail_url(&self, analysis_id: &str) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::Network(format!("invalid base url {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Network(format!("base url cannot take a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "ml", "analysis"])
            .push(analysis_id);
        Ok(url)
    }
}
