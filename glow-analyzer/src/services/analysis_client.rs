//! Remote analysis endpoint client
//!
//! One call = one multipart upload to one endpoint. Choosing the next
//! endpoint on failure is the orchestrator's job, not this client's.

use crate::capture::CapturedImage;
use crate::config::EndpointDescriptor;
use crate::error::EndpointError;
use crate::models::{parse_analysis_body, AnalysisReport, ParseFailure};
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("glow-analyzer/", env!("CARGO_PKG_VERSION"));

/// Multipart field carrying the image
pub const IMAGE_FIELD: &str = "image";

/// HTTP client for the analysis endpoints
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    http_client: reqwest::Client,
    timeout: Duration,
}

impl AnalysisClient {
    /// `timeout` bounds each attempt, connect through body
    pub fn new(timeout: Duration) -> Result<Self, EndpointError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| EndpointError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Upload `image` to `endpoint` and parse the report
    pub async fn submit(
        &self,
        endpoint: &EndpointDescriptor,
        image: &CapturedImage,
        bearer: Option<&str>,
    ) -> Result<AnalysisReport, EndpointError> {
        let part = Part::bytes(image.bytes().to_vec())
            .file_name(image.file_name())
            .mime_str(image.mime_type())
            .map_err(|e| EndpointError::Network(e.to_string()))?;
        let form = Form::new().part(IMAGE_FIELD, part);

        let mut request = self
            .http_client
            .post(&endpoint.url)
            .timeout(self.timeout)
            .multipart(form);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        debug!(
            endpoint = %endpoint.name,
            url = %endpoint.url,
            bytes = image.bytes().len(),
            authenticated = bearer.is_some(),
            "Submitting image"
        );

        let response = request.send().await.map_err(EndpointError::from_reqwest)?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EndpointError::Status(status.as_u16(), error_text));
        }

        let body = response.text().await.map_err(EndpointError::from_reqwest)?;

        parse_analysis_body(&body).map_err(|failure| match failure {
            ParseFailure::Malformed(msg) => EndpointError::Malformed(msg),
            ParseFailure::Schema(msg) => EndpointError::Schema(msg),
        })
    }
}
