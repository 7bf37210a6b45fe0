//! Capture-Analyze-Render workflow instance
//!
//! Holds the current image and the last rendered report. Replacing or
//! removing the image clears the report; a report is never shown against a
//! different image than the one it was produced for.

use super::orchestrator::{SubmissionOrchestrator, Trigger};
use crate::capture::CapturedImage;
use crate::error::Aborted;
use crate::models::AnalysisReport;
use tracing::debug;

pub struct AnalyzerWorkflow {
    orchestrator: SubmissionOrchestrator,
    image: Option<CapturedImage>,
    report: Option<AnalysisReport>,
}

impl AnalyzerWorkflow {
    pub fn new(orchestrator: SubmissionOrchestrator) -> Self {
        Self {
            orchestrator,
            image: None,
            report: None,
        }
    }

    pub fn orchestrator(&self) -> &SubmissionOrchestrator {
        &self.orchestrator
    }

    pub fn image(&self) -> Option<&CapturedImage> {
        self.image.as_ref()
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        self.report.as_ref()
    }

    /// Replace the current image; any previous report is discarded
    pub fn set_image(&mut self, image: CapturedImage) {
        debug!(source = ?image.source(), bytes = image.bytes().len(), "Image selected");
        self.image = Some(image);
        self.report = None;
    }

    pub fn remove_image(&mut self) {
        self.image = None;
        self.report = None;
    }

    pub fn is_analyzing(&self) -> bool {
        self.orchestrator.is_in_flight()
    }

    /// Analyze is offered only with an image and nothing in flight
    pub fn can_analyze(&self) -> bool {
        self.image.is_some() && !self.is_analyzing()
    }

    /// Analyze the current image
    ///
    /// `Ok(None)` when there is no image to analyze. On abort the previous
    /// report (if any) stays as it was.
    pub async fn analyze(&mut self, trigger: Trigger) -> Result<Option<&AnalysisReport>, Aborted> {
        let Some(image) = &self.image else {
            debug!("Analyze requested without an image; ignored");
            return Ok(None);
        };

        let report = self.orchestrator.analyze(image, trigger).await?;
        self.report = Some(report);
        Ok(self.report.as_ref())
    }

    /// Programmatic entry: set `image` and analyze it straight away
    pub async fn analyze_image(&mut self, image: CapturedImage) -> Result<&AnalysisReport, Aborted> {
        let result = self.orchestrator.analyze(&image, Trigger::Programmatic).await;
        self.set_image(image);
        Ok(self.report.insert(result?))
    }
}
