//! Analysis report model
//!
//! Two layers live here:
//! - the wire schema returned by the remote analysis endpoints, validated at
//!   the parse boundary so nothing half-formed reaches rendering
//! - the `AnalysisReport` handed to the renderer, tagged with its source

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Highest valid portrait score
pub const MAX_SCORE: u8 = 100;

/// Scores below this are the low severity band
pub const LOW_BAND_LIMIT: u8 = 40;

/// Scores at or above this are the high band
pub const HIGH_BAND_LIMIT: u8 = 70;

/// Where a report came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSource {
    /// Parsed from a successful remote endpoint response
    Live,
    /// Synthesized locally after every endpoint failed
    Fallback,
}

/// Recommended product
///
/// Endpoints send either bare names or `{ "name", "type" }` records; both
/// deserialize into this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ProductEntry")]
pub struct Product {
    pub name: String,
    /// Product category (Cleanser, Serum, ...) when the endpoint supplies one
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Product {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProductEntry {
    Name(String),
    Detailed {
        name: String,
        #[serde(rename = "type", default)]
        kind: Option<String>,
    },
}

impl From<ProductEntry> for Product {
    fn from(entry: ProductEntry) -> Self {
        match entry {
            ProductEntry::Name(name) => Product { name, kind: None },
            ProductEntry::Detailed { name, kind } => Product { name, kind },
        }
    }
}

/// Analysis identifiers arrive as strings or integers depending on backend
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum AnalysisId {
    Text(String),
    Number(i64),
}

impl From<AnalysisId> for String {
    fn from(id: AnalysisId) -> Self {
        match id {
            AnalysisId::Text(text) => text,
            AnalysisId::Number(n) => n.to_string(),
        }
    }
}

/// Body of a successful analysis endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(default)]
    analysis_id: Option<AnalysisId>,
    #[serde(default)]
    image_url: Option<String>,
    report: WireReport,
}

/// Nested `report` object, every field required
#[derive(Debug, Clone, Deserialize)]
struct WireReport {
    portrait_score: f64,
    snapshot_overview: BTreeMap<String, String>,
    feature_analysis: BTreeMap<String, String>,
    personalized_recommendations: Vec<String>,
    recommended_products: Vec<Product>,
}

impl AnalyzeResponse {
    /// Validate and convert into a live report
    ///
    /// Rejects fractional scores and scores outside 0-100; the orchestrator
    /// treats that like any other endpoint failure. `78.0` is accepted as 78.
    pub fn into_report(self) -> Result<AnalysisReport, String> {
        let raw = self.report.portrait_score;
        if raw.fract() != 0.0 {
            return Err(format!("portrait_score {} is not a whole number", raw));
        }
        if !(0.0..=MAX_SCORE as f64).contains(&raw) {
            return Err(format!("portrait_score {} outside 0-{}", raw, MAX_SCORE));
        }
        let score = raw as u8;

        Ok(AnalysisReport {
            portrait_score: score,
            snapshot_overview: self.report.snapshot_overview,
            feature_analysis: self.report.feature_analysis,
            recommendations: self.report.personalized_recommendations,
            products: self.report.recommended_products,
            image_url: self.image_url.filter(|u| !u.trim().is_empty()),
            analysis_id: self.analysis_id.map(String::from),
            source: ReportSource::Live,
        })
    }
}

/// Parse and validate a raw endpoint body
pub fn parse_analysis_body(body: &str) -> Result<AnalysisReport, ParseFailure> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ParseFailure::Malformed(e.to_string()))?;
    let response: AnalyzeResponse =
        serde_json::from_value(value).map_err(|e| ParseFailure::Schema(e.to_string()))?;
    response.into_report().map_err(ParseFailure::Schema)
}

/// Why a body was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// Not JSON at all
    Malformed(String),
    /// JSON, but not a report
    Schema(String),
}

/// Structured result handed to the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Overall score, 0-100
    pub portrait_score: u8,
    /// Snapshot attributes (skin tone, skin type, ...)
    pub snapshot_overview: BTreeMap<String, String>,
    /// Facial/skin feature ratings
    pub feature_analysis: BTreeMap<String, String>,
    /// Ordered free-text recommendations
    pub recommendations: Vec<String>,
    /// Ordered recommended products
    pub products: Vec<Product>,
    /// Reference image stored by the backend
    pub image_url: Option<String>,
    /// Backend identifier for fetching the persisted copy later
    pub analysis_id: Option<String>,
    pub source: ReportSource,
}

impl AnalysisReport {
    /// Fixed report returned when every endpoint fails
    ///
    /// Same literal values on every call.
    pub fn fallback() -> Self {
        let snapshot_overview = [
            ("skin_tone", "Fair"),
            ("skin_type", "Combination"),
            ("face_shape", "Oval"),
            ("estimated_age_range", "25-30"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let feature_analysis = [
            ("acne", "Mild"),
            ("dark_circles", "Light"),
            ("wrinkles", "Minimal"),
            ("texture", "Good"),
            ("hydration", "Moderate"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            portrait_score: 45,
            snapshot_overview,
            feature_analysis,
            recommendations: vec![
                "Use a gentle vitamin C serum in the morning".to_string(),
                "Apply SPF 30+ sunscreen daily".to_string(),
                "Consider adding retinol to your nighttime routine".to_string(),
                "Stay hydrated - aim for 8 glasses of water daily".to_string(),
            ],
            products: vec![
                Product::named("Hydrating Cleanser"),
                Product::named("Vitamin C Serum"),
                Product::named("Moisturizing Cream"),
                Product::named("Mineral Sunscreen SPF 50"),
            ],
            image_url: None,
            analysis_id: None,
            source: ReportSource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == ReportSource::Fallback
    }

    /// Severity band of the overall score
    pub fn score_band(&self) -> ScoreBand {
        ScoreBand::for_score(self.portrait_score, false)
    }
}

/// Three-bucket severity mapping used for color banding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    /// Below 40
    Low,
    /// 40 up to 69
    Moderate,
    /// 70 and above
    High,
}

impl ScoreBand {
    /// Map a 0-100 score to a band
    ///
    /// `inverted` is for metrics where lower is better (acne, wrinkles): the
    /// score is flipped to `100 - score` before banding.
    pub fn for_score(score: u8, inverted: bool) -> Self {
        let score = score.min(MAX_SCORE);
        let adjusted = if inverted { MAX_SCORE - score } else { score };

        if adjusted >= HIGH_BAND_LIMIT {
            ScoreBand::High
        } else if adjusted >= LOW_BAND_LIMIT {
            ScoreBand::Moderate
        } else {
            ScoreBand::Low
        }
    }
}

/// Report shape of a persisted analysis fetched by id
///
/// Lenient: the history view renders whatever the backend stored, with
/// empty defaults for missing sections.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct StoredReport {
    portrait_score: f64,
    snapshot_overview: BTreeMap<String, String>,
    feature_analysis: BTreeMap<String, String>,
    personalized_recommendations: Vec<String>,
    recommended_products: Vec<Product>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StoredAnalysisBody {
    #[serde(default)]
    id: Option<AnalysisId>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    report: StoredReport,
}

/// Persisted analysis as returned by the history endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredAnalysis {
    pub id: String,
    /// Creation timestamp as sent by the backend (ISO-8601 in practice)
    pub date: Option<String>,
    pub report: AnalysisReport,
}

impl StoredAnalysis {
    pub(crate) fn from_body(requested_id: &str, body: StoredAnalysisBody) -> Self {
        let score = body.report.portrait_score.round().clamp(0.0, MAX_SCORE as f64) as u8;
        let id = body
            .id
            .map(String::from)
            .unwrap_or_else(|| requested_id.to_string());

        let report = AnalysisReport {
            portrait_score: score,
            snapshot_overview: body.report.snapshot_overview,
            feature_analysis: body.report.feature_analysis,
            recommendations: body.report.personalized_recommendations,
            products: body.report.recommended_products,
            image_url: body.image_url.filter(|u| !u.trim().is_empty()),
            analysis_id: Some(id.clone()),
            source: ReportSource::Live,
        };

        Self {
            id,
            date: body.date,
            report,
        }
    }

    /// Creation date parsed as RFC 3339, if the backend sent one
    pub fn created_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.date
            .as_deref()
            .and_then(|d| chrono::DateTime::parse_from_rfc3339(d).ok())
            .map(|d| d.with_timezone(&chrono::Utc))
    }
}
