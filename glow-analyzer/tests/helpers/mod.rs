//! Shared fixtures for glow-analyzer integration tests
//!
//! Remote backends are real axum servers on 127.0.0.1:0; prompts and
//! sign-in are scripted collaborators that count how often they were shown.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use glow_analyzer::capture::{select_from_file, CapturedImage};
use glow_analyzer::consent::{ConsentDecision, ConsentPrompt, TipDecision, TipPrompt};
use glow_analyzer::services::AnalysisClient;
use glow_analyzer::session::{CredentialSource, SessionProvider, SessionUser, StaticSession};
use glow_analyzer::{
    AnalyzerEventBus, EndpointDescriptor, PreferenceStore, Prompts, SubmissionOrchestrator,
};
use glow_common::db::init_memory_database;
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::json;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TEST_TOKEN: &str = "test-id-token";

/// Serve `router` on an ephemeral local port
pub async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Well-formed analysis response body
pub fn report_body(score: i64) -> String {
    json!({
        "analysis_id": 42,
        "image_url": "https://cdn.example.com/a/42.jpg",
        "report": {
            "portrait_score": score,
            "snapshot_overview": { "skin_tone": "Medium", "skin_type": "Oily" },
            "feature_analysis": { "acne": "Moderate", "texture": "Fair" },
            "personalized_recommendations": ["Double cleanse at night"],
            "recommended_products": ["Gel Cleanser", { "name": "Niacinamide Serum", "type": "Serum" }]
        }
    })
    .to_string()
}

/// What one stub endpoint answers
#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: StatusCode,
    pub body: String,
    pub delay: Option<Duration>,
}

impl StubResponse {
    pub fn ok(score: i64) -> Self {
        Self {
            status: StatusCode::OK,
            body: report_body(score),
            delay: None,
        }
    }

    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            body: json!({ "detail": "failure" }).to_string(),
            delay: None,
        }
    }

    /// 200 with an arbitrary body
    pub fn raw(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.into(),
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Record of one received upload
#[derive(Debug, Clone)]
pub struct ReceivedUpload {
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub has_image_field: bool,
}

struct Stub {
    response: StubResponse,
    hits: AtomicUsize,
    uploads: Mutex<Vec<ReceivedUpload>>,
}

/// Analysis backend with one stub per endpoint index
pub struct MockAnalysisBackend {
    addr: SocketAddr,
    stubs: Arc<Vec<Stub>>,
}

impl MockAnalysisBackend {
    pub async fn start(responses: Vec<StubResponse>) -> Self {
        let stubs = Arc::new(
            responses
                .into_iter()
                .map(|response| Stub {
                    response,
                    hits: AtomicUsize::new(0),
                    uploads: Mutex::new(Vec::new()),
                })
                .collect::<Vec<_>>(),
        );

        let router = Router::new()
            .route("/endpoint/:index", post(handle_upload))
            .with_state(stubs.clone());

        Self {
            addr: serve(router).await,
            stubs,
        }
    }

    pub fn url(&self, index: usize) -> String {
        format!("http://{}/endpoint/{}", self.addr, index)
    }

    /// Endpoint list over every stub; `auth` marks which ones require a token
    pub fn endpoints(&self, auth: &[bool]) -> Vec<EndpointDescriptor> {
        (0..self.stubs.len())
            .map(|i| {
                EndpointDescriptor::new(
                    format!("stub-{}", i),
                    self.url(i),
                    auth.get(i).copied().unwrap_or(false),
                )
            })
            .collect()
    }

    pub fn hits(&self, index: usize) -> usize {
        self.stubs[index].hits.load(Ordering::SeqCst)
    }

    pub fn total_hits(&self) -> usize {
        (0..self.stubs.len()).map(|i| self.hits(i)).sum()
    }

    pub fn uploads(&self, index: usize) -> Vec<ReceivedUpload> {
        self.stubs[index].uploads.lock().unwrap().clone()
    }
}

async fn handle_upload(
    State(stubs): State<Arc<Vec<Stub>>>,
    Path(index): Path<usize>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let Some(stub) = stubs.get(index) else {
        return (StatusCode::NOT_FOUND, String::new());
    };
    stub.hits.fetch_add(1, Ordering::SeqCst);

    let header_text = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let needle = b"name=\"image\"";
    stub.uploads.lock().unwrap().push(ReceivedUpload {
        authorization: header_text(header::AUTHORIZATION),
        content_type: header_text(header::CONTENT_TYPE),
        has_image_field: body.windows(needle.len()).any(|w| w == needle),
    });

    if let Some(delay) = stub.response.delay {
        tokio::time::sleep(delay).await;
    }
    (stub.response.status, stub.response.body.clone())
}

/// Consent prompt answering with a fixed decision
pub struct ScriptedConsent {
    decision: ConsentDecision,
    shown: AtomicUsize,
}

impl ScriptedConsent {
    pub fn new(decision: ConsentDecision) -> Arc<Self> {
        Arc::new(Self {
            decision,
            shown: AtomicUsize::new(0),
        })
    }

    pub fn accepting() -> Arc<Self> {
        Self::new(ConsentDecision::Accept { acknowledged: true })
    }

    pub fn shown(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConsentPrompt for ScriptedConsent {
    async fn present(&self) -> ConsentDecision {
        self.shown.fetch_add(1, Ordering::SeqCst);
        self.decision
    }
}

/// Tip prompt answering with a fixed decision
pub struct ScriptedTip {
    decision: TipDecision,
    shown: AtomicUsize,
}

impl ScriptedTip {
    pub fn new(decision: TipDecision) -> Arc<Self> {
        Arc::new(Self {
            decision,
            shown: AtomicUsize::new(0),
        })
    }

    pub fn shown(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TipPrompt for ScriptedTip {
    async fn present(&self) -> TipDecision {
        self.shown.fetch_add(1, Ordering::SeqCst);
        self.decision
    }
}

/// Credentials handed out on sign-in, or `None` to cancel
pub struct ScriptedCredentials {
    answer: Option<(SessionUser, String)>,
    asked: Arc<AtomicUsize>,
}

#[async_trait]
impl CredentialSource for ScriptedCredentials {
    async fn request_credentials(&self) -> Option<(SessionUser, String)> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }
}

pub fn test_user() -> SessionUser {
    SessionUser {
        uid: "user-1".to_string(),
        email: Some("user@example.com".to_string()),
        display_name: Some("Test User".to_string()),
    }
}

pub fn signed_in() -> Arc<dyn SessionProvider> {
    Arc::new(StaticSession::signed_in(test_user(), TEST_TOKEN))
}

/// Signed-out session; returns the counter of sign-in requests
pub fn signed_out(completes: bool) -> (Arc<dyn SessionProvider>, Arc<AtomicUsize>) {
    let asked = Arc::new(AtomicUsize::new(0));
    let answer = completes.then(|| (test_user(), TEST_TOKEN.to_string()));
    let session = StaticSession::signed_out(Some(Box::new(ScriptedCredentials {
        answer,
        asked: asked.clone(),
    })));
    (Arc::new(session), asked)
}

pub async fn preferences() -> Arc<PreferenceStore> {
    Arc::new(
        PreferenceStore::load(init_memory_database().await.unwrap())
            .await
            .unwrap(),
    )
}

/// Preferences that loaded fine but reject every later write
///
/// The tips are already marked as seen; the pool is closed afterwards.
pub async fn unwritable_preferences() -> Arc<PreferenceStore> {
    let db = init_memory_database().await.unwrap();
    let prefs = Arc::new(PreferenceStore::load(db.clone()).await.unwrap());
    prefs.mark_tip_shown().await.unwrap();
    db.close().await;
    prefs
}

/// Preferences with consent granted and the tips already seen
pub async fn ready_preferences() -> Arc<PreferenceStore> {
    let prefs = preferences().await;
    prefs.grant_all_consent().await.unwrap();
    prefs.mark_tip_shown().await.unwrap();
    prefs
}

pub fn test_image() -> CapturedImage {
    let raster = RgbImage::from_pixel(32, 24, Rgb([210, 170, 150]));
    let mut png = Cursor::new(Vec::new());
    raster.write_to(&mut png, ImageFormat::Png).unwrap();
    select_from_file(png.get_ref(), "image/png").unwrap()
}

/// Orchestrator wiring with test collaborators
pub struct Harness {
    pub orchestrator: SubmissionOrchestrator,
    pub consent: Arc<ScriptedConsent>,
    pub tip: Arc<ScriptedTip>,
    pub events: AnalyzerEventBus,
}

pub fn harness(
    endpoints: Vec<EndpointDescriptor>,
    preferences: Arc<PreferenceStore>,
    session: Arc<dyn SessionProvider>,
    consent: Arc<ScriptedConsent>,
    tip: Arc<ScriptedTip>,
) -> Harness {
    harness_with_timeout(endpoints, preferences, session, consent, tip, Duration::from_secs(5))
}

pub fn harness_with_timeout(
    endpoints: Vec<EndpointDescriptor>,
    preferences: Arc<PreferenceStore>,
    session: Arc<dyn SessionProvider>,
    consent: Arc<ScriptedConsent>,
    tip: Arc<ScriptedTip>,
    timeout: Duration,
) -> Harness {
    let events = AnalyzerEventBus::new(64);
    let prompts = Prompts {
        consent: consent.clone(),
        tip: tip.clone(),
    };
    let orchestrator = SubmissionOrchestrator::new(
        endpoints,
        AnalysisClient::new(timeout).unwrap(),
        preferences,
        session,
        prompts,
        events.clone(),
    );

    Harness {
        orchestrator,
        consent,
        tip,
        events,
    }
}
