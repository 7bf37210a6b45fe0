//! Configuration resolution for glow-analyzer
//!
//! Priority for each setting: environment variable → TOML file → compiled
//! default. The endpoint list is fixed once loaded; nothing mutates it at
//! runtime.

use glow_common::config::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Module name used for the TOML file and root folder resolution
pub const MODULE_NAME: &str = "glow-analyzer";

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CAPTURE_WIDTH: u32 = 640;
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 480;
pub const DEFAULT_DASHBOARD_REFRESH_SECS: u64 = 60;

/// One entry of the ranked analysis endpoint list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    /// Full URL receiving the multipart upload
    pub url: String,
    /// Attach `Authorization: Bearer <token>`
    #[serde(default)]
    pub requires_auth: bool,
    /// Human-readable name for logs
    pub name: String,
}

impl EndpointDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>, requires_auth: bool) -> Self {
        Self {
            url: url.into(),
            requires_auth,
            name: name.into(),
        }
    }
}

/// Compiled endpoint ranking: authenticated first, demo second
pub fn default_endpoints() -> Vec<EndpointDescriptor> {
    vec![
        EndpointDescriptor::new(
            "authenticated",
            format!("{}/api/ml/analyze", DEFAULT_BACKEND_URL),
            true,
        ),
        EndpointDescriptor::new("demo", format!("{}/api/analyze", DEFAULT_BACKEND_URL), false),
    ]
}

/// Contents of `glow-analyzer.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Data folder holding the settings database
    pub root_folder: Option<PathBuf>,
    pub logging: LoggingConfig,
    /// Tried in order, first success wins
    pub endpoints: Vec<EndpointDescriptor>,
    /// Per-attempt network timeout
    pub request_timeout_secs: u64,
    pub history_base_url: String,
    pub admin_base_url: String,
    /// Fixed raster size for camera snapshots
    pub capture_width: u32,
    pub capture_height: u32,
    /// Theme preference expiry; never expires when unset
    pub theme_ttl_hours: Option<u64>,
    pub dashboard_refresh_secs: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            logging: LoggingConfig::default(),
            endpoints: default_endpoints(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            history_base_url: DEFAULT_BACKEND_URL.to_string(),
            admin_base_url: format!("{}/api/admin", DEFAULT_BACKEND_URL),
            capture_width: DEFAULT_CAPTURE_WIDTH,
            capture_height: DEFAULT_CAPTURE_HEIGHT,
            theme_ttl_hours: None,
            dashboard_refresh_secs: DEFAULT_DASHBOARD_REFRESH_SECS,
        }
    }
}

/// Message produced while loading config, logged once tracing is up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigNote {
    Info(String),
    Warn(String),
}

impl ConfigNote {
    pub fn emit(&self) {
        match self {
            ConfigNote::Info(msg) => info!("{}", msg),
            ConfigNote::Warn(msg) => warn!("{}", msg),
        }
    }
}

impl AnalyzerConfig {
    /// Load from the platform config file, then apply environment overrides
    ///
    /// Nothing is logged here; the notes describe which sources were used
    /// and what was repaired.
    pub fn load() -> (Self, Vec<ConfigNote>) {
        let mut notes = Vec::new();
        let mut config = match glow_common::config::config_file_path(MODULE_NAME) {
            Ok(path) => {
                let (config, note) = glow_common::config::load_toml_or_default::<Self>(&path);
                notes.extend(note.map(ConfigNote::Warn));
                config
            }
            Err(e) => {
                notes.push(ConfigNote::Warn(format!("{} (using defaults)", e)));
                Self::default()
            }
        };
        notes.extend(config.apply_env_overrides());
        notes.extend(config.normalize());
        (config, notes)
    }

    /// Environment variables take priority over TOML values
    pub fn apply_env_overrides(&mut self) -> Vec<ConfigNote> {
        let mut notes = Vec::new();
        if let Some(secs) = env_parse::<u64>("GLOW_REQUEST_TIMEOUT_SECS", &mut notes) {
            notes.push(ConfigNote::Info("Request timeout loaded from environment variable".to_string()));
            self.request_timeout_secs = secs;
        }
        if let Some(url) = env_non_empty("GLOW_HISTORY_BASE_URL") {
            notes.push(ConfigNote::Info("History base URL loaded from environment variable".to_string()));
            self.history_base_url = url;
        }
        if let Some(url) = env_non_empty("GLOW_ADMIN_BASE_URL") {
            notes.push(ConfigNote::Info("Admin base URL loaded from environment variable".to_string()));
            self.admin_base_url = url;
        }
        notes
    }

    /// Repair values that would make the workflow unusable
    fn normalize(&mut self) -> Vec<ConfigNote> {
        let mut notes = Vec::new();
        if self.endpoints.is_empty() {
            notes.push(ConfigNote::Warn(
                "No analysis endpoints configured; using compiled defaults".to_string(),
            ));
            self.endpoints = default_endpoints();
        }
        if self.request_timeout_secs == 0 {
            notes.push(ConfigNote::Warn(format!(
                "request_timeout_secs = 0 is invalid; using {}",
                DEFAULT_REQUEST_TIMEOUT_SECS
            )));
            self.request_timeout_secs = DEFAULT_REQUEST_TIMEOUT_SECS;
        }
        if self.capture_width == 0 || self.capture_height == 0 {
            notes.push(ConfigNote::Warn(format!(
                "Capture size must be non-zero; using {}x{}",
                DEFAULT_CAPTURE_WIDTH, DEFAULT_CAPTURE_HEIGHT
            )));
            self.capture_width = DEFAULT_CAPTURE_WIDTH;
            self.capture_height = DEFAULT_CAPTURE_HEIGHT;
        }
        if self.dashboard_refresh_secs == 0 {
            self.dashboard_refresh_secs = DEFAULT_DASHBOARD_REFRESH_SECS;
        }
        notes
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn theme_ttl(&self) -> Option<chrono::Duration> {
        self.theme_ttl_hours
            .and_then(|h| i64::try_from(h).ok())
            .map(chrono::Duration::hours)
    }

    pub fn dashboard_refresh(&self) -> Duration {
        Duration::from_secs(self.dashboard_refresh_secs)
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, notes: &mut Vec<ConfigNote>) -> Option<T> {
    let raw = env_non_empty(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            notes.push(ConfigNote::Warn(format!("Ignoring invalid {}={}", name, raw)));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint_order() {
        let endpoints = default_endpoints();
        assert_eq!(endpoints.len(), 2);
        assert!(endpoints[0].requires_auth);
        assert!(!endpoints[1].requires_auth);
        assert_eq!(endpoints[1].name, "demo");
    }

    #[test]
    fn test_toml_endpoint_list() {
        let toml_text = r#"
            request_timeout_secs = 5

            [[endpoints]]
            name = "primary"
            url = "https://api.example/analyze"
            requires_auth = true

            [[endpoints]]
            name = "public"
            url = "https://demo.example/analyze"
        "#;

        let config: AnalyzerConfig = toml::from_str(toml_text).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.endpoints.len(), 2);
        assert!(!config.endpoints[1].requires_auth);
        assert_eq!(config.capture_width, DEFAULT_CAPTURE_WIDTH);
    }

    #[test]
    fn test_normalize_repairs_zero_values() {
        let mut config = AnalyzerConfig {
            endpoints: vec![],
            request_timeout_secs: 0,
            capture_width: 0,
            ..AnalyzerConfig::default()
        };
        let notes = config.normalize();

        assert_eq!(notes.len(), 3);
        assert!(notes.iter().all(|n| matches!(n, ConfigNote::Warn(_))));
        assert_eq!(config.endpoints, default_endpoints());
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.capture_width, DEFAULT_CAPTURE_WIDTH);
    }

    #[test]
    #[serial_test::serial]
    fn test_env_overrides_toml_values() {
        std::env::set_var("GLOW_REQUEST_TIMEOUT_SECS", "7");
        std::env::set_var("GLOW_HISTORY_BASE_URL", "http://history.test");
        std::env::set_var("GLOW_ADMIN_BASE_URL", "  ");

        let mut config = AnalyzerConfig::default();
        let notes = config.apply_env_overrides();

        std::env::remove_var("GLOW_REQUEST_TIMEOUT_SECS");
        std::env::remove_var("GLOW_HISTORY_BASE_URL");
        std::env::remove_var("GLOW_ADMIN_BASE_URL");

        assert_eq!(config.request_timeout(), Duration::from_secs(7));
        assert_eq!(config.history_base_url, "http://history.test");
        // Blank values are ignored
        assert_eq!(config.admin_base_url, AnalyzerConfig::default().admin_base_url);
        assert_eq!(notes.len(), 2);
    }

    #[test]
    #[serial_test::serial]
    fn test_invalid_env_timeout_ignored() {
        std::env::set_var("GLOW_REQUEST_TIMEOUT_SECS", "soon");
        let mut config = AnalyzerConfig::default();
        let notes = config.apply_env_overrides();
        std::env::remove_var("GLOW_REQUEST_TIMEOUT_SECS");

        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(
            notes,
            vec![ConfigNote::Warn("Ignoring invalid GLOW_REQUEST_TIMEOUT_SECS=soon".to_string())]
        );
    }

    #[test]
    #[serial_test::serial]
    fn test_load_collects_notes_without_logging() {
        std::env::set_var("GLOW_REQUEST_TIMEOUT_SECS", "later");
        let (config, notes) = AnalyzerConfig::load();
        std::env::remove_var("GLOW_REQUEST_TIMEOUT_SECS");

        assert!(config.request_timeout_secs > 0);
        assert!(notes.contains(&ConfigNote::Warn(
            "Ignoring invalid GLOW_REQUEST_TIMEOUT_SECS=later".to_string()
        )));
    }

    #[test]
    fn test_theme_ttl() {
        let mut config = AnalyzerConfig::default();
        assert!(config.theme_ttl().is_none());
        config.theme_ttl_hours = Some(24);
        assert_eq!(config.theme_ttl(), Some(chrono::Duration::hours(24)));
    }
}
