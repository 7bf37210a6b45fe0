//! Process-wide client preferences
//!
//! `PreferenceStore` is loaded once at startup from the settings table and
//! shared (`Arc`) by every workflow instance. Each mutation writes through
//! to the database before the in-memory snapshot changes, so a failed write
//! never leaves memory ahead of disk.

use crate::session::{SessionProvider, SessionUser};
use chrono::{DateTime, Utc};
use glow_common::db::{delete_setting, get_setting, set_setting};
use glow_common::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const KEY_DATA_PROCESSING: &str = "consent_data_processing";
const KEY_HISTORY_SAVING: &str = "consent_history_saving";
const KEY_PRIVACY: &str = "consent_privacy";
const KEY_TIP_SHOWN: &str = "analyzer_tip_shown";
const KEY_THEME: &str = "theme_pref";
const KEY_PROFILE: &str = "cached_profile";

/// Permission flags gating analysis submission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentState {
    pub data_processing_allowed: bool,
    pub history_saving_allowed: bool,
    pub privacy_consent_given: bool,
}

impl ConsentState {
    pub fn granted() -> Self {
        Self {
            data_processing_allowed: true,
            history_saving_allowed: true,
            privacy_consent_given: true,
        }
    }

    /// Submission may proceed only when this is true
    pub fn all_granted(&self) -> bool {
        self.data_processing_allowed && self.history_saving_allowed && self.privacy_consent_given
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Theme::Light => f.write_str("light"),
            Theme::Dark => f.write_str("dark"),
        }
    }
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme '{}'", other)),
        }
    }
}

/// Stored theme with the time it was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemePreference {
    pub value: Theme,
    pub ts: DateTime<Utc>,
}

/// Last-known profile for painting before the backend answers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedProfile {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
    #[serde(default)]
    pub analysis_count: u64,
    pub cached_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
struct Snapshot {
    consent: ConsentState,
    tip_shown: bool,
    theme: Option<ThemePreference>,
    profile: Option<CachedProfile>,
}

/// Durable preferences shared across workflow instances
#[derive(Debug)]
pub struct PreferenceStore {
    db: SqlitePool,
    state: RwLock<Snapshot>,
}

impl PreferenceStore {
    /// Read every preference from the settings table
    ///
    /// Unreadable values are logged and treated as unset.
    pub async fn load(db: SqlitePool) -> Result<Self> {
        let consent = ConsentState {
            data_processing_allowed: load_flag(&db, KEY_DATA_PROCESSING).await?,
            history_saving_allowed: load_flag(&db, KEY_HISTORY_SAVING).await?,
            privacy_consent_given: load_flag(&db, KEY_PRIVACY).await?,
        };
        let tip_shown = get_setting::<String>(&db, KEY_TIP_SHOWN).await?.is_some();
        let theme = load_json::<ThemePreference>(&db, KEY_THEME).await?;
        let profile = load_json::<CachedProfile>(&db, KEY_PROFILE).await?;

        info!(
            consented = consent.all_granted(),
            tip_shown,
            has_cached_profile = profile.is_some(),
            "Preferences loaded"
        );

        Ok(Self {
            db,
            state: RwLock::new(Snapshot {
                consent,
                tip_shown,
                theme,
                profile,
            }),
        })
    }

    pub async fn consent(&self) -> ConsentState {
        self.state.read().await.consent
    }

    /// Persist all three flags, then update memory
    pub async fn set_consent(&self, consent: ConsentState) -> Result<()> {
        let mut state = self.state.write().await;
        set_setting(&self.db, KEY_DATA_PROCESSING, consent.data_processing_allowed).await?;
        set_setting(&self.db, KEY_HISTORY_SAVING, consent.history_saving_allowed).await?;
        set_setting(&self.db, KEY_PRIVACY, consent.privacy_consent_given).await?;
        state.consent = consent;
        debug!(?consent, "Consent flags persisted");
        Ok(())
    }

    pub async fn grant_all_consent(&self) -> Result<()> {
        self.set_consent(ConsentState::granted()).await
    }

    /// Settings-page action; nothing in the workflow calls this
    pub async fn revoke_consent(&self) -> Result<()> {
        self.set_consent(ConsentState::default()).await
    }

    pub async fn tip_shown(&self) -> bool {
        self.state.read().await.tip_shown
    }

    pub async fn mark_tip_shown(&self) -> Result<()> {
        let mut state = self.state.write().await;
        set_setting(&self.db, KEY_TIP_SHOWN, "1").await?;
        state.tip_shown = true;
        Ok(())
    }

    pub async fn theme_preference(&self) -> Option<ThemePreference> {
        self.state.read().await.theme
    }

    /// Stored theme, or the default once `ttl` has elapsed since it was set
    pub async fn effective_theme(&self, ttl: Option<chrono::Duration>, now: DateTime<Utc>) -> Theme {
        match (self.theme_preference().await, ttl) {
            (Some(pref), Some(ttl)) if glow_common::time::is_expired(pref.ts, ttl, now) => {
                debug!("Theme preference expired");
                Theme::default()
            }
            (Some(pref), _) => pref.value,
            (None, _) => Theme::default(),
        }
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<()> {
        let pref = ThemePreference {
            value: theme,
            ts: glow_common::time::now(),
        };
        let mut state = self.state.write().await;
        set_setting(&self.db, KEY_THEME, to_json(&pref)?).await?;
        state.theme = Some(pref);
        Ok(())
    }

    pub async fn cached_profile(&self) -> Option<CachedProfile> {
        self.state.read().await.profile.clone()
    }

    pub async fn cache_profile(&self, mut profile: CachedProfile) -> Result<()> {
        profile.cached_at = Some(glow_common::time::now());
        let mut state = self.state.write().await;
        set_setting(&self.db, KEY_PROFILE, to_json(&profile)?).await?;
        state.profile = Some(profile);
        Ok(())
    }

    /// Drop the cached profile (sign-out)
    pub async fn clear_cached_profile(&self) -> Result<()> {
        let mut state = self.state.write().await;
        delete_setting(&self.db, KEY_PROFILE).await?;
        state.profile = None;
        Ok(())
    }

    /// Cache the signed-in user's identity
    ///
    /// Photo and analysis count survive only when the email is unchanged.
    pub async fn cache_session_user(&self, user: &SessionUser) -> Result<()> {
        let mut profile = self
            .cached_profile()
            .await
            .filter(|p| p.email == user.email)
            .unwrap_or_default();
        profile.display_name = user.display_name.clone();
        profile.email = user.email.clone();
        self.cache_profile(profile).await
    }
}

/// Keep the cached profile in step with the session
///
/// Caches on sign-in, clears on sign-out. A session that starts signed out
/// leaves the previous run's cache in place. Ends when the session is dropped.
pub fn spawn_profile_sync(session: &dyn SessionProvider, preferences: Arc<PreferenceStore>) -> JoinHandle<()> {
    let mut users = session.subscribe();
    tokio::spawn(async move {
        let mut was_signed_in = false;
        loop {
            let user = users.borrow_and_update().clone();
            let result = match &user {
                Some(user) => preferences.cache_session_user(user).await,
                None if was_signed_in => preferences.clear_cached_profile().await,
                None => Ok(()),
            };
            was_signed_in = user.is_some();
            match result {
                Ok(()) => debug!(signed_in = was_signed_in, "Cached profile synced"),
                Err(e) => warn!("Failed to sync cached profile: {}", e),
            }
            if users.changed().await.is_err() {
                break;
            }
        }
    })
}

async fn load_flag(db: &SqlitePool, key: &str) -> Result<bool> {
    match get_setting::<bool>(db, key).await {
        Ok(value) => Ok(value.unwrap_or(false)),
        Err(glow_common::Error::InvalidInput(msg)) => {
            warn!("{} (treating as not granted)", msg);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

async fn load_json<T: serde::de::DeserializeOwned>(db: &SqlitePool, key: &str) -> Result<Option<T>> {
    let Some(raw) = get_setting::<String>(db, key).await? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!("Ignoring unreadable setting '{}': {}", key, e);
            Ok(None)
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| glow_common::Error::Internal(e.to_string()))
}
