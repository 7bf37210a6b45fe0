//! glow-analyzer - headless driver for the analysis workflow
//!
//! Runs the Capture-Analyze-Render flow from a terminal: the image comes from
//! a file (no camera on a console), consent, tips and sign-in are asked on
//! stdin, and the report is printed to stdout. Logs go to stderr or the
//! configured log file.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use glow_common::config::{LoggingConfig, RootFolderResolver};
use glow_common::db::init_database;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use glow_analyzer::capture::{CaptureSettings, MediaAcquisition, NoCamera};
use glow_analyzer::config::MODULE_NAME;
use glow_analyzer::console::{ConsoleCredentials, ConsolePrompts, PathPicker};
use glow_analyzer::models::{DashboardSnapshot, RegistrationRange, StoredAnalysis};
use glow_analyzer::preferences::{spawn_profile_sync, Theme};
use glow_analyzer::services::{AdminClient, DashboardPoller, HistoryClient};
use glow_analyzer::session::{SessionProvider, SessionUser, StaticSession};
use glow_analyzer::{
    AbortReason, AnalysisReport, AnalyzerConfig, AnalyzerEvent, AnalyzerEventBus, AnalyzerWorkflow,
    PreferenceStore, Prompts, SubmissionOrchestrator, Trigger,
};

/// Bearer token for the authenticated endpoints
const ID_TOKEN_ENV: &str = "GLOW_ID_TOKEN";
/// User id paired with `GLOW_ID_TOKEN`
const USER_ID_ENV: &str = "GLOW_USER_ID";

const DATABASE_FILE: &str = "glow.db";

/// Command-line arguments for glow-analyzer
#[derive(Parser, Debug)]
#[command(name = "glow-analyzer")]
#[command(about = "Skin analysis client: capture, analyze, render")]
#[command(version)]
struct Args {
    /// Data folder holding the settings database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a face photo
    Analyze {
        /// Image file (jpeg, png, webp, gif, bmp)
        #[arg(short, long)]
        image: PathBuf,
    },
    /// Show a stored analysis
    History {
        /// Analysis id
        id: String,
    },
    /// Show admin dashboard statistics
    Dashboard {
        /// Registration chart bucket (daily, weekly, monthly)
        #[arg(short = 'g', long, default_value = "daily")]
        range: RegistrationRange,
        /// Keep refreshing until Ctrl+C
        #[arg(short, long)]
        watch: bool,
        /// Only list users whose name or email contains this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show or change consent flags
    Consent {
        #[arg(value_enum)]
        action: ConsentAction,
    },
    /// Show or change the UI theme preference
    Theme {
        #[arg(value_enum)]
        action: ThemeAction,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ConsentAction {
    Grant,
    Revoke,
    Show,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ThemeAction {
    Light,
    Dark,
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (config, config_notes) = AnalyzerConfig::load();

    init_tracing(&config.logging)?;
    info!(
        "Starting glow-analyzer v{}",
        env!("CARGO_PKG_VERSION")
    );
    for note in &config_notes {
        note.emit();
    }

    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder.clone())
        .with_toml_root(config.root_folder.clone())
        .resolve();
    let db_path = root_folder.join(DATABASE_FILE);
    info!("Database path: {}", db_path.display());

    let db = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open settings database {}", db_path.display()))?;
    let preferences = Arc::new(
        PreferenceStore::load(db)
            .await
            .context("Failed to load preferences")?,
    );

    match args.command {
        Command::Analyze { image } => analyze(&config, preferences, image).await,
        Command::History { id } => history(&config, preferences, &id).await,
        Command::Dashboard {
            range,
            watch,
            search,
        } => dashboard(&config, range, watch, search.as_deref()).await,
        Command::Consent { action } => consent(&preferences, action).await,
        Command::Theme { action } => theme(&config, &preferences, action).await,
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    // RUST_LOG wins over the TOML level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
    Ok(())
}

/// Session from `GLOW_ID_TOKEN`, otherwise signed out with a console sign-in
fn session_from_env() -> Arc<dyn SessionProvider> {
    match std::env::var(ID_TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => {
            let uid = std::env::var(USER_ID_ENV).unwrap_or_else(|_| "local".to_string());
            info!(uid = %uid, "Using bearer token from environment");
            Arc::new(StaticSession::signed_in(
                SessionUser {
                    uid,
                    email: None,
                    display_name: None,
                },
                token.trim(),
            ))
        }
        _ => Arc::new(StaticSession::signed_out(Some(Box::new(ConsoleCredentials)))),
    }
}

async fn analyze(config: &AnalyzerConfig, preferences: Arc<PreferenceStore>, image_path: PathBuf) -> Result<()> {
    let acquisition = MediaAcquisition::new(Arc::new(NoCamera), CaptureSettings::from(config));
    let Some(image) = acquisition.acquire(&PathPicker::new(&image_path)).await? else {
        bail!("No image selected from {}", image_path.display());
    };

    let events = AnalyzerEventBus::new(64);
    let mut progress = events.subscribe();
    let progress_task = tokio::spawn(async move {
        while let Ok(event) = progress.recv().await {
            match event {
                AnalyzerEvent::EndpointAttempt { endpoint, .. } => {
                    eprintln!("Analyzing via {}...", endpoint)
                }
                other => debug!(?other, "Workflow event"),
            }
        }
    });

    if let Some(profile) = preferences.cached_profile().await {
        if let Some(name) = profile.display_name.or(profile.email) {
            eprintln!("Last signed in as {}", name);
        }
    }

    let session = session_from_env();
    let profile_sync = spawn_profile_sync(session.as_ref(), preferences.clone());

    let prompts = Prompts {
        consent: Arc::new(ConsolePrompts),
        tip: Arc::new(ConsolePrompts),
    };
    let orchestrator = SubmissionOrchestrator::from_config(
        config,
        preferences,
        session,
        prompts,
        events.clone(),
    )?;

    let mut workflow = AnalyzerWorkflow::new(orchestrator);
    workflow.set_image(image);

    match workflow.analyze(Trigger::Manual).await {
        Ok(Some(report)) => print_report(report),
        Ok(None) => {}
        Err(aborted) if aborted.reason() == AbortReason::ConsentNotSaved => {
            eprintln!("Consent could not be saved; nothing was submitted")
        }
        Err(aborted) => println!("Analysis cancelled ({})", aborted.reason()),
    }

    drop(workflow);
    drop(events);
    let _ = progress_task.await;
    let _ = profile_sync.await;
    Ok(())
}

async fn history(config: &AnalyzerConfig, preferences: Arc<PreferenceStore>, id: &str) -> Result<()> {
    let session = session_from_env();
    let profile_sync = spawn_profile_sync(session.as_ref(), preferences);
    let client = HistoryClient::new(config.history_base_url.clone(), session, config.request_timeout())?;
    let analysis = client.fetch_analysis(id).await;

    drop(client);
    let _ = profile_sync.await;
    print_stored(&analysis?);
    Ok(())
}

async fn dashboard(config: &AnalyzerConfig, range: RegistrationRange, watch: bool, search: Option<&str>) -> Result<()> {
    let client = AdminClient::new(config.admin_base_url.clone(), config.request_timeout())?;

    if !watch {
        let snapshot = client.snapshot(range).await?;
        print_dashboard(&snapshot, search);
        return Ok(());
    }

    let poller = DashboardPoller::spawn(client, range, config.dashboard_refresh());
    let mut snapshots = poller.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(snapshot) = snapshots.borrow_and_update().as_ref() {
                    print_dashboard(snapshot, search);
                }
            }
        }
    }
    poller.stop().await;
    Ok(())
}

async fn consent(preferences: &PreferenceStore, action: ConsentAction) -> Result<()> {
    match action {
        ConsentAction::Grant => preferences.grant_all_consent().await?,
        ConsentAction::Revoke => preferences.revoke_consent().await?,
        ConsentAction::Show => {}
    }

    let state = preferences.consent().await;
    println!("data processing: {}", state.data_processing_allowed);
    println!("history saving:  {}", state.history_saving_allowed);
    println!("privacy:         {}", state.privacy_consent_given);
    println!("analysis allowed: {}", state.all_granted());
    Ok(())
}

async fn theme(config: &AnalyzerConfig, preferences: &PreferenceStore, action: ThemeAction) -> Result<()> {
    match action {
        ThemeAction::Light => preferences.set_theme(Theme::Light).await?,
        ThemeAction::Dark => preferences.set_theme(Theme::Dark).await?,
        ThemeAction::Show => {}
    }

    println!("{}", preferences.effective_theme(config.theme_ttl(), Utc::now()).await);
    Ok(())
}

fn print_report(report: &AnalysisReport) {
    if report.is_fallback() {
        println!("(analysis service unavailable; showing a sample report)");
    }
    println!("Score: {}/100 ({:?})", report.portrait_score, report.score_band());

    if !report.snapshot_overview.is_empty() {
        println!("\nSnapshot");
        for (key, value) in &report.snapshot_overview {
            println!("  {:<22} {}", key.replace('_', " "), value);
        }
    }
    if !report.feature_analysis.is_empty() {
        println!("\nFeatures");
        for (key, value) in &report.feature_analysis {
            println!("  {:<22} {}", key.replace('_', " "), value);
        }
    }
    if !report.recommendations.is_empty() {
        println!("\nRecommendations");
        for (i, text) in report.recommendations.iter().enumerate() {
            println!("  {}. {}", i + 1, text);
        }
    }
    if !report.products.is_empty() {
        println!("\nProducts");
        for product in &report.products {
            match &product.kind {
                Some(kind) => println!("  - {} ({})", product.name, kind),
                None => println!("  - {}", product.name),
            }
        }
    }
    if let Some(id) = &report.analysis_id {
        println!("\nAnalysis id: {}", id);
    }
}

fn print_stored(analysis: &StoredAnalysis) {
    match analysis.created_at() {
        Some(at) => println!("Analysis {} ({})", analysis.id, at.format("%Y-%m-%d %H:%M")),
        None => println!("Analysis {}", analysis.id),
    }
    if let Some(url) = &analysis.report.image_url {
        println!("Image: {}", url);
    }
    print_report(&analysis.report);
}

fn print_dashboard(snapshot: &DashboardSnapshot, search: Option<&str>) {
    println!(
        "[{}] users {} (active {}, {:.0}%), analyses {} ({:.1}/user), today {}, registrations {}",
        snapshot.fetched_at.format("%H:%M:%S"),
        snapshot.summary.total_users,
        snapshot.summary.active_users,
        snapshot.active_ratio() * 100.0,
        snapshot.total_analyses,
        snapshot.average_analyses_per_user(),
        snapshot.today_users.len(),
        snapshot.registrations_in_range(),
    );

    if let Some(query) = search {
        for user in snapshot.filter_users(query) {
            println!(
                "  {:<24} {:<32} {}",
                user.name.as_deref().unwrap_or("-"),
                user.email.as_deref().unwrap_or("-"),
                user.analysis_count.unwrap_or(0)
            );
        }
    }
}
