//! Console implementations of the presentation collaborators
//!
//! Used by the headless binary. Every prompt reads one line from stdin on the
//! blocking pool; end of input counts as cancel/decline.

use crate::capture::{mime_for_path, FilePicker};
use crate::consent::{ConsentDecision, ConsentPrompt, TipDecision, TipPrompt};
use crate::session::{CredentialSource, SessionUser};
use async_trait::async_trait;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::warn;

const CONSENT_TEXT: &str = "\
Before analyzing, we need your permission to:
  - process your photo to produce a skin report
  - save the analysis to your history
  - handle your data under the privacy policy";

const TIP_TEXT: &str = "\
For the best results:
  - face the camera directly in even, natural light
  - remove glasses and pull hair away from your face
  - use a clean face without heavy makeup";

/// Print `prompt` and read one trimmed line; `None` on EOF or read error
async fn read_line(prompt: String) -> Option<String> {
    let result = tokio::task::spawn_blocking(move || {
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "{}", prompt);
        let _ = stdout.flush();

        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line.trim().to_string()),
            Err(e) => {
                warn!("Failed to read from stdin: {}", e);
                None
            }
        }
    })
    .await;

    match result {
        Ok(line) => line,
        Err(e) => {
            warn!("Console prompt task failed: {}", e);
            None
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Consent and tip prompts on the terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePrompts;

#[async_trait]
impl ConsentPrompt for ConsolePrompts {
    async fn present(&self) -> ConsentDecision {
        println!("{}", CONSENT_TEXT);
        match read_line("Accept? [y/N] ".to_string()).await {
            Some(answer) if is_yes(&answer) => {
                let acknowledged = read_line("I have read and understood the above [y/N] ".to_string())
                    .await
                    .is_some_and(|a| is_yes(&a));
                ConsentDecision::Accept { acknowledged }
            }
            _ => ConsentDecision::Decline,
        }
    }
}

#[async_trait]
impl TipPrompt for ConsolePrompts {
    async fn present(&self) -> TipDecision {
        println!("{}", TIP_TEXT);
        match read_line("Continue? [Y/n] ".to_string()).await {
            Some(answer) if answer.is_empty() || is_yes(&answer) => TipDecision::Proceed,
            _ => TipDecision::Dismiss,
        }
    }
}

/// Asks for a user id and bearer token on the terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleCredentials;

#[async_trait]
impl CredentialSource for ConsoleCredentials {
    async fn request_credentials(&self) -> Option<(SessionUser, String)> {
        println!("Sign-in required (leave empty to cancel)");
        let uid = read_line("User id: ".to_string()).await.filter(|s| !s.is_empty())?;
        let token = read_line("ID token: ".to_string()).await.filter(|s| !s.is_empty())?;

        Some((
            SessionUser {
                uid,
                email: None,
                display_name: None,
            },
            token,
        ))
    }
}

/// File picker answering with a path chosen up front
#[derive(Debug, Clone)]
pub struct PathPicker {
    path: PathBuf,
}

impl PathPicker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FilePicker for PathPicker {
    async fn pick(&self) -> Option<(Vec<u8>, String)> {
        let Some(mime) = mime_for_path(&self.path) else {
            warn!(path = %self.path.display(), "Unrecognized image extension");
            return None;
        };
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Some((bytes, mime.to_string())),
            Err(e) => {
                warn!(path = %self.path.display(), "Failed to read image: {}", e);
                None
            }
        }
    }
}
