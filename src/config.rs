//! Loading service settings from TOML, then applying environment overrides.
//!
//! See `Settings` for the expected schema. Every field has a default, so an
//! empty file (or no file at all) yields a runnable local setup.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct Settings {
  #[serde(default)]
  pub server: ServerSettings,
  #[serde(default)]
  pub catalog: CatalogSettings,
  #[serde(default)]
  pub oracles: OracleSettings,
  #[serde(default)]
  pub auth: AuthSettings,
  #[serde(default)]
  pub store: StoreSettings,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
  pub port: u16,
}

impl Default for ServerSettings {
  fn default() -> Self {
    Self { port: 8080 }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
  pub words_path: PathBuf,
  pub tasks_path: PathBuf,
}

impl Default for CatalogSettings {
  fn default() -> Self {
    Self {
      words_path: PathBuf::from("data/words.json"),
      tasks_path: PathBuf::from("data/tasks_for_model.json"),
    }
  }
}

/// Endpoints of the fill-mask distractor model and the speech recognizer.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct OracleSettings {
  pub distractor_url: String,
  pub transcription_url: String,
  pub timeout_secs: u64,
}

impl Default for OracleSettings {
  fn default() -> Self {
    Self {
      distractor_url: "http://127.0.0.1:8000/predict/".into(),
      transcription_url: "http://127.0.0.1:8001/transcribe".into(),
      timeout_secs: 20,
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
  pub session_ttl_hours: i64,
}

impl Default for AuthSettings {
  fn default() -> Self {
    Self { session_ttl_hours: 72 }
  }
}

#[derive(Clone, Debug, Deserialize, Default)]
#[serde(default)]
pub struct StoreSettings {
  /// When set, the user store is loaded from and snapshotted to this JSON file.
  pub snapshot_path: Option<PathBuf>,
}

impl Settings {
  /// TOML from APP_CONFIG_PATH (defaults on any IO/parse error), then env overrides.
  pub fn load() -> Self {
    let mut settings = load_settings_file_from_env().unwrap_or_default();
    settings.apply_env(|key| std::env::var(key).ok());
    settings
  }

  /// Apply overrides from a key lookup. Unparsable numeric values are ignored.
  pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(port) = lookup("PORT").and_then(|p| p.parse::<u16>().ok()) {
      self.server.port = port;
    }
    if let Some(p) = lookup("WORDS_PATH") {
      self.catalog.words_path = PathBuf::from(p);
    }
    if let Some(p) = lookup("TASKS_PATH") {
      self.catalog.tasks_path = PathBuf::from(p);
    }
    if let Some(url) = lookup("DISTRACTOR_URL") {
      self.oracles.distractor_url = url;
    }
    if let Some(url) = lookup("TRANSCRIBE_URL") {
      self.oracles.transcription_url = url;
    }
    if let Some(secs) = lookup("ORACLE_TIMEOUT_SECS").and_then(|s| s.parse::<u64>().ok()) {
      self.oracles.timeout_secs = secs;
    }
    if let Some(hours) = lookup("SESSION_TTL_HOURS").and_then(|s| s.parse::<i64>().ok()) {
      self.auth.session_ttl_hours = hours;
    }
    if let Some(p) = lookup("STORE_SNAPSHOT_PATH") {
      self.store.snapshot_path = Some(PathBuf::from(p));
    }
  }
}

/// Attempt to load `Settings` from APP_CONFIG_PATH. On any parsing/IO error, returns None.
fn load_settings_file_from_env() -> Option<Settings> {
  let path = std::env::var("APP_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<Settings>(&s) {
      Ok(cfg) => {
        info!(target: "vocab_trainer", %path, "Loaded settings (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "vocab_trainer", %path, error = %e, "Failed to parse TOML settings");
        None
      }
    },
    Err(e) => {
      error!(target: "vocab_trainer", %path, error = %e, "Failed to read TOML settings file");
      None
    }
  }
}
