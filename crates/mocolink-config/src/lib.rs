//! Preference storage for the mocolink workspace.
//!
//! A small TOML file under the platform config directory remembers
//! which service the consumer last talked to and through which
//! adapter, so a restart can offer to skip adapter discovery.
//! Loading layers defaults, the file, and `MOCOLINK_*` environment
//! variables; the core crate never touches disk itself.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use mocolink_core::SessionConfig;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to serialize preferences: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("preference loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Preferences ─────────────────────────────────────────────────────

/// Persisted user preferences.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Preferences {
    /// Host running the link adapter service.
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Service port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Adapter id used in the last run, if any. Lets the next run
    /// offer [`attach_connected_adapter`] straight away.
    ///
    /// [`attach_connected_adapter`]: mocolink_core::Session::attach_connected_adapter
    #[serde(default)]
    pub last_adapter: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            hostname: default_hostname(),
            port: default_port(),
            last_adapter: None,
        }
    }
}

fn default_hostname() -> String {
    "localhost".into()
}
fn default_port() -> u16 {
    8080
}

impl Preferences {
    /// Translate into a core session config with default intervals.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.hostname.clone(), self.port)
    }
}

// ── Paths ───────────────────────────────────────────────────────────

/// Canonical path of the preferences file.
pub fn preferences_path() -> PathBuf {
    ProjectDirs::from("com", "mocolink", "mocolink").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("preferences.toml");
            p
        },
        |dirs| dirs.config_dir().join("preferences.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("mocolink");
    p
}

// ── Loading / saving ────────────────────────────────────────────────

/// Load preferences from a specific file + environment.
pub fn load_preferences_from(path: &Path) -> Result<Preferences, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Preferences::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("MOCOLINK_"));

    Ok(figment.extract()?)
}

/// Load preferences from the canonical path + environment.
pub fn load_preferences() -> Result<Preferences, ConfigError> {
    load_preferences_from(&preferences_path())
}

/// Load preferences, falling back to defaults on any failure.
pub fn load_preferences_or_default() -> Preferences {
    load_preferences().unwrap_or_default()
}

/// Serialize preferences to TOML at a specific path.
pub fn save_preferences_to(prefs: &Preferences, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(prefs)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Serialize preferences to the canonical path.
pub fn save_preferences(prefs: &Preferences) -> Result<(), ConfigError> {
    save_preferences_to(prefs, &preferences_path())
}
