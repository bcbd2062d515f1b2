//! TOML-based application configuration.
//!
//! Stores the attendance API endpoint and the working-time policy knobs.
//! Configuration lives at `~/.config/punchcard/config.toml`; the
//! `PUNCHCARD_API_URL` and `PUNCHCARD_ACCESS_TOKEN` environment variables
//! override the file.

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::session::EnginePolicy;

/// Attendance API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token attached to every request when present.
    #[serde(default)]
    pub access_token: Option<String>,
}

/// Working-time policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Hours in a standard workday; time beyond it counts as overtime.
    #[serde(default = "default_standard_work_hours")]
    pub standard_work_hours: u32,
    /// An open session older than this many hours is a missed clock-out.
    #[serde(default = "default_missed_clock_out_hours")]
    pub missed_clock_out_hours: u32,
    /// Ask for confirmation before issuing a transition command.
    #[serde(default = "default_true")]
    pub confirm_transitions: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/punchcard/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
}

fn default_base_url() -> String {
    "http://localhost:4000/api/".into()
}
fn default_standard_work_hours() -> u32 {
    8
}
fn default_missed_clock_out_hours() -> u32 {
    12
}
fn default_true() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            access_token: None,
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            standard_work_hours: default_standard_work_hours(),
            missed_clock_out_hours: default_missed_clock_out_hours(),
            confirm_transitions: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            policy: PolicyConfig::default(),
        }
    }
}

impl Config {
    /// Load the configuration, falling back to defaults when no file
    /// exists and applying environment overrides on top.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::path()?)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, raw).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Translate the policy section into engine terms.
    pub fn engine_policy(&self) -> EnginePolicy {
        EnginePolicy {
            standard_work_secs: u64::from(self.policy.standard_work_hours) * 3600,
            missed_clock_out_after: Duration::hours(i64::from(self.policy.missed_clock_out_hours)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("PUNCHCARD_API_URL") {
            if !url.is_empty() {
                self.api.base_url = url;
            }
        }
        if let Ok(token) = std::env::var("PUNCHCARD_ACCESS_TOKEN") {
            if !token.is_empty() {
                self.api.access_token = Some(token);
            }
        }
    }
}

/// Returns `~/.config/punchcard[-dev]/` based on PUNCHCARD_ENV.
///
/// Set PUNCHCARD_ENV=dev to use a development data directory.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("PUNCHCARD_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("punchcard-dev")
    } else {
        base_dir.join("punchcard")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::LoadFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
