//! Settings file parsing
//!
//! Settings are shared with the shell's other plugins in a single JSON file;
//! ours live under the `libreGlucose` key.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{GlucoseError, Result};
use crate::units::{GlucoseUnit, Thresholds};

/// Key of our section in the shared settings file
const SETTINGS_SECTION: &str = "libreGlucose";

/// Environment variable overriding the settings file location
pub const SETTINGS_ENV: &str = "LIBRE_GLUCOSE_SETTINGS";

/// `version` header sent to the service
pub const DEFAULT_CLIENT_VERSION: &str = "4.16.0";

/// Configuration loaded from the `libreGlucose` settings section
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub username: String,
    pub password: String,
    pub glucose_unit: GlucoseUnit,
    /// mmol/L, whatever the display unit
    pub low_threshold: f64,
    /// mmol/L, whatever the display unit
    pub high_threshold: f64,
    pub client_version: String,
    /// Region to log in at first, skipping the global host
    pub region: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            glucose_unit: GlucoseUnit::MmolL,
            low_threshold: 4.0,
            high_threshold: 10.0,
            client_version: DEFAULT_CLIENT_VERSION.to_string(),
            region: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("glucose_unit", &self.glucose_unit)
            .field("low_threshold", &self.low_threshold)
            .field("high_threshold", &self.high_threshold)
            .field("client_version", &self.client_version)
            .field("region", &self.region)
            .finish()
    }
}

impl Config {
    /// Load configuration from a settings file.
    ///
    /// A missing file or a file without our section yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| GlucoseError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_settings_json(&contents)
    }

    /// Parse the shared settings document and pick out our section
    pub fn from_settings_json(contents: &str) -> Result<Self> {
        let mut settings: serde_json::Value =
            serde_json::from_str(contents).map_err(|e| GlucoseError::Config(e.to_string()))?;

        match settings.get_mut(SETTINGS_SECTION).map(serde_json::Value::take) {
            Some(section) if !section.is_null() => {
                serde_json::from_value(section).map_err(|e| GlucoseError::Config(e.to_string()))
            }
            _ => Ok(Config::default()),
        }
    }

    /// Credentials for login, or `NotConfigured` if either is blank
    pub fn credentials(&self) -> Result<Credentials> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err(GlucoseError::NotConfigured);
        }
        Ok(Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        })
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds::new(self.low_threshold, self.high_threshold)
    }
}

/// LibreLinkUp login credentials
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Directory holding the shell's plugin settings
pub fn get_settings_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("DankMaterialShell")
}

/// Settings file location, honoring the environment override
pub fn settings_file_path() -> PathBuf {
    match std::env::var_os(SETTINGS_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => get_settings_dir().join("plugin_settings.json"),
    }
}
