// Application settings
// Loaded from ~/.config/tally/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api";

/// Overrides `api.base` when set.
pub const API_BASE_ENV: &str = "TALLY_API_BASE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(rename = "api.base")]
    pub api_base: String,

    /// Year used when the filter query has none. `None` = current year.
    #[serde(rename = "filters.defaultYear")]
    pub default_year: Option<i32>,

    /// Keep the login token in auth.json between runs
    #[serde(rename = "auth.rememberToken")]
    pub remember_token: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            default_year: None,
            remember_token: true,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        crate::config_dir().join("settings.json")
    }

    /// Load settings from the default location and apply env overrides.
    /// Writes a commented default file on first run.
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            create_default_file(&path);
        }

        let mut settings = Self::load_from(&path);
        settings.apply_api_base_override(std::env::var(API_BASE_ENV).ok().as_deref());
        settings
    }

    /// Load settings from `path`, falling back to defaults on any error.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&crate::strip_comments(&contents)) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("error parsing {}: {}; using default settings", path.display(), e);
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                log::warn!("error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn apply_api_base_override(&mut self, value: Option<&str>) {
        if let Some(base) = value.map(str::trim).filter(|v| !v.is_empty()) {
            log::debug!("api base overridden by {}", API_BASE_ENV);
            self.api_base = base.to_string();
        }
    }

    /// Path of the saved login token, next to this file.
    pub fn auth_path() -> PathBuf {
        crate::config_dir().join("auth.json")
    }
}

/// Create default settings file with comments
fn create_default_file(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            log::warn!("error creating config directory: {}", e);
            return;
        }
    }

    let default_config = r#"{
    // Backend base URL (TALLY_API_BASE overrides this)
    "api.base": "http://localhost:8000/api",

    // Year shown when no filter is saved; null = current year
    "filters.defaultYear": null,

    // Keep the login token between runs (stored in auth.json, mode 0600)
    "auth.rememberToken": true
}
"#;

    if let Err(e) = fs::write(path, default_config) {
        log::warn!("error writing default settings.json: {}", e);
    }
}
