//! Configuration module for moodlebot.
//!
//! Loads typed configuration from `~/.moodlebot/config.json`, then applies
//! process-environment overrides (`MOODLE_URL`, `MOODLE_ADMIN_USERNAME`,
//! `MOODLE_ADMIN_PASSWORD`, `MOODLE_SERVICE_SHORTNAME`). Environment
//! variables always win, so deployments that configure everything through
//! the environment need no config file at all.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Path suffix of the Moodle REST endpoint, relative to the site base URL.
pub const REST_ENDPOINT: &str = "/webservice/rest/server.php";

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub moodle: MoodleConfig,
}

/// Connection settings for the target Moodle site.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MoodleConfig {
    /// Site base URL. Accepts either `https://moodle.example.org` or the
    /// full `.../webservice/rest/server.php` endpoint; the suffix is
    /// stripped on load.
    pub url: String,
    pub admin_username: String,
    pub admin_password: String,
    /// Shortname of the external service the admin token is issued for.
    pub service_shortname: String,
}

impl MoodleConfig {
    /// Normalize `url` so it always holds the site base URL.
    pub fn normalize(&mut self) {
        if let Some(base) = self.url.strip_suffix(REST_ENDPOINT) {
            self.url = base.to_string();
        }
        while self.url.ends_with('/') {
            self.url.pop();
        }
    }

    /// Full URL of the REST endpoint (`server.php`).
    pub fn rest_url(&self) -> String {
        format!("{}{}", self.url, REST_ENDPOINT)
    }

    /// Full URL of the token-exchange endpoint (`login/token.php`).
    pub fn token_url(&self) -> String {
        format!("{}/login/token.php", self.url)
    }
}

impl Config {
    /// Load configuration from the default path (`~/.moodlebot/config.json`),
    /// then apply environment overrides. A missing file is not an error:
    /// the environment alone may carry the whole configuration.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            Config::default()
        };
        config.apply_env();
        config.moodle.normalize();
        Ok(config)
    }

    /// Load configuration from a specific path (no env overrides).
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&content)?;
        config.moodle.normalize();
        Ok(config)
    }

    /// Get the default config file path.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".moodlebot")
            .join("config.json")
    }

    /// Overlay values from the process environment.
    fn apply_env(&mut self) {
        let vars = [
            ("MOODLE_URL", &mut self.moodle.url),
            ("MOODLE_ADMIN_USERNAME", &mut self.moodle.admin_username),
            ("MOODLE_ADMIN_PASSWORD", &mut self.moodle.admin_password),
            (
                "MOODLE_SERVICE_SHORTNAME",
                &mut self.moodle.service_shortname,
            ),
        ];
        for (name, field) in vars {
            if let Ok(value) = std::env::var(name) {
                if !value.is_empty() {
                    *field = value;
                }
            }
        }
    }

    /// Check for missing required settings. Returns the full list of
    /// problems so the CLI can print them all at once.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.moodle.url.is_empty() {
            errors.push("moodle.url is empty (or set MOODLE_URL)".to_string());
        }
        if self.moodle.admin_username.is_empty() {
            errors.push("moodle.adminUsername is empty (or set MOODLE_ADMIN_USERNAME)".to_string());
        }
        if self.moodle.admin_password.is_empty() {
            errors.push("moodle.adminPassword is empty (or set MOODLE_ADMIN_PASSWORD)".to_string());
        }
        if self.moodle.service_shortname.is_empty() {
            errors.push(
                "moodle.serviceShortname is empty (or set MOODLE_SERVICE_SHORTNAME)".to_string(),
            );
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Write the default config template to disk.
    pub fn write_default_template() -> anyhow::Result<PathBuf> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = serde_json::json!({
            "moodle": {
                "url": "https://moodle.example.org",
                "adminUsername": "admin",
                "adminPassword": "CHANGE_ME",
                "serviceShortname": "moodlebot_ws"
            }
        });

        std::fs::write(&path, serde_json::to_string_pretty(&template)?)?;
        Ok(path)
    }
}
