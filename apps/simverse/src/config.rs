use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::{anyhow, Context};
use client_core::{DEFAULT_ENDPOINT, DEFAULT_IMAGE};

pub const DEFAULT_CONFIG_FILE: &str = "simverse.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub endpoint: String,
    pub log_filter: String,
    pub default_image: String,
    pub response_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            log_filter: "info".into(),
            default_image: DEFAULT_IMAGE.into(),
            response_timeout_secs: 10,
        }
    }
}

impl Settings {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }

    /// Apply a flat `key = "value"` table.
    pub fn apply_file(&mut self, raw: &str) -> anyhow::Result<()> {
        let file_cfg = toml::from_str::<HashMap<String, String>>(raw)
            .context("config file must be a flat table of string values")?;
        if let Some(v) = file_cfg.get("endpoint") {
            self.endpoint = v.clone();
        }
        if let Some(v) = file_cfg.get("log_filter") {
            self.log_filter = v.clone();
        }
        if let Some(v) = file_cfg.get("default_image") {
            self.default_image = v.clone();
        }
        if let Some(v) = file_cfg.get("response_timeout_secs") {
            self.response_timeout_secs = v
                .parse()
                .with_context(|| format!("invalid response_timeout_secs '{v}'"))?;
        }
        Ok(())
    }

    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("SIMVERSE_ENDPOINT") {
            self.endpoint = v;
        }
        if let Some(v) = var("APP__ENDPOINT") {
            self.endpoint = v;
        }

        if let Some(v) = var("SIMVERSE_LOG") {
            self.log_filter = v;
        }
        if let Some(v) = var("APP__LOG_FILTER") {
            self.log_filter = v;
        }

        if let Some(v) = var("APP__DEFAULT_IMAGE") {
            self.default_image = v;
        }

        if let Some(v) = var("APP__RESPONSE_TIMEOUT_SECS") {
            if let Ok(parsed) = v.parse::<u64>() {
                self.response_timeout_secs = parsed;
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        client_core::transport::validate_endpoint(&self.endpoint)?;
        if self.response_timeout_secs == 0 {
            return Err(anyhow!("response_timeout_secs must be greater than zero"));
        }
        Ok(())
    }
}

/// Defaults, then `path` if it exists, then the process environment.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        settings
            .apply_file(&raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
    }

    settings.apply_env(|key| std::env::var(key).ok());
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
