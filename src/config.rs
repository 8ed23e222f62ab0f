use crate::listing::Timings;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_API_URL: &str = "REPORTSHARE_API_URL";
const ENV_STORAGE_DOMAIN: &str = "REPORTSHARE_STORAGE_DOMAIN";
const ENV_TOKEN: &str = "REPORTSHARE_TOKEN";
const ENV_PAGE_SIZE: &str = "REPORTSHARE_PAGE_SIZE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the REST API (`<api_url>/files`).
    pub api_url: String,
    /// Prefix turning storage keys into fetchable URLs.
    pub storage_domain: String,
    /// Bearer token. Usually supplied through the environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub page_size: u32,
    pub search_debounce_ms: u64,
    pub fetch_debounce_ms: u64,
    pub stale_time_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000".to_string(),
            storage_domain: String::new(),
            token: None,
            page_size: 10,
            search_debounce_ms: 500,
            fetch_debounce_ms: 300,
            stale_time_secs: 300,
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// `<config dir>/reportshare/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "reportshare").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Defaults, then the config file, then environment overrides.
    ///
    /// A missing file is fine; an unreadable or malformed one is an error.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(PathBuf::from(shellexpand::tilde(p).to_string())),
            None => Self::default_path(),
        };
        let mut config = match path {
            Some(p) if p.exists() => Self::from_file(&p)?,
            _ => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup(ENV_API_URL) {
            self.api_url = v;
        }
        if let Some(v) = lookup(ENV_STORAGE_DOMAIN) {
            self.storage_domain = v;
        }
        if let Some(v) = lookup(ENV_TOKEN).filter(|t| !t.trim().is_empty()) {
            self.token = Some(v);
        }
        if let Some(n) = lookup(ENV_PAGE_SIZE).and_then(|v| v.trim().parse::<u32>().ok()) {
            self.page_size = n;
        }
    }

    pub fn timings(&self) -> Timings {
        Timings {
            search_debounce: Duration::from_millis(self.search_debounce_ms),
            fetch_debounce: Duration::from_millis(self.fetch_debounce_ms),
            stale_time: Duration::from_secs(self.stale_time_secs),
            page_size: self.page_size.max(1),
        }
    }

    /// TOML rendering with the token left out.
    pub fn to_toml(&self) -> Result<String> {
        let redacted = Self {
            token: None,
            ..self.clone()
        };
        toml::to_string_pretty(&redacted).context("Failed to render config")
    }
}
