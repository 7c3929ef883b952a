use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_BASE_URL: &str = "PADEL_API_BASE_URL";
pub const ENV_TIMEOUT_MS: &str = "PADEL_API_TIMEOUT_MS";
pub const ENV_STORAGE_PATH: &str = "PADEL_STORAGE_PATH";
pub const ENV_LOG_LEVEL: &str = "PADEL_LOG_LEVEL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_csrf_path")]
    pub csrf_path: String,
    #[serde(default = "default_csrf_cookie")]
    pub csrf_cookie: String,
    #[serde(default = "default_csrf_header")]
    pub csrf_header: String,
    #[serde(default = "default_login_route")]
    pub login_route: String,
    /// Opt-in per-call timeout. Calls never retry, with or without it.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Where the session store persists. In-memory when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_console")]
    pub console: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            csrf_path: default_csrf_path(),
            csrf_cookie: default_csrf_cookie(),
            csrf_header: default_csrf_header(),
            login_route: default_login_route(),
            timeout_ms: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            console: default_console(),
        }
    }
}

// Default value functions
fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_csrf_path() -> String {
    "/sanctum/csrf-cookie".to_string()
}

fn default_csrf_cookie() -> String {
    "XSRF-TOKEN".to_string()
}

fn default_csrf_header() -> String {
    "X-XSRF-TOKEN".to_string()
}

fn default_login_route() -> String {
    "/".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_console() -> bool {
    false
}

impl ApiConfig {
    /// Parsed base URL. Only meaningful after `Config::validate` succeeded.
    pub fn base(&self) -> Result<Url> {
        Url::parse(&self.base_url).context(format!("Invalid base_url '{}'", self.base_url))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;

        config.validate()?;

        Ok(config)
    }

    /// File (or defaults when no path is given), then process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Override values from environment-style variables supplied by `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.api.base_url = base_url;
        }

        if let Some(timeout) = lookup(ENV_TIMEOUT_MS) {
            let timeout = timeout
                .trim()
                .parse::<u64>()
                .context(format!("{} must be a number of milliseconds", ENV_TIMEOUT_MS))?;
            self.api.timeout_ms = Some(timeout);
        }

        if let Some(path) = lookup(ENV_STORAGE_PATH) {
            self.storage.path = Some(PathBuf::from(path));
        }

        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate api config
        if self.api.base_url.is_empty() {
            bail!("base_url must not be empty");
        }

        let base = self.api.base()?;
        if base.scheme() != "http" && base.scheme() != "https" {
            bail!(
                "base_url must use http or https, got '{}'",
                base.scheme()
            );
        }

        if !self.api.csrf_path.starts_with('/') {
            bail!("csrf_path must start with '/'");
        }

        if self.api.csrf_cookie.is_empty() {
            bail!("csrf_cookie must not be empty");
        }

        if self.api.csrf_header.is_empty() {
            bail!("csrf_header must not be empty");
        }

        if reqwest::header::HeaderName::from_bytes(self.api.csrf_header.as_bytes()).is_err() {
            bail!("csrf_header '{}' is not a valid header name", self.api.csrf_header);
        }

        if !self.api.login_route.starts_with('/') {
            bail!("login_route must start with '/'");
        }

        if self.api.timeout_ms == Some(0) {
            bail!("timeout_ms must be greater than 0");
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            );
        }

        let valid_formats = ["json", "console"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            bail!(
                "Invalid log format '{}'. Must be one of: json, console",
                self.logging.format
            );
        }

        Ok(())
    }
}
