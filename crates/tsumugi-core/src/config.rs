use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::TsumugiError;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub cache: CacheConfig,
    pub content: ContentConfig,
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    pub redis_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Default for the `isAdult` search filter.
    pub nsfw: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub default: String,
}

impl AppConfig {
    /// Load config: user file (if exists) merged over built-in defaults,
    /// then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, TsumugiError> {
        let mut config = Self::load_file(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load the user file (explicit path or platform default) over the
    /// built-in defaults. An explicit path that does not exist is an error.
    pub fn load_file(path: Option<&Path>) -> Result<Self, TsumugiError> {
        let user_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::config_path);

        if user_path.exists() {
            tracing::info!(path = %user_path.display(), "loading config file");
            let user_str = std::fs::read_to_string(&user_path)?;
            Self::from_toml_over_defaults(&user_str)
        } else if path.is_some() {
            Err(TsumugiError::Config(format!(
                "config file not found: {}",
                user_path.display()
            )))
        } else {
            Self::defaults()
        }
    }

    /// Parse a (possibly partial) TOML document on top of the built-in defaults.
    pub fn from_toml_over_defaults(user: &str) -> Result<Self, TsumugiError> {
        let mut base: toml::Table =
            toml::from_str(DEFAULT_CONFIG).map_err(|e| TsumugiError::Config(e.to_string()))?;
        let overlay: toml::Table =
            toml::from_str(user).map_err(|e| TsumugiError::Config(e.to_string()))?;
        merge_tables(&mut base, overlay);

        toml::Value::Table(base)
            .try_into()
            .map_err(|e: toml::de::Error| TsumugiError::Config(e.to_string()))
    }

    fn defaults() -> Result<Self, TsumugiError> {
        toml::from_str(DEFAULT_CONFIG).map_err(|e| TsumugiError::Config(e.to_string()))
    }

    /// Apply the deployment environment variables (`PORT`, `REDIS_URL`,
    /// `NSFW`, `ANILIST_ENDPOINT`).
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("PORT").and_then(|p| p.trim().parse().ok()) {
            self.server.port = port;
        }
        if let Some(url) = lookup("REDIS_URL").filter(|u| !u.trim().is_empty()) {
            self.cache.redis_url = Some(url);
        }
        if let Some(nsfw) = lookup("NSFW") {
            self.content.nsfw = parse_flag(&nsfw);
        }
        if let Some(endpoint) = lookup("ANILIST_ENDPOINT").filter(|e| !e.trim().is_empty()) {
            self.upstream.endpoint = endpoint;
        }
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.timeout_secs)
    }

    /// Path to user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("", "", "tsumugi")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config is valid TOML")
    }
}

/// `true`/`1` (case-insensitive) are on, everything else is off.
pub fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("true") || value == "1"
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        if let toml::Value::Table(incoming) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, incoming);
                continue;
            }
            base.insert(key, toml::Value::Table(incoming));
        } else {
            base.insert(key, value);
        }
    }
}
