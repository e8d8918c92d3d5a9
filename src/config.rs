//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::dashboard::{ControllerConfig, RefreshPolicy};
use crate::store::SupabaseConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote store connection
///
/// Persistence is enabled only when both `url` and `anon_key` are non-empty.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub anon_key: String,

    #[serde(default = "default_schema")]
    pub schema: String,

    #[serde(default = "default_table")]
    pub table: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_table() -> String {
    "leads".to_string()
}

fn default_request_timeout() -> u64 {
    10_000
}

fn default_heartbeat_interval() -> u64 {
    25
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            schema: default_schema(),
            table: default_table(),
            request_timeout_ms: default_request_timeout(),
            heartbeat_interval_secs: default_heartbeat_interval(),
        }
    }
}

impl StoreConfig {
    /// Both connection values present
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.anon_key.trim().is_empty()
    }

    pub fn to_supabase(&self) -> SupabaseConfig {
        SupabaseConfig {
            url: self.url.trim().to_string(),
            anon_key: self.anon_key.trim().to_string(),
            schema: self.schema.clone(),
            table: self.table.clone(),
            request_timeout_ms: self.request_timeout_ms,
            heartbeat_interval_secs: self.heartbeat_interval_secs,
        }
    }
}

/// Dashboard controller settings
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub refresh_policy: RefreshPolicy,

    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
    64
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_policy: RefreshPolicy::default(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl DashboardConfig {
    pub fn controller(&self) -> ControllerConfig {
        ControllerConfig {
            refresh_policy: self.refresh_policy,
            event_capacity: self.event_capacity,
        }
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths: Vec<PathBuf> = [
            dirs::config_dir().map(|p| p.join("leadboard").join("config.toml")),
            Some(PathBuf::from("/etc/leadboard/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self::load_first(&config_paths)
    }

    /// Load the first candidate that exists and parses; a broken file is
    /// logged and skipped
    pub fn load_first(config_paths: &[PathBuf]) -> Self {
        for path_opt in config_paths {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Load from an explicit path if given, otherwise from default locations
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_with_env(path),
            None => Ok(Self::load_default()),
        }
    }

    fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any variable source
    ///
    /// Empty values count as unset, so an empty `LEADBOARD_STORE_URL` still
    /// lets `SUPABASE_URL` through.
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |primary: &str, fallback: Option<&str>| {
            lookup(primary)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| fallback.and_then(&lookup).filter(|v| !v.trim().is_empty()))
        };

        // Store overrides
        if let Some(url) = var("LEADBOARD_STORE_URL", Some("SUPABASE_URL")) {
            self.store.url = url;
        }
        if let Some(key) = var("LEADBOARD_STORE_KEY", Some("SUPABASE_ANON_KEY")) {
            self.store.anon_key = key;
        }
        if let Some(table) = var("LEADBOARD_STORE_TABLE", None) {
            self.store.table = table;
        }

        // Dashboard overrides
        if let Some(policy) = var("LEADBOARD_REFRESH_POLICY", None) {
            match policy.parse() {
                Ok(p) => self.dashboard.refresh_policy = p,
                Err(e) => tracing::warn!("Ignoring LEADBOARD_REFRESH_POLICY: {}", e),
            }
        }

        // Server overrides
        if let Some(host) = var("LEADBOARD_HOST", None) {
            self.server.host = host;
        }
        if let Some(port) = var("LEADBOARD_PORT", None) {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        // Logging overrides
        if let Some(level) = var("LEADBOARD_LOG_LEVEL", None) {
            self.logging.level = level;
        }
        if let Some(format) = var("LEADBOARD_LOG_FORMAT", None) {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Leadboard Configuration
#
# Environment variables override these settings:
# - LEADBOARD_STORE_URL (or SUPABASE_URL)
# - LEADBOARD_STORE_KEY (or SUPABASE_ANON_KEY)
# - LEADBOARD_STORE_TABLE
# - LEADBOARD_REFRESH_POLICY
# - LEADBOARD_HOST
# - LEADBOARD_PORT
# - LEADBOARD_LOG_LEVEL
# - LEADBOARD_LOG_FORMAT

[store]
# Project URL and anonymous key. Leave either empty to run without persistence.
url = ""
anon_key = ""

# Schema and table holding the leads
schema = "public"
table = "leads"

# HTTP request timeout (ms)
request_timeout_ms = 10000

# Realtime socket heartbeat interval (seconds)
heartbeat_interval_secs = 25

[dashboard]
# What to do on a change notification: "full_reload" or "delta_patch"
refresh_policy = "full_reload"

# Buffered dashboard events per observer
event_capacity = 64

[server]
# API server host
host = "0.0.0.0"

# API server port
port = 8090

# Allowed CORS origins
cors_origins = ["http://localhost:5173", "http://127.0.0.1:5173"]

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(!config.store.is_configured());
        assert_eq!(config.store.table, "leads");
        assert_eq!(config.dashboard.refresh_policy, RefreshPolicy::FullReload);
        assert_eq!(config.server.port, 8090);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_generated_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert!(!config.store.is_configured());
        assert_eq!(config.store.heartbeat_interval_secs, 25);
        assert_eq!(config.dashboard.event_capacity, 64);
        assert_eq!(config.server.cors_origins.len(), 2);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[store]
url = "https://abc.supabase.co"
anon_key = "anon"

[dashboard]
refresh_policy = "delta_patch"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert!(config.store.is_configured());
        assert_eq!(config.store.schema, "public");
        assert_eq!(config.dashboard.refresh_policy, RefreshPolicy::DeltaPatch);
        assert_eq!(config.server.host, "0.0.0.0");

        let supabase = config.store.to_supabase();
        assert_eq!(supabase.url, "https://abc.supabase.co");
        assert_eq!(supabase.table, "leads");
    }

    #[test]
    fn test_load_errors() {
        let missing = Config::load(Path::new("/nonexistent/leadboard.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = \"not a port\"").unwrap();
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env_overrides_from(lookup(&[
            ("LEADBOARD_STORE_URL", "https://abc.supabase.co"),
            ("LEADBOARD_STORE_KEY", "anon"),
            ("LEADBOARD_REFRESH_POLICY", "delta"),
            ("LEADBOARD_PORT", "9000"),
            ("LEADBOARD_LOG_FORMAT", "json"),
        ]));

        assert!(config.store.is_configured());
        assert_eq!(config.dashboard.refresh_policy, RefreshPolicy::DeltaPatch);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_env_fallback_names() {
        let mut config = Config::default();
        config.apply_env_overrides_from(lookup(&[
            ("LEADBOARD_STORE_URL", ""),
            ("SUPABASE_URL", "https://fallback.supabase.co"),
            ("SUPABASE_ANON_KEY", "fallback-key"),
        ]));

        assert_eq!(config.store.url, "https://fallback.supabase.co");
        assert_eq!(config.store.anon_key, "fallback-key");
    }

    #[test]
    fn test_bad_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_env_overrides_from(lookup(&[
            ("LEADBOARD_PORT", "not-a-port"),
            ("LEADBOARD_REFRESH_POLICY", "sometimes"),
        ]));

        assert_eq!(config.server.port, 8090);
        assert_eq!(config.dashboard.refresh_policy, RefreshPolicy::FullReload);
    }
}
