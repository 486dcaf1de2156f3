//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use thiserror::Error;
use voxrelay_voice::VoiceConfig;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network and filesystem settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// External collaborator settings. Credentials are never read from here.
    #[serde(default)]
    pub voice: VoiceConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory uploaded files are written to and served from.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Directory holding `index.html` and other static assets.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Maximum request body size in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "voxrelay_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8000
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            upload_dir: default_upload_dir(),
            static_dir: default_static_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `VOXRELAY_HOST` overrides `server.host`
/// - `VOXRELAY_PORT` overrides `server.port`
/// - `VOXRELAY_UPLOAD_DIR` overrides `server.upload_dir`
/// - `VOXRELAY_STATIC_DIR` overrides `server.static_dir`
/// - `VOXRELAY_LOG_LEVEL` overrides `logging.level`
/// - `VOXRELAY_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

/// Applies `VOXRELAY_*` overrides looked up through `lookup`.
///
/// Unparseable host or port values are ignored.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("VOXRELAY_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = lookup("VOXRELAY_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(dir) = lookup("VOXRELAY_UPLOAD_DIR") {
        config.server.upload_dir = PathBuf::from(dir);
    }
    if let Some(dir) = lookup("VOXRELAY_STATIC_DIR") {
        config.server.static_dir = PathBuf::from(dir);
    }
    if let Some(level) = lookup("VOXRELAY_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("VOXRELAY_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
