//! Configuration loading for the pronunciation assessment service
//!
//! Two sources feed the runtime configuration:
//! 1. **TOML Bootstrap**: bind address, port, staging directory, logging,
//!    speech endpoint tuning (static, read once at startup)
//! 2. **Environment secrets**: speech service key and region
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (each with an environment fallback)
//! 2. TOML configuration file
//! 3. Built-in defaults (code constants)
//!
//! Secrets never come from TOML. Missing secrets do not stop startup; every
//! assessment request fails with a configuration error instead.

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Environment variable holding the speech service subscription key
pub const SPEECH_KEY_ENV: &str = "AZURE_SPEECH_KEY";

/// Environment variable holding the speech service region (e.g. `eastus`)
pub const SPEECH_REGION_ENV: &str = "AZURE_SPEECH_REGION";

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5730;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = concat!("pronounce/", env!("CARGO_PKG_VERSION"));

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional; anything absent falls back to command-line
/// overrides or built-in defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Interface to bind the HTTP server to
    #[serde(default)]
    pub bind_address: Option<String>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Directory for staged uploads (system temp dir if not specified)
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,

    /// Maximum accepted request body size in bytes
    #[serde(default)]
    pub max_upload_bytes: Option<usize>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Speech service tuning (optional)
    #[serde(default)]
    pub speech: SpeechSection,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `[speech]` table of the TOML file
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SpeechSection {
    /// Base URL overriding the region-derived endpoint
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Per-call timeout for the speech service
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    #[serde(default)]
    pub user_agent: Option<String>,
}

/// Default TOML location: `<config_dir>/pronounce/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pronounce").join("config.toml"))
}

/// Load the TOML bootstrap file
///
/// A missing file is not an error: defaults apply and the caller decides
/// whether to warn (logging is usually not initialised yet at this point).
/// An unreadable or malformed file is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Speech service credentials
///
/// `Debug` output never includes the key.
#[derive(Clone, PartialEq, Eq)]
pub struct SpeechCredentials {
    pub key: String,
    pub region: String,
}

impl fmt::Debug for SpeechCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechCredentials")
            .field("key", &"<redacted>")
            .field("region", &self.region)
            .finish()
    }
}

/// Validate a secret (non-empty, non-whitespace)
pub fn is_valid_secret(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Resolve credentials through a variable lookup
///
/// Both values must be present and non-blank; otherwise `None`.
pub fn resolve_speech_credentials<F>(lookup: F) -> Option<SpeechCredentials>
where
    F: Fn(&str) -> Option<String>,
{
    let key = lookup(SPEECH_KEY_ENV).filter(|k| is_valid_secret(k))?;
    let region = lookup(SPEECH_REGION_ENV).filter(|r| is_valid_secret(r))?;

    Some(SpeechCredentials {
        key: key.trim().to_string(),
        region: region.trim().to_string(),
    })
}

/// Resolve credentials from the process environment
pub fn speech_credentials_from_env() -> Option<SpeechCredentials> {
    resolve_speech_credentials(|name| std::env::var(name).ok())
}

/// Values supplied on the command line (already merged with their env fallbacks by clap)
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub staging_dir: Option<PathBuf>,
}

/// Speech client settings
#[derive(Debug, Clone)]
pub struct SpeechSettings {
    /// `None` when the secrets are not configured
    pub credentials: Option<SpeechCredentials>,
    pub endpoint: Option<String>,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            credentials: None,
            endpoint: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_address: String,
    pub port: u16,
    pub staging_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
    pub log_level: String,
    pub speech: SpeechSettings,
}

impl ServiceConfig {
    /// Merge CLI overrides, TOML values and defaults
    pub fn resolve(
        cli: CliOverrides,
        toml: TomlConfig,
        credentials: Option<SpeechCredentials>,
    ) -> Self {
        let endpoint = toml
            .speech
            .endpoint
            .map(|e| e.trim().trim_end_matches('/').to_string())
            .filter(|e| !e.is_empty());

        Self {
            bind_address: cli
                .bind_address
                .or(toml.bind_address)
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            port: cli.port.or(toml.port).unwrap_or(DEFAULT_PORT),
            staging_dir: cli.staging_dir.or(toml.staging_dir),
            max_upload_bytes: toml.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            log_level: toml.logging.level,
            speech: SpeechSettings {
                credentials,
                endpoint,
                request_timeout: Duration::from_secs(
                    toml.speech
                        .request_timeout_secs
                        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
                ),
                user_agent: toml
                    .speech
                    .user_agent
                    .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            },
        }
    }

    /// `host:port` string for the listener
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Ensure the staging directory exists, creating it if needed
    pub fn ensure_staging_dir(&self) -> Result<()> {
        if let Some(dir) = &self.staging_dir {
            if !dir.exists() {
                std::fs::create_dir_all(dir)?;
                info!("Created staging directory: {}", dir.display());
            }
        }
        Ok(())
    }
}
