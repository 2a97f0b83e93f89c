//! Configuration Module
//!
//! Handles application configuration loading, validation, and management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Country codes routed to the premium scoring model (EU member states)
pub const DEFAULT_PREMIUM_COUNTRIES: [&str; 27] = [
    "AT", "BE", "BG", "HR", "CY", "CZ", "DK", "EE", "FI", "FR", "DE", "GR", "HU", "IE", "IT", "LV",
    "LT", "LU", "MT", "NL", "PL", "PT", "RO", "SK", "SI", "ES", "SE",
];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP API server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Audio blob storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Speech-to-text webservice configuration
    #[serde(default)]
    pub transcription: TranscriptionConfig,

    /// LLM scoring configuration
    #[serde(default)]
    pub scoring: ScoringConfig,
}

/// HTTP API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (default: "127.0.0.1")
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Server port (default: 8000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request header carrying the caller's 2-letter country code
    #[serde(default = "default_country_header")]
    pub country_header: String,

    /// Maximum accepted upload size in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_country_header() -> String {
    "CF-IPCountry".to_string()
}

fn default_max_upload_bytes() -> usize {
    64 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            country_header: default_country_header(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    langomine_home().join("langomine.db")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for uploaded audio
    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            media_dir: default_media_dir(),
        }
    }
}

fn default_media_dir() -> PathBuf {
    langomine_home().join("media")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log to file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Whisper ASR webservice configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Base URL of the ASR webservice (the `/asr` path is appended)
    #[serde(default = "default_transcription_host")]
    pub host: String,

    /// Total request timeout in seconds
    #[serde(default = "default_transcription_timeout")]
    pub timeout_secs: u64,
}

fn default_transcription_host() -> String {
    "http://localhost:9000".to_string()
}

fn default_transcription_timeout() -> u64 {
    300
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            host: default_transcription_host(),
            timeout_secs: default_transcription_timeout(),
        }
    }
}

/// LLM scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// API key (usually loaded from OPENAI_API_KEY)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// OpenAI-compatible API base URL
    #[serde(default = "default_scoring_base_url")]
    pub base_url: String,

    /// Model used for callers in `premium_countries`
    #[serde(default = "default_premium_model")]
    pub premium_model: String,

    /// Model used for everyone else
    #[serde(default = "default_standard_model")]
    pub standard_model: String,

    /// Country codes that get the premium model
    #[serde(default = "default_premium_countries")]
    pub premium_countries: Vec<String>,

    /// Total request timeout in seconds
    #[serde(default = "default_scoring_timeout")]
    pub timeout_secs: u64,
}

fn default_scoring_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_premium_model() -> String {
    "gpt-4o".to_string()
}

fn default_standard_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_premium_countries() -> Vec<String> {
    DEFAULT_PREMIUM_COUNTRIES.iter().map(|c| c.to_string()).collect()
}

fn default_scoring_timeout() -> u64 {
    120
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_scoring_base_url(),
            premium_model: default_premium_model(),
            standard_model: default_standard_model(),
            premium_countries: default_premium_countries(),
            timeout_secs: default_scoring_timeout(),
        }
    }
}

/// Base directory for local data: `<data_local_dir>/langomine`
pub fn langomine_home() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("langomine")
}

/// Recursive table merge; scalars and arrays from `overlay` replace what `base` holds.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming)
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. Default values
    /// 2. System config: ~/.config/langomine/config.toml
    /// 3. Local config: ./langomine.toml
    /// 4. Environment variables
    pub fn load() -> Result<Self> {
        tracing::debug!("Loading configuration...");

        let layers: Vec<PathBuf> = Self::system_config_path()
            .into_iter()
            .chain(std::iter::once(Self::local_config_path()))
            .collect();

        let mut config = Self::load_layered(&layers)?;
        config.apply_env_overrides();

        tracing::debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Fold existing files in `layers` over the defaults, later files winning key by key.
    fn load_layered(layers: &[PathBuf]) -> Result<Self> {
        let mut config = Self::default();
        for path in layers.iter().filter(|p| p.exists()) {
            tracing::debug!("Loading config layer from: {:?}", path);
            config = config.merge_from_file(path)?;
        }
        Ok(config)
    }

    /// Load configuration from a specific file path
    ///
    /// Priority (lowest to highest):
    /// 1. Default values
    /// 2. Custom config file (specified path)
    /// 3. Environment variables
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading configuration from custom path: {:?}", path);

        if !path.exists() {
            anyhow::bail!("Config file not found: {:?}", path);
        }

        let mut config = Self::default().merge_from_file(path)?;
        config.apply_env_overrides();

        tracing::debug!("Configuration loaded successfully from custom path");
        Ok(config)
    }

    /// Get the system config path: ~/.config/langomine/config.toml
    pub fn system_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("langomine").join("config.toml"))
    }

    /// Get the local config path: ./langomine.toml
    pub fn local_config_path() -> PathBuf {
        PathBuf::from("./langomine.toml")
    }

    /// Overlay a TOML file on `self`. Keys the file leaves out keep their current values.
    fn merge_from_file(self, path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let overlay: toml::Table = contents
            .parse()
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        let mut merged = toml::Value::try_from(&self).context("Failed to serialize config")?;
        if let toml::Value::Table(base) = &mut merged {
            merge_tables(base, overlay);
        }

        merged
            .try_into()
            .with_context(|| format!("Invalid configuration in {:?}", path))
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup("LANGOMINE_BIND") {
            self.server.bind = bind;
        }

        if let Some(port) = lookup("LANGOMINE_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid LANGOMINE_PORT: {}", port),
            }
        }

        if let Some(header) = lookup("LANGOMINE_COUNTRY_HEADER") {
            self.server.country_header = header;
        }

        if let Some(db_path) = lookup("LANGOMINE_DB_PATH") {
            self.database.path = PathBuf::from(db_path);
        }

        if let Some(media_dir) = lookup("LANGOMINE_MEDIA_DIR") {
            self.storage.media_dir = PathBuf::from(media_dir);
        }

        if let Some(log_level) = lookup("LANGOMINE_LOG_LEVEL") {
            self.logging.level = log_level;
        }

        if let Some(log_file) = lookup("LANGOMINE_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(log_file));
        }

        if let Some(host) = lookup("OPEN_AI_WHISPERER_HOST") {
            self.transcription.host = host;
        }

        if let Some(api_key) = lookup("OPENAI_API_KEY") {
            self.scoring.api_key = Some(api_key);
        }

        if let Some(base_url) = lookup("OPENAI_BASE_URL") {
            self.scoring.base_url = base_url;
        }

        if let Some(model) = lookup("LANGOMINE_PREMIUM_MODEL") {
            self.scoring.premium_model = model;
        }

        if let Some(model) = lookup("LANGOMINE_STANDARD_MODEL") {
            self.scoring.standard_model = model;
        }
    }

    /// Check that the configuration is usable
    /// Reject unusable settings and return the non-fatal problems as warnings.
    pub fn validate(&self) -> Result<Vec<String>> {
        tracing::debug!("Validating configuration...");

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            );
        }

        if self.server.port == 0 {
            anyhow::bail!("Server port must be non-zero");
        }

        let host = self.transcription.host.trim();
        if host.is_empty() {
            anyhow::bail!("Transcription host is empty");
        }
        if !host.starts_with("http://") && !host.starts_with("https://") {
            anyhow::bail!("Transcription host must be an http(s) URL: {}", host);
        }

        if self.scoring.premium_model.trim().is_empty()
            || self.scoring.standard_model.trim().is_empty()
        {
            anyhow::bail!("Scoring model identifiers must not be empty");
        }

        if let Some(bad) = self
            .scoring
            .premium_countries
            .iter()
            .find(|c| c.len() != 2 || !c.chars().all(|ch| ch.is_ascii_alphabetic()))
        {
            anyhow::bail!("Invalid country code in premium_countries: {:?}", bad);
        }

        let mut warnings = Vec::new();
        if self.scoring.api_key.is_none() {
            warnings.push(
                "No scoring API key configured (set OPENAI_API_KEY); submissions will fail"
                    .to_string(),
            );
        }

        if let Some(parent) = self.database.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            warnings.push(format!(
                "Database parent directory does not exist, will be created: {:?}",
                parent
            ));
        }

        tracing::debug!("Configuration validation passed");
        Ok(warnings)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        tracing::info!("Configuration saved to: {:?}", path);
        Ok(())
    }
}
