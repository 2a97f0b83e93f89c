//! Logging Module
//!
//! Sets up `tracing` output for the server and CLI. Console output always goes to
//! stderr; debug mode adds a daily-rolling log file, and a fixed log file can be
//! configured instead.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

const LOG_FILE_PREFIX: &str = "langomine.log";

/// Logging setup options
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default filter when RUST_LOG is not set
    pub level: String,
    /// Write a rolling log file in `log_dir`
    pub debug_mode: bool,
    /// Directory for rolling debug logs
    pub log_dir: PathBuf,
    /// Fixed log file (from `[logging] file`)
    pub log_file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self {
            level: "info".to_string(),
            debug_mode: false,
            log_dir: default_log_dir(),
            log_file: None,
        }
    }

    pub fn with_level(mut self, level: &str) -> Self {
        self.level = level.to_string();
        self
    }

    /// Debug mode raises the default level to `debug` and enables file output
    pub fn with_debug_mode(mut self, debug: bool) -> Self {
        self.debug_mode = debug;
        if debug {
            self.level = "debug".to_string();
        }
        self
    }

    pub fn with_log_dir(mut self, dir: PathBuf) -> Self {
        self.log_dir = dir;
        self
    }

    pub fn with_log_file(mut self, file: PathBuf) -> Self {
        self.log_file = Some(file);
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("langomine={}", self.level)))
    }
}

/// Default directory for debug logs: `<data_local_dir>/langomine/logs`
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("langomine")
        .join("logs")
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop, so `main` must hold it.
pub fn init_logging(config: LogConfig) -> Result<Option<WorkerGuard>, String> {
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(config.filter());

    let file_appender = if let Some(file) = &config.log_file {
        let dir = file.parent().unwrap_or(Path::new(".")).to_path_buf();
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| LOG_FILE_PREFIX.to_string());
        std::fs::create_dir_all(&dir)
            .map_err(|e| format!("Failed to create log directory {:?}: {}", dir, e))?;
        Some(tracing_appender::rolling::never(dir, name))
    } else if config.debug_mode {
        std::fs::create_dir_all(&config.log_dir).map_err(|e| {
            format!("Failed to create log directory {:?}: {}", config.log_dir, e)
        })?;
        Some(tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX))
    } else {
        None
    };

    match file_appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(config.filter());
            tracing_subscriber::registry()
                .with(console)
                .with(file_layer)
                .try_init()
                .map_err(|e| e.to_string())?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(console)
                .try_init()
                .map_err(|e| e.to_string())?;
            Ok(None)
        }
    }
}

/// Remove rolling log files older than `max_age_days` from the default log dir.
pub fn cleanup_old_logs(max_age_days: u64) -> std::io::Result<usize> {
    cleanup_logs_in(&active_log_dir(), max_age_days)
}

/// `DEBUG_LOGS_LOCATION` when set, otherwise [`default_log_dir`]
pub fn active_log_dir() -> PathBuf {
    std::env::var("DEBUG_LOGS_LOCATION")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_log_dir())
}

/// Remove `langomine.log*` files in `dir` whose mtime is older than `max_age_days`.
pub fn cleanup_logs_in(dir: &Path, max_age_days: u64) -> std::io::Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let max_age = Duration::from_secs(max_age_days * 24 * 60 * 60);
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(LOG_FILE_PREFIX) {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        let age = now.duration_since(modified).unwrap_or_default();
        if age > max_age {
            std::fs::remove_file(entry.path())?;
            removed += 1;
        }
    }

    Ok(removed)
}

/// Log files currently present in `dir`, newest first.
pub fn list_log_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with(LOG_FILE_PREFIX) {
            files.push((entry.metadata()?.modified()?, entry.path()));
        }
    }
    files.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(files.into_iter().map(|(_, p)| p).collect())
}
