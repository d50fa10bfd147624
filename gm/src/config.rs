//! ghmonitor configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;

use crate::dispatcher::DispatcherConfig;
use crate::notification::BackendRegistry;

/// Main ghmonitor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// What to watch
    pub watch: WatchConfig,

    /// Poll loop settings
    pub dispatcher: DispatcherConfig,

    /// GitHub API settings
    pub github: GithubConfig,

    /// Package resolution settings
    pub resolver: ResolveConfig,

    /// Notification backend selection
    pub backend: BackendConfig,

    /// Logging settings
    pub log: LogConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.watch.is_empty() {
            return Err(eyre::eyre!(
                "Nothing to watch. Set WATCH_PACKAGES or WATCH_REPOS, or list them under `watch:` in the config file."
            ));
        }

        let interval = self.dispatcher.poll_interval_secs;
        if !interval.is_finite() || interval <= 0.0 {
            return Err(eyre::eyre!("Poll interval must be a positive number of seconds, got {}", interval));
        }

        if self.dispatcher.max_concurrent_fetches == 0 {
            return Err(eyre::eyre!("max-concurrent-fetches must be at least 1"));
        }

        self.log.level_filter()?;

        let registry = BackendRegistry::with_builtin();
        if !registry.contains(&self.backend.name) {
            return Err(eyre::eyre!(
                "Invalid backend class '{}' (available: {})",
                self.backend.name,
                registry.names().join(", ")
            ));
        }

        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        Self::load_first_existing(&Self::fallback_paths())
    }

    /// `./ghmonitor.yml`, then `~/.config/ghmonitor/ghmonitor.yml`
    fn fallback_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("ghmonitor.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("ghmonitor").join("ghmonitor.yml"));
        }
        paths
    }

    /// Load the first candidate that exists, or defaults if none does
    ///
    /// A file that exists but cannot be read or parsed is an error; the
    /// chain never moves past it.
    pub fn load_first_existing(candidates: &[PathBuf]) -> Result<Self> {
        if let Some(path) = candidates.iter().find(|p| p.exists()) {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup
    ///
    /// Recognized: `WATCH_PACKAGES` and `WATCH_REPOS` (space-delimited),
    /// `SLEEP_PERIOD` (seconds), `LOGLEVEL`, `MONITOR_BACKEND`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(packages) = lookup("WATCH_PACKAGES") {
            self.watch.packages = split_list(&packages);
        }
        if let Some(repos) = lookup("WATCH_REPOS") {
            self.watch.repositories = split_list(&repos);
        }
        if let Some(period) = lookup("SLEEP_PERIOD") {
            self.dispatcher.poll_interval_secs = period
                .trim()
                .parse()
                .context(format!("SLEEP_PERIOD is not a number: {}", period))?;
        }
        if let Some(level) = lookup("LOGLEVEL") {
            self.log.level = level.trim().to_string();
        }
        if let Some(backend) = lookup("MONITOR_BACKEND") {
            self.backend.name = backend.trim().to_string();
        }
        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

/// Packages and repositories to watch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Go packages, translated to repositories at startup
    pub packages: Vec<String>,

    /// Repositories (`owner/repo`) watched directly
    pub repositories: Vec<String>,
}

impl WatchConfig {
    pub fn is_empty(&self) -> bool {
        self.packages.iter().chain(&self.repositories).all(|s| s.trim().is_empty())
    }
}

/// GitHub API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Environment variable holding comma-delimited API tokens
    #[serde(rename = "token-env")]
    pub token_env: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// User-Agent header (GitHub rejects requests without one)
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.github.com".to_string(),
            token_env: "GITHUB_TOKEN".to_string(),
            timeout_ms: 30_000,
            user_agent: format!("ghmonitor/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Package resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Timeout for `?go-get=1` lookups in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

impl ResolveConfig {
    pub fn to_resolver_config(&self) -> gopkg::ResolverConfig {
        gopkg::ResolverConfig {
            timeout_ms: self.timeout_ms,
            ..Default::default()
        }
    }
}

/// Notification backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Registered backend name ("logger" or "task-queue")
    pub name: String,

    /// Settings for the task-queue backend
    #[serde(rename = "task-queue")]
    pub task_queue: TaskQueueConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            name: "logger".to_string(),
            task_queue: TaskQueueConfig::default(),
        }
    }
}

/// Task-queue backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskQueueConfig {
    /// Flow every task is dispatched to
    pub flow: String,

    /// Queue capacity before `notify` waits
    pub capacity: usize,

    /// Directory the spooler writes `<flow>.jsonl` into
    #[serde(rename = "spool-dir")]
    pub spool_dir: PathBuf,
}

impl Default for TaskQueueConfig {
    fn default() -> Self {
        // Use XDG data directory (~/.local/share/ghmonitor/queue on Linux)
        let spool_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ghmonitor")
            .join("queue");

        Self {
            flow: "golangCVEPredictionsFlow".to_string(),
            capacity: 1024,
            spool_dir,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Verbosity: trace, debug, info, warning, error, critical, off
    pub level: String,

    /// Log file; logs go to stderr when unset
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warning".to_string(),
            file: None,
        }
    }
}

impl LogConfig {
    /// Parse the configured level
    pub fn level_filter(&self) -> Result<LevelFilter> {
        match self.level.to_lowercase().as_str() {
            "trace" => Ok(LevelFilter::TRACE),
            "debug" => Ok(LevelFilter::DEBUG),
            "info" => Ok(LevelFilter::INFO),
            "warn" | "warning" => Ok(LevelFilter::WARN),
            "error" | "critical" | "fatal" => Ok(LevelFilter::ERROR),
            "off" | "none" => Ok(LevelFilter::OFF),
            other => Err(eyre::eyre!("Unknown log level: {}", other)),
        }
    }
}
