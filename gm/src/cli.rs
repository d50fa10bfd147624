//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ghmonitor - GitHub repository activity monitor
#[derive(Parser)]
#[command(
    name = "gm",
    about = "Watch GitHub repositories of Go packages and notify about new activity",
    version,
    after_help = "Environment: WATCH_PACKAGES, WATCH_REPOS, SLEEP_PERIOD, LOGLEVEL, MONITOR_BACKEND, GITHUB_TOKEN"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Poll the watched repositories and send notifications
    Run {
        /// Run a single cycle and exit
        ///
        /// With baseline-first-poll enabled (the default) that cycle only
        /// records the baseline and never notifies; set
        /// `dispatcher.baseline-first-poll: false` to report what is there.
        #[arg(long)]
        once: bool,
    },

    /// Translate packages to their GitHub repositories
    Resolve {
        /// Go packages or import paths
        #[arg(value_name = "PACKAGE", required = true)]
        packages: Vec<String>,
    },

    /// List available notification backends
    Backends,

    /// Print the effective configuration
    ShowConfig {
        /// Output format
        #[arg(short, long, default_value = "yaml")]
        format: OutputFormat,
    },
}

/// Output format for show-config
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: yaml or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yaml => write!(f, "yaml"),
            Self::Json => write!(f, "json"),
        }
    }
}
