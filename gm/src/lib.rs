//! ghmonitor - GitHub repository activity monitor
//!
//! Watches the GitHub repositories behind a set of Go packages and sends a
//! notification whenever new activity shows up in a repository's public
//! event stream.
//!
//! # Core Concepts
//!
//! - **Snapshot diffing**: each repository keeps the set of events it saw
//!   last cycle; anything fetched that is not in that set is new
//! - **Push collapse**: any number of new pushes yields one notification,
//!   issues and pull requests are notified one by one
//! - **Pluggable delivery**: notifications go to a backend picked by name
//!
//! # Modules
//!
//! - [`event`] - Event model and parsing of GitHub event records
//! - [`github`] - GitHub API client and credentials
//! - [`monitor`] - Per-repository state and novelty detection
//! - [`notification`] - Notification payloads and backends
//! - [`dispatcher`] - The poll loop
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod event;
pub mod github;
pub mod monitor;
pub mod notification;

// Re-export commonly used types
pub use config::{BackendConfig, Config, GithubConfig, LogConfig, ResolveConfig, TaskQueueConfig, WatchConfig};
pub use dispatcher::{CycleReport, Dispatcher, DispatcherConfig};
pub use event::{Event, EventKind, ParseError, parse_events};
pub use github::{ApiError, ApiResponse, Credentials, GithubClient, RepositoryApi};
pub use monitor::{FetchError, Novelty, RepositoryMonitor, build_monitors};
pub use notification::{
    Backend, BackendError, BackendRegistry, LoggerBackend, Notification, QueuedTask, TaskQueueBackend, TaskSpooler,
    create_backend, read_spool,
};
