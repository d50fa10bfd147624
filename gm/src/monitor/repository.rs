//! Per-repository seen-event state and novelty detection

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::event::{Event, EventKind, parse_events};
use crate::github::{ApiError, RepositoryApi};
use crate::notification::Notification;

/// A poll of one repository produced no usable data
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to get events for {repository} (communication error): {source}")]
    Transport {
        repository: String,
        #[source]
        source: ApiError,
    },

    #[error("Failed to get events for {repository} (HTTP {status}: {message})")]
    Status {
        repository: String,
        status: u16,
        message: String,
    },

    #[error("Events response for {repository} is not a list")]
    Malformed { repository: String },
}

/// Novel events of each kind found in one fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Novelty {
    pub issues: HashSet<Event>,
    pub pushes: HashSet<Event>,
    pub pull_requests: HashSet<Event>,
}

impl Novelty {
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty() && self.pushes.is_empty() && self.pull_requests.is_empty()
    }

    /// Notifications to send, in delivery order
    ///
    /// One per issue, one for all pushes together, one per pull request.
    /// Issues and pull requests are ordered by id.
    pub fn notifications(&self, package: &str, repository: &str) -> Vec<Notification> {
        let mut out: Vec<Notification> = sorted_ids(&self.issues)
            .into_iter()
            .map(|id| Notification::issue(package, repository, id))
            .collect();

        if !self.pushes.is_empty() {
            out.push(Notification::push(package, repository));
        }

        out.extend(
            sorted_ids(&self.pull_requests)
                .into_iter()
                .map(|id| Notification::pull_request(package, repository, id)),
        );
        out
    }
}

fn sorted_ids(events: &HashSet<Event>) -> Vec<i64> {
    let mut ids: Vec<i64> = events.iter().map(|e| e.id).collect();
    ids.sort_unstable();
    ids
}

/// Tracks the last known event snapshot of one repository
#[derive(Debug, Clone)]
pub struct RepositoryMonitor {
    package: String,
    repository: String,
    seen_events: HashSet<Event>,
    primed: bool,
}

impl RepositoryMonitor {
    /// Create a monitor for a package and the repository it resolved to
    pub fn new(package: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            repository: repository.into(),
            seen_events: HashSet::new(),
            primed: false,
        }
    }

    /// Create a monitor for a repository watched directly, without a package
    pub fn for_repository(repository: impl Into<String>) -> Self {
        let repository = repository.into();
        Self::new(repository.clone(), repository)
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn seen_events(&self) -> &HashSet<Event> {
        &self.seen_events
    }

    /// Whether a snapshot has been recorded since startup
    pub fn is_primed(&self) -> bool {
        self.primed
    }

    fn events_path(&self) -> String {
        format!("repos/{}/events", self.repository)
    }

    /// Fetch the repository's recent events
    ///
    /// Unparsable records are dropped; a failed request or a non-200 status
    /// is a [`FetchError`] and leaves the monitor untouched.
    pub async fn fetch_current_events(&self, api: &dyn RepositoryApi) -> Result<HashSet<Event>, FetchError> {
        debug!(repository = %self.repository, "RepositoryMonitor::fetch_current_events: called");

        let response = api
            .request(&self.events_path())
            .await
            .map_err(|source| FetchError::Transport {
                repository: self.repository.clone(),
                source,
            })?;

        if !response.is_ok() {
            return Err(FetchError::Status {
                repository: self.repository.clone(),
                status: response.status,
                message: response.message().unwrap_or("no message").to_string(),
            });
        }

        let Value::Array(records) = &response.body else {
            return Err(FetchError::Malformed {
                repository: self.repository.clone(),
            });
        };

        let events = parse_events(records);
        debug!(
            repository = %self.repository,
            records = records.len(),
            events = events.len(),
            "RepositoryMonitor::fetch_current_events: parsed"
        );
        Ok(events)
    }

    /// Candidates of `kind` that are not in the seen snapshot
    pub fn diff_by_kind(&self, kind: EventKind, candidates: &HashSet<Event>) -> HashSet<Event> {
        candidates
            .iter()
            .filter(|e| e.kind == kind && !self.seen_events.contains(*e))
            .cloned()
            .collect()
    }

    pub fn new_issues(&self, candidates: &HashSet<Event>) -> HashSet<Event> {
        self.diff_by_kind(EventKind::Issue, candidates)
    }

    pub fn new_pushes(&self, candidates: &HashSet<Event>) -> HashSet<Event> {
        self.diff_by_kind(EventKind::Push, candidates)
    }

    pub fn new_pull_requests(&self, candidates: &HashSet<Event>) -> HashSet<Event> {
        self.diff_by_kind(EventKind::PullRequest, candidates)
    }

    /// Read out novelty of every kind without touching state
    pub fn novelty(&self, candidates: &HashSet<Event>) -> Novelty {
        let issues = self.new_issues(candidates);
        let pushes = self.new_pushes(candidates);
        let pull_requests = self.new_pull_requests(candidates);
        Novelty {
            issues,
            pushes,
            pull_requests,
        }
    }

    /// Replace the seen snapshot wholesale
    ///
    /// Must come after novelty has been read out for this snapshot. Events
    /// missing from `snapshot` are forgotten.
    pub fn advance(&mut self, snapshot: HashSet<Event>) {
        debug!(
            repository = %self.repository,
            previous = self.seen_events.len(),
            current = snapshot.len(),
            "RepositoryMonitor::advance: called"
        );
        self.seen_events = snapshot;
        self.primed = true;
    }
}

impl fmt::Display for RepositoryMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.package == self.repository {
            write!(f, "<RepositoryMonitor for {} repository>", self.repository)
        } else {
            write!(
                f,
                "<RepositoryMonitor for {} repository (package {})>",
                self.repository, self.package
            )
        }
    }
}
