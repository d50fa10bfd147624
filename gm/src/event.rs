//! Repository activity events
//!
//! Only the three kinds of activity we notify about are modelled. Everything
//! else the events API reports (stars, forks, releases, ...) is rejected at
//! parse time and never reaches a monitor.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Kind of activity an event represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Push,
    PullRequest,
    Issue,
}

impl EventKind {
    /// Map an events API `type` string to a kind
    pub fn classify(raw: &str) -> Result<Self, ParseError> {
        match raw {
            "PushEvent" => Ok(Self::Push),
            "PullRequestEvent" | "PullRequestReviewCommentEvent" => Ok(Self::PullRequest),
            "IssuesEvent" => Ok(Self::Issue),
            other => Err(ParseError::UnknownKind(other.to_string())),
        }
    }

    /// Get the kind as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::PullRequest => "pull-request",
            Self::Issue => "issue",
        }
    }
}

impl FromStr for EventKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::classify(s)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reasons a raw event record is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Event record is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Event id is not an integer: {0}")]
    InvalidId(String),

    #[error("Unknown event type: {0}")]
    UnknownKind(String),
}

/// A single observed activity item
///
/// Identity is the whole value: the same id seen with a different kind or
/// repository is a different event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub kind: EventKind,
    pub repo_name: String,
}

impl Event {
    pub fn new(id: i64, kind: EventKind, repo_name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            repo_name: repo_name.into(),
        }
    }

    /// Validate an untyped events API record
    ///
    /// The API sends ids as decimal strings; plain JSON integers are accepted
    /// too. Any signed integer is a valid id.
    pub fn parse(raw: &Value) -> Result<Self, ParseError> {
        let id = match raw.get("id") {
            None | Some(Value::Null) => return Err(ParseError::MissingField("id")),
            Some(Value::String(s)) => s.trim().parse().map_err(|_| ParseError::InvalidId(s.clone()))?,
            Some(Value::Number(n)) => n.as_i64().ok_or_else(|| ParseError::InvalidId(n.to_string()))?,
            Some(other) => return Err(ParseError::InvalidId(other.to_string())),
        };

        let kind = raw
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ParseError::MissingField("type"))
            .and_then(EventKind::classify)?;

        let repo_name = raw
            .get("repo")
            .and_then(|repo| repo.get("name"))
            .and_then(Value::as_str)
            .ok_or(ParseError::MissingField("repo.name"))?;

        let event = Self::new(id, kind, repo_name);
        debug!(%event, "Event::parse: parsed");
        Ok(event)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Event id={} kind={} repo={}>", self.id, self.kind, self.repo_name)
    }
}

/// Parse a batch of records, dropping the ones that fail
///
/// Unknown kinds are routine (the API reports many activity types) and are
/// only traced; structurally broken records are logged as warnings.
pub fn parse_events(records: &[Value]) -> HashSet<Event> {
    records
        .iter()
        .filter_map(|raw| match Event::parse(raw) {
            Ok(event) => Some(event),
            Err(ParseError::UnknownKind(kind)) => {
                debug!(%kind, "Skipping event of unmonitored type");
                None
            }
            Err(e) => {
                warn!(error = %e, "Skipping malformed event record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_known_kinds() {
        assert_eq!(EventKind::classify("PushEvent"), Ok(EventKind::Push));
        assert_eq!(EventKind::classify("IssuesEvent"), Ok(EventKind::Issue));
        assert_eq!(EventKind::classify("PullRequestEvent"), Ok(EventKind::PullRequest));
        assert_eq!(
            EventKind::classify("PullRequestReviewCommentEvent"),
            Ok(EventKind::PullRequest)
        );
    }

    #[test]
    fn test_classify_unknown_kind() {
        assert_eq!(
            EventKind::classify("foobar"),
            Err(ParseError::UnknownKind("foobar".to_string()))
        );
        assert!("WatchEvent".parse::<EventKind>().is_err());
        assert!("IssueCommentEvent".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_parse_string_id() {
        let raw = json!({"id": "222", "type": "PushEvent", "repo": {"name": "a"}});
        assert_eq!(Event::parse(&raw), Ok(Event::new(222, EventKind::Push, "a")));
    }

    #[test]
    fn test_parse_numeric_id() {
        let raw = json!({"id": 7, "type": "IssuesEvent", "repo": {"name": "owner/repo"}});
        assert_eq!(Event::parse(&raw), Ok(Event::new(7, EventKind::Issue, "owner/repo")));
    }

    #[test]
    fn test_parse_missing_type_field() {
        let raw = json!({"id": "222", "tpe": "PushEvent", "repo": {"name": "a"}});
        assert_eq!(Event::parse(&raw), Err(ParseError::MissingField("type")));
    }

    #[test]
    fn test_parse_missing_id() {
        let raw = json!({"type": "PushEvent", "repo": {"name": "a"}});
        assert_eq!(Event::parse(&raw), Err(ParseError::MissingField("id")));
    }

    #[test]
    fn test_parse_non_integer_id() {
        let raw = json!({"id": "abc", "type": "PushEvent", "repo": {"name": "a"}});
        assert_eq!(Event::parse(&raw), Err(ParseError::InvalidId("abc".to_string())));

        let raw = json!({"id": 4.5, "type": "PushEvent", "repo": {"name": "a"}});
        assert!(matches!(Event::parse(&raw), Err(ParseError::InvalidId(_))));
    }

    #[test]
    fn test_parse_negative_id() {
        let raw = json!({"id": -4, "type": "PushEvent", "repo": {"name": "a"}});
        assert_eq!(Event::parse(&raw).unwrap().id, -4);

        let raw = json!({"id": "-17", "type": "IssuesEvent", "repo": {"name": "a"}});
        assert_eq!(Event::parse(&raw).unwrap().id, -17);
    }

    #[test]
    fn test_parse_missing_repo_name() {
        let raw = json!({"id": "1", "type": "PushEvent", "repo": {"id": 42}});
        assert_eq!(Event::parse(&raw), Err(ParseError::MissingField("repo.name")));

        let raw = json!({"id": "1", "type": "PushEvent"});
        assert_eq!(Event::parse(&raw), Err(ParseError::MissingField("repo.name")));
    }

    #[test]
    fn test_equality_is_structural() {
        let a = Event::new(1, EventKind::Push, "a");
        assert_eq!(a, Event::new(1, EventKind::Push, "a"));
        assert_ne!(a, Event::new(1, EventKind::Issue, "a"));
        assert_ne!(a, Event::new(1, EventKind::Push, "b"));
        assert_ne!(a, Event::new(2, EventKind::Push, "a"));

        let set: HashSet<Event> = [a.clone(), a.clone()].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_parse_events_skips_bad_records() {
        let records = vec![
            json!({"id": "1", "type": "IssuesEvent", "repo": {"name": "o/r"}}),
            json!({"type": "IssuesEvent", "repo": {"name": "o/r"}}),
            json!({"id": "2", "type": "WatchEvent", "repo": {"name": "o/r"}}),
            json!({"id": "3", "type": "PushEvent", "repo": {}}),
            json!({"id": "4", "type": "PullRequestEvent", "repo": {"name": "o/r"}}),
            json!("not an object"),
        ];

        let events = parse_events(&records);
        let expected: HashSet<Event> = [
            Event::new(1, EventKind::Issue, "o/r"),
            Event::new(4, EventKind::PullRequest, "o/r"),
        ]
        .into_iter()
        .collect();
        assert_eq!(events, expected);
    }

    #[test]
    fn test_display() {
        let event = Event::new(5, EventKind::PullRequest, "o/r");
        assert_eq!(event.to_string(), "<Event id=5 kind=pull-request repo=o/r>");
    }
}
