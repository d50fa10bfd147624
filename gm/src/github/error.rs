//! GitHub API error types

use thiserror::Error;

/// Errors that prevent an API request from producing a response
///
/// A non-200 status is *not* an error at this level; callers decide what a
/// status means for them.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request to {path} timed out")]
    Timeout { path: String },

    #[error("Response for {path} does not contain JSON: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("API token contains characters not allowed in an HTTP header")]
    InvalidToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        let err = ApiError::Timeout {
            path: "repos/o/r/events".to_string(),
        };
        assert!(err.to_string().contains("repos/o/r/events"));
    }

    #[test]
    fn test_decode_message() {
        let source = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        let err = ApiError::Decode {
            path: "repos/o/r".to_string(),
            source,
        };
        assert!(err.to_string().contains("does not contain JSON"));
    }
}
