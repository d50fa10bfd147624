//! Resolver error types

use thiserror::Error;

/// Errors that can occur while looking up vanity import metadata
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Lookup of {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("No go-import meta tag found at {url}")]
    NoGoImport { url: String },
}

impl ResolveError {
    /// Whether the failure says something about the package rather than the network
    pub fn is_definitive(&self) -> bool {
        !matches!(self, ResolveError::Network(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message() {
        let err = ResolveError::Status {
            url: "https://launchpad.net/project?go-get=1".to_string(),
            status: 404,
        };

        let msg = err.to_string();
        assert!(msg.contains("launchpad.net/project"));
        assert!(msg.contains("404"));
    }

    #[test]
    fn test_is_definitive() {
        assert!(
            ResolveError::NoGoImport {
                url: "https://seznam.cz?go-get=1".to_string()
            }
            .is_definitive()
        );
        assert!(
            ResolveError::Status {
                url: "x".to_string(),
                status: 500
            }
            .is_definitive()
        );
    }
}
