//! Notification backend trait and the logging backend

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

/// Errors raised by backends and backend selection
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Invalid backend class '{name}' (available: {available})")]
    InvalidBackendClass { name: String, available: String },

    #[error("Backend '{name}' requires a running tokio runtime")]
    RuntimeUnavailable { name: String },

    #[error("Task queue for flow '{flow}' is closed")]
    QueueClosed { flow: String },

    #[error("Payload is not valid JSON: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// A sink for serialized notifications
///
/// Delivery failures are the backend's own concern; callers log them and
/// move on.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Registered name of the backend
    fn name(&self) -> &'static str;

    /// Deliver one notification payload
    async fn notify(&self, payload: &str) -> Result<(), BackendError>;

    /// Stop accepting notifications and flush anything still pending
    async fn close(&self) {}
}

/// Backend that writes notifications to the log
///
/// Useful for local development and testing.
#[derive(Debug, Default)]
pub struct LoggerBackend;

impl LoggerBackend {
    pub fn new() -> Self {
        info!("Using logger backend");
        Self
    }
}

#[async_trait]
impl Backend for LoggerBackend {
    fn name(&self) -> &'static str {
        "logger"
    }

    async fn notify(&self, payload: &str) -> Result<(), BackendError> {
        info!(target: "ghmonitor::notification", "{}", payload);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_logger_backend_accepts_payload() {
        let backend = LoggerBackend::new();
        assert_eq!(backend.name(), "logger");
        assert!(backend.notify(r#"{"event":"push"}"#).await.is_ok());
    }

    #[test]
    fn test_invalid_backend_class_message() {
        let err = BackendError::InvalidBackendClass {
            name: "InvalidBackendName".to_string(),
            available: "logger, task-queue".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("InvalidBackendName"));
        assert!(msg.contains("task-queue"));
    }
}
