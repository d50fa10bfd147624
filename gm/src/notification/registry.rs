//! Backend selection by name

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use super::backend::{Backend, BackendError, LoggerBackend};
use super::queue::{TaskQueueBackend, TaskSpooler};
use crate::config::BackendConfig;

/// Constructor for a backend
pub type BackendFactory = fn(&BackendConfig) -> Result<Arc<dyn Backend>, BackendError>;

/// Name → factory mapping for notification backends
pub struct BackendRegistry {
    factories: BTreeMap<String, BackendFactory>,
}

impl BackendRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with the `logger` and `task-queue` backends
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("logger", logger_factory);
        registry.register("task-queue", task_queue_factory);
        registry
    }

    /// Register (or replace) a backend factory
    pub fn register(&mut self, name: impl Into<String>, factory: BackendFactory) {
        let name = name.into();
        debug!(%name, "BackendRegistry::register: called");
        self.factories.insert(name, factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Construct the backend registered under `name`
    ///
    /// Unknown names are an error; there is no fallback backend.
    pub fn create(&self, name: &str, config: &BackendConfig) -> Result<Arc<dyn Backend>, BackendError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| BackendError::InvalidBackendClass {
                name: name.to_string(),
                available: self.names().join(", "),
            })?;
        factory(config)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

/// Create the backend named in the configuration from the built-in registry
pub fn create_backend(config: &BackendConfig) -> Result<Arc<dyn Backend>, BackendError> {
    BackendRegistry::with_builtin().create(&config.name, config)
}

fn logger_factory(_config: &BackendConfig) -> Result<Arc<dyn Backend>, BackendError> {
    Ok(Arc::new(LoggerBackend::new()))
}

/// Builds the queue and spawns its spooler on the current runtime
fn task_queue_factory(config: &BackendConfig) -> Result<Arc<dyn Backend>, BackendError> {
    let runtime = tokio::runtime::Handle::try_current().map_err(|_| BackendError::RuntimeUnavailable {
        name: "task-queue".to_string(),
    })?;

    let queue = &config.task_queue;
    let (backend, rx) = TaskQueueBackend::channel(queue.flow.clone(), queue.capacity);
    let spooler = TaskSpooler::new(&queue.spool_dir, &queue.flow);
    info!(
        flow = %queue.flow,
        spool = %spooler.spool_path().display(),
        "Using task-queue backend"
    );
    let consumer = runtime.spawn(spooler.run(rx));

    Ok(Arc::new(backend.with_consumer(consumer)))
}
