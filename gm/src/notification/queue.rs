//! Task-queue backend
//!
//! Every notification becomes a task for a named flow, pushed onto a bounded
//! in-process queue. The [`TaskSpooler`] drains the queue and appends each
//! task to `<spool-dir>/<flow>.jsonl`, where a broker bridge or worker can
//! pick it up.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::backend::{Backend, BackendError};

/// A notification dispatched as a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedTask {
    pub id: Uuid,
    pub flow: String,
    pub payload: Value,
    pub enqueued_at: DateTime<Utc>,
}

/// Backend that enqueues notifications as tasks
pub struct TaskQueueBackend {
    flow: String,
    tx: Mutex<Option<mpsc::Sender<QueuedTask>>>,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl TaskQueueBackend {
    /// Create the backend together with the receiving end of its queue
    pub fn channel(flow: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<QueuedTask>) {
        let flow = flow.into();
        debug!(%flow, capacity, "TaskQueueBackend::channel: called");
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let backend = Self {
            flow,
            tx: Mutex::new(Some(tx)),
            consumer: Mutex::new(None),
        };
        (backend, rx)
    }

    /// Attach the task draining the queue so `close` can wait for it
    pub fn with_consumer(self, handle: JoinHandle<()>) -> Self {
        Self {
            consumer: Mutex::new(Some(handle)),
            ..self
        }
    }

    pub fn flow(&self) -> &str {
        &self.flow
    }
}

#[async_trait]
impl Backend for TaskQueueBackend {
    fn name(&self) -> &'static str {
        "task-queue"
    }

    /// Waits for queue capacity; fails when the queue is closed or the
    /// consumer is gone
    async fn notify(&self, payload: &str) -> Result<(), BackendError> {
        let Some(tx) = self.tx.lock().await.clone() else {
            return Err(BackendError::QueueClosed {
                flow: self.flow.clone(),
            });
        };

        let task = QueuedTask {
            id: Uuid::now_v7(),
            flow: self.flow.clone(),
            payload: serde_json::from_str(payload)?,
            enqueued_at: Utc::now(),
        };
        debug!(task_id = %task.id, flow = %self.flow, "TaskQueueBackend::notify: enqueuing");

        tx.send(task).await.map_err(|_| BackendError::QueueClosed {
            flow: self.flow.clone(),
        })
    }

    /// Drop the sender and wait for the consumer to drain the queue
    async fn close(&self) {
        debug!(flow = %self.flow, "TaskQueueBackend::close: called");
        self.tx.lock().await.take();

        let consumer = self.consumer.lock().await.take();
        if let Some(handle) = consumer {
            if let Err(e) = handle.await {
                error!(flow = %self.flow, error = %e, "Task queue consumer failed");
            }
        }
    }
}

/// Drains a task queue into a JSONL spool file
pub struct TaskSpooler {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl TaskSpooler {
    pub fn new(spool_dir: impl AsRef<Path>, flow: &str) -> Self {
        let path = spool_dir.as_ref().join(format!("{}.jsonl", spool_file_stem(flow)));
        debug!(?path, "TaskSpooler::new: called");
        Self { path, writer: None }
    }

    pub fn spool_path(&self) -> &Path {
        &self.path
    }

    /// Append one task as a JSON line
    pub fn write_task(&mut self, task: &QueuedTask) -> eyre::Result<()> {
        if self.writer.is_none() {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
            self.writer = Some(BufWriter::new(file));
        }
        let Some(writer) = self.writer.as_mut() else {
            return Err(eyre::eyre!("Spool file {} is not open", self.path.display()));
        };

        let json = serde_json::to_string(task)?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;
        Ok(())
    }

    /// Consume tasks until every sender is dropped
    pub async fn run(mut self, mut rx: mpsc::Receiver<QueuedTask>) {
        info!(path = %self.path.display(), "Task spooler started");

        while let Some(task) = rx.recv().await {
            if let Err(e) = self.write_task(&task) {
                error!(task_id = %task.id, flow = %task.flow, error = %e, "Failed to spool task");
            }
        }

        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
        debug!("Task spooler stopped");
    }
}

/// Read every task from a spool file
pub fn read_spool(path: impl AsRef<Path>) -> eyre::Result<Vec<QueuedTask>> {
    let file = File::open(path.as_ref())?;
    let mut tasks = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        tasks.push(serde_json::from_str(&line)?);
    }
    Ok(tasks)
}

fn spool_file_stem(flow: &str) -> String {
    flow.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_notify_enqueues_task() {
        let (backend, mut rx) = TaskQueueBackend::channel("golangCVEPredictionsFlow", 4);
        backend.notify(r#"{"event":"push","package":"p","repository":"o/r"}"#).await.unwrap();

        let task = rx.recv().await.unwrap();
        assert_eq!(task.flow, "golangCVEPredictionsFlow");
        assert_eq!(task.payload["event"], "push");
        assert_eq!(task.payload["repository"], "o/r");
    }

    #[tokio::test]
    async fn test_notify_rejects_non_json() {
        let (backend, _rx) = TaskQueueBackend::channel("flow", 4);
        let err = backend.notify("not json").await.unwrap_err();
        assert!(matches!(err, BackendError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn test_notify_fails_when_consumer_gone() {
        let (backend, rx) = TaskQueueBackend::channel("flow", 4);
        drop(rx);
        let err = backend.notify(r#"{"event":"push"}"#).await.unwrap_err();
        assert!(matches!(err, BackendError::QueueClosed { .. }));
    }

    #[tokio::test]
    async fn test_spooler_writes_jsonl() {
        let temp = tempdir().unwrap();
        let (backend, rx) = TaskQueueBackend::channel("my flow", 4);
        let spooler = TaskSpooler::new(temp.path().join("queue"), backend.flow());
        let path = spooler.spool_path().to_path_buf();
        assert!(path.ends_with("my_flow.jsonl"));

        let handle = tokio::spawn(spooler.run(rx));
        backend.notify(&json!({"event": "issue", "id": 1}).to_string()).await.unwrap();
        backend.notify(&json!({"event": "issue", "id": 2}).to_string()).await.unwrap();
        drop(backend);
        handle.await.unwrap();

        let tasks = read_spool(&path).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].payload["id"], 1);
        assert_eq!(tasks[1].payload["id"], 2);
        assert_ne!(tasks[0].id, tasks[1].id);
    }

    #[tokio::test]
    async fn test_close_drains_queue_and_rejects_new_tasks() {
        let temp = tempdir().unwrap();
        let (backend, rx) = TaskQueueBackend::channel("flow", 1);
        let spooler = TaskSpooler::new(temp.path(), backend.flow());
        let path = spooler.spool_path().to_path_buf();
        let backend = backend.with_consumer(tokio::spawn(spooler.run(rx)));

        for id in 0..3 {
            backend.notify(&json!({"event": "issue", "id": id}).to_string()).await.unwrap();
        }
        backend.close().await;

        assert_eq!(read_spool(&path).unwrap().len(), 3);
        let err = backend.notify(r#"{"event":"push"}"#).await.unwrap_err();
        assert!(matches!(err, BackendError::QueueClosed { .. }));
    }

    #[test]
    fn test_spool_file_stem() {
        assert_eq!(spool_file_stem("golangCVEPredictionsFlow"), "golangCVEPredictionsFlow");
        assert_eq!(spool_file_stem("../etc/passwd"), "___etc_passwd");
    }
}
