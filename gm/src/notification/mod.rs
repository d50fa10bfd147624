//! Notifications about new repository activity
//!
//! [`Notification`] is the payload; a [`Backend`] delivers the encoded
//! payload somewhere. Backends are picked by name through the
//! [`BackendRegistry`]:
//!
//! - `logger` - writes each payload to the log
//! - `task-queue` - enqueues each payload as a task for a named flow

mod backend;
mod encoder;
mod queue;
mod registry;

#[cfg(test)]
pub use backend::mock;
pub use backend::{Backend, BackendError, LoggerBackend};
pub use encoder::Notification;
pub use queue::{QueuedTask, TaskQueueBackend, TaskSpooler, read_spool};
pub use registry::{BackendFactory, BackendRegistry, create_backend};
