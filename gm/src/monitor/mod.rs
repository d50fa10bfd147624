//! Repository monitors
//!
//! A [`RepositoryMonitor`] remembers the last event snapshot of one repository
//! and answers which events in a fresh fetch are new. State only changes by
//! wholesale replacement, after novelty has been read out.

mod builder;
mod repository;

pub use builder::build_monitors;
pub use repository::{FetchError, Novelty, RepositoryMonitor};
