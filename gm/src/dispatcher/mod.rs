//! Poll loop over every repository monitor
//!
//! Each cycle fetches every repository, sends notifications for what is new
//! since the previous snapshot, then advances the snapshot. Cycles repeat at
//! a fixed interval until shutdown.

mod config;
mod poll;

pub use config::DispatcherConfig;
pub use poll::{CycleReport, Dispatcher};
