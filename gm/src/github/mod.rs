//! GitHub API access
//!
//! The [`RepositoryApi`] trait is the seam the monitors depend on;
//! [`GithubClient`] is the reqwest implementation used by the daemon.

mod client;
mod error;

#[cfg(test)]
pub use client::mock;
pub use client::{ApiResponse, Credentials, GithubClient, RepositoryApi};
pub use error::ApiError;
