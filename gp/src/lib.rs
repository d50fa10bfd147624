//! gopkg - Go import path to GitHub repository translation
//!
//! Takes whatever `go get` takes and answers with the `owner/repo` name of the
//! GitHub repository that serves it, or nothing if the package does not live
//! on GitHub.
//!
//! Two strategies are tried in order:
//!
//! 1. **Direct match**: `github.com/owner/repo[/sub/dir]` is translated by
//!    pattern alone, no network involved.
//! 2. **Vanity import lookup**: the package URL is fetched with `?go-get=1`
//!    and the `go-import` meta tag is searched for a GitHub URL, the same
//!    redirect metadata `go get` follows.
//!
//! # Example
//!
//! ```ignore
//! use gopkg::{GoGetResolver, PackageResolver};
//!
//! let resolver = GoGetResolver::new(Default::default())?;
//! assert_eq!(resolver.resolve("k8s.io/metrics").await.as_deref(), Some("kubernetes/metrics"));
//! ```

pub mod cli;
mod error;
mod resolver;

pub use error::ResolveError;
pub use resolver::{
    GITHUB_REPO_RE, GoGetResolver, PackageResolver, ResolverConfig, direct_repository, go_import_repository,
};
