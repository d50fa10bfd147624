//! Package resolution strategies

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use crate::error::ResolveError;

/// Matches `github.com/<owner>/<repo>` anywhere in a string
///
/// Anchoring is left to the caller: a package path must start with it, a
/// `go-import` meta content only has to contain it.
pub static GITHUB_REPO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com/(?P<user>[a-zA-Z0-9][A-Za-z0-9_-]*)/(?P<repo>[a-zA-Z0-9][A-Za-z0-9_.-]*)")
        .expect("GitHub repository pattern is valid")
});

const GO_IMPORT_SELECTOR: &str = r#"meta[name="go-import"]"#;

/// Resolves a package identifier into an `owner/repo` string
///
/// `None` means the package is not served from GitHub (or could not be
/// looked up); callers exclude such packages instead of retrying.
#[async_trait]
pub trait PackageResolver: Send + Sync {
    async fn resolve(&self, package: &str) -> Option<String>;
}

/// Resolver configuration
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Timeout for the `?go-get=1` lookup in milliseconds
    pub timeout_ms: u64,

    /// User-Agent sent with the lookup
    pub user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            user_agent: format!("gopkg/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Translate a `github.com/...` package path without touching the network
pub fn direct_repository(package: &str) -> Option<String> {
    let caps = GITHUB_REPO_RE.captures(package)?;
    if caps.get(0)?.start() != 0 {
        return None;
    }
    Some(format_repository(&caps["user"], &caps["repo"]))
}

/// Extract the GitHub repository from the `go-import` meta tag of a page
///
/// Only the first `go-import` tag is considered, as `go get` does for a
/// single import prefix.
pub fn go_import_repository(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(GO_IMPORT_SELECTOR).ok()?;
    let content = document.select(&selector).next()?.value().attr("content")?;
    let caps = GITHUB_REPO_RE.captures(content)?;
    Some(format_repository(&caps["user"], &caps["repo"]))
}

fn format_repository(user: &str, repo: &str) -> String {
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    format!("{}/{}", user, repo)
}

/// Resolver that follows `go get` vanity import metadata over HTTPS
pub struct GoGetResolver {
    http: Client,
}

impl GoGetResolver {
    /// Create a resolver with its own HTTP client
    pub fn new(config: ResolverConfig) -> Result<Self, ResolveError> {
        debug!(?config, "GoGetResolver::new: called");
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent)
            .build()?;
        Ok(Self { http })
    }

    /// Create a resolver around an existing HTTP client
    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    /// Fetch `https://<package>?go-get=1` and read its go-import metadata
    pub async fn lookup(&self, package: &str) -> Result<String, ResolveError> {
        self.lookup_url(format!("https://{}?go-get=1", package)).await
    }

    async fn lookup_url(&self, url: String) -> Result<String, ResolveError> {
        debug!(%url, "GoGetResolver::lookup: fetching");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        go_import_repository(&body).ok_or(ResolveError::NoGoImport { url })
    }
}

#[async_trait]
impl PackageResolver for GoGetResolver {
    async fn resolve(&self, package: &str) -> Option<String> {
        let package = package.trim();
        if package.is_empty() {
            return None;
        }

        if let Some(repo) = direct_repository(package) {
            debug!(%package, %repo, "Resolved package by direct match");
            return Some(repo);
        }

        match self.lookup(package).await {
            Ok(repo) => {
                info!(%package, %repo, "Resolved package via go-import metadata");
                Some(repo)
            }
            Err(e) if e.is_definitive() => {
                debug!(%package, error = %e, "Package is not hosted on GitHub");
                None
            }
            Err(e) => {
                warn!(%package, error = %e, "Package lookup failed");
                None
            }
        }
    }
}
