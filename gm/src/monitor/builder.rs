//! Monitor-set construction from watched packages and repositories

use std::collections::HashSet;

use gopkg::PackageResolver;
use tracing::{info, warn};

use super::RepositoryMonitor;
use crate::github::RepositoryApi;

/// Build the monitors for this process
///
/// Packages are translated through the resolver; packages that do not
/// resolve are excluded for the lifetime of the process. Repositories are
/// watched as-is. Either way a repository must be confirmed to exist before
/// a monitor is created for it. Duplicate `(package, repository)` pairs are
/// collapsed.
pub async fn build_monitors(
    packages: &[String],
    repositories: &[String],
    resolver: &dyn PackageResolver,
    api: &dyn RepositoryApi,
) -> Vec<RepositoryMonitor> {
    let mut pairs: Vec<(String, String)> = Vec::new();

    for package in packages.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
        match resolver.resolve(package).await {
            Some(repository) => pairs.push((package.to_string(), repository)),
            None => warn!(%package, "Package does not resolve to a GitHub repository, not monitoring it"),
        }
    }

    for repository in repositories.iter().map(|r| r.trim()).filter(|r| !r.is_empty()) {
        pairs.push((repository.to_string(), repository.to_string()));
    }

    let mut seen = HashSet::new();
    let mut monitors = Vec::new();
    for (package, repository) in pairs {
        if !seen.insert((package.clone(), repository.clone())) {
            continue;
        }
        if !api.repository_exists(&repository).await {
            warn!(%package, %repository, "Repository could not be confirmed, not monitoring it");
            continue;
        }
        let monitor = RepositoryMonitor::new(package, repository);
        info!(%monitor, "Monitoring repository");
        monitors.push(monitor);
    }

    monitors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::mock::{MockApi, MockReply};
    use async_trait::async_trait;
    use serde_json::json;

    /// Resolves `github.com/...` directly and `k8s.io/<name>` to `kubernetes/<name>`
    struct StubResolver;

    #[async_trait]
    impl PackageResolver for StubResolver {
        async fn resolve(&self, package: &str) -> Option<String> {
            if let Some(repo) = gopkg::direct_repository(package) {
                return Some(repo);
            }
            package.strip_prefix("k8s.io/").map(|name| format!("kubernetes/{}", name))
        }
    }

    fn existing(api: MockApi, name: &str) -> MockApi {
        api.reply(
            &format!("repos/{}", name),
            MockReply::Json(200, json!({"full_name": name})),
        )
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_build_from_vanity_package() {
        let api = existing(MockApi::new(), "kubernetes/metrics");
        let monitors = build_monitors(&strings(&["k8s.io/metrics"]), &[], &StubResolver, &api).await;

        assert_eq!(monitors.len(), 1);
        assert_eq!(monitors[0].package(), "k8s.io/metrics");
        assert_eq!(monitors[0].repository(), "kubernetes/metrics");
    }

    #[tokio::test]
    async fn test_unresolved_and_empty_packages_are_skipped() {
        let api = existing(MockApi::new(), "user/project");
        let packages = strings(&["", "launchpad.net/project", "github.com/user/project/sub", " "]);
        let monitors = build_monitors(&packages, &[], &StubResolver, &api).await;

        assert_eq!(monitors.len(), 1);
        assert_eq!(monitors[0].package(), "github.com/user/project/sub");
        assert_eq!(monitors[0].repository(), "user/project");
    }

    #[tokio::test]
    async fn test_missing_repositories_are_skipped() {
        let api = existing(MockApi::new(), "kubernetes/metrics");
        let monitors = build_monitors(&[], &strings(&["kubernetes/metrics", "gone/away"]), &StubResolver, &api).await;

        assert_eq!(monitors.len(), 1);
        assert_eq!(monitors[0].package(), "kubernetes/metrics");
    }

    #[tokio::test]
    async fn test_duplicate_pairs_collapse() {
        let api = existing(MockApi::new(), "o/r");
        let monitors = build_monitors(&[], &strings(&["o/r", "o/r"]), &StubResolver, &api).await;
        assert_eq!(monitors.len(), 1);
        assert_eq!(api.call_count(), 1);
    }
}
