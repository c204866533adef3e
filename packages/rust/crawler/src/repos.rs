//! Repository enumeration for one account.
//!
//! One listing request per account. A failed listing degrades to an empty
//! result so the remaining accounts are still enumerated.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use repocorpus_shared::{DEFAULT_BRANCH, RepositoryDescriptor, join_url};

use crate::client::{ApiClient, ApiResponse};

/// Visibility/fork filter applied to enumerated repositories.
///
/// Private and empty repositories are always excluded.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepoFilter {
    /// Keep forked repositories.
    pub include_forks: bool,
}

impl RepoFilter {
    /// Whether `repo` should be traversed.
    pub fn keep(&self, repo: &RepositoryDescriptor) -> bool {
        !repo.private && repo.size > 0 && (self.include_forks || !repo.fork)
    }
}

/// Which URL [`repository_urls`] returns for each repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoUrlKind {
    /// The repository's canonical API URL.
    Canonical,
    /// The tree-traversal template.
    Trees,
}

/// Repository record as returned by `GET /users/{account}/repos`.
#[derive(Debug, Deserialize)]
struct RepoRecord {
    name: String,
    #[serde(default)]
    owner: Option<OwnerRecord>,
    #[serde(default)]
    default_branch: Option<String>,
    fork: bool,
    private: bool,
    size: u64,
    url: String,
    trees_url: String,
}

#[derive(Debug, Deserialize)]
struct OwnerRecord {
    login: String,
}

impl RepoRecord {
    fn into_descriptor(self, account: &str) -> RepositoryDescriptor {
        RepositoryDescriptor {
            owner: self
                .owner
                .map(|o| o.login)
                .unwrap_or_else(|| account.to_string()),
            name: self.name,
            default_branch: self
                .default_branch
                .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            fork: self.fork,
            private: self.private,
            size: self.size,
            url: self.url,
            trees_url: self.trees_url,
        }
    }
}

/// List the repositories of `account` that pass `filter`.
///
/// Never fails: a non-success status, transport error, or malformed body is
/// logged and yields an empty list.
#[instrument(skip_all, fields(account = %account))]
pub async fn list_repositories(
    client: &ApiClient,
    account: &str,
    filter: RepoFilter,
) -> Vec<RepositoryDescriptor> {
    let url = format!(
        "{}?per_page={}",
        join_url(client.base_url(), ["users", account, "repos"]),
        client.repos_per_page()
    );

    let body = match client.get_json(&url).await {
        Ok(ApiResponse::Success(body)) => body,
        Ok(ApiResponse::Failure { status }) => {
            warn!(%url, %status, "unable to get repos");
            return Vec::new();
        }
        Err(e) => {
            warn!(%url, error = %e, "unable to get repos");
            return Vec::new();
        }
    };

    let records = parse_repo_records(body, account);
    info!(count = records.len(), "retrieved repository records");

    filter_repositories(records, filter)
}

/// Output mode of [`list_repositories`] returning only one URL per repository.
pub async fn repository_urls(
    client: &ApiClient,
    account: &str,
    filter: RepoFilter,
    kind: RepoUrlKind,
) -> Vec<String> {
    list_repositories(client, account, filter)
        .await
        .into_iter()
        .map(|repo| match kind {
            RepoUrlKind::Canonical => repo.url,
            RepoUrlKind::Trees => repo.trees_url,
        })
        .collect()
}

/// Apply `filter`, logging every excluded repository at debug level.
pub fn filter_repositories(
    repos: Vec<RepositoryDescriptor>,
    filter: RepoFilter,
) -> Vec<RepositoryDescriptor> {
    repos
        .into_iter()
        .filter(|repo| {
            let keep = filter.keep(repo);
            if !keep {
                debug!(
                    repo = %repo.full_name(),
                    private = repo.private,
                    fork = repo.fork,
                    size = repo.size,
                    "skipping repository"
                );
            }
            keep
        })
        .collect()
}

/// Parse the listing body. Records missing required fields are skipped.
fn parse_repo_records(body: Value, account: &str) -> Vec<RepositoryDescriptor> {
    let Value::Array(items) = body else {
        warn!(account, "repository listing is not an array");
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<RepoRecord>(item) {
            Ok(record) => Some(record.into_descriptor(account)),
            Err(e) => {
                warn!(account, error = %e, "skipping malformed repository record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use repocorpus_shared::{ClientConfig, Credentials};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record(name: &str, private: bool, fork: bool, size: u64) -> Value {
        json!({
            "name": name,
            "owner": { "login": "octocat" },
            "default_branch": "main",
            "private": private,
            "fork": fork,
            "size": size,
            "url": format!("https://api.example.com/repos/octocat/{name}"),
            "trees_url": format!("https://api.example.com/repos/octocat/{name}/git/trees{{/sha}}"),
        })
    }

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new(ClientConfig {
            base_url: base_url.to_string(),
            credentials: Credentials::anonymous(),
            timeout_secs: 5,
            concurrency: 1,
            repos_per_page: 100,
        })
        .expect("build client")
    }

    fn mixed_listing() -> Value {
        json!([
            record("secret", true, false, 10),
            record("empty", false, false, 0),
            record("forked", false, true, 10),
            record("valid", false, false, 10),
        ])
    }

    #[test]
    fn filter_keeps_only_valid() {
        let repos = parse_repo_records(mixed_listing(), "octocat");
        assert_eq!(repos.len(), 4);

        let kept = filter_repositories(repos, RepoFilter::default());
        let names: Vec<_> = kept.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["valid"]);
    }

    #[test]
    fn filter_with_forks_requested() {
        let repos = parse_repo_records(mixed_listing(), "octocat");
        let kept = filter_repositories(repos, RepoFilter { include_forks: true });
        let names: Vec<_> = kept.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["forked", "valid"]);
    }

    #[test]
    fn missing_owner_and_branch_fall_back() {
        let body = json!([{
            "name": "bare",
            "private": false,
            "fork": false,
            "size": 3,
            "url": "u",
            "trees_url": "t{/sha}",
        }]);
        let repos = parse_repo_records(body, "hubot");
        assert_eq!(repos[0].owner, "hubot");
        assert_eq!(repos[0].default_branch, "main");
    }

    #[test]
    fn malformed_records_are_skipped() {
        let body = json!([{ "name": "no-flags" }, record("ok", false, false, 1)]);
        let repos = parse_repo_records(body, "octocat");
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].name, "ok");
    }

    #[tokio::test]
    async fn list_repositories_from_mock() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/octocat/repos"))
            .and(query_param("per_page", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mixed_listing()))
            .mount(&server)
            .await;

        let repos = list_repositories(&client(&server.uri()), "octocat", RepoFilter::default()).await;
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].full_name(), "octocat/valid");
    }

    #[tokio::test]
    async fn failed_listing_is_empty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/ghost/repos"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let repos = list_repositories(&client(&server.uri()), "ghost", RepoFilter::default()).await;
        assert!(repos.is_empty());
    }

    #[tokio::test]
    async fn url_only_modes() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/users/octocat/repos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(mixed_listing()))
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let canonical =
            repository_urls(&client, "octocat", RepoFilter::default(), RepoUrlKind::Canonical)
                .await;
        assert_eq!(canonical, vec!["https://api.example.com/repos/octocat/valid"]);

        let trees =
            repository_urls(&client, "octocat", RepoFilter::default(), RepoUrlKind::Trees).await;
        assert_eq!(
            trees,
            vec!["https://api.example.com/repos/octocat/valid/git/trees{/sha}"]
        );
    }
}
