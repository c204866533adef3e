//! Recursive tree listing for one repository at a branch or commit.

use serde::Deserialize;
use tracing::{debug, instrument, warn};

use repocorpus_shared::{EntryKind, FileEntry, join_url};

use crate::client::{ApiClient, ApiResponse};

/// Path fragment identifying an already-resolved tree endpoint.
const TREES_SEGMENT: &str = "git/trees";

/// Query that flattens nested directories into path-qualified entries.
const RECURSIVE_QUERY: &str = "?recursive=1";

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Hidden-file and extension filter applied to tree entries.
#[derive(Debug, Clone)]
pub struct TreeFilter {
    include_hidden: bool,
    extensions: Vec<String>,
}

impl Default for TreeFilter {
    fn default() -> Self {
        Self {
            include_hidden: true,
            extensions: Vec::new(),
        }
    }
}

impl TreeFilter {
    /// Build a filter; `extensions` are normalized with [`normalize_extensions`].
    pub fn new<S: AsRef<str>>(include_hidden: bool, extensions: &[S]) -> Self {
        Self {
            include_hidden,
            extensions: normalize_extensions(extensions),
        }
    }

    /// Normalized extension allow-list (empty keeps every file).
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Whether a blob at `path` passes the filter.
    pub fn keep_path(&self, path: &str) -> bool {
        let leaf = repocorpus_shared::leaf_name(path);

        if !self.include_hidden && leaf.starts_with('.') {
            return false;
        }

        if self.extensions.is_empty() {
            return true;
        }

        leaf.rsplit_once('.')
            .is_some_and(|(_, ext)| self.extensions.iter().any(|e| e == ext))
    }

    /// Whether `entry` is retained: blobs only, then [`Self::keep_path`].
    pub fn keep(&self, entry: &FileEntry) -> bool {
        entry.kind == EntryKind::Blob && self.keep_path(&entry.path)
    }
}

/// Strip everything up to the last `.` of each extension (`.nlp` → `nlp`,
/// `tar.gz` → `gz`). Entries that end up empty are dropped.
pub fn normalize_extensions<S: AsRef<str>>(extensions: &[S]) -> Vec<String> {
    extensions
        .iter()
        .filter_map(|ext| {
            let ext = ext.as_ref();
            let suffix = ext.rsplit('.').next().unwrap_or(ext);
            (!suffix.is_empty()).then(|| suffix.to_string())
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeItem {
    path: String,
    #[serde(rename = "type")]
    kind: EntryKind,
    #[serde(default)]
    url: Option<String>,
}

/// Build the recursive listing URL for a repository or tree endpoint.
///
/// URLs already containing `git/trees` are used as-is; otherwise
/// `git/trees` is joined on. `git_ref` is appended as a path segment when
/// given, and `?recursive=1` unless a `?recursive` query is present.
pub fn tree_listing_url(repo_url: &str, git_ref: Option<&str>) -> String {
    let mut url = if repo_url.contains(TREES_SEGMENT) {
        repo_url.to_string()
    } else {
        join_url(repo_url, ["git", "trees"])
    };

    if let Some(git_ref) = git_ref {
        url = join_url(&url, [git_ref]);
    }

    if !url.contains("?recursive") {
        url.push_str(RECURSIVE_QUERY);
    }
    url
}

/// List the files of one repository that pass `filter`.
///
/// `repo_url` may be a repository URL or a tree URL already resolved to a
/// branch/commit (pass `git_ref = None` in that case). Failures are logged
/// and yield an empty list.
#[instrument(skip_all, fields(repo_url = %repo_url))]
pub async fn walk_tree(
    client: &ApiClient,
    repo_url: &str,
    git_ref: Option<&str>,
    filter: &TreeFilter,
) -> Vec<FileEntry> {
    let url = tree_listing_url(repo_url, git_ref);

    let body = match client.get_json(&url).await {
        Ok(ApiResponse::Success(body)) => body,
        Ok(ApiResponse::Failure { status }) => {
            warn!(%url, %status, "unable to get contents");
            return Vec::new();
        }
        Err(e) => {
            warn!(%url, error = %e, "unable to get contents");
            return Vec::new();
        }
    };

    let listing: TreeResponse = match serde_json::from_value(body) {
        Ok(listing) => listing,
        Err(e) => {
            warn!(%url, error = %e, "malformed tree listing");
            return Vec::new();
        }
    };

    if listing.truncated {
        warn!(%url, "tree listing was truncated by the server");
    }

    let total = listing.tree.len();
    let files: Vec<FileEntry> = listing
        .tree
        .into_iter()
        .filter_map(|item| {
            let entry = FileEntry {
                repository: url.clone(),
                path: item.path,
                kind: item.kind,
                url: item.url?,
            };
            filter.keep(&entry).then_some(entry)
        })
        .collect();

    debug!(total, kept = files.len(), "tree listing filtered");
    files
}

/// Output mode of [`walk_tree`] returning only content URLs.
pub async fn file_urls(
    client: &ApiClient,
    repo_url: &str,
    git_ref: Option<&str>,
    filter: &TreeFilter,
) -> Vec<String> {
    walk_tree(client, repo_url, git_ref, filter)
        .await
        .into_iter()
        .map(|entry| entry.url)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use repocorpus_shared::{ClientConfig, Credentials};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

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

    #[test]
    fn normalizes_extensions() {
        assert_eq!(
            normalize_extensions(&[".nlp", "pat", "tar.gz", ".", ""]),
            vec!["nlp", "pat", "gz"]
        );
    }

    #[test]
    fn extension_match_is_case_sensitive() {
        let filter = TreeFilter::new(true, &["nlp"]);
        let kept: Vec<_> = ["a.py", "b.nlp", "c.NLP"]
            .into_iter()
            .filter(|p| filter.keep_path(p))
            .collect();
        assert_eq!(kept, vec!["b.nlp"]);
    }

    #[test]
    fn extension_uses_leaf_name() {
        let filter = TreeFilter::new(true, &[".nlp"]);
        assert!(filter.keep_path("spec/rules.v2/main.nlp"));
        assert!(!filter.keep_path("spec/rules.nlp/README"));
    }

    #[test]
    fn hidden_files_dropped_when_excluded() {
        let filter = TreeFilter::new(false, &[] as &[&str]);
        assert!(!filter.keep_path(".gitignore"));
        assert!(!filter.keep_path("src/.env"));
        assert!(filter.keep_path("src/main.nlp"));

        let permissive = TreeFilter::new(true, &[] as &[&str]);
        assert!(permissive.keep_path("src/.env"));
    }

    #[test]
    fn listing_url_variants() {
        assert_eq!(
            tree_listing_url("https://api.example.com/repos/o/r", Some("main")),
            "https://api.example.com/repos/o/r/git/trees/main?recursive=1"
        );
        assert_eq!(
            tree_listing_url("https://api.example.com/repos/o/r/git/trees/abc", None),
            "https://api.example.com/repos/o/r/git/trees/abc?recursive=1"
        );
        assert_eq!(
            tree_listing_url("https://api.example.com/repos/o/r/git/trees/abc?recursive=1", None),
            "https://api.example.com/repos/o/r/git/trees/abc?recursive=1"
        );
    }

    #[tokio::test]
    async fn walk_keeps_matching_blobs() {
        let server = MockServer::start().await;
        let base = server.uri();

        let listing = json!({
            "sha": "abc",
            "truncated": false,
            "tree": [
                { "path": "rules", "type": "tree", "url": format!("{base}/trees/1") },
                { "path": "rules/a.py", "type": "blob", "url": format!("{base}/blobs/1") },
                { "path": "rules/b.nlp", "type": "blob", "url": format!("{base}/blobs/2") },
                { "path": "rules/c.NLP", "type": "blob", "url": format!("{base}/blobs/3") },
                { "path": "rules/.d.nlp", "type": "blob", "url": format!("{base}/blobs/4") },
                { "path": "vendor", "type": "commit" },
            ]
        });

        Mock::given(method("GET"))
            .and(path("/repos/o/r/git/trees/main"))
            .and(query_param("recursive", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(listing))
            .mount(&server)
            .await;

        let client = client(&base);
        let repo_url = format!("{base}/repos/o/r/git/trees/main");
        let filter = TreeFilter::new(false, &["nlp"]);

        let files = walk_tree(&client, &repo_url, None, &filter).await;
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["rules/b.nlp"]);
        assert_eq!(files[0].kind, EntryKind::Blob);

        let urls = file_urls(&client, &repo_url, None, &filter).await;
        assert_eq!(urls, vec![format!("{base}/blobs/2")]);
    }

    #[tokio::test]
    async fn failed_listing_is_empty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let files = walk_tree(
            &client,
            &format!("{}/repos/o/empty", server.uri()),
            Some("main"),
            &TreeFilter::default(),
        )
        .await;
        assert!(files.is_empty());
    }
}
