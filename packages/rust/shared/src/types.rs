//! Core domain types shared by the crawler, pipeline, and storage crates.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::endpoint::resolve_path_parameter;

/// Placeholder name used by the hosting API in `trees_url` templates.
pub const TREE_SHA_PARAM: &str = "sha";

/// Branch assumed when a repository record omits `default_branch`.
pub const DEFAULT_BRANCH: &str = "main";

// ---------------------------------------------------------------------------
// RepositoryDescriptor
// ---------------------------------------------------------------------------

/// Summary record for one repository, as returned by account enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    /// Owning account login.
    pub owner: String,
    /// Repository name.
    pub name: String,
    /// Default branch (or ref) to traverse.
    pub default_branch: String,
    /// Whether the repository is a fork.
    pub fork: bool,
    /// Whether the repository is private.
    pub private: bool,
    /// Repository size in kilobytes as reported by the API; `0` means empty.
    pub size: u64,
    /// Canonical API URL of the repository.
    pub url: String,
    /// Tree-traversal endpoint template (contains `{/sha}`).
    pub trees_url: String,
}

impl RepositoryDescriptor {
    /// `owner/name` slug for logging.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Resolve the tree-traversal template to a concrete branch or commit.
    ///
    /// Uses `git_ref` when given, otherwise the default branch.
    pub fn tree_url(&self, git_ref: Option<&str>) -> String {
        let target = git_ref.unwrap_or(&self.default_branch);
        resolve_path_parameter(&self.trees_url, TREE_SHA_PARAM, target)
    }
}

// ---------------------------------------------------------------------------
// FileEntry
// ---------------------------------------------------------------------------

/// Kind of an entry in a recursive tree listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A file.
    Blob,
    /// A directory.
    Tree,
    /// Anything else the API reports (e.g. `commit` for submodules).
    #[serde(other)]
    Other,
}

/// One entry produced by a tree traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Tree listing URL this entry came from.
    pub repository: String,
    /// Path relative to the repository root.
    pub path: String,
    /// Entry kind.
    pub kind: EntryKind,
    /// Content endpoint for this entry.
    pub url: String,
}

impl FileEntry {
    /// Final path component.
    pub fn leaf(&self) -> &str {
        leaf_name(&self.path)
    }
}

/// Final `/`-delimited component of a path.
pub fn leaf_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

// ---------------------------------------------------------------------------
// RetrievedFile
// ---------------------------------------------------------------------------

/// Decoded content of one file, with the URL it was fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedFile {
    /// Content endpoint the text was fetched from.
    pub source_url: String,
    /// Decoded UTF-8 text.
    pub text: String,
}

// ---------------------------------------------------------------------------
// Deduplication key
// ---------------------------------------------------------------------------

/// Deduplication key of a text: SHA-256 hex digest of the exact bytes.
///
/// No trimming or normalization is applied; two texts are the same corpus
/// entry iff their keys are equal.
pub fn content_key(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> RepositoryDescriptor {
        RepositoryDescriptor {
            owner: "octocat".into(),
            name: "hello".into(),
            default_branch: "trunk".into(),
            fork: false,
            private: false,
            size: 12,
            url: "https://api.example.com/repos/octocat/hello".into(),
            trees_url: "https://api.example.com/repos/octocat/hello/git/trees{/sha}".into(),
        }
    }

    #[test]
    fn tree_url_uses_default_branch() {
        assert_eq!(
            descriptor().tree_url(None),
            "https://api.example.com/repos/octocat/hello/git/trees/trunk"
        );
    }

    #[test]
    fn tree_url_prefers_override() {
        assert!(descriptor().tree_url(Some("abc123")).ends_with("/git/trees/abc123"));
    }

    #[test]
    fn entry_kind_deserializes_unknown() {
        let kind: EntryKind = serde_json::from_str("\"commit\"").expect("parse kind");
        assert_eq!(kind, EntryKind::Other);
        let kind: EntryKind = serde_json::from_str("\"blob\"").expect("parse kind");
        assert_eq!(kind, EntryKind::Blob);
    }

    #[test]
    fn leaf_of_nested_path() {
        assert_eq!(leaf_name("src/rules/.hidden.nlp"), ".hidden.nlp");
        assert_eq!(leaf_name("README"), "README");
    }

    #[test]
    fn content_key_is_exact() {
        assert_eq!(
            content_key("hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_ne!(content_key("hello world"), content_key("hello world\n"));
    }
}
