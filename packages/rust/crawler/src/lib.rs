//! Hosting-API crawler: repository enumeration, tree traversal, and content retrieval.
//!
//! This crate provides:
//! - [`client`]: authenticated JSON client with per-request timeouts
//! - [`repos`]: account repository listing with visibility/fork/size filters
//! - [`tree`]: recursive tree listing with extension and hidden-file filters
//! - [`content`]: blob retrieval and base64 decoding with configurable failure policy
//! - [`fanout`]: bounded concurrent execution of independent requests

pub mod client;
pub mod content;
pub mod fanout;
pub mod repos;
pub mod tree;

pub use client::{ApiClient, ApiResponse};
pub use content::{decode_content, fetch_contents};
pub use repos::{RepoFilter, RepoUrlKind, filter_repositories, list_repositories, repository_urls};
pub use tree::{TreeFilter, file_urls, normalize_extensions, tree_listing_url, walk_tree};
