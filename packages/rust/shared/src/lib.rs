//! Shared types, error model, and configuration for repocorpus.
//!
//! This crate is the foundation depended on by all other repocorpus crates.
//! It provides:
//! - [`CorpusError`]: the unified error type
//! - Domain types ([`RepositoryDescriptor`], [`FileEntry`], [`RetrievedFile`])
//! - Endpoint template resolution and URL joining ([`endpoint`])
//! - Configuration ([`AppConfig`], [`ClientConfig`], [`ScrapeConfig`], config loading)

pub mod config;
pub mod endpoint;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiConfig, AppConfig, CleaningConfig, ClientConfig, ContentPolicy, Credentials,
    FailurePolicy, OutputConfig, ScrapeConfig, ScrapeDefaults, config_dir, config_file_path,
    init_config, load_config, load_config_from, validate_base_url,
};
pub use endpoint::{join_url, resolve_path_parameter, resolve_path_parameters};
pub use error::{CorpusError, Result};
pub use types::{
    DEFAULT_BRANCH, EntryKind, FileEntry, RepositoryDescriptor, RetrievedFile, TREE_SHA_PARAM,
    content_key, leaf_name,
};
