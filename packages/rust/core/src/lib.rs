//! Corpus aggregation and end-to-end scrape workflows for repocorpus.
//!
//! This crate ties the crawler together with deduplication into the
//! `scrape` pipeline, and provides the same aggregation for local trees.

pub mod corpus;
pub mod local;
pub mod pipeline;

pub use corpus::{Corpus, CorpusEntry, CorpusInput, line_count, merge};
pub use local::scrape_dir;
pub use pipeline::{ProgressReporter, ScrapeResult, SilentProgress, scrape};
