//! End-to-end `scrape` pipeline: accounts → repositories → trees → contents → corpus.

use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};
use uuid::Uuid;

use repocorpus_crawler::{ApiClient, RepoFilter, TreeFilter, fanout, fetch_contents, list_repositories, walk_tree};
use repocorpus_shared::{CorpusError, FileEntry, Result, ScrapeConfig};

use crate::corpus::Corpus;

/// Result of the `scrape` pipeline.
#[derive(Debug)]
pub struct ScrapeResult {
    /// Deduplicated corpus across all accounts.
    pub corpus: Corpus,
    /// Number of accounts enumerated.
    pub accounts: usize,
    /// Accounts that yielded no traversable repositories.
    pub empty_accounts: Vec<String>,
    /// Repositories traversed.
    pub repositories: usize,
    /// Blob entries that passed the tree filters.
    pub files_listed: usize,
    /// Files successfully retrieved and decoded.
    pub files_decoded: usize,
    /// Decoded files dropped as duplicates.
    pub duplicates: usize,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when an account's enumeration starts.
    fn account_started(&self, account: &str, current: usize, total: usize);
    /// Called after a repository's tree has been listed.
    fn repository_walked(&self, repo: &str, files: usize);
    /// Called after an account's content batch completes.
    fn files_decoded(&self, account: &str, decoded: usize, requested: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &ScrapeResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn account_started(&self, _account: &str, _current: usize, _total: usize) {}
    fn repository_walked(&self, _repo: &str, _files: usize) {}
    fn files_decoded(&self, _account: &str, _decoded: usize, _requested: usize) {}
    fn done(&self, _result: &ScrapeResult) {}
}

/// Run the full scrape.
///
/// For each account, in order:
/// 1. List repositories (private, empty, and unrequested forks dropped)
/// 2. Resolve each tree template to the default branch or `git_ref`
/// 3. List trees concurrently and keep matching blobs
/// 4. Fetch and decode contents concurrently
/// 5. Dedup within the account, then fold into the run corpus
///
/// A failing account contributes nothing and the run moves on. The run fails
/// only when no account yields a repository, no file matches the filters, or
/// a content failure is configured to propagate.
#[instrument(skip_all, fields(run_id = %Uuid::now_v7(), accounts = config.accounts.len()))]
pub async fn scrape(
    client: &ApiClient,
    config: &ScrapeConfig,
    progress: &dyn ProgressReporter,
) -> Result<ScrapeResult> {
    let start = Instant::now();

    if config.accounts.is_empty() {
        return Err(CorpusError::config("no accounts given to scrape"));
    }

    let repo_filter = RepoFilter {
        include_forks: config.include_forks,
    };
    let tree_filter = TreeFilter::new(config.include_hidden, &config.extensions);

    let mut corpus = Corpus::new();
    let mut empty_accounts = Vec::new();
    let mut repositories = 0;
    let mut files_listed = 0;
    let mut files_decoded = 0;

    let total = config.accounts.len();
    for (i, account) in config.accounts.iter().enumerate() {
        progress.account_started(account, i + 1, total);

        let repos = list_repositories(client, account, repo_filter).await;
        if repos.is_empty() {
            warn!(%account, "no repositories to traverse");
            empty_accounts.push(account.clone());
            continue;
        }
        repositories += repos.len();

        info!(%account, repos = repos.len(), "retrieving files");
        let git_ref = config.git_ref.as_deref();
        let trees: Vec<(String, String)> = repos
            .iter()
            .map(|repo| (repo.full_name(), repo.tree_url(git_ref)))
            .collect();

        let entries = list_files(client, trees, &tree_filter, progress).await;
        files_listed += entries.len();

        info!(%account, files = entries.len(), "retrieving file data");
        let urls: Vec<String> = entries.into_iter().map(|e| e.url).collect();
        let retrieved = fetch_contents(client, &urls, config.content_policy).await?;
        files_decoded += retrieved.len();
        progress.files_decoded(account, retrieved.len(), urls.len());

        let account_corpus: Corpus = retrieved.into_iter().collect();
        let added = corpus.absorb(account_corpus);
        info!(%account, added, unique = corpus.len(), "account merged");
    }

    if repositories == 0 {
        return Err(CorpusError::validation(format!(
            "no repositories found for accounts: {}",
            config.accounts.join(", ")
        )));
    }
    if files_listed == 0 {
        return Err(CorpusError::validation(
            "no files matched the extension/hidden-file filters",
        ));
    }

    let result = ScrapeResult {
        duplicates: files_decoded - corpus.len(),
        corpus,
        accounts: total,
        empty_accounts,
        repositories,
        files_listed,
        files_decoded,
        elapsed: start.elapsed(),
    };

    info!(
        accounts = result.accounts,
        repositories = result.repositories,
        files_listed = result.files_listed,
        files_decoded = result.files_decoded,
        unique = result.corpus.len(),
        duration_ms = result.elapsed.as_millis(),
        "scrape completed"
    );

    progress.done(&result);
    Ok(result)
}

/// List the trees of one account's repositories concurrently.
///
/// `trees` holds `(full_name, resolved_tree_url)` pairs.
async fn list_files(
    client: &ApiClient,
    trees: Vec<(String, String)>,
    filter: &TreeFilter,
    progress: &dyn ProgressReporter,
) -> Vec<FileEntry> {
    let listings = fanout::bounded(trees, client.concurrency(), |(name, url)| {
        let client = client.clone();
        let filter = filter.clone();
        async move {
            let files = walk_tree(&client, &url, None, &filter).await;
            (name, files)
        }
    })
    .await;

    let mut entries = Vec::new();
    for (name, files) in listings.into_iter().flatten() {
        progress.repository_walked(&name, files.len());
        entries.extend(files);
    }
    entries
}
