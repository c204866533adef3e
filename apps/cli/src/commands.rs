//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use repocorpus_cleaning::{CleanConfig, clean_samples};
use repocorpus_core::pipeline::{ProgressReporter, ScrapeResult};
use repocorpus_core::{Corpus, merge, scrape, scrape_dir};
use repocorpus_crawler::ApiClient;
use repocorpus_shared::{AppConfig, ClientConfig, ContentPolicy, ScrapeConfig, init_config, load_config};
use repocorpus_storage::{
    RawDump, WriteMode, default_dump_name, ensure_writable, load_texts, save, write_indexed_json,
    write_raw_dump,
};

/// Number of sample texts echoed after a scrape.
const PREVIEW_SAMPLES: usize = 3;

/// Characters shown per previewed sample.
const PREVIEW_CHARS: usize = 200;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// repocorpus: build deduplicated text corpora from public repositories.
#[derive(Parser)]
#[command(
    name = "repocorpus",
    version,
    about = "Scrape, deduplicate, and clean text corpora from hosted git repositories.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Scrape every public repository of one or more accounts.
    Scrape {
        /// Accounts to scrape (defaults to `scrape.accounts` from config).
        accounts: Vec<String>,

        /// File extension to keep, repeatable (defaults to `scrape.extensions`).
        #[arg(short, long = "ext")]
        extensions: Vec<String>,

        /// Include forked repositories.
        #[arg(long)]
        forks: bool,

        /// Skip files whose name starts with `.`.
        #[arg(long)]
        no_hidden: bool,

        /// Branch or commit to traverse instead of each default branch.
        #[arg(long = "ref")]
        git_ref: Option<String>,

        /// Maximum in-flight requests per stage.
        #[arg(long)]
        concurrency: Option<u32>,

        /// Output path (`.bin` or `.json`); defaults to a name derived from
        /// the accounts and extensions under `output.dir`.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Overwrite the output file if it exists.
        #[arg(long)]
        force: bool,

        /// Abort on the first missing or undecodable file.
        #[arg(long)]
        strict: bool,
    },

    /// Collect matching files from a local directory tree.
    ScrapeDir {
        /// Directory to walk.
        dir: PathBuf,

        /// File extension to keep, repeatable (defaults to `scrape.extensions`).
        #[arg(short, long = "ext")]
        extensions: Vec<String>,

        /// Output path (`.bin` or `.json`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Overwrite the output file if it exists.
        #[arg(long)]
        force: bool,
    },

    /// Strip headers and redact comments, writing indexed JSON.
    Clean {
        /// Raw dump (`.bin`) or indexed JSON (`.json`) to clean.
        #[arg(short, long)]
        input: PathBuf,

        /// Destination JSON file.
        #[arg(short, long)]
        out: PathBuf,

        /// Extra name to redact, repeatable (added to `cleaning.redact_names`).
        #[arg(long = "redact")]
        redact_names: Vec<String>,

        /// Overwrite the output file if it exists.
        #[arg(long)]
        force: bool,
    },

    /// Merge several dumps into one set of unique texts.
    Merge {
        /// Input files (`.bin` or `.json`).
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Destination file (`.bin` or `.json`).
        #[arg(short, long)]
        out: PathBuf,

        /// Overwrite the output file if it exists.
        #[arg(long)]
        force: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "repocorpus=info",
        1 => "repocorpus=debug",
        _ => "repocorpus=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Scrape {
            accounts,
            extensions,
            forks,
            no_hidden,
            git_ref,
            concurrency,
            out,
            force,
            strict,
        } => {
            let overrides = ScrapeOverrides {
                accounts,
                extensions,
                forks,
                no_hidden,
                git_ref,
                concurrency,
                strict,
            };
            cmd_scrape(overrides, out, WriteMode::from_force(force)).await
        }
        Command::ScrapeDir {
            dir,
            extensions,
            out,
            force,
        } => cmd_scrape_dir(&dir, extensions, out, WriteMode::from_force(force)),
        Command::Clean {
            input,
            out,
            redact_names,
            force,
        } => cmd_clean(&input, &out, redact_names, WriteMode::from_force(force)),
        Command::Merge { inputs, out, force } => {
            cmd_merge(&inputs, &out, WriteMode::from_force(force))
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

/// Flag values layered over the `[scrape]` and `[api]` config sections.
struct ScrapeOverrides {
    accounts: Vec<String>,
    extensions: Vec<String>,
    forks: bool,
    no_hidden: bool,
    git_ref: Option<String>,
    concurrency: Option<u32>,
    strict: bool,
}

impl ScrapeOverrides {
    fn apply(self, config: &AppConfig) -> (ClientConfig, ScrapeConfig) {
        let mut client = ClientConfig::from(config);
        if let Some(concurrency) = self.concurrency {
            client.concurrency = concurrency;
        }

        let mut scrape = ScrapeConfig::from(config);
        if !self.accounts.is_empty() {
            scrape.accounts = self.accounts;
        }
        if !self.extensions.is_empty() {
            scrape.extensions = self.extensions;
        }
        scrape.include_forks |= self.forks;
        scrape.include_hidden &= !self.no_hidden;
        if self.git_ref.is_some() {
            scrape.git_ref = self.git_ref;
        }
        if self.strict {
            scrape.content_policy = ContentPolicy::strict();
        }

        (client, scrape)
    }
}

async fn cmd_scrape(overrides: ScrapeOverrides, out: Option<PathBuf>, mode: WriteMode) -> Result<()> {
    let config = load_config()?;
    let reporter = CliProgress::new();
    let (result, out) = run_scrape(&config, overrides, out, mode, &reporter).await?;

    println!();
    println!("  Scrape complete!");
    println!("  Accounts:     {}", result.accounts);
    if !result.empty_accounts.is_empty() {
        println!("  No repos:     {}", result.empty_accounts.join(", "));
    }
    println!("  Repositories: {}", result.repositories);
    println!("  Files:        {}/{} decoded", result.files_decoded, result.files_listed);
    println!("  Duplicates:   {}", result.duplicates);
    print_corpus_summary(&result.corpus, &out);
    println!("  Time:         {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

/// Resolve the output path, refuse an existing one up front, then scrape and persist.
async fn run_scrape(
    config: &AppConfig,
    overrides: ScrapeOverrides,
    out: Option<PathBuf>,
    mode: WriteMode,
    reporter: &dyn ProgressReporter,
) -> Result<(ScrapeResult, PathBuf)> {
    let (client_config, scrape_config) = overrides.apply(config);

    if !client_config.credentials.is_present() {
        info!("no credentials configured, requests are anonymous and heavily rate limited");
    }

    let out = out.unwrap_or_else(|| {
        PathBuf::from(&config.output.dir)
            .join(default_dump_name(&scrape_config.accounts, &scrape_config.extensions))
    });
    ensure_writable(&out, mode)?;

    info!(
        accounts = ?scrape_config.accounts,
        extensions = ?scrape_config.extensions,
        "starting scrape"
    );

    let client = ApiClient::new(client_config)?;
    let result = scrape(&client, &scrape_config, reporter).await?;

    let texts: Vec<String> = result.corpus.texts().map(String::from).collect();
    persist(&out, scrape_config.accounts.clone(), texts, mode)?;

    Ok((result, out))
}

fn cmd_scrape_dir(dir: &Path, extensions: Vec<String>, out: Option<PathBuf>, mode: WriteMode) -> Result<()> {
    let config = load_config()?;
    let extensions = if extensions.is_empty() {
        config.scrape.extensions.clone()
    } else {
        extensions
    };

    let out = match out {
        Some(out) => out,
        None => {
            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| eyre!("cannot derive an output name from '{}', pass --out", dir.display()))?;
            PathBuf::from(&config.output.dir).join(format!("{name}_local_data.bin"))
        }
    };
    ensure_writable(&out, mode)?;

    let corpus = scrape_dir(dir, &extensions)?;
    let texts: Vec<String> = corpus.texts().map(String::from).collect();
    save(&out, &texts, mode)?;

    println!();
    println!("  Directory scrape complete!");
    print_corpus_summary(&corpus, &out);
    println!();

    Ok(())
}

fn cmd_clean(input: &Path, out: &Path, extra_names: Vec<String>, mode: WriteMode) -> Result<()> {
    ensure_writable(out, mode)?;
    let config = load_config()?;
    let mut clean_config = CleanConfig::from(&config.cleaning);
    clean_config.redact_names.extend(extra_names);

    let samples = load_texts(input)?;
    let cleaned = clean_samples(&samples, &clean_config)?;
    let texts: Vec<&str> = cleaned.values().map(String::as_str).collect();
    write_indexed_json(out, &texts, mode)?;

    println!();
    println!("  Cleaned {} of {} samples", cleaned.len(), samples.len());
    println!("  Output: {}", out.display());
    println!();

    Ok(())
}

fn cmd_merge(inputs: &[PathBuf], out: &Path, mode: WriteMode) -> Result<()> {
    ensure_writable(out, mode)?;
    let loaded = inputs
        .iter()
        .map(|path| load_texts(path))
        .collect::<repocorpus_shared::Result<Vec<_>>>()?;
    let total: usize = loaded.iter().map(Vec::len).sum();

    let merged: Vec<String> = merge(loaded).into_iter().collect();
    save(out, &merged, mode)?;

    info!(inputs = inputs.len(), total, unique = merged.len(), "merged");
    println!();
    println!("  Merged {} files: {} unique of {} texts", inputs.len(), merged.len(), total);
    println!("  Output: {}", out.display());
    println!();

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

/// Write a raw dump carrying `accounts` for `.bin`, plain indexed JSON otherwise.
fn persist(path: &Path, accounts: Vec<String>, texts: Vec<String>, mode: WriteMode) -> Result<()> {
    if path.extension().is_some_and(|ext| ext == "bin") {
        write_raw_dump(path, &RawDump::new(accounts, texts), mode)?;
    } else {
        save(path, &texts, mode)?;
    }
    Ok(())
}

fn print_corpus_summary(corpus: &Corpus, out: &Path) {
    println!("  Samples:      {}", corpus.len());
    println!("  Lines:        {}", corpus.total_lines());
    println!("  Output:       {}", out.display());

    for (i, text) in corpus.texts().take(PREVIEW_SAMPLES).enumerate() {
        let preview: String = text.chars().take(PREVIEW_CHARS).collect();
        println!();
        println!("  --- sample {} ---", i + 1);
        for line in preview.lines() {
            println!("  {line}");
        }
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn account_started(&self, account: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Listing repositories [{current}/{total}] {account}"));
    }

    fn repository_walked(&self, repo: &str, files: usize) {
        self.spinner
            .set_message(format!("Walked {repo} ({files} matching files)"));
    }

    fn files_decoded(&self, account: &str, decoded: usize, requested: usize) {
        self.spinner
            .set_message(format!("Decoded {decoded}/{requested} files for {account}"));
    }

    fn done(&self, _result: &ScrapeResult) {
        self.spinner.finish_and_clear();
    }
}
