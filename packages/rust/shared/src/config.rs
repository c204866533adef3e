//! Application configuration for repocorpus.
//!
//! User config lives at `~/.repocorpus/repocorpus.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CorpusError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "repocorpus.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".repocorpus";

// ---------------------------------------------------------------------------
// Config structs (matching repocorpus.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Hosting API connection settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Default scrape parameters.
    #[serde(default)]
    pub scrape: ScrapeDefaults,

    /// Output locations.
    #[serde(default)]
    pub output: OutputConfig,

    /// Cleaning pass settings.
    #[serde(default)]
    pub cleaning: CleaningConfig,
}

/// `[api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API root, e.g. `https://api.github.com/`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Username sent with basic auth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Name of the env var holding the access token (never store the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum in-flight requests per fan-out stage. `1` is fully sequential.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// `per_page` query value for repository listings.
    #[serde(default = "default_repos_per_page")]
    pub repos_per_page: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            username: None,
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
            repos_per_page: default_repos_per_page(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.github.com/".into()
}
fn default_token_env() -> String {
    "GH_TOKEN".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_concurrency() -> u32 {
    4
}
fn default_repos_per_page() -> u32 {
    100
}

/// `[scrape]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeDefaults {
    /// Accounts to scrape when none are given on the command line.
    #[serde(default)]
    pub accounts: Vec<String>,

    /// File extensions to keep. Empty keeps every file.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Traverse forked repositories too.
    #[serde(default)]
    pub include_forks: bool,

    /// Keep files whose name starts with `.`.
    #[serde(default = "default_true")]
    pub include_hidden: bool,

    /// Branch or commit to traverse instead of each repository's default branch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,

    /// Fail the run when a content response has no payload.
    #[serde(default)]
    pub raise_missing_content: bool,

    /// Fail the run when a payload cannot be decoded.
    #[serde(default)]
    pub raise_decode_errors: bool,
}

impl Default for ScrapeDefaults {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            extensions: Vec::new(),
            include_forks: false,
            include_hidden: true,
            git_ref: None,
            raise_missing_content: false,
            raise_decode_errors: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory raw scrape dumps are written to.
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "data".into()
}

/// `[cleaning]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Proper names removed from comment lines (matched case-insensitively).
    #[serde(default)]
    pub redact_names: Vec<String>,
}

// ---------------------------------------------------------------------------
// Runtime config (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Username/token pair attached to every outbound request.
#[derive(Clone, Default)]
pub struct Credentials {
    pub username: Option<String>,
    pub token: Option<String>,
}

impl Credentials {
    /// No credentials; requests go out anonymously.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Whether any credential is present.
    pub fn is_present(&self) -> bool {
        self.username.is_some() || self.token.is_some()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Runtime HTTP client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root.
    pub base_url: String,
    /// Auth attached to each request.
    pub credentials: Credentials,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Fan-out bound.
    pub concurrency: u32,
    /// `per_page` for repository listings.
    pub repos_per_page: u32,
}

impl From<&AppConfig> for ClientConfig {
    fn from(config: &AppConfig) -> Self {
        let token = std::env::var(&config.api.token_env)
            .ok()
            .filter(|t| !t.is_empty());
        Self {
            base_url: config.api.base_url.clone(),
            credentials: Credentials {
                username: config.api.username.clone(),
                token,
            },
            timeout_secs: config.api.timeout_secs,
            concurrency: config.api.concurrency,
            repos_per_page: config.api.repos_per_page,
        }
    }
}

/// What to do with one category of per-file content failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log a warning and continue with the remaining files.
    #[default]
    Skip,
    /// Surface the failure to the caller.
    Propagate,
}

impl FailurePolicy {
    /// `Propagate` when `raise` is set, `Skip` otherwise.
    pub fn raise_if(raise: bool) -> Self {
        if raise { Self::Propagate } else { Self::Skip }
    }
}

/// Independent policies for the two content failure categories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentPolicy {
    /// Response lacks the `content` payload.
    pub missing_content: FailurePolicy,
    /// Payload is not valid base64 or not UTF-8.
    pub decode_failure: FailurePolicy,
}

impl ContentPolicy {
    /// Propagate both categories.
    pub fn strict() -> Self {
        Self {
            missing_content: FailurePolicy::Propagate,
            decode_failure: FailurePolicy::Propagate,
        }
    }
}

/// Runtime scrape configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Accounts to enumerate, in order.
    pub accounts: Vec<String>,
    /// Extension allow-list (empty keeps all files).
    pub extensions: Vec<String>,
    /// Traverse forks.
    pub include_forks: bool,
    /// Keep dot-files.
    pub include_hidden: bool,
    /// Branch/commit override for every repository.
    pub git_ref: Option<String>,
    /// Content failure handling.
    pub content_policy: ContentPolicy,
}

impl From<&AppConfig> for ScrapeConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            accounts: config.scrape.accounts.clone(),
            extensions: config.scrape.extensions.clone(),
            include_forks: config.scrape.include_forks,
            include_hidden: config.scrape.include_hidden,
            git_ref: config.scrape.git_ref.clone(),
            content_policy: ContentPolicy {
                missing_content: FailurePolicy::raise_if(config.scrape.raise_missing_content),
                decode_failure: FailurePolicy::raise_if(config.scrape.raise_decode_errors),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.repocorpus/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| CorpusError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.repocorpus/repocorpus.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CorpusError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| CorpusError::config(format!("failed to parse {}: {e}", path.display())))?;
    validate_base_url(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CorpusError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CorpusError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CorpusError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that `api.base_url` is an absolute URL.
pub fn validate_base_url(config: &AppConfig) -> Result<()> {
    url::Url::parse(&config.api.base_url).map(|_| ()).map_err(|e| {
        CorpusError::config(format!("invalid api.base_url '{}': {e}", config.api.base_url))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("base_url"));
        assert!(toml_str.contains("GH_TOKEN"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.api.timeout_secs, 30);
        assert_eq!(parsed.api.token_env, "GH_TOKEN");
        assert!(parsed.scrape.include_hidden);
        assert!(!parsed.scrape.include_forks);
    }

    #[test]
    fn config_with_scrape_section() {
        let toml_str = r#"
[scrape]
accounts = ["octocat", "hubot"]
extensions = [".nlp", "pat"]
include_hidden = false
raise_decode_errors = true

[cleaning]
redact_names = ["elvis"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.scrape.accounts, vec!["octocat", "hubot"]);
        assert_eq!(config.cleaning.redact_names, vec!["elvis"]);

        let scrape = ScrapeConfig::from(&config);
        assert!(!scrape.include_hidden);
        assert_eq!(scrape.content_policy.missing_content, FailurePolicy::Skip);
        assert_eq!(scrape.content_policy.decode_failure, FailurePolicy::Propagate);
    }

    #[test]
    fn client_config_reads_missing_token_as_anonymous() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.api.token_env = "RC_TEST_NONEXISTENT_TOKEN_12345".into();
        let client = ClientConfig::from(&config);
        assert!(!client.credentials.is_present());
        assert_eq!(client.repos_per_page, 100);
    }

    #[test]
    fn credentials_debug_hides_token() {
        let creds = Credentials {
            username: Some("octocat".into()),
            token: Some("ghp_secret".into()),
        };
        let shown = format!("{creds:?}");
        assert!(shown.contains("octocat"));
        assert!(!shown.contains("ghp_secret"));
    }

    #[test]
    fn base_url_validation() {
        let mut config = AppConfig::default();
        assert!(validate_base_url(&config).is_ok());
        config.api.base_url = "not a url".into();
        let err = validate_base_url(&config).unwrap_err();
        assert!(err.to_string().contains("invalid api.base_url"));
    }
}
