//! File persistence for scraped corpora.
//!
//! Two formats are supported:
//! - **Indexed JSON** (`.json`): `{"0": "...", "1": "..."}`, 4-space indented,
//!   the input format for cleaning.
//! - **Raw dump** (`.bin`): an opaque `bincode` blob holding the texts plus
//!   scrape metadata, written straight after a scrape.
//!
//! All writes create missing parent directories and go through a temp file
//! that is moved into place. Create-only writes never replace a file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use repocorpus_shared::{CorpusError, Result};

/// Bumped whenever [`RawDump`]'s layout changes.
pub const RAW_DUMP_VERSION: u32 = 1;

/// Maximum length of the account part of [`default_dump_name`].
const MAX_ACCOUNTS_LEN: usize = 100;

const DUMP_SUFFIX: &str = "_github_data.bin";

/// Whether an existing destination may be replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Fail with [`CorpusError::AlreadyExists`] if the destination exists.
    #[default]
    CreateNew,
    /// Replace any existing file.
    Overwrite,
}

impl WriteMode {
    pub fn from_force(force: bool) -> Self {
        if force { Self::Overwrite } else { Self::CreateNew }
    }
}

/// Raw scrape output prior to cleaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDump {
    pub format_version: u32,
    pub scraped_at: DateTime<Utc>,
    /// Accounts the texts were scraped from (empty for local or merged dumps).
    pub accounts: Vec<String>,
    pub texts: Vec<String>,
}

impl RawDump {
    /// Stamp a new dump with the current version and time.
    pub fn new(accounts: Vec<String>, texts: Vec<String>) -> Self {
        Self {
            format_version: RAW_DUMP_VERSION,
            scraped_at: Utc::now(),
            accounts,
            texts,
        }
    }
}

// ---------------------------------------------------------------------------
// Indexed JSON
// ---------------------------------------------------------------------------

/// Write `texts` as `{"<index>": text}` with 4-space indentation.
#[instrument(skip(texts), fields(path = %path.display(), entries = texts.len()))]
pub fn write_indexed_json<S: AsRef<str>>(path: &Path, texts: &[S], mode: WriteMode) -> Result<()> {
    let indexed: BTreeMap<usize, &str> = texts.iter().map(AsRef::as_ref).enumerate().collect();

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    indexed
        .serialize(&mut ser)
        .map_err(|e| CorpusError::Serialization(e.to_string()))?;

    write_guarded(path, &buf, mode)?;
    info!("wrote {} entries to {}", texts.len(), path.display());
    Ok(())
}

/// Read an indexed JSON file. Keys must be non-negative integers.
pub fn read_indexed_json(path: &Path) -> Result<BTreeMap<usize, String>> {
    let raw = fs::read_to_string(path).map_err(|e| CorpusError::io(path, e))?;
    let parsed: BTreeMap<String, String> = serde_json::from_str(&raw)
        .map_err(|e| CorpusError::parse(format!("{}: {e}", path.display())))?;

    parsed
        .into_iter()
        .map(|(key, text)| {
            key.parse::<usize>()
                .map(|index| (index, text))
                .map_err(|_| CorpusError::parse(format!("{}: non-integer key '{key}'", path.display())))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Raw dump
// ---------------------------------------------------------------------------

#[instrument(skip(dump), fields(path = %path.display(), entries = dump.texts.len()))]
pub fn write_raw_dump(path: &Path, dump: &RawDump, mode: WriteMode) -> Result<()> {
    let bytes = bincode::serialize(dump).map_err(|e| CorpusError::Serialization(e.to_string()))?;
    write_guarded(path, &bytes, mode)?;
    info!("wrote {} entries to {}", dump.texts.len(), path.display());
    Ok(())
}

pub fn read_raw_dump(path: &Path) -> Result<RawDump> {
    let bytes = fs::read(path).map_err(|e| CorpusError::io(path, e))?;
    let dump: RawDump = bincode::deserialize(&bytes)
        .map_err(|e| CorpusError::Serialization(format!("{}: {e}", path.display())))?;

    if dump.format_version != RAW_DUMP_VERSION {
        return Err(CorpusError::validation(format!(
            "{}: unsupported dump version {} (expected {RAW_DUMP_VERSION})",
            path.display(),
            dump.format_version
        )));
    }
    Ok(dump)
}

// ---------------------------------------------------------------------------
// Extension dispatch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    IndexedJson,
    RawDump,
}

fn format_of(path: &Path) -> Result<Format> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(Format::IndexedJson),
        Some("bin") => Ok(Format::RawDump),
        _ => Err(CorpusError::validation(format!(
            "unsupported file type for {}: must be '.json' or '.bin'",
            path.display()
        ))),
    }
}

/// Save `texts` in the format implied by `path`'s extension.
pub fn save<S: AsRef<str>>(path: &Path, texts: &[S], mode: WriteMode) -> Result<()> {
    match format_of(path)? {
        Format::IndexedJson => write_indexed_json(path, texts, mode),
        Format::RawDump => {
            let texts = texts.iter().map(|t| t.as_ref().to_string()).collect();
            write_raw_dump(path, &RawDump::new(Vec::new(), texts), mode)
        }
    }
}

/// Load texts from either format, in stored order.
pub fn load_texts(path: &Path) -> Result<Vec<String>> {
    match format_of(path)? {
        Format::IndexedJson => Ok(read_indexed_json(path)?.into_values().collect()),
        Format::RawDump => Ok(read_raw_dump(path)?.texts),
    }
}

/// File name for a raw dump of `accounts` filtered to `extensions`.
pub fn default_dump_name<A, E>(accounts: &[A], extensions: &[E]) -> String
where
    A: AsRef<str>,
    E: AsRef<str>,
{
    let accounts: String = accounts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .take(MAX_ACCOUNTS_LEN)
        .collect();
    let extensions = extensions
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("_");

    format!("{accounts}_{extensions}{DUMP_SUFFIX}")
}

// ---------------------------------------------------------------------------
// Guarded atomic write
// ---------------------------------------------------------------------------

/// Fail early if a [`WriteMode::CreateNew`] write to `path` would be refused.
///
/// Callers run this before expensive work; the write itself still refuses
/// to replace a file that appears in between.
pub fn ensure_writable(path: &Path, mode: WriteMode) -> Result<()> {
    if mode == WriteMode::CreateNew && path.exists() {
        return Err(CorpusError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn write_guarded(path: &Path, bytes: &[u8], mode: WriteMode) -> Result<()> {
    ensure_writable(path, mode)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CorpusError::io(parent, e))?;
    }

    let tmp = temp_path(path);
    fs::write(&tmp, bytes).map_err(|e| CorpusError::io(&tmp, e))?;
    publish(&tmp, path, mode)?;

    debug!(bytes = bytes.len(), "file written");
    Ok(())
}

/// Move the finished temp file into place.
///
/// `CreateNew` links instead of renaming, so an existing destination is
/// never replaced.
fn publish(tmp: &Path, path: &Path, mode: WriteMode) -> Result<()> {
    let published = match mode {
        WriteMode::Overwrite => fs::rename(tmp, path),
        WriteMode::CreateNew => fs::hard_link(tmp, path),
    };

    if mode == WriteMode::CreateNew || published.is_err() {
        let _ = fs::remove_file(tmp);
    }

    match published {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(CorpusError::AlreadyExists {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(CorpusError::io(path, e)),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("repocorpus-storage-{}", Uuid::now_v7()))
    }

    #[test]
    fn indexed_json_layout() {
        let dir = temp_dir();
        let path = dir.join("nested/clean.json");

        write_indexed_json(&path, &["a", "b\nc"], WriteMode::CreateNew).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(raw, "{\n    \"0\": \"a\",\n    \"1\": \"b\\nc\"\n}");

        let back = read_indexed_json(&path).unwrap();
        assert_eq!(back.get(&1).map(String::as_str), Some("b\nc"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn guarded_write_refuses_existing() {
        let dir = temp_dir();
        let path = dir.join("out.json");

        write_indexed_json(&path, &["first"], WriteMode::CreateNew).unwrap();
        let err = write_indexed_json(&path, &["second"], WriteMode::CreateNew).unwrap_err();
        assert!(matches!(err, CorpusError::AlreadyExists { .. }));
        assert_eq!(load_texts(&path).unwrap(), vec!["first"]);

        write_indexed_json(&path, &["second"], WriteMode::Overwrite).unwrap();
        assert_eq!(load_texts(&path).unwrap(), vec!["second"]);
        assert!(!temp_path(&path).exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn create_new_never_replaces_a_late_file() {
        let dir = temp_dir();
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("late.json");
        let tmp = temp_path(&path);

        // Destination shows up after the pre-flight check passed.
        fs::write(&tmp, "new").unwrap();
        fs::write(&path, "existing").unwrap();

        let err = publish(&tmp, &path, WriteMode::CreateNew).unwrap_err();
        assert!(matches!(err, CorpusError::AlreadyExists { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "existing");
        assert!(!tmp.exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn ensure_writable_checks_mode() {
        let dir = temp_dir();
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("out.bin");

        ensure_writable(&path, WriteMode::CreateNew).unwrap();
        fs::write(&path, "x").unwrap();
        assert!(matches!(
            ensure_writable(&path, WriteMode::CreateNew),
            Err(CorpusError::AlreadyExists { .. })
        ));
        ensure_writable(&path, WriteMode::Overwrite).unwrap();

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn raw_dump_keeps_metadata() {
        let dir = temp_dir();
        let path = dir.join("raw.bin");

        let dump = RawDump::new(vec!["alice".into()], vec!["x".into(), "y".into()]);
        write_raw_dump(&path, &dump, WriteMode::CreateNew).unwrap();
        assert_eq!(read_raw_dump(&path).unwrap(), dump);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn indexed_json_sorts_numerically() {
        let dir = temp_dir();
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("keys.json");
        fs::write(&path, r#"{"10": "ten", "2": "two"}"#).unwrap();

        assert_eq!(load_texts(&path).unwrap(), vec!["two", "ten"]);

        fs::write(&path, r#"{"x": "bad"}"#).unwrap();
        assert!(matches!(read_indexed_json(&path), Err(CorpusError::Parse { .. })));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn save_dispatches_on_extension() {
        let dir = temp_dir();

        save(&dir.join("a.json"), &["t"], WriteMode::CreateNew).unwrap();
        save(&dir.join("a.bin"), &["t"], WriteMode::CreateNew).unwrap();
        assert_eq!(load_texts(&dir.join("a.bin")).unwrap(), vec!["t"]);

        let err = save(&dir.join("a.pkl"), &["t"], WriteMode::CreateNew).unwrap_err();
        assert!(matches!(err, CorpusError::Validation { .. }));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn dump_name_truncates_accounts() {
        assert_eq!(
            default_dump_name(&["alice", "bob"], &["nlp", "pat"]),
            "alice_bob_nlp_pat_github_data.bin"
        );

        let long = vec!["a".repeat(80), "b".repeat(80)];
        let name = default_dump_name(&long, &["nlp"]);
        assert_eq!(name.len(), 100 + "_nlp_github_data.bin".len());
        assert!(name.starts_with(&format!("{}_{}", "a".repeat(80), "b".repeat(19))));
    }
}
