//! Scrape a local directory tree into a [`Corpus`].

use std::path::Path;

use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use repocorpus_crawler::TreeFilter;
use repocorpus_shared::{CorpusError, Result};

use crate::corpus::Corpus;

/// Recursively collect every file under `dir` whose extension is in
/// `extensions` (empty keeps all files).
///
/// Extension matching and dedup follow the remote path exactly. Hidden files
/// are included. Files that cannot be read as UTF-8 are warned and skipped.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn scrape_dir<S: AsRef<str>>(dir: &Path, extensions: &[S]) -> Result<Corpus> {
    if !dir.is_dir() {
        return Err(CorpusError::validation(format!(
            "not a directory: {}",
            dir.display()
        )));
    }

    let filter = TreeFilter::new(true, extensions);
    let mut corpus = Corpus::new();
    let mut matched = 0;

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "unable to walk entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(dir).unwrap_or(path).to_string_lossy();
        if !filter.keep_path(&relative) {
            continue;
        }
        matched += 1;

        match std::fs::read_to_string(path) {
            Ok(text) => {
                corpus.insert(text, path.display().to_string());
            }
            Err(e) => warn!(path = %path.display(), error = %e, "unable to read file"),
        }
    }

    debug!(matched, "directory walked");
    info!(unique = corpus.len(), "read {} unique files", corpus.len());
    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use uuid::Uuid;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("repocorpus-local-{}", Uuid::now_v7()));
        fs::create_dir_all(dir.join("nested/deeper")).unwrap();
        dir
    }

    #[test]
    fn collects_matching_files_and_dedups() {
        let dir = temp_dir();
        fs::write(dir.join("a.nlp"), "rule one").unwrap();
        fs::write(dir.join("nested/b.nlp"), "rule two").unwrap();
        fs::write(dir.join("nested/deeper/copy.nlp"), "rule one").unwrap();
        fs::write(dir.join("nested/readme.md"), "docs").unwrap();
        fs::write(dir.join("upper.NLP"), "shouty").unwrap();

        let corpus = scrape_dir(&dir, &[".nlp"]).unwrap();
        assert_eq!(corpus.len(), 2);
        assert!(corpus.contains("rule one"));
        assert!(corpus.contains("rule two"));
        assert!(!corpus.contains("docs"));
        assert!(!corpus.contains("shouty"));
        assert!(
            corpus
                .source_of("rule one")
                .is_some_and(|s| s.ends_with("a.nlp"))
        );

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn skips_non_utf8_files() {
        let dir = temp_dir();
        fs::write(dir.join("good.txt"), "fine").unwrap();
        fs::write(dir.join("bad.txt"), [0xffu8, 0xfe, 0x00]).unwrap();

        let corpus = scrape_dir(&dir, &[] as &[&str]).unwrap();
        assert_eq!(corpus.len(), 1);
        assert!(corpus.contains("fine"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn rejects_missing_directory() {
        let missing = std::env::temp_dir().join(format!("repocorpus-missing-{}", Uuid::now_v7()));
        assert!(scrape_dir(&missing, &["nlp"]).is_err());
    }
}
