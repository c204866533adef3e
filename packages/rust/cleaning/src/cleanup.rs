//! Line-ending normalization and comment redaction passes.

use std::sync::LazyLock;

use regex::Regex;

use repocorpus_shared::{CorpusError, Result};

use crate::CleanConfig;

/// Comment lines keeping fewer characters than this after a redaction are dropped.
const MIN_REDACTED_LEN: usize = 10;

// ---------------------------------------------------------------------------
// Line endings
// ---------------------------------------------------------------------------

/// Convert `\r\r\n` and `\r\n` line endings to `\n`. Lone `\r` is kept.
pub fn normalize_line_endings(sample: &str) -> String {
    if !sample.contains('\r') {
        return sample.to_string();
    }
    sample.replace("\r\r\n", "\n").replace("\r\n", "\n")
}

// ---------------------------------------------------------------------------
// Redaction
// ---------------------------------------------------------------------------

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,4}[/:-]\d{1,2}[/:-]?\d{0,4}").expect("valid regex")
});

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)https?://\S*|www\.\S+\.\S*|\S+\.com\S+|\S+\.net\S+|\S+\.org\S+|\S+\.edu\S+|\S+\.uk\S+",
    )
    .expect("valid regex")
});

/// Trailing stamps on code lines, e.g. `# 02/12/02 AM.`
static STAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#\s*\d{2}/\d{2}/\d{2} [AP]M\.").expect("valid regex")
});

/// Removes dates, block-listed names, and URLs/emails from comment lines.
#[derive(Debug, Clone)]
pub struct Redactor {
    names: Option<Regex>,
}

impl Redactor {
    /// Compile the name block-list. Names are matched case-insensitively as
    /// literal substrings; blank names are ignored.
    pub fn new(config: &CleanConfig) -> Result<Self> {
        let alternatives: Vec<String> = config
            .redact_names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(regex::escape)
            .collect();

        if alternatives.is_empty() {
            return Ok(Self { names: None });
        }

        let pattern = format!("(?i){}", alternatives.join("|"));
        let names = Regex::new(&pattern)
            .map_err(|e| CorpusError::config(format!("invalid redaction name list: {e}")))?;
        Ok(Self { names: Some(names) })
    }

    /// Redact every line of `sample`, dropping comment lines left uninformative.
    pub fn redact(&self, sample: &str) -> String {
        sample
            .split('\n')
            .filter_map(|line| self.redact_line(line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn redact_line(&self, line: &str) -> Option<String> {
        if !line.trim_start().starts_with('#') {
            return Some(match STAMP_RE.find(line) {
                Some(m) => line[..m.start()].trim_end().to_string(),
                None => line.to_string(),
            });
        }

        let mut line = line.to_string();
        let mut matched = false;

        if let Some(m) = DATE_RE.find(&line) {
            line = truncate_at(&line, m.start());
            matched = true;
        }

        if let Some(m) = self.names.as_ref().and_then(|re| re.find(&line)) {
            line = truncate_at(&line, m.start());
            matched = true;
        }

        if let Some(m) = URL_RE.find(&line) {
            line.replace_range(m.range(), "");
            matched = true;
        }

        if matched && line.trim().chars().count() <= MIN_REDACTED_LEN {
            return None;
        }
        Some(line)
    }
}

/// Cut `line` at byte `at`, then trim trailing spaces and one trailing `-`.
fn truncate_at(line: &str, at: usize) -> String {
    let head = line[..at].trim_end();
    head.strip_suffix('-')
        .map(str::trim_end)
        .unwrap_or(head)
        .to_string()
}
