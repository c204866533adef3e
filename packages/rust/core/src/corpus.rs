//! Deduplicating corpus aggregation.
//!
//! Two texts are the same entry iff their [`content_key`]s are equal. The same
//! key is used for per-account dedup during a scrape and for the final merge,
//! so there is exactly one definition of "duplicate".

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use repocorpus_shared::{RetrievedFile, content_key};

/// One unique text with the first source it was seen at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusEntry {
    /// Exact decoded text.
    pub text: String,
    /// First-seen source URL or path.
    pub source: String,
}

/// Content-addressed set of unique texts with first-seen provenance.
///
/// Iteration is ordered by content key, which is stable but carries no
/// meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    entries: BTreeMap<String, CorpusEntry>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `text` from `source`. Returns `false` (and keeps the existing
    /// canonical source) if the text is already present.
    pub fn insert(&mut self, text: impl Into<String>, source: impl Into<String>) -> bool {
        let text = text.into();
        let source = source.into();
        let key = content_key(&text);

        if let Some(existing) = self.entries.get(&key) {
            debug!(%source, first_seen = %existing.source, "filtering duplicate file");
            return false;
        }

        self.entries.insert(key, CorpusEntry { text, source });
        true
    }

    /// Fold `other` into `self`, keeping `self`'s provenance on collisions.
    /// Returns the number of new entries.
    pub fn absorb(&mut self, other: Corpus) -> usize {
        let mut added = 0;
        for (key, entry) in other.entries {
            if let Some(existing) = self.entries.get(&key) {
                debug!(
                    source = %entry.source,
                    first_seen = %existing.source,
                    "filtering duplicate file"
                );
                continue;
            }
            self.entries.insert(key, entry);
            added += 1;
        }
        added
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an identical text is already present.
    pub fn contains(&self, text: &str) -> bool {
        self.entries.contains_key(&content_key(text))
    }

    /// Canonical source recorded for `text`, if present.
    pub fn source_of(&self, text: &str) -> Option<&str> {
        self.entries
            .get(&content_key(text))
            .map(|e| e.source.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = &CorpusEntry> {
        self.entries.values()
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|e| e.text.as_str())
    }

    /// Drop provenance and return the texts.
    pub fn into_texts(self) -> Vec<String> {
        self.entries.into_values().map(|e| e.text).collect()
    }

    /// Sum of `\n`-separated line counts over all texts.
    pub fn total_lines(&self) -> usize {
        self.texts().map(line_count).sum()
    }
}

impl FromIterator<RetrievedFile> for Corpus {
    fn from_iter<T: IntoIterator<Item = RetrievedFile>>(iter: T) -> Self {
        let mut corpus = Corpus::new();
        for file in iter {
            corpus.insert(file.text, file.source_url);
        }
        corpus
    }
}

/// Number of `\n`-separated lines in `text` (an empty text has one line).
pub fn line_count(text: &str) -> usize {
    text.split('\n').count()
}

// ---------------------------------------------------------------------------
// Merging heterogeneous inputs
// ---------------------------------------------------------------------------

/// One input to [`merge`]: a plain text list, a keyed mapping, or a corpus.
#[derive(Debug, Clone)]
pub enum CorpusInput {
    /// Ordered sequence of texts.
    Texts(Vec<String>),
    /// `identifier → text` pairs; identifiers are discarded on merge.
    Keyed(Vec<(String, String)>),
    /// A corpus; provenance is discarded on merge.
    Corpus(Corpus),
}

impl CorpusInput {
    fn into_texts(self) -> Vec<String> {
        match self {
            Self::Texts(texts) => texts,
            Self::Keyed(pairs) => pairs.into_iter().map(|(_, text)| text).collect(),
            Self::Corpus(corpus) => corpus.into_texts(),
        }
    }
}

impl From<Vec<String>> for CorpusInput {
    fn from(texts: Vec<String>) -> Self {
        Self::Texts(texts)
    }
}

impl From<Vec<&str>> for CorpusInput {
    fn from(texts: Vec<&str>) -> Self {
        Self::Texts(texts.into_iter().map(String::from).collect())
    }
}

impl<K: ToString> From<BTreeMap<K, String>> for CorpusInput {
    fn from(map: BTreeMap<K, String>) -> Self {
        Self::Keyed(map.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

impl<K: ToString> From<HashMap<K, String>> for CorpusInput {
    fn from(map: HashMap<K, String>) -> Self {
        Self::Keyed(map.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }
}

impl From<Corpus> for CorpusInput {
    fn from(corpus: Corpus) -> Self {
        Self::Corpus(corpus)
    }
}

/// Merge any number of inputs into one flat set of unique texts.
///
/// Texts are deduplicated by [`content_key`], the same identity a [`Corpus`]
/// uses. Identifiers and provenance are discarded. The result depends only on
/// the multiset of texts given, so the merge is commutative and idempotent.
pub fn merge<I>(inputs: I) -> BTreeSet<String>
where
    I: IntoIterator,
    I::Item: Into<CorpusInput>,
{
    let mut by_key: BTreeMap<String, String> = BTreeMap::new();
    for input in inputs {
        let input: CorpusInput = input.into();
        for text in input.into_texts() {
            by_key.entry(content_key(&text)).or_insert(text);
        }
    }
    by_key.into_values().collect()
}
