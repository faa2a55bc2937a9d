//! Persisted lexicon store.
//!
//! Holds the syllable list, the word table, user dictionary words and
//! learned n-gram counts. Two
//! backends share one API:
//! - `Redb`: the on-disk `khiin.db` database, opened once by the engine.
//! - `InMemory`: hash maps; used for the built-in fallback store and tests.
//!
//! Word rows are keyed by their normalized input key (lower-cased, hyphens
//! removed, tone digits kept) and stored as bincode blobs, one blob per key.
//! User words are stored the same way under their lower-cased input.
use crate::userdict::UserWord;
use ahash::AHashMap;
use anyhow::{anyhow, Context, Result};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

const SYLLABLES: TableDefinition<&str, u32> = TableDefinition::new("syllables");
const WORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("words");
const UNIGRAMS: TableDefinition<&str, u64> = TableDefinition::new("unigram_freq");
const BIGRAMS: TableDefinition<(&str, &str), u64> = TableDefinition::new("bigram_freq");
const USER_WORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("user_words");

/// Input key and Han spelling of the single entry in the built-in store.
pub const PLACEHOLDER_KEY: &str = "a";
pub const PLACEHOLDER_HAN: &str = "阿";

/// One dictionary row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRow {
    /// Hyphen-delimited ASCII syllables with tone digits, e.g. `an2-ne`.
    pub key: String,
    pub han: Option<String>,
    pub priority: i32,
}

impl WordRow {
    pub fn new(key: &str, han: Option<&str>, priority: i32) -> Self {
        Self {
            key: key.to_string(),
            han: han.map(str::to_string),
            priority,
        }
    }

    /// The row's syllables in order.
    pub fn syllables(&self) -> Vec<String> {
        self.key
            .split('-')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Key used for lookup: lower-cased with hyphens removed.
    pub fn input_key(&self) -> String {
        normalize_key(&self.key)
    }
}

/// Normalize a lookup key the way word rows are indexed.
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// The lexicon store, selecting its backend at construction.
#[derive(Debug)]
pub enum LexiconStore {
    InMemory(MemoryStore),
    Redb(RedbStore),
}

impl LexiconStore {
    /// The degraded store: exactly one placeholder word and nothing else.
    pub fn builtin() -> Self {
        LexiconStore::InMemory(MemoryStore::new(
            Vec::new(),
            vec![WordRow::new(PLACEHOLDER_KEY, Some(PLACEHOLDER_HAN), 0)],
        ))
    }

    pub fn in_memory(syllables: Vec<String>, words: Vec<WordRow>) -> Self {
        LexiconStore::InMemory(MemoryStore::new(syllables, words))
    }

    /// Open an existing database file.
    pub fn open_redb<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(LexiconStore::Redb(RedbStore::open(path)?))
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, LexiconStore::InMemory(m) if m.builtin)
    }

    /// Every syllable, in stored order.
    pub fn syllables(&self) -> Result<Vec<String>> {
        match self {
            LexiconStore::InMemory(m) => Ok(m.syllables.clone()),
            LexiconStore::Redb(r) => r.syllables(),
        }
    }

    /// Every word row, grouped by input key.
    pub fn words(&self) -> Result<Vec<WordRow>> {
        match self {
            LexiconStore::InMemory(m) => Ok(m.words.values().flatten().cloned().collect()),
            LexiconStore::Redb(r) => r.words(),
        }
    }

    /// Every user dictionary word, ordered by input key.
    pub fn user_words(&self) -> Result<Vec<UserWord>> {
        match self {
            LexiconStore::InMemory(m) => m.user_words(),
            LexiconStore::Redb(r) => r.user_words(),
        }
    }

    /// Add user words, skipping exact duplicates and empty inputs or
    /// outputs. Returns the number added.
    pub fn add_user_words(&self, words: &[UserWord]) -> Result<usize> {
        let words: Vec<&UserWord> = words
            .iter()
            .filter(|w| !w.input_key().is_empty() && !w.output.is_empty())
            .collect();
        if words.is_empty() {
            return Ok(0);
        }
        let added = match self {
            LexiconStore::InMemory(m) => m.add_user_words(&words)?,
            LexiconStore::Redb(r) => r.add_user_words(&words)?,
        };
        debug!(added, "user words stored");
        Ok(added)
    }

    /// Rows whose input key equals `key`. An empty key yields no rows.
    pub fn lookup(&self, key: &str) -> Result<Vec<WordRow>> {
        let key = normalize_key(key);
        if key.is_empty() {
            return Ok(Vec::new());
        }
        match self {
            LexiconStore::InMemory(m) => Ok(m.words.get(&key).cloned().unwrap_or_default()),
            LexiconStore::Redb(r) => r.lookup(&key),
        }
    }

    /// Rows for each key in turn, concatenated. Empty keys are skipped.
    pub fn lookup_batch(&self, keys: &[&str]) -> Result<Vec<WordRow>> {
        let mut out = Vec::new();
        for key in keys {
            out.extend(self.lookup(key)?);
        }
        Ok(out)
    }

    /// Record a committed token sequence: one unigram increment per token and
    /// one bigram increment per adjacent pair. Returns the number of rows
    /// touched, `n + max(n - 1, 0)`.
    pub fn record(&self, tokens: &[&str]) -> Result<usize> {
        if tokens.is_empty() {
            return Ok(0);
        }
        let rows = match self {
            LexiconStore::InMemory(m) => m.record(tokens)?,
            LexiconStore::Redb(r) => r.record(tokens)?,
        };
        debug!(tokens = tokens.len(), rows, "recorded n-grams");
        Ok(rows)
    }

    pub fn unigram_count(&self, token: &str) -> Result<u64> {
        match self {
            LexiconStore::InMemory(m) => m.unigram_count(token),
            LexiconStore::Redb(r) => r.unigram_count(token),
        }
    }

    pub fn unigram_counts(&self, tokens: &[&str]) -> Result<Vec<u64>> {
        tokens.iter().map(|t| self.unigram_count(t)).collect()
    }

    pub fn bigram_count(&self, left: &str, right: &str) -> Result<u64> {
        match self {
            LexiconStore::InMemory(m) => m.bigram_count(left, right),
            LexiconStore::Redb(r) => r.bigram_count(left, right),
        }
    }

    /// All unigram counts, sorted by token.
    pub fn unigrams(&self) -> Result<Vec<(String, u64)>> {
        let mut out = match self {
            LexiconStore::InMemory(m) => m.unigrams()?,
            LexiconStore::Redb(r) => r.unigrams()?,
        };
        out.sort();
        Ok(out)
    }

    /// All bigram counts, sorted by token pair.
    pub fn bigrams(&self) -> Result<Vec<((String, String), u64)>> {
        let mut out = match self {
            LexiconStore::InMemory(m) => m.bigrams()?,
            LexiconStore::Redb(r) => r.bigrams()?,
        };
        out.sort();
        Ok(out)
    }

    /// Forget every learned count.
    pub fn clear_ngrams(&self) -> Result<()> {
        match self {
            LexiconStore::InMemory(m) => m.clear_ngrams(),
            LexiconStore::Redb(r) => r.clear_ngrams(),
        }
    }

    /// Word rows ordered by learned frequency of their surface (Han spelling
    /// or key), then priority, then key.
    pub fn all_words_by_frequency(&self) -> Result<Vec<WordRow>> {
        let mut rows: Vec<(u64, WordRow)> = Vec::new();
        for row in self.words()? {
            let surface = row.han.clone().unwrap_or_else(|| row.key.clone());
            rows.push((self.unigram_count(&surface)?, row));
        }
        rows.sort_by(|(fa, a), (fb, b)| {
            fb.cmp(fa)
                .then_with(|| b.priority.cmp(&a.priority))
                .then_with(|| a.key.cmp(&b.key))
        });
        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }
}

/// Hash-map backed store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    syllables: Vec<String>,
    words: BTreeMap<String, Vec<WordRow>>,
    unigrams: RwLock<AHashMap<String, u64>>,
    bigrams: RwLock<AHashMap<(String, String), u64>>,
    user_words: RwLock<BTreeMap<String, Vec<UserWord>>>,
    builtin: bool,
}

impl MemoryStore {
    pub fn new(syllables: Vec<String>, words: Vec<WordRow>) -> Self {
        let builtin = syllables.is_empty()
            && words.len() == 1
            && words[0].key == PLACEHOLDER_KEY
            && words[0].han.as_deref() == Some(PLACEHOLDER_HAN);
        let mut by_key: BTreeMap<String, Vec<WordRow>> = BTreeMap::new();
        for row in words {
            by_key.entry(row.input_key()).or_default().push(row);
        }
        Self {
            syllables,
            words: by_key,
            unigrams: RwLock::new(AHashMap::new()),
            bigrams: RwLock::new(AHashMap::new()),
            user_words: RwLock::new(BTreeMap::new()),
            builtin,
        }
    }

    fn record(&self, tokens: &[&str]) -> Result<usize> {
        let mut rows = 0;
        {
            let mut uni = self.unigrams.write().map_err(|_| poisoned())?;
            for token in tokens {
                let count = uni.entry(token.to_string()).or_insert(0);
                *count = count.saturating_add(1);
                rows += 1;
            }
        }
        let mut bi = self.bigrams.write().map_err(|_| poisoned())?;
        for pair in tokens.windows(2) {
            let count = bi.entry((pair[0].to_string(), pair[1].to_string())).or_insert(0);
            *count = count.saturating_add(1);
            rows += 1;
        }
        Ok(rows)
    }

    fn unigram_count(&self, token: &str) -> Result<u64> {
        let uni = self.unigrams.read().map_err(|_| poisoned())?;
        Ok(uni.get(token).copied().unwrap_or(0))
    }

    fn bigram_count(&self, left: &str, right: &str) -> Result<u64> {
        let bi = self.bigrams.read().map_err(|_| poisoned())?;
        Ok(bi
            .get(&(left.to_string(), right.to_string()))
            .copied()
            .unwrap_or(0))
    }

    fn unigrams(&self) -> Result<Vec<(String, u64)>> {
        let uni = self.unigrams.read().map_err(|_| poisoned())?;
        Ok(uni.iter().map(|(k, v)| (k.clone(), *v)).collect())
    }

    fn bigrams(&self) -> Result<Vec<((String, String), u64)>> {
        let bi = self.bigrams.read().map_err(|_| poisoned())?;
        Ok(bi.iter().map(|(k, v)| (k.clone(), *v)).collect())
    }

    fn user_words(&self) -> Result<Vec<UserWord>> {
        let words = self.user_words.read().map_err(|_| poisoned())?;
        Ok(words.values().flatten().cloned().collect())
    }

    fn add_user_words(&self, words: &[&UserWord]) -> Result<usize> {
        let mut stored = self.user_words.write().map_err(|_| poisoned())?;
        let mut added = 0;
        for word in words {
            let slot = stored.entry(word.input_key()).or_default();
            if !slot.contains(*word) {
                slot.push((*word).clone());
                added += 1;
            }
        }
        Ok(added)
    }

    fn clear_ngrams(&self) -> Result<()> {
        self.unigrams.write().map_err(|_| poisoned())?.clear();
        self.bigrams.write().map_err(|_| poisoned())?.clear();
        Ok(())
    }
}

fn poisoned() -> anyhow::Error {
    anyhow!("in-memory lexicon store lock poisoned")
}

/// Redb-backed store.
pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").field("path", &self.path).finish()
    }
}

impl RedbStore {
    /// Open an existing database. Fails if the file is missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let db = Database::open(path)
            .with_context(|| format!("opening lexicon database {}", path.display()))?;
        let store = Self {
            db,
            path: path.to_path_buf(),
        };
        store.ensure_tables()?;
        Ok(store)
    }

    /// Create a database, or open it if it already exists.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        let db = Database::create(path)
            .with_context(|| format!("creating lexicon database {}", path.display()))?;
        let store = Self {
            db,
            path: path.to_path_buf(),
        };
        store.ensure_tables()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_tables(&self) -> Result<()> {
        let txn = self.db.begin_write()?;
        txn.open_table(SYLLABLES)?;
        txn.open_table(WORDS)?;
        txn.open_table(UNIGRAMS)?;
        txn.open_table(BIGRAMS)?;
        txn.open_table(USER_WORDS)?;
        txn.commit()?;
        Ok(())
    }

    /// Bulk-write syllables and word rows, appending to what is stored.
    pub fn write_lexicon(&self, syllables: &[String], words: &[WordRow]) -> Result<()> {
        let mut grouped: BTreeMap<String, Vec<WordRow>> = BTreeMap::new();
        for row in words {
            grouped.entry(row.input_key()).or_default().push(row.clone());
        }

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(SYLLABLES)?;
            let mut next = table.len()? as u32;
            for syllable in syllables {
                let key = syllable.to_ascii_lowercase();
                if table.get(key.as_str())?.is_none() {
                    table.insert(key.as_str(), next)?;
                    next += 1;
                }
            }

            let mut table = txn.open_table(WORDS)?;
            for (key, rows) in grouped {
                let mut merged: Vec<WordRow> = match table.get(key.as_str())? {
                    Some(existing) => bincode::deserialize(existing.value())?,
                    None => Vec::new(),
                };
                merged.extend(rows);
                let bytes = bincode::serialize(&merged)?;
                table.insert(key.as_str(), bytes.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    fn syllables(&self) -> Result<Vec<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SYLLABLES)?;
        let mut out = Vec::new();
        for item in table.iter()? {
            let (k, v) = item?;
            out.push((v.value(), k.value().to_string()));
        }
        out.sort();
        Ok(out.into_iter().map(|(_, s)| s).collect())
    }

    fn words(&self) -> Result<Vec<WordRow>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(WORDS)?;
        let mut out = Vec::new();
        for item in table.iter()? {
            let (_, v) = item?;
            let rows: Vec<WordRow> = bincode::deserialize(v.value())?;
            out.extend(rows);
        }
        Ok(out)
    }

    fn user_words(&self) -> Result<Vec<UserWord>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(USER_WORDS)?;
        let mut out = Vec::new();
        for item in table.iter()? {
            let (_, v) = item?;
            let words: Vec<UserWord> = bincode::deserialize(v.value())?;
            out.extend(words);
        }
        Ok(out)
    }

    fn add_user_words(&self, words: &[&UserWord]) -> Result<usize> {
        let mut added = 0;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(USER_WORDS)?;
            for word in words {
                let key = word.input_key();
                let mut stored: Vec<UserWord> = match table.get(key.as_str())? {
                    Some(existing) => bincode::deserialize(existing.value())?,
                    None => Vec::new(),
                };
                if stored.contains(*word) {
                    continue;
                }
                stored.push((*word).clone());
                let bytes = bincode::serialize(&stored)?;
                table.insert(key.as_str(), bytes.as_slice())?;
                added += 1;
            }
        }
        txn.commit()?;
        Ok(added)
    }

    fn lookup(&self, key: &str) -> Result<Vec<WordRow>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(WORDS)?;
        match table.get(key)? {
            Some(v) => Ok(bincode::deserialize(v.value())?),
            None => Ok(Vec::new()),
        }
    }

    fn record(&self, tokens: &[&str]) -> Result<usize> {
        let mut rows = 0;
        let txn = self.db.begin_write()?;
        {
            let mut uni = txn.open_table(UNIGRAMS)?;
            for token in tokens {
                let current = uni.get(*token)?.map(|v| v.value()).unwrap_or(0);
                uni.insert(*token, current.saturating_add(1))?;
                rows += 1;
            }
            let mut bi = txn.open_table(BIGRAMS)?;
            for pair in tokens.windows(2) {
                let key = (pair[0], pair[1]);
                let current = bi.get(key)?.map(|v| v.value()).unwrap_or(0);
                bi.insert(key, current.saturating_add(1))?;
                rows += 1;
            }
        }
        txn.commit()?;
        Ok(rows)
    }

    fn unigram_count(&self, token: &str) -> Result<u64> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(UNIGRAMS)?;
        Ok(table.get(token)?.map(|v| v.value()).unwrap_or(0))
    }

    fn bigram_count(&self, left: &str, right: &str) -> Result<u64> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(BIGRAMS)?;
        Ok(table.get((left, right))?.map(|v| v.value()).unwrap_or(0))
    }

    fn unigrams(&self) -> Result<Vec<(String, u64)>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(UNIGRAMS)?;
        let mut out = Vec::new();
        for item in table.iter()? {
            let (k, v) = item?;
            out.push((k.value().to_string(), v.value()));
        }
        Ok(out)
    }

    fn bigrams(&self) -> Result<Vec<((String, String), u64)>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(BIGRAMS)?;
        let mut out = Vec::new();
        for item in table.iter()? {
            let (k, v) = item?;
            let (left, right) = k.value();
            out.push(((left.to_string(), right.to_string()), v.value()));
        }
        Ok(out)
    }

    fn clear_ngrams(&self) -> Result<()> {
        let txn = self.db.begin_write()?;
        txn.delete_table(UNIGRAMS)?;
        txn.delete_table(BIGRAMS)?;
        txn.open_table(UNIGRAMS)?;
        txn.open_table(BIGRAMS)?;
        txn.commit()?;
        Ok(())
    }
}
