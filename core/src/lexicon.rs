//! In-memory lexicon: a trie over the store's syllables and words, plus
//! cached access to learned n-gram counts.
//!
//! Trie keys are lower-cased ASCII:
//! - every syllable is inserted bare and once per tone digit `0`–`9`
//! - every word is inserted under its toned key (`an2ne`) and, when
//!   different, its tone-stripped key (`anne`)
//! - every user word is inserted under its lower-cased input
use crate::store::{LexiconStore, WordRow, PLACEHOLDER_HAN, PLACEHOLDER_KEY};
use crate::trie::Trie;
use crate::userdict::{UserWord, USER_PRIORITY};
use anyhow::Result;
use lru::LruCache;
use std::cell::RefCell;
use std::num::NonZeroUsize;
use tracing::{info, warn};
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Syllable,
    Word,
    /// User dictionary word; `han` holds its output text.
    User,
}

/// A terminal value in the lexicon trie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Hyphen-delimited toned key, e.g. `an2-ne`.
    pub key: String,
    pub syllables: Vec<String>,
    pub han: Option<String>,
    pub priority: i32,
    pub kind: EntryKind,
}

impl Entry {
    fn syllable(key: &str) -> Self {
        Self {
            key: key.to_string(),
            syllables: vec![key.to_string()],
            han: None,
            priority: 0,
            kind: EntryKind::Syllable,
        }
    }

    fn word(row: WordRow) -> Self {
        let han = row
            .han
            .as_deref()
            .map(|h| h.nfc().collect::<String>())
            .filter(|h| !h.is_empty());
        Self {
            syllables: row.syllables(),
            key: row.key,
            han,
            priority: row.priority,
            kind: EntryKind::Word,
        }
    }

    fn user(word: &UserWord) -> Self {
        let key = word.input_key();
        Self {
            syllables: vec![key.clone()],
            key,
            han: Some(word.output.nfc().collect()),
            priority: USER_PRIORITY,
            kind: EntryKind::User,
        }
    }
}

/// Every entry reachable by one trie key starting at some offset.
#[derive(Debug, Clone, Copy)]
pub struct Match<'a> {
    /// Raw characters consumed.
    pub len: usize,
    pub entries: &'a [Entry],
}

pub struct Lexicon {
    store: LexiconStore,
    trie: Trie<Entry>,
    syllable_count: usize,
    word_count: usize,
    user_word_count: usize,
    unigram_cache: RefCell<LruCache<String, u64>>,
}

impl std::fmt::Debug for Lexicon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lexicon")
            .field("store", &self.store)
            .field("syllables", &self.syllable_count)
            .field("words", &self.word_count)
            .field("user_words", &self.user_word_count)
            .finish()
    }
}

impl Lexicon {
    /// Bulk-read the store and build the trie. Called once per engine.
    pub fn load(store: LexiconStore, cache_capacity: usize) -> Result<Self> {
        let syllables = store.syllables()?;
        let words = store.words()?;
        let user_words = store.user_words()?;
        Ok(Self::build(store, syllables, words, user_words, cache_capacity))
    }

    /// Lexicon over the built-in placeholder store.
    pub fn builtin(cache_capacity: usize) -> Self {
        let words = vec![WordRow::new(PLACEHOLDER_KEY, Some(PLACEHOLDER_HAN), 0)];
        Self::build(LexiconStore::builtin(), Vec::new(), words, Vec::new(), cache_capacity)
    }

    fn build(
        store: LexiconStore,
        syllables: Vec<String>,
        words: Vec<WordRow>,
        user_words: Vec<UserWord>,
        cache_capacity: usize,
    ) -> Self {
        let mut trie = Trie::new();

        for syllable in &syllables {
            let base = strip_digits(&syllable.to_ascii_lowercase());
            if base.is_empty() {
                continue;
            }
            trie.insert(&base, Entry::syllable(&base));
            for digit in 0..=9 {
                let toned = format!("{base}{digit}");
                trie.insert(&toned, Entry::syllable(&toned));
            }
        }

        let word_count = words.len();
        for row in words {
            let toned = row.input_key();
            if toned.is_empty() {
                continue;
            }
            let bare = strip_digits(&toned);
            let entry = Entry::word(row);
            if !bare.is_empty() && bare != toned {
                trie.insert(&bare, entry.clone());
            }
            trie.insert(&toned, entry);
        }

        for word in &user_words {
            let entry = Entry::user(word);
            if entry.key.is_empty() {
                continue;
            }
            trie.insert(&entry.key.clone(), entry);
        }

        info!(
            syllables = syllables.len(),
            words = word_count,
            user_words = user_words.len(),
            keys = trie.len(),
            "lexicon loaded"
        );

        let capacity = NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            store,
            trie,
            syllable_count: syllables.len(),
            word_count,
            user_word_count: user_words.len(),
            unigram_cache: RefCell::new(LruCache::new(capacity)),
        }
    }

    pub fn store(&self) -> &LexiconStore {
        &self.store
    }

    /// True when running on the built-in placeholder store.
    pub fn is_degraded(&self) -> bool {
        self.store.is_builtin()
    }

    pub fn syllable_count(&self) -> usize {
        self.syllable_count
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn user_word_count(&self) -> usize {
        self.user_word_count
    }

    /// Entries stored under exactly `key`.
    pub fn entries(&self, key: &str) -> &[Entry] {
        self.trie.get(key).unwrap_or(&[])
    }

    /// Whether more input could still extend `text` into a longer key.
    pub fn has_continuation(&self, text: &str) -> bool {
        !text.is_empty() && self.trie.has_continuation(text)
    }

    /// Every key matching `input[start..]` as a prefix, shortest first.
    ///
    /// A match that ends in a letter and is directly followed by a digit is
    /// dropped: the digit is that syllable's tone and must stay with it.
    pub fn matches_at<'a>(&'a self, input: &[char], start: usize) -> Vec<Match<'a>> {
        self.trie
            .prefixes_at(input, start)
            .into_iter()
            .filter(|(end, _)| {
                let dangling = input.get(*end).is_some_and(|c| c.is_ascii_digit());
                let ends_in_digit = input[*end - 1].is_ascii_digit();
                !dangling || ends_in_digit
            })
            .map(|(end, entries)| Match {
                len: end - start,
                entries,
            })
            .collect()
    }

    /// Learned unigram count; store errors count as zero.
    pub fn unigram(&self, token: &str) -> u64 {
        if let Some(count) = self.unigram_cache.borrow_mut().get(token) {
            return *count;
        }
        let count = self.store.unigram_count(token).unwrap_or_else(|e| {
            warn!(token, error = %e, "unigram lookup failed");
            0
        });
        self.unigram_cache.borrow_mut().put(token.to_string(), count);
        count
    }

    /// Learned bigram count; store errors count as zero.
    pub fn bigram(&self, left: &str, right: &str) -> u64 {
        self.store.bigram_count(left, right).unwrap_or_else(|e| {
            warn!(left, right, error = %e, "bigram lookup failed");
            0
        })
    }

    /// Persist a committed token sequence. Returns rows touched.
    pub fn record(&self, tokens: &[&str]) -> Result<usize> {
        let rows = self.store.record(tokens);
        self.unigram_cache.borrow_mut().clear();
        rows
    }

    /// Forget all learned counts.
    pub fn clear_ngrams(&self) -> Result<()> {
        let result = self.store.clear_ngrams();
        self.unigram_cache.borrow_mut().clear();
        result
    }
}

fn strip_digits(s: &str) -> String {
    s.chars().filter(|c| !c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon() -> Lexicon {
        let store = LexiconStore::in_memory(
            vec!["a".into(), "an".into(), "ne".into(), "e".into(), "u".into()],
            vec![
                WordRow::new("an2-ne", Some("按呢"), 900),
                WordRow::new("e5", Some("鞋"), 500),
                WordRow::new("e5", Some("个"), 400),
            ],
        );
        Lexicon::load(store, 16).unwrap()
    }

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn words_are_reachable_with_and_without_tones() {
        let lx = lexicon();
        assert_eq!(lx.entries("an2ne").len(), 1);
        assert_eq!(lx.entries("anne").len(), 1);
        assert_eq!(lx.entries("anne")[0].syllables, vec!["an2", "ne"]);
        assert_eq!(lx.entries("e5").len(), 3);
        assert_eq!(lx.word_count(), 3);
        assert_eq!(lx.syllable_count(), 5);
    }

    #[test]
    fn tone_digits_never_dangle() {
        let lx = lexicon();
        let lens: Vec<usize> = lx.matches_at(&chars("e5"), 0).iter().map(|m| m.len).collect();
        assert_eq!(lens, vec![2]);

        let lens: Vec<usize> = lx.matches_at(&chars("u7h"), 0).iter().map(|m| m.len).collect();
        assert_eq!(lens, vec![2]);
        assert!(lx.matches_at(&chars("u7h"), 2).is_empty());

        let lens: Vec<usize> = lx.matches_at(&chars("a55"), 0).iter().map(|m| m.len).collect();
        assert_eq!(lens, vec![2]);
    }

    #[test]
    fn matches_cover_word_and_syllables() {
        let lx = lexicon();
        let lens: Vec<usize> = lx.matches_at(&chars("anne"), 0).iter().map(|m| m.len).collect();
        assert_eq!(lens, vec![1, 2, 4]);
        assert!(lx.has_continuation("ann"));
        assert!(lx.has_continuation("an"));
        assert!(!lx.has_continuation("anne"));
        assert!(!lx.has_continuation("hx"));
        assert!(!lx.has_continuation(""));
    }

    #[test]
    fn recording_invalidates_cached_counts() {
        let lx = lexicon();
        assert_eq!(lx.unigram("鞋"), 0);
        assert_eq!(lx.record(&["鞋", "个"]).unwrap(), 3);
        assert_eq!(lx.unigram("鞋"), 1);
        assert_eq!(lx.bigram("鞋", "个"), 1);
        lx.clear_ngrams().unwrap();
        assert_eq!(lx.unigram("鞋"), 0);
    }

    #[test]
    fn user_words_join_the_trie() {
        let store = LexiconStore::in_memory(vec!["khi".into(), "in".into()], Vec::new());
        store
            .add_user_words(&[UserWord::new("khiin", "起引"), UserWord::new("Dog", "káu-á")])
            .unwrap();
        let lx = Lexicon::load(store, 4).unwrap();
        assert_eq!(lx.user_word_count(), 2);
        let entry = &lx.entries("dog")[0];
        assert_eq!(entry.kind, EntryKind::User);
        assert_eq!(entry.han.as_deref(), Some("káu-á"));
        assert_eq!(entry.syllables, vec!["dog"]);
        let lens: Vec<usize> = lx.matches_at(&chars("khiin"), 0).iter().map(|m| m.len).collect();
        assert_eq!(lens, vec![3, 5]);
    }

    #[test]
    fn builtin_holds_only_the_placeholder() {
        let lx = Lexicon::builtin(4);
        assert!(lx.is_degraded());
        assert_eq!(lx.word_count(), 1);
        assert_eq!(lx.syllable_count(), 0);
        assert_eq!(lx.entries("a")[0].han.as_deref(), Some("阿"));
    }
}
