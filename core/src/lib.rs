//! khiin-core
//!
//! Language-independent engine core for romanized-input IMEs: lexicon
//! storage, trie matching, beam-search segmentation, candidate ranking and
//! the composition buffer state machine. A language crate plugs in its
//! rendering rules through the `Orthography` trait.
//!
//! Public API:
//! - `LexiconStore` - Dictionary, user words and learned n-gram counts (redb or in-memory)
//! - `UserWord` - User dictionary entry parsed from `khiin_user.txt`
//! - `Lexicon` - Trie over syllables and words with cached frequency lookups
//! - `Segmenter` - Top-k segmentation, segment layout and candidate generation
//! - `Candidate` - Ranked conversion candidate
//! - `BufferManager` - Editing state machine producing `BufferSnapshot`s
//! - `EngineConfig` / `ConfigHandle` - Tunables and the shared input mode
pub mod trie;
pub use trie::Trie;

pub mod config;
pub use config::{AppConfig, ConfigHandle, EngineConfig, InputMode};

pub mod store;
pub use store::{normalize_key, LexiconStore, MemoryStore, RedbStore, WordRow};

pub mod userdict;
pub use userdict::{parse_user_dictionary, read_user_dictionary, UserWord, USER_DICTIONARY_FILE};

pub mod lexicon;
pub use lexicon::{Entry, EntryKind, Lexicon, Match};

pub mod candidate;
pub use candidate::{Candidate, CandidateKind};

pub mod orthography;
pub use orthography::{has_khin_key, is_han, Glyph, Orthography, Plain, KHIN_DOT, KHIN_KEY};

pub mod segmenter;
pub use segmenter::{Segmentation, Segmenter, Token, TokenKind};

pub mod buffer;
pub use buffer::{BufferManager, BufferSnapshot, SegmentSnapshot, SegmentState};
