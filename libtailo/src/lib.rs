//! libtailo crate root
//!
//! Tai-lo (Taiwanese Hokkien romanization) front-end for `khiin-core`: the
//! tone-mark normalizer, the `Tailo` orthography that renders raw tone-digit
//! input, and the `Engine` facade a host drives.
//!
//! Public API exported here:
//! - `Engine`, database discovery and user dictionary import from `engine`
//! - `Tailo` from `orthography`
//! - `compose` / `decompose` and the tone helpers from `lomaji`
pub mod engine;
pub mod lomaji;
pub mod orthography;

pub use engine::{
    import_user_dictionary, locate_database, Engine, CONFIG_FILE, DATABASE_FILE, HOME_ENV,
};
pub use lomaji::{compose, decompose, parse_syllable, strip_tone_digits, to_ascii, tone_of};
pub use orthography::Tailo;

// Re-export the core types a host sees through the engine.
pub use khiin_core::{
    AppConfig, BufferManager, BufferSnapshot, Candidate, CandidateKind, ConfigHandle,
    EngineConfig, InputMode, LexiconStore, SegmentSnapshot, SegmentState, UserWord, WordRow,
    USER_DICTIONARY_FILE,
};
