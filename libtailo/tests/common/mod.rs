// Shared fixture for the libtailo integration tests: a small lexicon that
// covers every buffer scenario without a database file.
#![allow(dead_code)]

use khiin_core::{AppConfig, EngineConfig, InputMode, LexiconStore, UserWord, WordRow};
use libtailo::Engine;

pub const SYLLABLES: &[&str] = &[
    "a", "ah", "an", "e", "ho", "bo", "ne", "u", "ta", "tai", "ian", "tsi", "si", "goa", "li",
];

pub fn words() -> Vec<WordRow> {
    vec![
        WordRow::new("a1", Some("阿"), 100),
        WordRow::new("an1", Some("安"), 300),
        WordRow::new("an2-ne", Some("按呢"), 900),
        WordRow::new("an2-ne", Some("安呢"), 500),
        WordRow::new("e5", Some("鞋"), 500),
        WordRow::new("e5", Some("个"), 400),
        WordRow::new("e5", Some("兮"), 100),
        WordRow::new("e7", Some("會"), 600),
        WordRow::new("ho2", Some("好"), 800),
        WordRow::new("bo5", Some("無"), 800),
        WordRow::new("u7", Some("有"), 700),
        WordRow::new("ian5", Some("員"), 900),
        WordRow::new("tai7-tsi3", Some("代誌"), 700),
        WordRow::new("goa2", Some("我"), 900),
        WordRow::new("li2", Some("你"), 900),
        WordRow::new("si7", Some("是"), 800),
    ]
}

pub fn store() -> LexiconStore {
    LexiconStore::in_memory(SYLLABLES.iter().map(|s| s.to_string()).collect(), words())
}

pub fn engine(mode: InputMode) -> Engine {
    let engine = Engine::with_store(store(), EngineConfig::default()).unwrap();
    engine.config().update(engine.config().app().with_input_mode(mode));
    engine
}

/// Engine over the fixture lexicon with a few user words added.
pub fn engine_with_user_words(mode: InputMode) -> Engine {
    let store = store();
    store
        .add_user_words(&[
            UserWord::new("khiin", "起引"),
            UserWord::new("dog", "káu-á"),
            UserWord::new("no", "の"),
        ])
        .unwrap();
    let engine = Engine::with_store(store, EngineConfig::default()).unwrap();
    engine.config().update(engine.config().app().with_input_mode(mode));
    engine
}

/// Engine in continuous mode with the khin switches set.
pub fn engine_with_khin(dotted_khin: bool, autokhin: bool) -> Engine {
    let engine = engine(InputMode::Continuous);
    engine.config().update(AppConfig {
        dotted_khin,
        autokhin,
        ..engine.config().app()
    });
    engine
}

/// Raw text of each segment, in order.
pub fn raws(snap: &libtailo::BufferSnapshot) -> Vec<String> {
    snap.segments.iter().map(|s| s.raw.clone()).collect()
}

pub fn texts(snap: &libtailo::BufferSnapshot, segment: usize) -> Vec<String> {
    snap.segments[segment]
        .candidates
        .iter()
        .map(|c| c.text.clone())
        .collect()
}
