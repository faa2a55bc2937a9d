// Engine construction: database discovery, degraded fallback and the
// optional config file. Everything that touches KHIIN_HOME lives in one test
// because the variable is process-wide.

mod common;

use khiin_core::{InputMode, LexiconStore, RedbStore};
use libtailo::{Engine, CONFIG_FILE, DATABASE_FILE, HOME_ENV};
use std::path::{Path, PathBuf};

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("khiin_engine_{}_{}", tag, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_database(dir: &Path) {
    let syllables: Vec<String> = common::SYLLABLES.iter().map(|s| s.to_string()).collect();
    let store = RedbStore::create(dir.join(DATABASE_FILE)).unwrap();
    store.write_lexicon(&syllables, &common::words()).unwrap();
}

#[test]
fn create_finds_database_or_degrades() {
    let missing = scratch_dir("missing");
    let resources = scratch_dir("resources");
    let home = scratch_dir("home");
    write_database(&resources);
    write_database(&home);

    std::env::remove_var(HOME_ENV);

    let mut engine = Engine::create(&missing);
    assert!(engine.is_degraded());
    assert_eq!(engine.lexicon().word_count(), 1);
    let buffer = engine.buffer_manager();
    buffer.insert("a");
    let snap = buffer.word_boundary();
    assert_eq!(snap.display, "阿");

    let mut engine = Engine::create(&resources);
    assert!(!engine.is_degraded());
    assert_eq!(engine.lexicon().word_count(), common::words().len());
    let snap = engine.buffer_manager().insert("hobo");
    assert_eq!(snap.display, "ho bo");
    drop(engine);

    let search = std::env::join_paths([missing.clone(), home.clone()]).unwrap();
    std::env::set_var(HOME_ENV, &search);
    let engine = Engine::create(&missing);
    assert!(!engine.is_degraded());
    match engine.lexicon().store() {
        LexiconStore::Redb(store) => assert_eq!(store.path(), home.join(DATABASE_FILE)),
        other => panic!("expected the database from {HOME_ENV}, got {other:?}"),
    }
    drop(engine);
    std::env::remove_var(HOME_ENV);

    for dir in [missing, resources, home] {
        let _ = std::fs::remove_dir_all(dir);
    }
}

#[test]
fn config_file_sets_mode_and_knobs() {
    let dir = scratch_dir("config");
    std::fs::write(
        dir.join(CONFIG_FILE),
        "input_mode = \"basic\"\nbeam_width = 4\n",
    )
    .unwrap();

    let engine = Engine::create(&dir);
    assert_eq!(engine.config().input_mode(), InputMode::Basic);
    let config = engine.config().get();
    assert_eq!(config.beam_width, 4);
    assert_eq!(config.cache_capacity, 256);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn learned_counts_persist_across_engines() {
    let dir = scratch_dir("persist");
    write_database(&dir);
    let db = dir.join(DATABASE_FILE);

    {
        let store = LexiconStore::open_redb(&db).unwrap();
        let mut engine = Engine::with_store(store, Default::default()).unwrap();
        engine.buffer_manager().insert("hobo");
        assert_eq!(engine.buffer_manager().commit(), "好無");
    }

    let store = LexiconStore::open_redb(&db).unwrap();
    let engine = Engine::with_store(store, Default::default()).unwrap();
    assert_eq!(engine.lexicon().unigram("好"), 1);
    assert_eq!(engine.lexicon().bigram("好", "無"), 1);
    drop(engine);

    let _ = std::fs::remove_dir_all(&dir);
}
