//! Tai-lo input method engine
//!
//! Owns the configuration, the lexicon (and through it the lexicon store) and
//! one composition buffer rendered with [`Tailo`]. This is the only entry
//! point a host needs. Words from `khiin_user.txt` in the resource directory
//! are merged into the store before the lexicon is built.
use std::env;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Result;
use khiin_core::{
    read_user_dictionary, BufferManager, ConfigHandle, EngineConfig, Lexicon, LexiconStore,
    USER_DICTIONARY_FILE,
};
use tracing::{debug, info, warn};

use crate::orthography::Tailo;

/// Lexicon database file name looked up in each search directory.
pub const DATABASE_FILE: &str = "khiin.db";
/// Optional engine configuration in the resource directory.
pub const CONFIG_FILE: &str = "khiin.toml";
/// Path-list environment variable searched before the resource directory.
pub const HOME_ENV: &str = "KHIIN_HOME";

pub struct Engine {
    config: ConfigHandle,
    lexicon: Rc<Lexicon>,
    buffer: BufferManager<Tailo>,
}

impl Engine {
    /// Build an engine for `resource_dir`.
    ///
    /// The database is the first `khiin.db` found in the directories listed
    /// in `KHIIN_HOME`, then in `resource_dir`. When none is found or it fails
    /// to open, the engine runs on the built-in placeholder store instead.
    pub fn create<P: AsRef<Path>>(resource_dir: P) -> Self {
        let resource_dir = resource_dir.as_ref();
        let config = load_config(resource_dir);
        let user_dictionary = resource_dir.join(USER_DICTIONARY_FILE);

        let mut dirs: Vec<PathBuf> = env::var_os(HOME_ENV)
            .map(|paths| env::split_paths(&paths).collect())
            .unwrap_or_default();
        dirs.push(resource_dir.to_path_buf());

        let Some(path) = locate_database(&dirs) else {
            warn!(dirs = ?dirs, "no {} found, using built-in lexicon", DATABASE_FILE);
            return Self::degraded(config, &user_dictionary);
        };

        let opened = LexiconStore::open_redb(&path).and_then(|store| {
            import_user_dictionary(&store, &user_dictionary);
            Self::with_store(store, config.clone())
        });
        match opened {
            Ok(engine) => {
                info!(path = %path.display(), "lexicon database opened");
                engine
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load lexicon, using built-in lexicon");
                Self::degraded(config, &user_dictionary)
            }
        }
    }

    /// Build an engine over an already opened store.
    pub fn with_store(store: LexiconStore, config: EngineConfig) -> Result<Self> {
        let lexicon = Lexicon::load(store, config.cache_capacity)?;
        Ok(Self::assemble(lexicon, config))
    }

    fn degraded(config: EngineConfig, user_dictionary: &Path) -> Self {
        let store = LexiconStore::builtin();
        import_user_dictionary(&store, user_dictionary);
        let lexicon = match Lexicon::load(store, config.cache_capacity) {
            Ok(lexicon) => lexicon,
            Err(e) => {
                warn!(error = %e, "built-in store unreadable, dropping user words");
                Lexicon::builtin(config.cache_capacity)
            }
        };
        Self::assemble(lexicon, config)
    }

    fn assemble(lexicon: Lexicon, config: EngineConfig) -> Self {
        let config = ConfigHandle::new(config);
        let lexicon = Rc::new(lexicon);
        let buffer = BufferManager::new(Rc::clone(&lexicon), Tailo, config.clone());
        Self {
            config,
            lexicon,
            buffer,
        }
    }

    pub fn buffer_manager(&mut self) -> &mut BufferManager<Tailo> {
        &mut self.buffer
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    /// True when running on the built-in placeholder lexicon.
    pub fn is_degraded(&self) -> bool {
        self.lexicon.is_degraded()
    }
}

/// First directory in `dirs` that holds a lexicon database.
pub fn locate_database<P: AsRef<Path>>(dirs: &[P]) -> Option<PathBuf> {
    dirs.iter()
        .map(|dir| dir.as_ref().join(DATABASE_FILE))
        .find(|path| path.is_file())
}

/// Merge the user dictionary at `path` into `store`, if the file exists.
/// Returns the number of new words.
pub fn import_user_dictionary(store: &LexiconStore, path: &Path) -> usize {
    if !path.is_file() {
        return 0;
    }
    match read_user_dictionary(path).and_then(|words| store.add_user_words(&words)) {
        Ok(added) => {
            info!(path = %path.display(), added, "user dictionary imported");
            added
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable user dictionary");
            0
        }
    }
}

fn load_config(resource_dir: &Path) -> EngineConfig {
    let path = resource_dir.join(CONFIG_FILE);
    if !path.is_file() {
        return EngineConfig::default();
    }
    match EngineConfig::load_toml(&path) {
        Ok(config) => {
            debug!(path = %path.display(), "engine config loaded");
            config
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable engine config");
            EngineConfig::default()
        }
    }
}
