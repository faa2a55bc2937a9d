//! Engine configuration.
//!
//! `AppConfig` holds the switches the host flips (input mode, khin display);
//! `EngineConfig` adds the ranking knobs and is what `khiin.toml` holds.
//! The engine shares one `ConfigHandle` with the buffer manager so an
//! `update` is visible on the very next operation.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// How eagerly the segmenter fixes syllable boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// Boundaries are fixed as soon as no lexicon key can extend them.
    Basic,
    /// The whole unconverted tail is re-segmented on every edit.
    #[default]
    Continuous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub input_mode: InputMode,
    /// Show the `--` neutral-tone key as a middle dot instead of two hyphens.
    pub dotted_khin: bool,
    /// Syllables following a neutral-tone syllable are neutral too.
    pub autokhin: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input_mode: InputMode::default(),
            dotted_khin: true,
            autokhin: true,
        }
    }
}

impl AppConfig {
    pub fn with_input_mode(mut self, input_mode: InputMode) -> Self {
        self.input_mode = input_mode;
        self
    }
}

/// Full engine configuration as stored in `khiin.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    #[serde(flatten)]
    pub app: AppConfig,

    /// Number of partial segmentations kept per raw offset.
    pub beam_width: usize,

    /// Capacity of the unigram count cache.
    pub cache_capacity: usize,

    /// Score penalty for a character no lexicon key covers.
    pub unknown_cost: f32,

    /// Multiplier on the log bigram count when ranking candidates.
    pub bigram_weight: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            beam_width: 8,
            cache_capacity: 256,
            unknown_cost: 10.0,
            bigram_weight: 2.0,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_toml_string()?)
            .with_context(|| format!("writing config {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Shared, interiorly mutable view of the engine configuration.
///
/// Cloning the handle shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct ConfigHandle {
    inner: Rc<RefCell<EngineConfig>>,
}

impl ConfigHandle {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(config)),
        }
    }

    /// Replace the host-facing settings. Takes effect on the next operation.
    pub fn update(&self, app: AppConfig) {
        self.inner.borrow_mut().app = app;
    }

    pub fn app(&self) -> AppConfig {
        self.inner.borrow().app
    }

    pub fn input_mode(&self) -> InputMode {
        self.inner.borrow().app.input_mode
    }

    /// A copy of the current configuration.
    pub fn get(&self) -> EngineConfig {
        self.inner.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.app.input_mode, InputMode::Continuous);
        assert!(cfg.app.dotted_khin);
        assert!(cfg.app.autokhin);
        assert_eq!(cfg.beam_width, 8);
        assert!(cfg.unknown_cost > 0.0);
    }

    #[test]
    fn toml_roundtrip_and_partial_files() {
        let cfg = EngineConfig::from_toml_str("input_mode = \"basic\"\nbeam_width = 4\nautokhin = false\n").unwrap();
        assert_eq!(cfg.app.input_mode, InputMode::Basic);
        assert!(!cfg.app.autokhin);
        assert!(cfg.app.dotted_khin);
        assert_eq!(cfg.beam_width, 4);
        assert_eq!(cfg.cache_capacity, EngineConfig::default().cache_capacity);

        let text = cfg.to_toml_string().unwrap();
        let back = EngineConfig::from_toml_str(&text).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn save_and_load_file() {
        let path = std::env::temp_dir().join(format!("khiin_config_{}.toml", std::process::id()));
        let mut cfg = EngineConfig::default();
        cfg.bigram_weight = 1.5;
        cfg.save_toml(&path).unwrap();
        let loaded = EngineConfig::load_toml(&path).unwrap();
        assert_eq!(loaded, cfg);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn handle_updates_are_shared() {
        let handle = ConfigHandle::new(EngineConfig::default());
        let other = handle.clone();
        other.update(other.app().with_input_mode(InputMode::Basic));
        assert_eq!(handle.input_mode(), InputMode::Basic);
        assert!(handle.app().dotted_khin);
        assert_eq!(handle.get().beam_width, 8);
    }
}
