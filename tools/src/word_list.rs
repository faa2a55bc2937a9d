//! Source word lists for the lexicon database.
//!
//! Two input formats are accepted:
//! - TOML with a `syllables` array and `[[words]]` tables (`key`, `han`,
//!   `priority`)
//! - tab-separated tables, one `key<TAB>han<TAB>priority` row per line;
//!   `han` and `priority` may be omitted and `#` starts a comment line
//!
//! Keys may be written with tone digits (`an2-ne`) or diacritics (`án-ne`).
use ahash::AHashSet;
use anyhow::{Context, Result};
use khiin_core::WordRow;
use libtailo::lomaji::{strip_tone_digits, to_ascii};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WordList {
    pub syllables: Vec<String>,
    pub words: Vec<WordEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WordEntry {
    pub key: String,
    pub han: Option<String>,
    #[serde(default)]
    pub priority: i32,
}

impl WordList {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let is_toml = path.extension().and_then(|s| s.to_str()) == Some("toml");
        if is_toml {
            Self::from_toml_str(&content).with_context(|| format!("parsing {}", path.display()))
        } else {
            Self::from_table(&content).with_context(|| format!("parsing {}", path.display()))
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_table(content: &str) -> Result<Self> {
        let mut list = WordList::default();
        for (n, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = line.split('\t').map(str::trim).collect();
            let han = parts.get(1).filter(|h| !h.is_empty()).map(|h| h.to_string());
            let priority = match parts.get(2) {
                Some(p) => p
                    .parse::<i32>()
                    .with_context(|| format!("line {}: bad priority {:?}", n + 1, p))?,
                None => 0,
            };
            list.words.push(WordEntry {
                key: parts[0].to_string(),
                han,
                priority,
            });
        }
        Ok(list)
    }

    pub fn merge(&mut self, other: WordList) {
        self.syllables.extend(other.syllables);
        self.words.extend(other.words);
    }

    /// Word rows with keys normalized to lower-case tone-digit form.
    pub fn rows(&self) -> Vec<WordRow> {
        self.words
            .iter()
            .filter_map(|w| {
                let key = normalize_word_key(&w.key);
                (!key.is_empty()).then(|| WordRow::new(&key, w.han.as_deref(), w.priority))
            })
            .collect()
    }

    /// Declared syllables followed by every toneless syllable used in a word
    /// key, without duplicates.
    pub fn all_syllables(&self) -> Vec<String> {
        let mut seen = AHashSet::new();
        let declared = self.syllables.iter().map(|s| s.to_ascii_lowercase());
        let from_words = self
            .rows()
            .into_iter()
            .flat_map(|row| row.syllables())
            .map(|s| strip_tone_digits(&s));
        declared
            .chain(from_words)
            .filter(|s| !s.is_empty() && seen.insert(s.clone()))
            .collect()
    }
}

/// `Án-ne` and `an2-ne` both become `an2-ne`.
pub fn normalize_word_key(key: &str) -> String {
    key.split('-')
        .map(|part| to_ascii(part.trim()).to_ascii_lowercase())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_word_list() {
        let list = WordList::from_toml_str(
            r#"
            syllables = ["a", "ho"]

            [[words]]
            key = "an2-ne"
            han = "按呢"
            priority = 900

            [[words]]
            key = "Hó"
            "#,
        )
        .unwrap();
        let rows = list.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, "an2-ne");
        assert_eq!(rows[1].key, "ho2");
        assert_eq!(rows[1].han, None);
        assert_eq!(list.all_syllables(), vec!["a", "ho", "an", "ne"]);
    }

    #[test]
    fn tab_separated_table() {
        let list = WordList::from_table("# comment\nho2\t好\t800\ntai7-tsi3\t代誌\n\nsi7\n").unwrap();
        let rows = list.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].priority, 800);
        assert_eq!(rows[1].han.as_deref(), Some("代誌"));
        assert_eq!(rows[2].han, None);
        assert!(WordList::from_table("ho2\t好\tlots\n").is_err());
    }

    #[test]
    fn keys_accept_diacritics() {
        assert_eq!(normalize_word_key("Án-ne"), "an2-ne");
        assert_eq!(normalize_word_key("tai7-tsi3"), "tai7-tsi3");
        assert_eq!(normalize_word_key("-"), "");
    }
}
