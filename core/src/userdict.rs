//! User dictionary: words the user maps from an input to any output text.
//!
//! The text format (`khiin_user.txt`) has one entry per line: the input, a
//! run of spaces or tabs, then the output, which may itself contain spaces.
//! `#` starts a comment running to the end of the line. An input must be
//! printable ASCII; lines without a separator or with an unprintable input
//! are skipped.
//!
//! ```text
//! # animals
//! dog   káu-á
//! khiin 起引
//! ```
//!
//! Parsed entries are written into the lexicon store, which feeds them into
//! the trie like any other word.
use crate::store::normalize_key;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// File name of the user dictionary in the resource directory.
pub const USER_DICTIONARY_FILE: &str = "khiin_user.txt";

/// Priority given to user words when scored against dictionary words.
pub const USER_PRIORITY: i32 = 1000;

const COMMENT: char = '#';

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserWord {
    pub input: String,
    pub output: String,
}

impl UserWord {
    pub fn new(input: &str, output: &str) -> Self {
        Self {
            input: input.to_string(),
            output: output.to_string(),
        }
    }

    /// Key the word is indexed under, normalized like dictionary keys.
    pub fn input_key(&self) -> String {
        normalize_key(&self.input)
    }
}

/// Parse user dictionary text. Invalid lines are skipped.
pub fn parse_user_dictionary(text: &str) -> Vec<UserWord> {
    text.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<UserWord> {
    let line = match line.find(COMMENT) {
        Some(at) => &line[..at],
        None => line,
    };
    let (input, output) = line.trim().split_once([' ', '\t'])?;
    if !input.chars().all(|c| c.is_ascii_graphic()) {
        return None;
    }
    let output = output.trim_start_matches([' ', '\t']);
    Some(UserWord::new(input, output))
}

/// Read and parse a user dictionary file.
pub fn read_user_dictionary<P: AsRef<Path>>(path: P) -> Result<Vec<UserWord>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading user dictionary {}", path.display()))?;
    let words = parse_user_dictionary(&text);
    debug!(path = %path.display(), words = words.len(), "user dictionary parsed");
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entries_and_skips_comments() {
        let text = "# comment line\nkhiin 起引\ndog\tkáu-á  # trailing\n\n  no   の\n";
        let words = parse_user_dictionary(text);
        assert_eq!(
            words,
            vec![
                UserWord::new("khiin", "起引"),
                UserWord::new("dog", "káu-á"),
                UserWord::new("no", "の"),
            ]
        );
    }

    #[test]
    fn outputs_may_contain_spaces() {
        let words = parse_user_dictionary("tg Tâi-gí bûn\r\n");
        assert_eq!(words, vec![UserWord::new("tg", "Tâi-gí bûn")]);
    }

    #[test]
    fn invalid_lines_are_skipped() {
        let words = parse_user_dictionary("lonely\nkáu dog\n#only comment\n   \n");
        assert!(words.is_empty());
    }

    #[test]
    fn keys_are_lower_cased() {
        assert_eq!(UserWord::new("Dog", "káu").input_key(), "dog");
    }
}
