//! Conversion candidates.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Where a candidate came from; also its rank class within one match length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateKind {
    /// Output of a user dictionary word.
    User,
    /// Han spelling of a dictionary word.
    Han,
    /// Diacritic romanization of a word or syllable.
    Lomaji,
    /// The segment's own raw text, composed. Always last.
    Fallback,
}

/// A single conversion candidate for the raw text starting at a segment.
///
/// Scores are on a relative scale; higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Rendered text.
    pub text: String,
    /// Backing ASCII key (dictionary key, or the raw text for fallbacks).
    pub key: String,
    pub score: f32,
    /// Learned unigram count of `text` when ranked.
    pub frequency: u64,
    /// Number of raw characters consumed, counted from the segment start.
    pub len: usize,
    pub kind: CandidateKind,
}

impl Candidate {
    pub fn new<T: Into<String>, K: Into<String>>(
        text: T,
        key: K,
        len: usize,
        kind: CandidateKind,
        score: f32,
    ) -> Self {
        Candidate {
            text: text.into(),
            key: key.into(),
            score,
            frequency: 0,
            len,
            kind,
        }
    }

    pub fn with_frequency(mut self, frequency: u64) -> Self {
        self.frequency = frequency;
        self
    }
}

/// Candidate ordering: longer match first, then rank class, then score,
/// then frequency, then lexical order of the text.
pub fn rank_order(a: &Candidate, b: &Candidate) -> Ordering {
    b.len
        .cmp(&a.len)
        .then_with(|| a.kind.cmp(&b.kind))
        .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
        .then_with(|| b.frequency.cmp(&a.frequency))
        .then_with(|| a.text.cmp(&b.text))
}

/// Sort candidates by `rank_order` and drop later duplicates of a text.
pub fn rank_and_dedup(candidates: &mut Vec<Candidate>) {
    candidates.sort_by(rank_order);
    let mut seen = AHashSet::new();
    candidates.retain(|c| seen.insert(c.text.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longer_matches_rank_first() {
        let mut list = vec![
            Candidate::new("安", "an1", 2, CandidateKind::Han, 0.3),
            Candidate::new("án-ne", "an2-ne", 4, CandidateKind::Lomaji, -1.0),
            Candidate::new("按呢", "an2-ne", 4, CandidateKind::Han, 0.9),
        ];
        rank_and_dedup(&mut list);
        let texts: Vec<&str> = list.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["按呢", "án-ne", "安"]);
    }

    #[test]
    fn user_words_lead_their_length() {
        let mut list = vec![
            Candidate::new("狗", "kau2", 3, CandidateKind::Han, 0.9),
            Candidate::new("káu-á", "dog", 3, CandidateKind::User, 0.5),
        ];
        rank_and_dedup(&mut list);
        assert_eq!(list[0].kind, CandidateKind::User);
    }

    #[test]
    fn ties_fall_back_to_frequency_then_text() {
        let mut list = vec![
            Candidate::new("乙", "e5", 2, CandidateKind::Han, 0.5),
            Candidate::new("甲", "e5", 2, CandidateKind::Han, 0.5),
            Candidate::new("丙", "e5", 2, CandidateKind::Han, 0.5).with_frequency(3),
        ];
        rank_and_dedup(&mut list);
        let texts: Vec<&str> = list.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["丙", "乙", "甲"]);
    }

    #[test]
    fn duplicates_keep_best_rank() {
        let mut list = vec![
            Candidate::new("ê", "e", 2, CandidateKind::Fallback, 0.0),
            Candidate::new("ê", "e5", 2, CandidateKind::Lomaji, 0.0),
        ];
        rank_and_dedup(&mut list);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].kind, CandidateKind::Lomaji);
    }
}
