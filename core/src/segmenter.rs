//! Segmentation and candidate generation.
//!
//! A position-indexed beam search over lexicon matches: for every raw offset
//! the `beam_width` cheapest partial segmentations ending there are kept and
//! extended by every trie match starting at that offset. Characters no key
//! covers are consumed one at a time at `unknown_cost`.
//!
//! Token cost is `1.0 - score`, where score combines the entry priority with
//! learned unigram and bigram counts, so a path with fewer (longer) tokens is
//! preferred unless learned counts say otherwise.
//!
//! Hyphens are read before any lexicon match: exactly two hyphens left in a
//! run form the khin key and bind to the match after them; any other hyphen
//! is a literal token of its own.
use crate::candidate::{rank_and_dedup, Candidate, CandidateKind};
use crate::config::EngineConfig;
use crate::lexicon::{Entry, EntryKind, Lexicon, Match};
use crate::orthography::{has_khin_key, Orthography, KHIN_KEY};
use std::cmp::Ordering;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Dictionary or user word.
    Word,
    Syllable,
    /// Syllable or word typed after the khin key.
    Khin,
    /// Literal hyphen, or a khin key with no match after it.
    Hyphen,
    Unknown,
}

/// One token of a segmentation.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Raw character range within the segmented text.
    pub start: usize,
    pub end: usize,
    pub kind: TokenKind,
    /// Best display text for this token.
    pub text: String,
    /// Syllables of the entry the token was matched through.
    pub syllables: Vec<String>,
    pub score: f32,
}

impl Token {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    pub tokens: Vec<Token>,
    pub cost: f32,
}

#[derive(Clone)]
struct State {
    tokens: Vec<Token>,
    cost: f32,
    freq: u64,
}

// lower is better
fn state_cmp(a: &State, b: &State) -> Ordering {
    if (a.cost - b.cost).abs() > 1e-6 {
        return a.cost.partial_cmp(&b.cost).unwrap_or(Ordering::Equal);
    }
    if a.tokens.len() != b.tokens.len() {
        return a.tokens.len().cmp(&b.tokens.len());
    }
    let first_len = |s: &State| s.tokens.first().map(Token::len).unwrap_or(0);
    if first_len(a) != first_len(b) {
        return first_len(b).cmp(&first_len(a));
    }
    if a.freq != b.freq {
        return b.freq.cmp(&a.freq);
    }
    a.tokens
        .iter()
        .map(|t| t.text.as_str())
        .cmp(b.tokens.iter().map(|t| t.text.as_str()))
}

/// Segmenter over one lexicon, orthography and configuration.
pub struct Segmenter<'a, O: Orthography> {
    lexicon: &'a Lexicon,
    ortho: &'a O,
    config: &'a EngineConfig,
}

impl<'a, O: Orthography> Segmenter<'a, O> {
    pub fn new(lexicon: &'a Lexicon, ortho: &'a O, config: &'a EngineConfig) -> Self {
        Self {
            lexicon,
            ortho,
            config,
        }
    }

    /// The `k` best segmentations of `raw`, best first. `prev` is the token
    /// immediately before `raw`, used for bigram scoring.
    pub fn segment_top_k(&self, raw: &str, prev: Option<&str>, k: usize) -> Vec<Segmentation> {
        let chars: Vec<char> = raw.chars().collect();
        let n = chars.len();
        if n == 0 {
            return Vec::new();
        }
        let width = self.config.beam_width.max(k).max(1);

        let mut beams: Vec<Vec<State>> = vec![Vec::new(); n + 1];
        beams[0].push(State {
            tokens: Vec::new(),
            cost: 0.0,
            freq: 0,
        });

        for pos in 0..n {
            let mut beam = std::mem::take(&mut beams[pos]);
            if beam.is_empty() {
                continue;
            }
            beam.sort_by(state_cmp);
            beam.truncate(width);

            let hyphens = chars[pos..].iter().take_while(|c| **c == '-').count();
            let (lead, matches) = match hyphens {
                0 => (0, self.lexicon.matches_at(&chars, pos)),
                2 => (KHIN_KEY.len(), self.lexicon.matches_at(&chars, pos + KHIN_KEY.len())),
                _ => (1, Vec::new()),
            };
            for st in beam {
                let before = st.tokens.last().map(|t| t.text.as_str()).or(prev);
                let steps: Vec<Token> = if matches.is_empty() && lead > 0 {
                    vec![self.hyphen_token(&chars, pos, lead)]
                } else if matches.is_empty() {
                    vec![self.unknown_token(&chars, pos)]
                } else {
                    matches
                        .iter()
                        .map(|m| self.best_token(m, pos, lead, before))
                        .collect()
                };
                for token in steps {
                    let mut next = st.clone();
                    next.cost += self.token_cost(&token);
                    if matches!(token.kind, TokenKind::Word | TokenKind::Syllable | TokenKind::Khin) {
                        next.freq += self.lexicon.unigram(&token.text);
                    }
                    let end = token.end;
                    next.tokens.push(token);
                    beams[end].push(next);
                }
            }
        }

        let mut done = std::mem::take(&mut beams[n]);
        done.sort_by(state_cmp);
        done.into_iter()
            .take(k)
            .map(|st| Segmentation {
                tokens: st.tokens,
                cost: st.cost,
            })
            .collect()
    }

    /// Raw character lengths of the composing segments for `raw`: the best
    /// segmentation, with words split into their syllables and adjacent
    /// unknown characters merged. A khin key stays with the syllable after it.
    pub fn layout(&self, raw: &str, prev: Option<&str>) -> Vec<usize> {
        let chars: Vec<char> = raw.chars().collect();
        let Some(best) = self.segment_top_k(raw, prev, 1).into_iter().next() else {
            return Vec::new();
        };

        let mut spans: Vec<usize> = Vec::new();
        let mut unknown_run = 0;
        for token in &best.tokens {
            if token.kind == TokenKind::Unknown {
                unknown_run += token.len();
                continue;
            }
            if unknown_run > 0 {
                spans.push(unknown_run);
                unknown_run = 0;
            }
            match token.kind {
                TokenKind::Hyphen => spans.push(token.len()),
                TokenKind::Khin => {
                    let body = &chars[token.start + KHIN_KEY.len()..token.end];
                    let mut aligned = align_syllables(body, &token.syllables);
                    aligned[0] += KHIN_KEY.len();
                    spans.extend(aligned);
                }
                _ => spans.extend(align_syllables(&chars[token.start..token.end], &token.syllables)),
            }
        }
        if unknown_run > 0 {
            spans.push(unknown_run);
        }
        spans
    }

    /// Ranked candidates for a segment whose raw text is the first `own_len`
    /// characters of `region`. Only match lengths that begin one of the top
    /// segmentations of `region` are offered.
    ///
    /// The last candidate is always the segment's own composed text, exactly
    /// as a composing segment displays it; a ranked candidate with the same
    /// text is dropped in its favour. `virtual_khin` renders the segment and
    /// its romanized candidates neutral-tone.
    pub fn candidates(
        &self,
        region: &str,
        own_len: usize,
        prev: Option<&str>,
        virtual_khin: bool,
    ) -> Vec<Candidate> {
        let chars: Vec<char> = region.chars().collect();
        let own_len = own_len.min(chars.len());
        let own: String = chars[..own_len].iter().collect();
        let dotted = self.config.app.dotted_khin;
        let lead = if has_khin_key(&own) { KHIN_KEY.len() } else { 0 };
        let khin = lead > 0 || virtual_khin;
        let mut out = Vec::new();

        if own_len > lead && chars[lead] != '-' {
            let leading: BTreeSet<usize> = self
                .segment_top_k(region, prev, self.config.beam_width.max(1))
                .iter()
                .filter_map(|s| s.tokens.first())
                .filter(|t| matches!(t.kind, TokenKind::Word | TokenKind::Syllable | TokenKind::Khin))
                .map(Token::len)
                .collect();

            for m in self.lexicon.matches_at(&chars, lead) {
                let len = lead + m.len;
                if !leading.contains(&len) {
                    continue;
                }
                for entry in m.entries {
                    let score = self.entry_score(entry, prev);
                    if let Some(han) = &entry.han {
                        let kind = match entry.kind {
                            EntryKind::User => CandidateKind::User,
                            _ => CandidateKind::Han,
                        };
                        let freq = self.lexicon.unigram(han);
                        out.push(
                            Candidate::new(han.clone(), entry.key.clone(), len, kind, score)
                                .with_frequency(freq),
                        );
                    }
                    if entry.kind == EntryKind::User {
                        continue;
                    }
                    let mut lomaji = self.ortho.render_word(&entry.syllables);
                    if khin {
                        lomaji.insert_str(0, self.ortho.khin_marker(dotted));
                    }
                    let freq = self.lexicon.unigram(&lomaji);
                    out.push(
                        Candidate::new(lomaji, entry.key.clone(), len, CandidateKind::Lomaji, score)
                            .with_frequency(freq),
                    );
                }
            }
            rank_and_dedup(&mut out);
        }

        let fallback = self.ortho.render_segment(&own, virtual_khin, dotted);
        out.retain(|c| c.text != fallback);
        out.push(Candidate::new(fallback, own, own_len, CandidateKind::Fallback, 0.0));
        out
    }

    fn entry_score(&self, entry: &Entry, prev: Option<&str>) -> f32 {
        let text = match &entry.han {
            Some(han) => han.clone(),
            None if entry.kind == EntryKind::Word => self.ortho.render_word(&entry.syllables),
            None => return 0.0,
        };
        let priority = entry.priority.max(0) as f32;
        let mut score = priority / (priority + 1000.0);
        score += (1.0 + self.lexicon.unigram(&text) as f32).ln();
        if let Some(prev) = prev {
            let bigram = self.lexicon.bigram(prev, &text) as f32;
            score += self.config.bigram_weight * (1.0 + bigram).ln();
        }
        score
    }

    fn token_cost(&self, token: &Token) -> f32 {
        match token.kind {
            TokenKind::Unknown => self.config.unknown_cost,
            TokenKind::Hyphen => 0.0,
            _ => 1.0 - token.score,
        }
    }

    fn unknown_token(&self, chars: &[char], pos: usize) -> Token {
        Token {
            start: pos,
            end: pos + 1,
            kind: TokenKind::Unknown,
            text: chars[pos].to_string(),
            syllables: Vec::new(),
            score: -self.config.unknown_cost,
        }
    }

    fn hyphen_token(&self, chars: &[char], pos: usize, len: usize) -> Token {
        Token {
            start: pos,
            end: pos + len,
            kind: TokenKind::Hyphen,
            text: chars[pos..pos + len].iter().collect(),
            syllables: Vec::new(),
            score: 0.0,
        }
    }

    /// Best entry of `m` as a token. `lead` raw characters (the khin key)
    /// precede the match.
    fn best_token(&self, m: &Match<'_>, start: usize, lead: usize, prev: Option<&str>) -> Token {
        let mut best: Option<(f32, &Entry, String)> = None;
        for entry in m.entries {
            let score = self.entry_score(entry, prev);
            let text = entry
                .han
                .clone()
                .unwrap_or_else(|| self.ortho.render_word(&entry.syllables));
            let better = match &best {
                None => true,
                Some((s, e, t)) => {
                    score > *s + 1e-6
                        || ((score - *s).abs() <= 1e-6
                            && (kind_rank(entry.kind) < kind_rank(e.kind)
                                || (entry.kind == e.kind && text < *t)))
                }
            };
            if better {
                best = Some((score, entry, text));
            }
        }
        let end = start + lead + m.len;
        match best {
            Some((score, entry, text)) => Token {
                start,
                end,
                kind: match entry.kind {
                    _ if lead > 0 => TokenKind::Khin,
                    EntryKind::Word | EntryKind::User => TokenKind::Word,
                    EntryKind::Syllable => TokenKind::Syllable,
                },
                text,
                syllables: entry.syllables.clone(),
                score,
            },
            None => Token {
                start,
                end,
                kind: TokenKind::Syllable,
                text: String::new(),
                syllables: Vec::new(),
                score: 0.0,
            },
        }
    }
}

// equal scores prefer user words, then dictionary words
fn kind_rank(kind: EntryKind) -> u8 {
    match kind {
        EntryKind::User => 0,
        EntryKind::Word => 1,
        EntryKind::Syllable => 2,
    }
}

/// Split a matched raw slice into per-syllable lengths following the entry's
/// syllables. Tone digits are optional in the raw text. Falls back to one
/// span when the syllables do not line up.
pub fn align_syllables(raw: &[char], syllables: &[String]) -> Vec<usize> {
    if syllables.len() <= 1 {
        return vec![raw.len()];
    }
    let mut spans = Vec::with_capacity(syllables.len());
    let mut pos = 0;
    for syllable in syllables {
        let start = pos;
        for letter in syllable.chars().filter(|c| !c.is_ascii_digit()) {
            match raw.get(pos) {
                Some(c) if c.eq_ignore_ascii_case(&letter) => pos += 1,
                _ => return vec![raw.len()],
            }
        }
        if raw.get(pos).is_some_and(|c| c.is_ascii_digit()) {
            pos += 1;
        }
        spans.push(pos - start);
    }
    if pos != raw.len() {
        return vec![raw.len()];
    }
    spans
}
