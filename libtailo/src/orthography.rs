//! Tai-lo rendering of raw ASCII input.
use crate::lomaji::{compose, is_noncursorable, mark_position, takes_tone, NEUTRAL_TONE_PREFIX};
use khiin_core::{Glyph, Orthography};
use std::ops::Range;
use unicode_normalization::UnicodeNormalization;

/// Renders raw tone-digit input as Tai-lo with diacritics.
///
/// Raw text is split into chunks of letters ending in at most one digit, and
/// each chunk is shown as [`compose`] marks it. A used-up digit joins the
/// glyph of the letter carrying its mark, so deleting the glyph removes
/// both; any other digit stays visible as a literal glyph of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tailo;

impl Orthography for Tailo {
    fn glyphs(&self, raw: &str) -> Vec<Glyph> {
        let chars: Vec<char> = raw.chars().collect();
        let mut out = Vec::with_capacity(chars.len());
        let mut i = 0;
        while i < chars.len() {
            let start = i;
            while i < chars.len() && !chars[i].is_ascii_digit() {
                i += 1;
            }
            let digit = if i < chars.len() {
                i += 1;
                Some(i - 1)
            } else {
                None
            };
            push_chunk(&chars, start..i - usize::from(digit.is_some()), digit, &mut out);
        }
        out
    }
}

fn push_chunk(chars: &[char], letters: Range<usize>, digit: Option<usize>, out: &mut Vec<Glyph>) {
    let literal = |d: usize| Glyph::new(chars[d].to_string(), vec![d]);
    if letters.is_empty() {
        out.extend(digit.map(literal));
        return;
    }

    let base: String = chars[letters.clone()].iter().collect();
    let tone = digit
        .and_then(|d| chars[d].to_digit(10))
        .map(|t| t as u8)
        .filter(|&t| takes_tone(&base, t));

    let mut glyphs: Vec<Glyph> = Vec::with_capacity(letters.len());
    let mut raw = letters;
    let mut prefix = String::new();
    for c in compose(&base, tone.unwrap_or(1)).chars() {
        if c == NEUTRAL_TONE_PREFIX {
            prefix.push(c);
        } else if is_noncursorable(c) {
            if let Some(last) = glyphs.last_mut() {
                last.text.push(c);
            }
        } else if let Some(k) = raw.next() {
            let mut text = std::mem::take(&mut prefix);
            text.push(c);
            glyphs.push(Glyph::new(text, vec![k]));
        }
    }

    let carrier = match tone {
        Some(0) => Some(0),
        Some(_) => mark_position(&base),
        None => None,
    };
    let mut trailing = None;
    match (digit, carrier) {
        (Some(d), Some(p)) => glyphs[p].raw.push(d),
        (Some(d), None) => trailing = Some(literal(d)),
        (None, _) => {}
    }

    for mut glyph in glyphs.into_iter().chain(trailing) {
        glyph.text = glyph.text.nfc().collect();
        out.push(glyph);
    }
}
