//! Tai-lo tone marks.
//!
//! Converts between ASCII tone-digit syllables (`an2`, `tsha8h`) and their
//! diacritic-marked forms. `compose` produces the canonical decomposed form
//! (base letter followed by its combining mark); callers that display text
//! normalize to NFC.
//!
//! Tone table:
//!
//! | digit | mark                      |
//! |-------|---------------------------|
//! | 1, 4  | none                      |
//! | 2     | acute U+0301              |
//! | 3     | grave U+0300              |
//! | 5     | circumflex U+0302         |
//! | 6     | caron U+030C              |
//! | 7     | macron U+0304             |
//! | 8     | vertical line above U+030D|
//! | 9     | breve U+0306              |
//! | 0     | none, `·` prefix          |
use phf::phf_map;
use unicode_normalization::char::decompose_canonical;
use unicode_normalization::UnicodeNormalization;

/// Neutral-tone separator prepended for tone 0.
pub const NEUTRAL_TONE_PREFIX: char = '\u{00B7}';

static TONE_MARKS: phf::Map<u8, char> = phf_map! {
    2u8 => '\u{0301}',
    3u8 => '\u{0300}',
    5u8 => '\u{0302}',
    6u8 => '\u{030C}',
    7u8 => '\u{0304}',
    8u8 => '\u{030D}',
    9u8 => '\u{0306}',
};

static MARK_TONES: phf::Map<char, u8> = phf_map! {
    '\u{0301}' => 2,
    '\u{0300}' => 3,
    '\u{0302}' => 5,
    '\u{030C}' => 6,
    '\u{0304}' => 7,
    '\u{030D}' => 8,
    '\u{0306}' => 9,
};

// letters after oa/oe that pull the mark onto the second vowel
const CLOSING_FINALS: [char; 6] = ['m', 'n', 'p', 't', 'k', 'h'];

/// Combining mark for a tone digit. Tones without a mark (and digits above 9)
/// give `None`.
pub fn tone_mark(tone: u8) -> Option<char> {
    TONE_MARKS.get(&tone).copied()
}

/// Tone digit encoded by a combining mark.
pub fn tone_of_mark(mark: char) -> Option<u8> {
    MARK_TONES.get(&mark).copied()
}

/// Combining diacritics the caret must never rest in front of.
pub fn is_noncursorable(c: char) -> bool {
    (0x300..=0x358).contains(&(c as u32))
}

/// Character index in `base` of the letter that takes the tone mark.
///
/// `oa`/`oe` followed by a closing final mark the second vowel; otherwise the
/// first of `o a e u i` present, then the `n` of `ng`, then `m`.
pub fn mark_position(base: &str) -> Option<usize> {
    let lower: Vec<char> = base.chars().map(|c| c.to_ascii_lowercase()).collect();

    for i in 0..lower.len().saturating_sub(2) {
        if lower[i] == 'o'
            && matches!(lower[i + 1], 'a' | 'e')
            && CLOSING_FINALS.contains(&lower[i + 2])
        {
            return Some(i + 1);
        }
    }
    for vowel in ['o', 'a', 'e', 'u', 'i'] {
        if let Some(i) = lower.iter().position(|&c| c == vowel) {
            return Some(i);
        }
    }
    if let Some(i) = lower.windows(2).position(|w| w == ['n', 'g']) {
        return Some(i);
    }
    lower.iter().position(|&c| c == 'm')
}

/// Whether [`compose`] uses up a tone digit typed after `base`. Tone 0 always
/// does; other tones need a letter to carry their mark, even when the mark
/// is invisible. A digit that is not used up stays visible as typed.
pub fn takes_tone(base: &str, tone: u8) -> bool {
    tone == 0 || (tone <= 9 && mark_position(base).is_some())
}

/// Mark `base` with `tone`, in decomposed form.
///
/// Tone 0 prepends [`NEUTRAL_TONE_PREFIX`]. Tones 1 and 4, digits above 9,
/// and bases with no markable letter come back unmarked.
pub fn compose(base: &str, tone: u8) -> String {
    let mut out = String::with_capacity(base.len() + 4);
    if tone == 0 {
        out.push(NEUTRAL_TONE_PREFIX);
    }
    let mark = tone_mark(tone).zip(mark_position(base));
    for (i, c) in base.chars().enumerate() {
        out.push(c);
        if let Some((m, _)) = mark.filter(|&(_, pos)| pos == i) {
            out.push(m);
        }
    }
    out
}

/// Expand precomposed tone-marked letters into base letter plus combining
/// mark. Other characters pass through untouched, so this is idempotent.
pub fn decompose(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    for c in text.chars() {
        let mut parts = Vec::with_capacity(2);
        decompose_canonical(c, |d| parts.push(d));
        if parts.len() > 1 && parts[1..].iter().all(|m| MARK_TONES.contains_key(m)) {
            out.extend(parts);
        } else {
            out.push(c);
        }
    }
    out
}

/// NFC form of `text`.
pub fn to_nfc(text: &str) -> String {
    text.nfc().collect()
}

/// Split a raw syllable into base and trailing tone digit.
pub fn parse_syllable(raw: &str) -> (&str, Option<u8>) {
    match raw.chars().last() {
        Some(c) if c.is_ascii_digit() => {
            let tone = c.to_digit(10).map(|d| d as u8);
            (&raw[..raw.len() - 1], tone)
        }
        _ => (raw, None),
    }
}

pub fn strip_tone_digits(key: &str) -> String {
    key.chars().filter(|c| !c.is_ascii_digit()).collect()
}

/// Tone of a marked syllable; `None` when no mark distinguishes it.
pub fn tone_of(text: &str) -> Option<u8> {
    let decomposed = decompose(text);
    if let Some(tone) = decomposed.chars().find_map(tone_of_mark) {
        return Some(tone);
    }
    decomposed.contains(NEUTRAL_TONE_PREFIX).then_some(0)
}

/// Marked Lomaji back to ASCII tone digits: `án-ne` becomes `an2ne`.
/// Hyphens are dropped and whitespace is kept.
pub fn to_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut tone: Option<u8> = None;

    let flush = |out: &mut String, tone: &mut Option<u8>| {
        if let Some(t) = tone.take() {
            out.push(char::from(b'0' + t));
        }
    };

    for c in decompose(text).chars() {
        if c == NEUTRAL_TONE_PREFIX {
            tone = Some(0);
        } else if let Some(t) = tone_of_mark(c) {
            tone = Some(t);
        } else if c == '-' {
            flush(&mut out, &mut tone);
        } else if c.is_whitespace() {
            flush(&mut out, &mut tone);
            out.push(c);
        } else {
            out.push(c);
        }
    }
    flush(&mut out, &mut tone);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_table() {
        assert_eq!(compose("a", 2), "a\u{301}");
        assert_eq!(to_nfc(&compose("a", 2)), "á");
        assert_eq!(to_nfc(&compose("a", 3)), "à");
        assert_eq!(to_nfc(&compose("a", 5)), "â");
        assert_eq!(to_nfc(&compose("a", 6)), "ǎ");
        assert_eq!(to_nfc(&compose("u", 7)), "ū");
        assert_eq!(compose("ah", 8), "a\u{30D}h");
        assert_eq!(to_nfc(&compose("a", 9)), "ă");
        assert_eq!(compose("a", 1), "a");
        assert_eq!(compose("ah", 4), "ah");
        assert_eq!(compose("a", 0), "·a");
    }

    #[test]
    fn tone_digits_need_a_carrier() {
        assert!(takes_tone("a", 1));
        assert!(takes_tone("ah", 8));
        assert!(takes_tone("tsh", 0));
        assert!(!takes_tone("tsh", 2));
        assert!(!takes_tone("tsh", 4));
        assert!(!takes_tone("", 2));
    }

    #[test]
    fn out_of_range_tones_stay_unmarked() {
        assert_eq!(compose("a", 10), "a");
        assert_eq!(compose("ho", 42), "ho");
    }

    #[test]
    fn mark_placement() {
        assert_eq!(compose("oan", 5), "oa\u{302}n");
        assert_eq!(compose("oeh", 8), "oe\u{30D}h");
        assert_eq!(compose("goa", 2), "go\u{301}a");
        assert_eq!(compose("hong", 5), "ho\u{302}ng");
        assert_eq!(compose("kau", 3), "ka\u{300}u");
        assert_eq!(compose("tsiu", 2), "tsiu\u{301}");
        assert_eq!(compose("ng", 7), "n\u{304}g");
        assert_eq!(compose("hm", 5), "hm\u{302}");
        assert_eq!(compose("tsh", 2), "tsh");
        assert_eq!(compose("An", 2), "A\u{301}n");
    }

    #[test]
    fn decompose_is_idempotent_and_round_trips() {
        let bases = ["a", "oan", "oeh", "hong", "ng", "m", "tsiu", "kheh", "tsh"];
        for base in bases {
            for tone in 0..=9u8 {
                let composed = compose(base, tone);
                let once = decompose(&composed);
                assert_eq!(once, composed, "{base}{tone}");
                assert_eq!(decompose(&once), once);
                assert_eq!(decompose(&to_nfc(&composed)), composed, "{base}{tone}");
            }
        }
    }

    #[test]
    fn decompose_leaves_other_text_alone() {
        assert_eq!(decompose("好 ho"), "好 ho");
        assert_eq!(decompose("é"), "e\u{301}");
    }

    #[test]
    fn syllable_helpers() {
        assert_eq!(parse_syllable("an2"), ("an", Some(2)));
        assert_eq!(parse_syllable("an"), ("an", None));
        assert_eq!(parse_syllable(""), ("", None));
        assert_eq!(strip_tone_digits("an2ne"), "anne");
        assert_eq!(tone_of("tsha\u{30D}h"), Some(8));
        assert_eq!(tone_of("·a"), Some(0));
        assert_eq!(tone_of("ho"), None);
    }

    #[test]
    fn lomaji_to_ascii() {
        assert_eq!(to_ascii("án-ne"), "an2ne");
        assert_eq!(to_ascii("·a"), "a0");
        assert_eq!(to_ascii("ū h"), "u7 h");
        assert_eq!(to_ascii("Tâi-uân"), "Tai5uan5");
    }

    #[test]
    fn combining_marks_are_not_caret_stops() {
        assert!(is_noncursorable('\u{301}'));
        assert!(is_noncursorable('\u{358}'));
        assert!(!is_noncursorable('a'));
    }
}
