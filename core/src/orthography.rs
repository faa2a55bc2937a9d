//! Rendering seam between raw ASCII input and displayed text.
//!
//! The buffer manager and the candidate generator never build display text
//! themselves; they ask an `Orthography`. A language crate supplies the real
//! implementation (diacritics, tone placement); `Plain` shows raw input as-is.
//!
//! Two hyphens typed before a syllable (`--a`) mark it neutral-tone (khin).
//! The marker is rendered here too, so every orthography shows it the same
//! way: a middle dot, or the two hyphens themselves when dotted khin is off.

/// Raw key that marks the following syllable neutral-tone.
pub const KHIN_KEY: &str = "--";
/// Display form of [`KHIN_KEY`] when dotted khin is on.
pub const KHIN_DOT: &str = "\u{00B7}";

/// One caret-indivisible unit of display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph {
    /// NFC display text: usually one letter, possibly with a tone mark or a
    /// leading separator.
    pub text: String,
    /// Raw indices (relative to the rendered input) this glyph stands for,
    /// ascending and non-empty. Every raw index belongs to exactly one glyph.
    pub raw: Vec<usize>,
}

impl Glyph {
    pub fn new<T: Into<String>>(text: T, raw: Vec<usize>) -> Self {
        Self {
            text: text.into(),
            raw,
        }
    }

    /// First raw index covered.
    pub fn raw_start(&self) -> usize {
        self.raw.first().copied().unwrap_or(0)
    }

    /// Length in Unicode scalar values.
    pub fn width(&self) -> usize {
        self.text.chars().count()
    }
}

pub trait Orthography {
    /// Render raw ASCII (a syllable with optional tone digit, or any run the
    /// lexicon does not cover) as display glyphs.
    fn glyphs(&self, raw: &str) -> Vec<Glyph>;

    /// Rendered text of `raw`.
    fn render(&self, raw: &str) -> String {
        self.glyphs(raw).into_iter().map(|g| g.text).collect()
    }

    /// Rendered text of a multi-syllable word; syllables are hyphen-joined.
    fn render_word(&self, syllables: &[String]) -> String {
        syllables
            .iter()
            .map(|s| self.render(s))
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Text shown for a khin marker.
    fn khin_marker(&self, dotted: bool) -> &'static str {
        if dotted {
            KHIN_DOT
        } else {
            KHIN_KEY
        }
    }

    /// Glyphs of one composing segment.
    ///
    /// A segment typed as `--` plus a syllable shows the marker as one glyph
    /// over both hyphens (or one glyph per hyphen when not dotted). With
    /// `virtual_khin` the marker is prepended to the first glyph instead, as
    /// it covers no raw input.
    fn segment_glyphs(&self, raw: &str, virtual_khin: bool, dotted: bool) -> Vec<Glyph> {
        let marker = self.khin_marker(dotted);
        if has_khin_key(raw) {
            let mut out = if dotted {
                vec![Glyph::new(marker, vec![0, 1])]
            } else {
                vec![Glyph::new("-", vec![0]), Glyph::new("-", vec![1])]
            };
            out.extend(self.glyphs(&raw[KHIN_KEY.len()..]).into_iter().map(|mut g| {
                g.raw.iter_mut().for_each(|r| *r += KHIN_KEY.len());
                g
            }));
            return out;
        }

        let mut out = self.glyphs(raw);
        if virtual_khin {
            if let Some(first) = out.first_mut() {
                first.text.insert_str(0, marker);
            }
        }
        out
    }

    /// Rendered text of a composing segment; see [`segment_glyphs`](Self::segment_glyphs).
    fn render_segment(&self, raw: &str, virtual_khin: bool, dotted: bool) -> String {
        self.segment_glyphs(raw, virtual_khin, dotted)
            .into_iter()
            .map(|g| g.text)
            .collect()
    }
}

/// Whether `raw` opens with the khin key: exactly two hyphens, then
/// anything but a third.
pub fn has_khin_key(raw: &str) -> bool {
    raw.starts_with(KHIN_KEY) && !raw[KHIN_KEY.len()..].starts_with('-')
}

/// Orthography that displays raw input unchanged, one glyph per character.
#[derive(Debug, Clone, Copy, Default)]
pub struct Plain;

impl Orthography for Plain {
    fn glyphs(&self, raw: &str) -> Vec<Glyph> {
        raw.chars()
            .enumerate()
            .map(|(i, c)| Glyph::new(c.to_string(), vec![i]))
            .collect()
    }
}

/// Whether `c` is a Han character (CJK unified ideographs and extensions).
pub fn is_han(c: char) -> bool {
    matches!(c as u32,
        0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xF900..=0xFAFF
        | 0x20000..=0x2FA1F)
}
