//! Composition buffer state machine.
//!
//! The buffer is an ordered list of segments whose raw spans concatenate to
//! the raw ASCII input. Each segment is `Composing` (shows its own raw text
//! through the orthography), `Focused` (candidate list active, shows the
//! selected candidate) or `Converted` (locked to its selected candidate).
//! At most one segment is focused.
//!
//! Composing segments always carry a fresh candidate list for their open
//! region, ending with their own composed text. A composing syllable that
//! follows a khin syllable is shown neutral-tone too when autokhin is on.
//!
//! Every operation returns an immutable [`BufferSnapshot`]. Display text and
//! the raw/display cursor mapping are rebuilt from the segments each time.
use crate::candidate::Candidate;
use crate::config::{ConfigHandle, EngineConfig, InputMode};
use crate::lexicon::{EntryKind, Lexicon};
use crate::orthography::{has_khin_key, is_han, Glyph, Orthography};
use crate::segmenter::Segmenter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::rc::Rc;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentState {
    Composing,
    Focused,
    Converted,
}

#[derive(Debug, Clone)]
struct Segment {
    raw: String,
    state: SegmentState,
    candidates: Vec<Candidate>,
    selected: usize,
    /// Basic mode only: boundary fixed, excluded from re-segmentation.
    settled: bool,
    /// Neutral-tone by autokhin rather than by a typed khin key.
    virtual_khin: bool,
}

impl Segment {
    fn composing(raw: String) -> Self {
        Self {
            raw,
            state: SegmentState::Composing,
            candidates: Vec::new(),
            selected: 0,
            settled: false,
            virtual_khin: false,
        }
    }

    fn len(&self) -> usize {
        self.raw.len()
    }

    fn selection(&self) -> Option<&Candidate> {
        self.candidates.get(self.selected)
    }

    fn is_locked(&self) -> bool {
        self.state != SegmentState::Composing
    }

    /// Text this segment contributes when locked.
    fn locked_text(&self) -> Option<&str> {
        if self.is_locked() {
            self.selection().map(|c| c.text.as_str())
        } else {
            None
        }
    }
}

/// One segment as seen by the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSnapshot {
    pub raw: String,
    pub raw_start: usize,
    pub raw_end: usize,
    pub text: String,
    pub display_start: usize,
    pub display_end: usize,
    pub state: SegmentState,
    pub candidates: Vec<Candidate>,
    pub selected: usize,
}

/// Immutable view of the buffer after an operation.
///
/// Display offsets count Unicode scalar values of the (NFC) display string.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BufferSnapshot {
    pub display: String,
    pub cursor: usize,
    pub raw: String,
    pub raw_cursor: usize,
    pub segments: Vec<SegmentSnapshot>,
}

impl BufferSnapshot {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Index of the focused segment, if any.
    pub fn focused(&self) -> Option<usize> {
        self.segments
            .iter()
            .position(|s| s.state == SegmentState::Focused)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// Rendered position of one segment. Glyph raw indices are segment-relative.
struct SegmentLayout {
    raw_start: usize,
    raw_end: usize,
    display_start: usize,
    display_end: usize,
    text: String,
    glyphs: Vec<Glyph>,
}

struct Layout {
    display: String,
    width: usize,
    raw_len: usize,
    segments: Vec<SegmentLayout>,
}

impl Layout {
    fn display_offset(&self, raw: usize) -> usize {
        if raw >= self.raw_len {
            return self.width;
        }
        for seg in &self.segments {
            if raw < seg.raw_start || raw >= seg.raw_end {
                continue;
            }
            if raw == seg.raw_start {
                return seg.display_start;
            }
            let rel = raw - seg.raw_start;
            let inside: usize = seg
                .glyphs
                .iter()
                .filter(|g| g.raw_start() < rel)
                .map(Glyph::width)
                .sum();
            return seg.display_start + inside;
        }
        self.width
    }

    /// Raw offsets where the caret may rest.
    fn caret_stops(&self) -> BTreeSet<usize> {
        let mut stops = BTreeSet::new();
        stops.insert(0);
        stops.insert(self.raw_len);
        for seg in &self.segments {
            stops.insert(seg.raw_start);
            for g in &seg.glyphs {
                stops.insert(seg.raw_start + g.raw_start());
            }
        }
        stops
    }
}

enum Piece {
    Kept(Segment),
    Loose(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pick {
    First,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Backward,
    Forward,
}

/// The editing state machine.
pub struct BufferManager<O: Orthography> {
    lexicon: Rc<Lexicon>,
    ortho: O,
    config: ConfigHandle,
    segments: Vec<Segment>,
    cursor: usize,
}

impl<O: Orthography> BufferManager<O> {
    pub fn new(lexicon: Rc<Lexicon>, ortho: O, config: ConfigHandle) -> Self {
        Self {
            lexicon,
            ortho,
            config,
            segments: Vec::new(),
            cursor: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Raw ASCII input.
    pub fn raw(&self) -> String {
        self.segments.iter().map(|s| s.raw.as_str()).collect()
    }

    /// Splice ASCII letters, digits and hyphens into the raw buffer at the
    /// caret. Other characters are dropped.
    pub fn insert(&mut self, text: &str) -> BufferSnapshot {
        let text: String = text
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect();
        if text.is_empty() {
            return self.snapshot();
        }
        trace!(text = %text, cursor = self.cursor, "insert");
        let at = self.cursor;
        self.rebuild(at, at, &text);
        self.cursor = at + text.len();
        self.clamp_cursor();
        self.finish()
    }

    pub fn delete_backward(&mut self, count: usize) -> BufferSnapshot {
        for _ in 0..count {
            if !self.delete_step(Direction::Backward) {
                break;
            }
        }
        self.finish()
    }

    pub fn delete_forward(&mut self, count: usize) -> BufferSnapshot {
        for _ in 0..count {
            if !self.delete_step(Direction::Forward) {
                break;
            }
        }
        self.finish()
    }

    /// Cursor-down: select the next candidate of the focused segment. Past
    /// the end of the list the segment returns to composing and focus moves
    /// to the segment after it. Without a focused segment, focuses the first
    /// unconverted one. The caret moves to the end of the buffer.
    pub fn focus_next_candidate(&mut self) -> BufferSnapshot {
        if self.segments.is_empty() {
            return self.snapshot();
        }
        match self.focused_index() {
            Some(i) => {
                let (selected, count) = self.selection_state(i);
                if selected + 1 < count {
                    self.select(i, selected + 1);
                } else if i + 1 < self.segments.len() {
                    let (_, end) = self.segment_bounds(i);
                    self.unfocus(i);
                    let next = self
                        .segment_starting_from(end)
                        .unwrap_or(self.segments.len() - 1);
                    self.focus(next, Pick::First);
                } else {
                    self.select(i, 0);
                }
            }
            None => {
                let i = self.first_open_segment();
                self.focus(i, Pick::First);
            }
        }
        self.cursor = self.raw_len();
        self.finish()
    }

    /// Cursor-up: the mirror of [`focus_next_candidate`](Self::focus_next_candidate).
    pub fn focus_prev_candidate(&mut self) -> BufferSnapshot {
        if self.segments.is_empty() {
            return self.snapshot();
        }
        match self.focused_index() {
            Some(i) => {
                let (selected, count) = self.selection_state(i);
                if selected > 0 {
                    self.select(i, selected - 1);
                } else if i > 0 {
                    let (start, _) = self.segment_bounds(i);
                    self.unfocus(i);
                    let prev = self.segment_left_of(start).unwrap_or(0);
                    self.focus(prev, Pick::Last);
                } else {
                    self.select(i, count.saturating_sub(1));
                }
            }
            None => {
                let i = self.first_open_segment();
                self.focus(i, Pick::First);
            }
        }
        self.cursor = self.raw_len();
        self.finish()
    }

    /// Word-boundary key: lock the focused segment, or else convert the
    /// segment left of the caret to its best candidate.
    pub fn word_boundary(&mut self) -> BufferSnapshot {
        if let Some(i) = self.focused_index() {
            self.segments[i].state = SegmentState::Converted;
        } else if let Some(i) = self.segment_left_of(self.cursor) {
            if self.segments[i].state == SegmentState::Composing {
                self.focus(i, Pick::First);
                self.segments[i].state = SegmentState::Converted;
            }
        }
        self.finish()
    }

    pub fn move_cursor_left(&mut self) -> BufferSnapshot {
        let stops = self.layout().caret_stops();
        if let Some(&stop) = stops.range(..self.cursor).next_back() {
            self.cursor = stop;
        }
        self.snapshot()
    }

    pub fn move_cursor_right(&mut self) -> BufferSnapshot {
        let stops = self.layout().caret_stops();
        if let Some(&stop) = stops.range(self.cursor + 1..).next() {
            self.cursor = stop;
        }
        self.snapshot()
    }

    /// Convert every segment to its selected candidate, record the token
    /// sequence in the lexicon store, clear, and return the committed text.
    pub fn commit(&mut self) -> String {
        if self.segments.is_empty() {
            return String::new();
        }
        let mut i = 0;
        while i < self.segments.len() {
            match self.segments[i].state {
                SegmentState::Composing => {
                    self.focus(i, Pick::First);
                    self.segments[i].state = SegmentState::Converted;
                }
                SegmentState::Focused => self.segments[i].state = SegmentState::Converted,
                SegmentState::Converted => {}
            }
            i += 1;
        }

        let text = self.layout().display;
        let tokens: Vec<&str> = self
            .segments
            .iter()
            .filter_map(|s| s.selection().map(|c| c.text.as_str()))
            .collect();
        match self.lexicon.record(&tokens) {
            Ok(rows) => debug!(rows, text = %text, "committed"),
            Err(e) => warn!(error = %e, "failed to record committed tokens"),
        }
        self.clear();
        text
    }

    /// Discard everything. Idempotent.
    pub fn clear(&mut self) -> BufferSnapshot {
        self.segments.clear();
        self.cursor = 0;
        self.snapshot()
    }

    pub fn snapshot(&self) -> BufferSnapshot {
        let layout = self.layout();
        let cursor = layout.display_offset(self.cursor);
        let segments = self
            .segments
            .iter()
            .zip(layout.segments)
            .map(|(seg, lay)| SegmentSnapshot {
                raw: seg.raw.clone(),
                raw_start: lay.raw_start,
                raw_end: lay.raw_end,
                text: lay.text,
                display_start: lay.display_start,
                display_end: lay.display_end,
                state: seg.state,
                candidates: seg.candidates.clone(),
                selected: seg.selected,
            })
            .collect();
        BufferSnapshot {
            display: layout.display,
            cursor,
            raw: self.raw(),
            raw_cursor: self.cursor,
            segments,
        }
    }

    fn finish(&mut self) -> BufferSnapshot {
        self.apply_autokhin();
        self.refresh_composing();
        self.snapshot()
    }

    fn layout(&self) -> Layout {
        let dotted = self.config.app().dotted_khin;
        let mut display = String::new();
        let mut width = 0;
        let mut raw_pos = 0;
        let mut segments = Vec::with_capacity(self.segments.len());
        let mut last_char: Option<char> = None;

        for seg in &self.segments {
            let (text, glyphs) = match seg.locked_text() {
                Some(text) => {
                    let glyph = Glyph::new(text, (0..seg.len()).collect());
                    (text.to_string(), vec![glyph])
                }
                None => {
                    let glyphs = self.ortho.segment_glyphs(&seg.raw, seg.virtual_khin, dotted);
                    let text: String = glyphs.iter().map(|g| g.text.as_str()).collect();
                    (text, glyphs)
                }
            };

            if let (Some(prev), Some(next)) = (last_char, text.chars().next()) {
                let joined = (is_han(prev) && is_han(next)) || prev == '-' || next == '-';
                if !joined {
                    display.push(' ');
                    width += 1;
                }
            }
            let display_start = width;
            width += text.chars().count();
            display.push_str(&text);
            if let Some(c) = text.chars().last() {
                last_char = Some(c);
            }

            segments.push(SegmentLayout {
                raw_start: raw_pos,
                raw_end: raw_pos + seg.len(),
                display_start,
                display_end: width,
                text,
                glyphs,
            });
            raw_pos += seg.len();
        }

        Layout {
            display,
            width,
            raw_len: raw_pos,
            segments,
        }
    }

    fn focused_index(&self) -> Option<usize> {
        self.segments
            .iter()
            .position(|s| s.state == SegmentState::Focused)
    }

    fn selection_state(&self, i: usize) -> (usize, usize) {
        let seg = &self.segments[i];
        (seg.selected, seg.candidates.len())
    }

    fn first_open_segment(&self) -> usize {
        self.segments
            .iter()
            .position(|s| s.state != SegmentState::Converted)
            .unwrap_or(0)
    }

    fn raw_len(&self) -> usize {
        self.segments.iter().map(Segment::len).sum()
    }

    fn segment_bounds(&self, i: usize) -> (usize, usize) {
        let start: usize = self.segments[..i].iter().map(Segment::len).sum();
        (start, start + self.segments[i].len())
    }

    /// Segment whose span ends at or contains `raw` (from the left).
    fn segment_left_of(&self, raw: usize) -> Option<usize> {
        let mut start = 0;
        for (i, seg) in self.segments.iter().enumerate() {
            let end = start + seg.len();
            if start < raw && raw <= end {
                return Some(i);
            }
            start = end;
        }
        None
    }

    /// First segment starting at or after `raw`.
    fn segment_starting_from(&self, raw: usize) -> Option<usize> {
        let mut start = 0;
        for (i, seg) in self.segments.iter().enumerate() {
            if start >= raw {
                return Some(i);
            }
            start += seg.len();
        }
        None
    }

    /// Segment whose span starts at or contains `raw` (from the right).
    fn segment_right_of(&self, raw: usize) -> Option<usize> {
        let mut start = 0;
        for (i, seg) in self.segments.iter().enumerate() {
            let end = start + seg.len();
            if start <= raw && raw < end {
                return Some(i);
            }
            start = end;
        }
        None
    }

    /// Exclusive end index of the open region starting at segment `i`: the
    /// segment itself plus every following segment up to the next converted one.
    fn region_end(&self, i: usize) -> usize {
        let mut j = i + 1;
        while j < self.segments.len() && self.segments[j].state != SegmentState::Converted {
            j += 1;
        }
        j
    }

    fn prev_token(&self, i: usize) -> Option<String> {
        i.checked_sub(1)
            .and_then(|p| self.segments[p].locked_text())
            .map(str::to_string)
    }

    fn region_raw(&self, i: usize) -> String {
        let j = self.region_end(i);
        self.segments[i..j].iter().map(|s| s.raw.as_str()).collect()
    }

    /// Candidates for segment `i` over its open region.
    fn candidates_for(&self, i: usize, cfg: &EngineConfig) -> Vec<Candidate> {
        let seg = &self.segments[i];
        let prev = self.prev_token(i);
        Segmenter::new(&self.lexicon, &self.ortho, cfg).candidates(
            &self.region_raw(i),
            seg.len(),
            prev.as_deref(),
            seg.virtual_khin,
        )
    }

    /// Return focused segment `i` to composing. Its open region is merged
    /// and segmented afresh.
    fn unfocus(&mut self, i: usize) {
        let j = self.region_end(i);
        let region = self.region_raw(i);
        let prev = self.prev_token(i);
        let cfg = self.config.get();
        let fresh = self.compose_run(&region, prev.as_deref(), &cfg);
        self.segments.splice(i..j, fresh);
        self.clamp_cursor();
    }

    /// Focus converted segment `i` again with a fresh candidate list,
    /// keeping its current text selected.
    fn reopen(&mut self, i: usize) {
        let cfg = self.config.get();
        let candidates = self.candidates_for(i, &cfg);
        let seg = &self.segments[i];
        let current = seg.selection().map(|c| c.text.clone());
        let selected = candidates
            .iter()
            .position(|c| Some(&c.text) == current.as_ref() && c.len == seg.len())
            .unwrap_or(candidates.len().saturating_sub(1));
        self.set_focus(i);
        let seg = &mut self.segments[i];
        seg.candidates = candidates;
        seg.selected = selected;
    }

    fn set_focus(&mut self, i: usize) {
        for (k, seg) in self.segments.iter_mut().enumerate() {
            if k != i && seg.state == SegmentState::Focused {
                seg.state = SegmentState::Converted;
            }
        }
        self.segments[i].state = SegmentState::Focused;
    }

    /// Focus segment `i` with a fresh candidate list for its open region.
    fn focus(&mut self, i: usize, pick: Pick) {
        self.apply_autokhin();
        let cfg = self.config.get();
        let candidates = self.candidates_for(i, &cfg);

        let selected = match pick {
            Pick::First => 0,
            Pick::Last => candidates.len().saturating_sub(1),
        };
        self.set_focus(i);
        let seg = &mut self.segments[i];
        seg.candidates = candidates;
        seg.selected = selected;
        self.apply_span(i);
    }

    fn select(&mut self, i: usize, index: usize) {
        if index < self.segments[i].candidates.len() {
            self.segments[i].selected = index;
            self.apply_span(i);
        }
    }

    /// Resize segment `i` to its selected candidate's span and re-segment the
    /// rest of the open region behind it.
    fn apply_span(&mut self, i: usize) {
        let j = self.region_end(i);
        let region = self.region_raw(i);
        let wanted = self.segments[i].selection().map(|c| c.len).unwrap_or(region.len());
        let len = wanted.clamp(1, region.len().max(1));
        if len == self.segments[i].len() && j == i + 1 {
            return;
        }

        let tail = region[len..].to_string();
        self.segments[i].raw = region[..len].to_string();
        let prev = self.segments[i].locked_text().map(str::to_string);
        let cfg = self.config.get();
        let rest = if tail.is_empty() {
            Vec::new()
        } else {
            self.compose_run(&tail, prev.as_deref(), &cfg)
        };
        if len != region.len() || j != i + 1 {
            self.segments.splice(i + 1..j, rest);
        }
        self.clamp_cursor();
    }

    /// Replace raw `[start, end)` with `replacement` and re-segment every
    /// open run around the edit.
    fn rebuild(&mut self, start: usize, end: usize, replacement: &str) {
        let cfg = self.config.get();
        let basic = cfg.app.input_mode == InputMode::Basic;

        let mut before: Vec<Piece> = Vec::new();
        let mut after: Vec<Piece> = Vec::new();
        let mut touched_raw = String::new();
        let mut touched_tail = String::new();
        let mut offset = 0;

        for mut seg in std::mem::take(&mut self.segments) {
            let (s, e) = (offset, offset + seg.len());
            offset = e;
            let touched = if start == end {
                s < start && start < e
            } else {
                s < end && start < e
            };
            if touched {
                if s < start {
                    touched_raw.push_str(&seg.raw[..start - s]);
                }
                if e > end {
                    touched_tail.push_str(&seg.raw[end - s..]);
                }
                continue;
            }
            if seg.state == SegmentState::Focused {
                seg.state = SegmentState::Converted;
            }
            let piece = if seg.is_locked() || (basic && seg.settled) {
                Piece::Kept(seg)
            } else {
                Piece::Loose(seg.raw)
            };
            if e <= start {
                before.push(piece);
            } else {
                after.push(piece);
            }
        }

        let middle = format!("{touched_raw}{replacement}{touched_tail}");
        let mut pieces = before;
        if !middle.is_empty() {
            pieces.push(Piece::Loose(middle));
        }
        pieces.extend(after);

        let mut merged: Vec<Piece> = Vec::new();
        for piece in pieces {
            match (merged.last_mut(), piece) {
                (Some(Piece::Loose(text)), Piece::Loose(more)) => text.push_str(&more),
                (_, piece) => merged.push(piece),
            }
        }

        let mut out: Vec<Segment> = Vec::new();
        for piece in merged {
            match piece {
                Piece::Kept(seg) => out.push(seg),
                Piece::Loose(text) => {
                    let prev = out
                        .last()
                        .and_then(|s| s.locked_text())
                        .map(str::to_string);
                    out.extend(self.compose_run(&text, prev.as_deref(), &cfg));
                }
            }
        }
        self.segments = out;
    }

    /// Segment an open run of raw text into composing segments. Candidates
    /// are filled in by `refresh_composing` once the buffer settles.
    fn compose_run(&self, text: &str, prev: Option<&str>, cfg: &EngineConfig) -> Vec<Segment> {
        let segmenter = Segmenter::new(&self.lexicon, &self.ortho, cfg);
        let mut out = Vec::new();
        let mut pos = 0;
        for len in segmenter.layout(text, prev) {
            out.push(Segment::composing(text[pos..pos + len].to_string()));
            pos += len;
        }

        if cfg.app.input_mode == InputMode::Basic && out.len() > 1 {
            let mut start = 0;
            let last = out.len() - 1;
            for seg in out.iter_mut().take(last) {
                if self.lexicon.has_continuation(&text[start..]) {
                    break;
                }
                seg.settled = true;
                start += seg.len();
            }
        }
        out
    }

    /// Mark composing syllables after a khin syllable neutral-tone, up to the
    /// first segment that is not a plain syllable or word. Locked segments
    /// keep their marking and pass it on.
    fn apply_autokhin(&mut self) {
        let enabled = self.config.app().autokhin;
        let mut active = false;
        for seg in self.segments.iter_mut() {
            if seg.is_locked() {
                active = has_khin_key(&seg.raw) || seg.virtual_khin;
                continue;
            }
            if has_khin_key(&seg.raw) {
                seg.virtual_khin = false;
                active = true;
                continue;
            }
            let syllable = self
                .lexicon
                .entries(&seg.raw)
                .iter()
                .any(|e| e.kind != EntryKind::User);
            if !syllable {
                active = false;
            }
            seg.virtual_khin = enabled && active;
        }
    }

    /// Give every composing segment a fresh candidate list.
    fn refresh_composing(&mut self) {
        let cfg = self.config.get();
        for i in 0..self.segments.len() {
            if self.segments[i].state == SegmentState::Composing {
                self.segments[i].candidates = self.candidates_for(i, &cfg);
                self.segments[i].selected = 0;
            }
        }
    }

    /// One deletion step. Returns false when nothing could be deleted.
    fn delete_step(&mut self, direction: Direction) -> bool {
        let c = self.cursor;
        let idx = match direction {
            Direction::Backward => self.segment_left_of(c),
            Direction::Forward => self.segment_right_of(c),
        };
        let Some(idx) = idx else {
            return false;
        };
        let (s, e) = self.segment_bounds(idx);

        let removed: Vec<usize> = match self.segments[idx].state {
            SegmentState::Converted => {
                self.reopen(idx);
                return true;
            }
            SegmentState::Focused => (s..e).collect(),
            SegmentState::Composing => {
                let seg = &self.segments[idx];
                let dotted = self.config.app().dotted_khin;
                let glyphs = self.ortho.segment_glyphs(&seg.raw, seg.virtual_khin, dotted);
                let rel = c - s;
                let glyph = match direction {
                    Direction::Backward => glyphs.iter().filter(|g| g.raw_start() < rel).last(),
                    Direction::Forward => glyphs.iter().find(|g| g.raw_start() >= rel),
                };
                match glyph {
                    Some(g) => g.raw.iter().map(|r| s + r).collect(),
                    None => return false,
                }
            }
        };

        let remaining: String = self.segments[idx]
            .raw
            .char_indices()
            .filter(|(i, _)| !removed.contains(&(s + i)))
            .map(|(_, ch)| ch)
            .collect();
        self.rebuild(s, e, &remaining);
        self.cursor = c - removed.iter().filter(|&&r| r < c).count();
        self.clamp_cursor();

        if direction == Direction::Backward {
            if let Some(left) = self.segment_left_of(self.cursor) {
                if self.segments[left].state == SegmentState::Converted {
                    self.reopen(left);
                }
            }
        }
        true
    }

    /// Keep the caret out of the interior of locked segments.
    fn clamp_cursor(&mut self) {
        let total = self.raw_len();
        if self.cursor > total {
            self.cursor = total;
        }
        let mut start = 0;
        for seg in &self.segments {
            let end = start + seg.len();
            if seg.is_locked() && start < self.cursor && self.cursor < end {
                self.cursor = end;
                return;
            }
            start = end;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::CandidateKind;
    use crate::config::EngineConfig;
    use crate::orthography::Plain;
    use crate::store::{LexiconStore, WordRow};

    fn buffer(mode: InputMode) -> BufferManager<Plain> {
        let store = LexiconStore::in_memory(
            ["a", "an", "ne", "ho", "bo", "u"].iter().map(|s| s.to_string()).collect(),
            vec![
                WordRow::new("a1", Some("阿"), 100),
                WordRow::new("an1", Some("安"), 300),
                WordRow::new("an2-ne", Some("按呢"), 900),
                WordRow::new("ho2", Some("好"), 800),
                WordRow::new("bo5", Some("無"), 800),
            ],
        );
        let lexicon = Rc::new(Lexicon::load(store, 16).unwrap());
        let config = ConfigHandle::new(EngineConfig::default());
        config.update(config.app().with_input_mode(mode));
        BufferManager::new(lexicon, Plain, config)
    }

    fn raws(snap: &BufferSnapshot) -> Vec<&str> {
        snap.segments.iter().map(|s| s.raw.as_str()).collect()
    }

    #[test]
    fn insert_segments_and_moves_cursor() {
        let mut buf = buffer(InputMode::Continuous);
        let snap = buf.insert("hobo");
        assert_eq!(snap.display, "ho bo");
        assert_eq!(snap.cursor, 5);
        assert_eq!(raws(&snap), vec!["ho", "bo"]);
        assert!(snap.segments.iter().all(|s| s.state == SegmentState::Composing));
        assert_eq!(snap.raw, "hobo");
    }

    #[test]
    fn unsupported_input_is_dropped() {
        let mut buf = buffer(InputMode::Continuous);
        let snap = buf.insert("!? ");
        assert!(snap.is_empty());
        assert_eq!(buf.insert("a b").raw, "ab");
        assert_eq!(buf.insert("-").raw, "ab-");
    }

    #[test]
    fn hyphens_join_without_spaces() {
        let mut buf = buffer(InputMode::Continuous);
        let snap = buf.insert("ho2---a");
        assert_eq!(raws(&snap), vec!["ho2", "-", "--a"]);
        assert_eq!(snap.display, "ho2-\u{00B7}a");
        assert_eq!(snap.cursor, 6);
    }

    #[test]
    fn basic_mode_settles_boundaries() {
        let mut buf = buffer(InputMode::Basic);
        for ch in ["h", "o", "b", "o"] {
            buf.insert(ch);
        }
        let snap = buf.snapshot();
        assert_eq!(raws(&snap), vec!["ho", "bo"]);
        assert!(buf.segments[0].settled);
    }

    #[test]
    fn focus_cycles_through_candidates_and_segments() {
        let mut buf = buffer(InputMode::Continuous);
        buf.insert("hobo");
        let snap = buf.focus_next_candidate();
        assert_eq!(snap.focused(), Some(0));
        assert_eq!(snap.display, "好 bo");

        let count = snap.segments[0].candidates.len();
        let mut snap = snap;
        for _ in 0..count {
            snap = buf.focus_next_candidate();
        }
        assert_eq!(snap.focused(), Some(1));
        assert_eq!(snap.segments[0].state, SegmentState::Composing);
        assert_eq!(snap.display, "ho 無");

        let snap = buf.focus_prev_candidate();
        assert_eq!(snap.focused(), Some(0));
        assert_eq!(snap.segments[0].selected, snap.segments[0].candidates.len() - 1);
    }

    #[test]
    fn leaving_a_segment_resegments_its_region() {
        let mut buf = buffer(InputMode::Continuous);
        buf.insert("anne");
        let snap = buf.focus_next_candidate();
        assert_eq!(snap.display, "按呢");
        let count = snap.segments[0].candidates.len();
        let mut snap = snap;
        for _ in 0..count {
            snap = buf.focus_next_candidate();
        }
        assert_eq!(snap.display, "an ne");
        assert_eq!(raws(&snap), vec!["an", "ne"]);
        assert_eq!(snap.focused(), Some(1));

        let left = &snap.segments[0];
        assert_eq!(left.state, SegmentState::Composing);
        let own = left.candidates.last().unwrap();
        assert_eq!(own.kind, CandidateKind::Fallback);
        assert_eq!((own.text.as_str(), own.key.as_str(), own.len), ("an", "an", 2));
        assert!(left.candidates.iter().all(|c| c.len <= 4));
        assert_eq!(left.candidates[0].text, "按呢");
    }

    #[test]
    fn composing_candidates_follow_conversions() {
        let mut buf = buffer(InputMode::Continuous);
        let snap = buf.insert("anne");
        assert_eq!(snap.segments[0].candidates[0].text, "按呢");

        let snap = buf.word_boundary();
        assert_eq!(snap.segments[1].state, SegmentState::Converted);
        let head = &snap.segments[0];
        assert_eq!(head.state, SegmentState::Composing);
        assert!(head.candidates.iter().all(|c| c.len <= 2));
        assert_eq!(head.candidates[0].text, "安");
        assert_eq!(head.candidates.last().map(|c| c.text.as_str()), Some("an"));
    }

    #[test]
    fn focus_moves_the_caret_to_the_end() {
        let mut buf = buffer(InputMode::Continuous);
        buf.insert("hobo");
        buf.move_cursor_left();
        let snap = buf.move_cursor_left();
        assert_eq!(snap.raw_cursor, 2);
        let snap = buf.focus_next_candidate();
        assert_eq!(snap.display, "好 bo");
        assert_eq!(snap.raw_cursor, 4);
        assert_eq!(snap.cursor, 4);
    }

    #[test]
    fn focused_candidate_spans_resize_segments() {
        let mut buf = buffer(InputMode::Continuous);
        buf.insert("anne");
        let snap = buf.focus_next_candidate();
        assert_eq!(snap.display, "按呢");
        assert_eq!(snap.segments.len(), 1);
        assert_eq!(snap.cursor, 2);

        let snap = buf.focus_next_candidate();
        assert_eq!(snap.display, "an2-ne");
        let snap = buf.focus_next_candidate();
        assert_eq!(snap.display, "安 ne");
        assert_eq!(raws(&snap), vec!["an", "ne"]);
        assert_eq!(snap.cursor, 4);
    }

    #[test]
    fn word_boundary_then_delete() {
        let mut buf = buffer(InputMode::Basic);
        buf.insert("a");
        let snap = buf.word_boundary();
        assert_eq!(snap.segments[0].state, SegmentState::Converted);
        assert_eq!(snap.display, "阿");

        let snap = buf.insert("a");
        assert_eq!(snap.display, "阿 a");

        let snap = buf.delete_backward(1);
        assert_eq!(snap.segments.len(), 1);
        assert_eq!(snap.focused(), Some(0));

        let snap = buf.delete_backward(1);
        assert!(snap.is_empty());
        assert_eq!(snap.cursor, 0);
    }

    #[test]
    fn deleting_past_the_ends_is_a_no_op() {
        let mut buf = buffer(InputMode::Continuous);
        assert!(buf.delete_backward(3).is_empty());
        let before = buf.insert("ho");
        assert_eq!(buf.delete_forward(1), before);
        let snap = buf.delete_backward(5);
        assert!(snap.is_empty());
    }

    #[test]
    fn cursor_moves_by_glyph_and_edits_in_place() {
        let mut buf = buffer(InputMode::Continuous);
        buf.insert("hobo");
        let snap = buf.move_cursor_left();
        assert_eq!(snap.raw_cursor, 3);
        assert_eq!(snap.cursor, 4);
        buf.move_cursor_left();
        let snap = buf.move_cursor_left();
        assert_eq!(snap.raw_cursor, 1);
        let snap = buf.delete_forward(1);
        assert_eq!(snap.raw, "hbo");
        let snap = buf.insert("o");
        assert_eq!(snap.raw, "hobo");
        assert_eq!(snap.raw_cursor, 2);

        buf.move_cursor_left();
        buf.move_cursor_left();
        let snap = buf.move_cursor_left();
        assert_eq!(snap.raw_cursor, 0);
        let snap = buf.move_cursor_right();
        assert_eq!(snap.raw_cursor, 1);
    }

    #[test]
    fn commit_records_tokens_and_clears() {
        let mut buf = buffer(InputMode::Continuous);
        buf.insert("hobo");
        let text = buf.commit();
        assert_eq!(text, "好無");
        assert!(buf.is_empty());
        assert_eq!(buf.lexicon.unigram("好"), 1);
        assert_eq!(buf.lexicon.bigram("好", "無"), 1);
        assert_eq!(buf.commit(), "");
    }

    #[test]
    fn clear_is_idempotent() {
        let mut buf = buffer(InputMode::Continuous);
        buf.insert("anne");
        assert!(buf.clear().is_empty());
        let snap = buf.clear();
        assert!(snap.is_empty());
        assert_eq!(snap.cursor, 0);
    }

    #[test]
    fn mode_updates_apply_to_the_next_edit() {
        let mut buf = buffer(InputMode::Basic);
        buf.insert("hob");
        assert!(buf.segments[0].settled);
        buf.config
            .update(buf.config.app().with_input_mode(InputMode::Continuous));
        let snap = buf.insert("o");
        assert_eq!(raws(&snap), vec!["ho", "bo"]);
        assert!(buf.segments.iter().all(|s| !s.settled));
    }
}
