//! The universal message type.
//!
//! [`UniMessage`] is an ordered sequence of [`Segment`]s in wire order.
//! Adjacent text segments are merged eagerly on every mutation, so no two
//! neighbouring elements are ever both [`Segment::Text`]; style spans of the
//! right-hand text are shifted past the left-hand content when merged.
//!
//! All query and transformation methods (`select`, `include`, `exclude`,
//! `slice`, `split`, ...) return new messages and leave `self` untouched.
//!
//! # Example
//!
//! ```rust
//! use unimsg_core::{Segment, SegmentKind, UniMessage};
//!
//! let msg = UniMessage::new()
//!     .text("hello ")
//!     .with(Segment::at("42"))
//!     .text(" and ")
//!     .text("welcome");
//!
//! assert_eq!(msg.len(), 3);
//! assert_eq!(msg.count(&SegmentKind::At), 1);
//! assert_eq!(msg.extract_plain_text(), "hello  and welcome");
//! ```

use std::fmt::{self, Display};
use std::ops::{Add, AddAssign, Bound, Deref, RangeBounds};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::segment::{Origin, Segment, SegmentKind, SegmentVariant, Text};

/// An ordered, normalised sequence of segments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UniMessage {
    segments: Vec<Segment>,
}

// ============================================================================
// Construction and mutation
// ============================================================================

impl UniMessage {
    /// Creates an empty message.
    pub const fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Creates a message from segments, merging adjacent text.
    pub fn from_segments(segments: impl IntoIterator<Item = Segment>) -> Self {
        let mut msg = Self::new();
        msg.extend(segments);
        msg
    }

    /// Appends a segment, merging it into a trailing text segment if both are
    /// text. Empty text is dropped.
    pub fn push(&mut self, segment: impl Into<Segment>) {
        match segment.into() {
            Segment::Text(text) if text.is_empty() => {}
            Segment::Text(text) => match self.segments.last_mut() {
                Some(Segment::Text(last)) => {
                    last.append(&text);
                    last.origin = Origin::none();
                }
                _ => self.segments.push(Segment::Text(text)),
            },
            other => self.segments.push(other),
        }
    }

    /// Appends several segments.
    pub fn extend(&mut self, segments: impl IntoIterator<Item = Segment>) {
        for segment in segments {
            self.push(segment);
        }
    }

    /// Consumes the message and appends a segment (builder pattern).
    pub fn with(mut self, segment: impl Into<Segment>) -> Self {
        self.push(segment);
        self
    }

    /// Appends plain text.
    pub fn text(self, text: impl Into<String>) -> Self {
        self.with(Text::new(text))
    }

    /// Appends a user mention.
    pub fn at(self, target: impl Into<String>) -> Self {
        self.with(Segment::at(target))
    }

    /// Appends a mention of everyone.
    pub fn at_all(self) -> Self {
        self.with(Segment::at_all())
    }

    /// Appends an image by URL.
    pub fn image_url(self, url: impl Into<String>) -> Self {
        self.with(Segment::image_url(url))
    }

    /// Prepends a reply marker.
    pub fn reply_to(self, id: impl Into<String>) -> Self {
        let mut msg = UniMessage::from(Segment::reply(id));
        msg.extend(self.segments);
        msg
    }

    /// Inserts a segment at `index` (clamped to the length).
    pub fn insert(&mut self, index: usize, segment: impl Into<Segment>) {
        let index = index.min(self.segments.len());
        let tail = self.segments.split_off(index);
        self.push(segment);
        self.extend(tail);
    }

    /// Removes and returns the segment at `index`; neighbouring text
    /// segments are merged afterwards.
    pub fn remove(&mut self, index: usize) -> Option<Segment> {
        if index >= self.segments.len() {
            return None;
        }
        let removed = self.segments.remove(index);
        let tail = self.segments.split_off(index);
        self.extend(tail);
        Some(removed)
    }

    /// Consumes the message and returns its segments.
    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }
}

// ============================================================================
// Queries
// ============================================================================

impl UniMessage {
    /// All segments of `kind`.
    pub fn select(&self, kind: &SegmentKind) -> UniMessage {
        self.filtered(|seg| seg.is(kind))
    }

    /// All segments of `kind`, descending into nested children.
    pub fn select_deep(&self, kind: &SegmentKind) -> UniMessage {
        fn walk(seg: &Segment, kind: &SegmentKind, out: &mut UniMessage) {
            if seg.is(kind) {
                out.push(seg.clone());
            }
            for child in seg.children() {
                walk(&child, kind, out);
            }
        }

        let mut out = UniMessage::new();
        for seg in &self.segments {
            walk(seg, kind, &mut out);
        }
        out
    }

    /// The first `count` segments of `kind`.
    pub fn get(&self, kind: &SegmentKind, count: usize) -> UniMessage {
        UniMessage::from_segments(
            self.segments
                .iter()
                .filter(|seg| seg.is(kind))
                .take(count)
                .cloned(),
        )
    }

    /// Returns `true` if every segment is of `kind`.
    pub fn only(&self, kind: &SegmentKind) -> bool {
        self.segments.iter().all(|seg| seg.is(kind))
    }

    /// Number of segments of `kind`.
    pub fn count(&self, kind: &SegmentKind) -> usize {
        self.segments.iter().filter(|seg| seg.is(kind)).count()
    }

    /// Returns `true` if any segment is of `kind`.
    pub fn has(&self, kind: &SegmentKind) -> bool {
        self.segments.iter().any(|seg| seg.is(kind))
    }

    /// Position of the first segment of `kind`.
    pub fn index(&self, kind: &SegmentKind) -> Option<usize> {
        self.segments.iter().position(|seg| seg.is(kind))
    }

    /// Typed iteration over one variant.
    pub fn of<'a, T: SegmentVariant + 'a>(&'a self) -> impl Iterator<Item = &'a T> {
        self.segments.iter().filter_map(T::from_segment)
    }

    /// Keeps only segments whose kind is in `kinds`.
    pub fn include(&self, kinds: &[SegmentKind]) -> UniMessage {
        self.filtered(|seg| kinds.contains(&seg.kind()))
    }

    /// Drops segments whose kind is in `kinds`.
    pub fn exclude(&self, kinds: &[SegmentKind]) -> UniMessage {
        self.filtered(|seg| !kinds.contains(&seg.kind()))
    }

    fn filtered(&self, keep: impl Fn(&Segment) -> bool) -> UniMessage {
        UniMessage::from_segments(self.segments.iter().filter(|seg| keep(seg)).cloned())
    }

    /// Concatenates the content of all text segments.
    pub fn extract_plain_text(&self) -> String {
        self.segments.iter().filter_map(Segment::as_text).collect()
    }

    /// Returns `true` if the message begins with text starting with `prefix`.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.segments
            .first()
            .and_then(Segment::as_text)
            .is_some_and(|text| text.starts_with(prefix))
    }

    /// Returns `true` if the message ends with text ending with `suffix`.
    pub fn ends_with(&self, suffix: &str) -> bool {
        self.segments
            .last()
            .and_then(Segment::as_text)
            .is_some_and(|text| text.ends_with(suffix))
    }
}

// ============================================================================
// Transformations
// ============================================================================

impl UniMessage {
    /// Segments in `range` (by segment index).
    pub fn slice(&self, range: impl RangeBounds<usize>) -> UniMessage {
        let len = self.segments.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s + 1,
            Bound::Unbounded => 0,
        }
        .min(len);
        let end = match range.end_bound() {
            Bound::Included(&e) => e + 1,
            Bound::Excluded(&e) => e,
            Bound::Unbounded => len,
        }
        .clamp(start, len);
        UniMessage {
            segments: self.segments[start..end].to_vec(),
        }
    }

    /// Removes whitespace at the start of the leading text segment.
    pub fn trim_start(&self) -> UniMessage {
        let mut segments = self.segments.clone();
        if let Some(Segment::Text(text)) = segments.first() {
            let trimmed = text.trim_start();
            if trimmed.is_empty() {
                segments.remove(0);
            } else {
                segments[0] = Segment::Text(trimmed);
            }
        }
        UniMessage { segments }
    }

    /// Removes whitespace at the end of the trailing text segment.
    pub fn trim_end(&self) -> UniMessage {
        let mut segments = self.segments.clone();
        if let Some(Segment::Text(text)) = segments.last() {
            let trimmed = text.trim_end();
            if trimmed.is_empty() {
                segments.pop();
            } else if let Some(last) = segments.last_mut() {
                *last = Segment::Text(trimmed);
            }
        }
        UniMessage { segments }
    }

    /// Removes edge whitespace on both ends.
    pub fn trim(&self) -> UniMessage {
        self.trim_start().trim_end()
    }

    /// Splits on `sep` inside text segments; other segments stay with the
    /// piece they appear in. Empty pieces are dropped.
    pub fn split(&self, sep: &str) -> Vec<UniMessage> {
        let mut pieces = Vec::new();
        let mut current = UniMessage::new();
        for seg in &self.segments {
            let Segment::Text(text) = seg else {
                current.push(seg.clone());
                continue;
            };
            let mut parts = text.split(sep).into_iter();
            if let Some(first) = parts.next() {
                current.push(first);
            }
            for part in parts {
                let done = std::mem::take(&mut current);
                if !done.is_empty() {
                    pieces.push(done);
                }
                current.push(part);
            }
        }
        if !current.is_empty() {
            pieces.push(current);
        }
        pieces
    }

    /// Replaces every occurrence of `from` in text segments with `to`.
    pub fn replace(&self, from: &str, to: &str) -> UniMessage {
        let mut out = UniMessage::new();
        for seg in &self.segments {
            match seg {
                Segment::Text(text) if !from.is_empty() => {
                    let mut replaced = Text::new("");
                    for (i, part) in text.split(from).iter().enumerate() {
                        if i > 0 {
                            replaced.append(&Text::new(to));
                        }
                        replaced.append(part);
                    }
                    out.push(replaced);
                }
                other => out.push(other.clone()),
            }
        }
        out
    }
}

// ============================================================================
// Trait implementations
// ============================================================================

impl Deref for UniMessage {
    type Target = [Segment];

    fn deref(&self) -> &Self::Target {
        &self.segments
    }
}

impl Display for UniMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl Add for UniMessage {
    type Output = UniMessage;

    fn add(mut self, rhs: UniMessage) -> Self::Output {
        self.extend(rhs.segments);
        self
    }
}

impl AddAssign for UniMessage {
    fn add_assign(&mut self, rhs: UniMessage) {
        self.extend(rhs.segments);
    }
}

impl IntoIterator for UniMessage {
    type Item = Segment;
    type IntoIter = std::vec::IntoIter<Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.into_iter()
    }
}

impl<'a> IntoIterator for &'a UniMessage {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}

impl FromIterator<Segment> for UniMessage {
    fn from_iter<T: IntoIterator<Item = Segment>>(iter: T) -> Self {
        Self::from_segments(iter)
    }
}

impl From<Vec<Segment>> for UniMessage {
    fn from(segments: Vec<Segment>) -> Self {
        Self::from_segments(segments)
    }
}

impl From<Segment> for UniMessage {
    fn from(segment: Segment) -> Self {
        Self::new().with(segment)
    }
}

impl From<&str> for UniMessage {
    fn from(text: &str) -> Self {
        Self::new().text(text)
    }
}

impl From<String> for UniMessage {
    fn from(text: String) -> Self {
        Self::new().text(text)
    }
}

impl Serialize for UniMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.segments.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for UniMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Segment>::deserialize(deserializer).map(UniMessage::from_segments)
    }
}
