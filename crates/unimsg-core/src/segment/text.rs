//! Text segments with style spans.
//!
//! Span offsets are character offsets (not bytes) into the text content and
//! are half-open. Spans may overlap. Every operation that changes the content
//! re-attributes the spans so that no span ever reaches outside the content.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use super::Origin;

/// Style spans of a [`Text`], keyed by `(start, end)` character range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Styles(BTreeMap<(usize, usize), Vec<String>>);

impl Styles {
    /// Returns `true` if no span is recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct ranges.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over `((start, end), styles)` in range order.
    pub fn iter(&self) -> impl Iterator<Item = (&(usize, usize), &Vec<String>)> {
        self.0.iter()
    }

    /// Returns the styles recorded for exactly `range`.
    pub fn get(&self, range: (usize, usize)) -> Option<&[String]> {
        self.0.get(&range).map(Vec::as_slice)
    }

    fn insert(&mut self, range: (usize, usize), styles: impl IntoIterator<Item = String>) {
        let entry = self.0.entry(range).or_default();
        for style in styles {
            if !entry.contains(&style) {
                entry.push(style);
            }
        }
        if entry.is_empty() {
            self.0.remove(&range);
        }
    }

    /// Spans intersected with `[start, end)` and moved to start at zero.
    fn window(&self, start: usize, end: usize) -> Self {
        let mut out = Styles::default();
        for (&(s, e), styles) in &self.0 {
            let s = s.max(start);
            let e = e.min(end);
            if s < e {
                out.insert((s - start, e - start), styles.iter().cloned());
            }
        }
        out
    }

    fn shifted(&self, offset: usize) -> impl Iterator<Item = ((usize, usize), &Vec<String>)> {
        self.0
            .iter()
            .map(move |(&(s, e), styles)| ((s + offset, e + offset), styles))
    }
}

impl Serialize for Styles {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for ((start, end), styles) in &self.0 {
            map.serialize_entry(&format!("{start}:{end}"), styles)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Styles {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Vec<String>>::deserialize(deserializer)?;
        let mut styles = Styles::default();
        for (key, values) in raw {
            let (start, end) = key
                .split_once(':')
                .and_then(|(s, e)| Some((s.parse().ok()?, e.parse().ok()?)))
                .ok_or_else(|| de::Error::custom(format!("invalid style range '{key}'")))?;
            styles.insert((start, end), values);
        }
        Ok(styles)
    }
}

/// Text content, optionally tagged with style spans.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Text {
    pub text: String,
    #[serde(skip_serializing_if = "Styles::is_empty")]
    pub styles: Styles,
    #[serde(skip)]
    pub origin: Origin,
}

/// Loaded spans are clamped to the content; empty and inverted ranges are
/// dropped.
impl<'de> Deserialize<'de> for Text {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            text: String,
            #[serde(default)]
            styles: Styles,
        }

        let Raw { text, styles } = Raw::deserialize(deserializer)?;
        let len = text.chars().count();
        Ok(Text {
            styles: styles.window(0, len),
            text,
            origin: Origin::none(),
        })
    }
}

impl Text {
    /// Creates unstyled text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            styles: Styles::default(),
            origin: Origin::none(),
        }
    }

    /// Creates text with one style covering all of it.
    pub fn styled(text: impl Into<String>, style: impl Into<String>) -> Self {
        let text = Self::new(text);
        let len = text.len();
        text.mark(0, len, [style])
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    /// Returns `true` if the content is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Tags `[start, end)` with `styles`. The range is clamped to the content.
    pub fn mark<I, S>(mut self, start: usize, end: usize, styles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let end = end.min(self.len());
        if start < end {
            self.styles
                .insert((start, end), styles.into_iter().map(Into::into));
        }
        self
    }

    /// Marks the whole text bold.
    pub fn bold(self) -> Self {
        let len = self.len();
        self.mark(0, len, ["bold"])
    }

    /// Marks the whole text italic.
    pub fn italic(self) -> Self {
        let len = self.len();
        self.mark(0, len, ["italic"])
    }

    /// Marks the whole text as inline code.
    pub fn code(self) -> Self {
        let len = self.len();
        self.mark(0, len, ["code"])
    }

    /// Marks the whole text as a link.
    pub fn link(self) -> Self {
        let len = self.len();
        self.mark(0, len, ["link"])
    }

    /// Styles applying at character `index`, outermost span first.
    pub fn styles_at(&self, index: usize) -> Vec<&str> {
        self.styles
            .iter()
            .filter(|((s, e), _)| *s <= index && index < *e)
            .flat_map(|(_, styles)| styles.iter().map(String::as_str))
            .collect()
    }

    /// Returns `true` if no style span is recorded.
    pub fn is_plain(&self) -> bool {
        self.styles.is_empty()
    }

    /// Characters `[start, end)` with their spans re-attributed.
    pub fn slice(&self, start: usize, end: usize) -> Text {
        let len = self.len();
        let end = end.min(len);
        let start = start.min(end);
        Text {
            text: char_slice(&self.text, start, end).to_string(),
            styles: self.styles.window(start, end),
            origin: Origin::none(),
        }
    }

    /// Appends `other`, shifting its spans past the current content.
    pub fn append(&mut self, other: &Text) {
        let offset = self.len();
        self.text.push_str(&other.text);
        for (range, styles) in other.styles.shifted(offset) {
            self.styles.insert(range, styles.iter().cloned());
        }
    }

    /// Splits on `sep`, keeping spans attributed to each part.
    pub fn split(&self, sep: &str) -> Vec<Text> {
        if sep.is_empty() {
            return vec![self.clone()];
        }
        let sep_len = sep.chars().count();
        let mut parts = Vec::new();
        let mut start = 0;
        let mut byte_from = 0;
        while let Some(found) = self.text[byte_from..].find(sep) {
            let byte_at = byte_from + found;
            let end = self.text[..byte_at].chars().count();
            parts.push(self.slice(start, end));
            start = end + sep_len;
            byte_from = byte_at + sep.len();
        }
        parts.push(self.slice(start, self.len()));
        parts
    }

    /// Removes leading whitespace.
    pub fn trim_start(&self) -> Text {
        let skipped = self.text.chars().take_while(|c| c.is_whitespace()).count();
        self.slice(skipped, self.len())
    }

    /// Removes trailing whitespace.
    pub fn trim_end(&self) -> Text {
        let kept = self.text.trim_end().chars().count();
        self.slice(0, kept)
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Borrows characters `[start, end)` of `s`.
pub(crate) fn char_slice(s: &str, start: usize, end: usize) -> &str {
    let mut indices = s.char_indices().map(|(i, _)| i).chain(std::iter::once(s.len()));
    let from = indices.nth(start).unwrap_or(s.len());
    let to = if end > start {
        indices.nth(end - start - 1).unwrap_or(s.len())
    } else {
        from
    };
    &s[from..to]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_clamps_to_content() {
        let text = Text::new("hello").mark(2, 99, ["bold"]);
        assert_eq!(text.styles.get((2, 5)), Some(&["bold".to_string()][..]));
        let empty = Text::new("hi").mark(5, 9, ["bold"]);
        assert!(empty.is_plain());
    }

    #[test]
    fn test_append_shifts_spans() {
        let mut a = Text::new("ab").bold();
        let b = Text::new("cde").mark(1, 3, ["italic"]);
        a.append(&b);
        assert_eq!(a.text, "abcde");
        assert!(a.styles.get((0, 2)).is_some());
        assert_eq!(a.styles.get((3, 5)), Some(&["italic".to_string()][..]));
    }

    #[test]
    fn test_slice_reattributes_overlapping_spans() {
        let text = Text::new("hello world")
            .mark(0, 5, ["bold"])
            .mark(3, 8, ["italic"]);
        let slice = text.slice(4, 11);
        assert_eq!(slice.text, "o world");
        assert!(slice.styles.get((0, 1)).is_some());
        assert!(slice.styles.get((0, 4)).is_some());
        assert_eq!(slice.styles.len(), 2);
    }

    #[test]
    fn test_slice_uses_character_offsets() {
        let text = Text::new("你好世界").mark(1, 3, ["bold"]);
        let slice = text.slice(1, 4);
        assert_eq!(slice.text, "好世界");
        assert!(slice.styles.get((0, 2)).is_some());
    }

    #[test]
    fn test_split_keeps_styles() {
        let text = Text::new("a,bb,c").mark(2, 4, ["code"]);
        let parts = text.split(",");
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].text, "bb");
        assert!(parts[1].styles.get((0, 2)).is_some());
        assert!(parts[0].is_plain());
    }

    #[test]
    fn test_styles_at() {
        let text = Text::new("abc").bold().mark(1, 2, ["italic"]);
        assert_eq!(text.styles_at(1), vec!["bold", "italic"]);
        assert_eq!(text.styles_at(2), vec!["bold"]);
    }

    #[test]
    fn test_trim() {
        let text = Text::new("  hi  ").mark(2, 4, ["bold"]);
        let trimmed = text.trim_start().trim_end();
        assert_eq!(trimmed.text, "hi");
        assert!(trimmed.styles.get((0, 2)).is_some());
    }

    #[test]
    fn test_styles_serde() {
        let text = Text::new("abc").bold();
        let value = serde_json::to_value(&text).unwrap();
        assert_eq!(value["styles"]["0:3"][0], "bold");
        let back: Text = serde_json::from_value(value).unwrap();
        assert_eq!(back, text);
    }

    #[test]
    fn test_char_slice() {
        assert_eq!(char_slice("héllo", 1, 3), "él");
        assert_eq!(char_slice("abc", 3, 3), "");
        assert_eq!(char_slice("abc", 0, 0), "");
    }
}
