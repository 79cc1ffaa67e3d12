//! Native segments and builder tables.
//!
//! A platform describes its wire segments by implementing [`NativeSegment`]
//! and registers one build function per wire type string in a
//! [`BuilderTable`]. Tables are assembled once at startup; building a
//! message is then a single map lookup per segment.
//!
//! Build functions are pure and total. A function that cannot find a field
//! it needs returns no segments, and a wire type with no entry is preserved
//! verbatim as [`Other`].

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::trace;

use crate::message::UniMessage;
use crate::segment::{Origin, Other, Reply, Segment, Text};

// ============================================================================
// NativeSegment Trait
// ============================================================================

/// A platform's wire segment.
pub trait NativeSegment:
    Debug + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Creates a plain text wire segment.
    fn text(text: impl Into<String>) -> Self;

    /// Returns the wire type identifier (e.g. "text", "image", "at").
    fn wire_type(&self) -> &str;

    /// Returns true if this is a plain text segment.
    fn is_text(&self) -> bool {
        self.wire_type() == "text"
    }

    /// Returns the text content if this is a text segment.
    fn as_text(&self) -> Option<&str>;

    /// Converts this segment into the value kept as an [`Origin`].
    fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Restores a segment from a value kept as an [`Origin`].
    fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

// ============================================================================
// BuilderTable
// ============================================================================

/// Converts one wire segment into zero or more universal segments.
pub type BuildFn<N> = Arc<dyn Fn(&N) -> Vec<Segment> + Send + Sync + 'static>;

/// Build functions of one platform, keyed by wire type string.
///
/// # Example
///
/// ```rust,ignore
/// let table = BuilderTable::<MySegment>::new("my-platform")
///     .on("text", |seg| vec![Segment::text(seg.content())])
///     .on("mention", |seg| seg.user_id().map(Segment::at).into_iter().collect());
///
/// let msg = table.build(&wire_segments);
/// ```
pub struct BuilderTable<N> {
    platform: String,
    entries: HashMap<String, BuildFn<N>>,
}

impl<N> Clone for BuilderTable<N> {
    fn clone(&self) -> Self {
        Self {
            platform: self.platform.clone(),
            entries: self.entries.clone(),
        }
    }
}

impl<N> Debug for BuilderTable<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut wire_types: Vec<_> = self.entries.keys().collect();
        wire_types.sort();
        f.debug_struct("BuilderTable")
            .field("platform", &self.platform)
            .field("wire_types", &wire_types)
            .finish()
    }
}

impl<N: NativeSegment> BuilderTable<N> {
    /// Creates an empty table for `platform`.
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            entries: HashMap::new(),
        }
    }

    /// Registers the build function for `wire_type`, replacing any previous one.
    pub fn on<F>(mut self, wire_type: impl Into<String>, build: F) -> Self
    where
        F: Fn(&N) -> Vec<Segment> + Send + Sync + 'static,
    {
        self.entries.insert(wire_type.into(), Arc::new(build));
        self
    }

    /// The platform this table builds for.
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Returns `true` if `wire_type` has a build function.
    pub fn supports(&self, wire_type: &str) -> bool {
        self.entries.contains_key(wire_type)
    }

    /// Builds the universal segments for one wire segment.
    ///
    /// Every produced segment carries an origin pointing at `native` unless
    /// the build function attached one itself.
    pub fn build_segment(&self, native: &N) -> Vec<Segment> {
        let raw = native.to_value();
        let Some(build) = self.entries.get(native.wire_type()) else {
            trace!(
                platform = %self.platform,
                wire_type = native.wire_type(),
                "no builder entry, keeping native segment"
            );
            return vec![Segment::Other(Other::new(self.platform.clone(), raw))];
        };

        let origin = Origin::new(self.platform.clone(), raw);
        let mut segments = build(native);
        for seg in &mut segments {
            if seg.origin().is_none() {
                seg.set_origin(origin.clone());
            }
        }
        segments
    }

    /// Builds a message from wire segments.
    ///
    /// Whitespace-only text segments are joined with the neighbouring content
    /// and dropped at the start and end of the message.
    pub fn build<'a, I>(&self, natives: I) -> UniMessage
    where
        I: IntoIterator<Item = &'a N>,
    {
        let mut msg = UniMessage::new();
        let mut pending: Option<String> = None;

        for native in natives {
            if let Some(text) = native.as_text() {
                if text.trim().is_empty() {
                    if !msg.is_empty() {
                        pending.get_or_insert_with(String::new).push_str(text);
                    }
                    continue;
                }
            }
            let segments = self.build_segment(native);
            if segments.is_empty() {
                continue;
            }
            if let Some(space) = pending.take() {
                msg.push(Text::new(space));
            }
            msg.extend(segments);
        }
        msg
    }

    /// Builds a message and prepends `reply` unless it already starts with one.
    ///
    /// `reply` comes from platform reply metadata carried outside the
    /// segment list.
    pub fn build_with_reply<'a, I>(&self, natives: I, reply: Option<Reply>) -> UniMessage
    where
        I: IntoIterator<Item = &'a N>,
    {
        let msg = self.build(natives);
        match reply {
            Some(reply) if !matches!(msg.first(), Some(Segment::Reply(_))) => {
                let mut out = UniMessage::from(Segment::Reply(reply));
                out.extend(msg);
                out
            }
            _ => msg,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::segment::SegmentKind;
    use serde::Deserialize;
    use serde_json::json;

    /// A minimal wire model used across the core tests.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "type", content = "data", rename_all = "snake_case")]
    pub(crate) enum Wire {
        Text { text: String },
        Mention { id: Option<String> },
        Picture { url: String },
        Dice {},
    }

    impl NativeSegment for Wire {
        fn text(text: impl Into<String>) -> Self {
            Wire::Text { text: text.into() }
        }

        fn wire_type(&self) -> &str {
            match self {
                Wire::Text { .. } => "text",
                Wire::Mention { .. } => "mention",
                Wire::Picture { .. } => "picture",
                Wire::Dice {} => "dice",
            }
        }

        fn as_text(&self) -> Option<&str> {
            match self {
                Wire::Text { text } => Some(text),
                _ => None,
            }
        }
    }

    pub(crate) fn table() -> BuilderTable<Wire> {
        BuilderTable::new("test")
            .on("text", |seg| match seg {
                Wire::Text { text } => vec![Segment::text(text.clone())],
                _ => vec![],
            })
            .on("mention", |seg| match seg {
                Wire::Mention { id: Some(id) } => vec![Segment::at(id.clone())],
                _ => vec![],
            })
            .on("picture", |seg| match seg {
                Wire::Picture { url } => vec![Segment::image_url(url.clone())],
                _ => vec![],
            })
    }

    fn text(s: &str) -> Wire {
        Wire::text(s)
    }

    #[test]
    fn test_unknown_wire_type_becomes_other() {
        let msg = table().build(&[Wire::Dice {}]);
        assert_eq!(msg.len(), 1);
        let Segment::Other(other) = &msg[0] else {
            panic!("expected other");
        };
        assert_eq!(other.platform, "test");
        assert_eq!(other.raw, json!({"type": "dice", "data": {}}));
    }

    #[test]
    fn test_missing_field_contributes_nothing() {
        let msg = table().build(&[text("hi "), Wire::Mention { id: None }, text("there")]);
        assert_eq!(msg.len(), 1);
        assert_eq!(msg.extract_plain_text(), "hi there");
    }

    #[test]
    fn test_whitespace_dropped_at_edges_and_merged_inside() {
        let natives = [
            text("  "),
            text("hello"),
            text(" "),
            text("world"),
            Wire::Mention { id: Some("1".into()) },
            text("\n"),
        ];
        let msg = table().build(&natives);
        assert_eq!(msg.len(), 2);
        assert_eq!(msg[0].as_text(), Some("hello world"));
        assert_eq!(msg[1].kind(), SegmentKind::At);
    }

    #[test]
    fn test_whitespace_between_non_text_is_kept() {
        let natives = [
            Wire::Mention { id: Some("1".into()) },
            text(" "),
            Wire::Mention { id: Some("2".into()) },
        ];
        let msg = table().build(&natives);
        assert_eq!(msg.len(), 3);
        assert_eq!(msg[1].as_text(), Some(" "));
    }

    #[test]
    fn test_origin_attached() {
        let msg = table().build(&[Wire::Picture { url: "http://p".into() }]);
        let raw = msg[0].native_for("test").unwrap();
        assert_eq!(
            Wire::from_value(raw),
            Some(Wire::Picture { url: "http://p".into() })
        );
    }

    #[test]
    fn test_leading_reply() {
        let msg = table().build_with_reply(&[text("ok")], Some(Reply::new("77")));
        assert_eq!(msg.len(), 2);
        assert_eq!(msg[0], Segment::reply("77"));
    }
}
