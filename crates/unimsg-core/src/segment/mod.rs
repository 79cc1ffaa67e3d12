//! The universal segment model.
//!
//! A [`Segment`] is the smallest unit of content in a [`UniMessage`]. The
//! variant set is closed: platform-specific content that has no universal
//! counterpart is kept verbatim in [`Other`], and plugin-defined content goes
//! through the [`Custom`] escape path, which still participates in builder
//! and exporter dispatch through [`SegmentKind::Custom`].
//!
//! Every segment produced by a builder may carry an [`Origin`]: a shared,
//! non-owning annotation pointing back at the native wire segment it was built
//! from. Origins never take part in equality or persistence.
//!
//! [`UniMessage`]: crate::UniMessage

mod basic;
mod interactive;
mod media;
mod reference;
mod text;

use std::fmt::{self, Display};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use basic::{At, AtAll, AtFlag, Custom, Emoji, Hyper, HyperFormat, Other};
pub use interactive::{Button, ButtonFlag, Keyboard, Permission};
pub use media::{Media, MediaSource, MediaType};
pub use reference::{CustomNode, ForwardNode, RefNode, Reference, Reply, ReplyContent};
pub use text::{Styles, Text};

// ============================================================================
// Origin
// ============================================================================

#[derive(Debug)]
struct OriginData {
    platform: String,
    raw: Value,
}

/// Back-reference to the native segment a [`Segment`] was built from.
///
/// The native value is shared with the builder that produced it; cloning a
/// segment only bumps a reference count. An origin is only a hint for
/// re-serialising on the same platform: two segments that differ only in
/// their origin compare equal, and origins are never dumped.
#[derive(Debug, Clone, Default)]
pub struct Origin(Option<Arc<OriginData>>);

impl Origin {
    /// An empty origin.
    pub const fn none() -> Self {
        Self(None)
    }

    /// Creates an origin pointing at a native value from `platform`.
    pub fn new(platform: impl Into<String>, raw: Value) -> Self {
        Self(Some(Arc::new(OriginData {
            platform: platform.into(),
            raw,
        })))
    }

    /// Returns `true` if no origin is attached.
    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// Platform the origin was produced by.
    pub fn platform(&self) -> Option<&str> {
        self.0.as_deref().map(|data| data.platform.as_str())
    }

    /// The native value, if it came from `platform`.
    pub fn raw_for(&self, platform: &str) -> Option<&Value> {
        self.0
            .as_deref()
            .filter(|data| data.platform == platform)
            .map(|data| &data.raw)
    }
}

impl PartialEq for Origin {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

// ============================================================================
// SegmentKind
// ============================================================================

/// Discriminator of a [`Segment`], used by queries and dispatch tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SegmentKind {
    Text,
    At,
    AtAll,
    Emoji,
    Image,
    Audio,
    Voice,
    Video,
    File,
    Reply,
    Hyper,
    Reference,
    Button,
    Keyboard,
    Other,
    /// A plugin-registered custom segment, keyed by its name.
    Custom(String),
}

impl SegmentKind {
    /// Returns the lowercase identifier of this kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::At => "at",
            Self::AtAll => "at_all",
            Self::Emoji => "emoji",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Voice => "voice",
            Self::Video => "video",
            Self::File => "file",
            Self::Reply => "reply",
            Self::Hyper => "hyper",
            Self::Reference => "reference",
            Self::Button => "button",
            Self::Keyboard => "keyboard",
            Self::Other => "other",
            Self::Custom(name) => name,
        }
    }

    /// Looks a built-in kind up by name, accepting both `snake_case` and the
    /// capitalised names used in command declarations (`At`, `Image`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name.to_ascii_lowercase().as_str() {
            "text" => Self::Text,
            "at" => Self::At,
            "at_all" | "atall" => Self::AtAll,
            "emoji" => Self::Emoji,
            "image" => Self::Image,
            "audio" => Self::Audio,
            "voice" => Self::Voice,
            "video" => Self::Video,
            "file" => Self::File,
            "reply" => Self::Reply,
            "hyper" => Self::Hyper,
            "reference" => Self::Reference,
            "button" => Self::Button,
            "keyboard" => Self::Keyboard,
            "other" => Self::Other,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns `true` for the media kinds.
    pub fn is_media(&self) -> bool {
        matches!(
            self,
            Self::Image | Self::Audio | Self::Voice | Self::Video | Self::File
        )
    }
}

impl Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Segment
// ============================================================================

/// One unit of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    /// Text with optional style spans.
    Text(Text),
    /// A mention of a user, role or channel.
    At(At),
    /// A mention of everyone.
    AtAll(AtAll),
    /// A platform emoji or sticker.
    Emoji(Emoji),
    /// Image, audio, voice, video or file content.
    Media(Media),
    /// A reply marker.
    Reply(Reply),
    /// XML or JSON card content.
    Hyper(Hyper),
    /// A forwarded message bundle.
    Reference(Reference),
    /// A single interactive button.
    Button(Button),
    /// A group of buttons.
    Keyboard(Keyboard),
    /// A native segment with no universal counterpart.
    Other(Other),
    /// A plugin-defined segment.
    Custom(Custom),
}

impl Segment {
    /// Creates a plain text segment.
    pub fn text(text: impl Into<String>) -> Self {
        Segment::Text(Text::new(text))
    }

    /// Creates a user mention.
    pub fn at(target: impl Into<String>) -> Self {
        Segment::At(At::user(target))
    }

    /// Creates a mention of everyone.
    pub fn at_all() -> Self {
        Segment::AtAll(AtAll::default())
    }

    /// Creates an emoji segment.
    pub fn emoji(id: impl Into<String>) -> Self {
        Segment::Emoji(Emoji::new(id))
    }

    /// Creates an image segment referring to a URL.
    pub fn image_url(url: impl Into<String>) -> Self {
        Segment::Media(Media::from_url(MediaType::Image, url))
    }

    /// Creates an image segment from raw bytes.
    pub fn image_raw(raw: impl Into<Vec<u8>>) -> Self {
        Segment::Media(Media::from_raw(MediaType::Image, raw))
    }

    /// Creates a reply marker for message `id`.
    pub fn reply(id: impl Into<String>) -> Self {
        Segment::Reply(Reply::new(id))
    }

    /// Returns the discriminator of this segment.
    pub fn kind(&self) -> SegmentKind {
        match self {
            Segment::Text(_) => SegmentKind::Text,
            Segment::At(_) => SegmentKind::At,
            Segment::AtAll(_) => SegmentKind::AtAll,
            Segment::Emoji(_) => SegmentKind::Emoji,
            Segment::Media(media) => media.media_type.kind(),
            Segment::Reply(_) => SegmentKind::Reply,
            Segment::Hyper(_) => SegmentKind::Hyper,
            Segment::Reference(_) => SegmentKind::Reference,
            Segment::Button(_) => SegmentKind::Button,
            Segment::Keyboard(_) => SegmentKind::Keyboard,
            Segment::Other(_) => SegmentKind::Other,
            Segment::Custom(custom) => SegmentKind::Custom(custom.name.clone()),
        }
    }

    /// Returns `true` if this segment is of `kind`.
    pub fn is(&self, kind: &SegmentKind) -> bool {
        &self.kind() == kind
    }

    /// Returns the text content if this is a text segment.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Segment::Text(text) => Some(&text.text),
            _ => None,
        }
    }

    /// Returns the origin annotation of this segment.
    pub fn origin(&self) -> &Origin {
        match self {
            Segment::Text(s) => &s.origin,
            Segment::At(s) => &s.origin,
            Segment::AtAll(s) => &s.origin,
            Segment::Emoji(s) => &s.origin,
            Segment::Media(s) => &s.origin,
            Segment::Reply(s) => &s.origin,
            Segment::Hyper(s) => &s.origin,
            Segment::Reference(s) => &s.origin,
            Segment::Button(s) => &s.origin,
            Segment::Keyboard(s) => &s.origin,
            Segment::Other(s) => &s.origin,
            Segment::Custom(s) => &s.origin,
        }
    }

    /// Replaces the origin annotation.
    pub fn set_origin(&mut self, origin: Origin) {
        let slot = match self {
            Segment::Text(s) => &mut s.origin,
            Segment::At(s) => &mut s.origin,
            Segment::AtAll(s) => &mut s.origin,
            Segment::Emoji(s) => &mut s.origin,
            Segment::Media(s) => &mut s.origin,
            Segment::Reply(s) => &mut s.origin,
            Segment::Hyper(s) => &mut s.origin,
            Segment::Reference(s) => &mut s.origin,
            Segment::Button(s) => &mut s.origin,
            Segment::Keyboard(s) => &mut s.origin,
            Segment::Other(s) => &mut s.origin,
            Segment::Custom(s) => &mut s.origin,
        };
        *slot = origin;
    }

    /// Returns a copy with the origin stripped, as seen by another platform.
    pub fn without_origin(&self) -> Self {
        let mut seg = self.clone();
        seg.set_origin(Origin::none());
        seg
    }

    /// Returns the native value to re-emit on `platform`, if any.
    ///
    /// For [`Other`] this is the preserved segment itself.
    pub fn native_for(&self, platform: &str) -> Option<&Value> {
        match self {
            Segment::Other(other) if other.platform == platform => Some(&other.raw),
            seg => seg.origin().raw_for(platform),
        }
    }

    /// Returns the segments nested inside this one.
    ///
    /// Used by the `rollback` export policy and by recursive selection.
    pub fn children(&self) -> Vec<Segment> {
        match self {
            Segment::Reference(reference) => reference
                .children
                .iter()
                .filter_map(|node| match node {
                    ForwardNode::Custom(node) => Some(node.content.iter().cloned()),
                    ForwardNode::Ref(_) => None,
                })
                .flatten()
                .collect(),
            Segment::Reply(Reply {
                msg: Some(ReplyContent::Message(msg)),
                ..
            }) => msg.iter().cloned().collect(),
            Segment::Keyboard(keyboard) => keyboard
                .buttons
                .iter()
                .cloned()
                .map(Segment::Button)
                .collect(),
            Segment::Custom(custom) => custom.children.clone(),
            _ => Vec::new(),
        }
    }
}

impl Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Text(text) => write!(f, "{}", text.text),
            Segment::At(at) => write!(f, "{at}"),
            Segment::AtAll(all) if all.here => write!(f, "@here"),
            Segment::AtAll(_) => write!(f, "@all"),
            Segment::Emoji(emoji) => match &emoji.name {
                Some(name) => write!(f, "[emoji:{name}]"),
                None => write!(f, "[emoji:{}]", emoji.id),
            },
            Segment::Media(media) => write!(f, "[{}]", media.media_type.kind()),
            Segment::Reply(reply) => write!(f, "[reply:{}]", reply.id),
            Segment::Hyper(hyper) => write!(f, "[hyper:{}]", hyper.format),
            Segment::Reference(_) => write!(f, "[forward]"),
            Segment::Button(button) => write!(f, "[button:{}]", button.label),
            Segment::Keyboard(_) => write!(f, "[keyboard]"),
            Segment::Other(other) => write!(f, "[{}]", other.wire_type()),
            Segment::Custom(custom) => write!(f, "[{}]", custom.name),
        }
    }
}

// ============================================================================
// Typed access
// ============================================================================

/// Typed access to one [`Segment`] variant.
pub trait SegmentVariant: Sized {
    /// Borrows the variant out of a segment.
    fn from_segment(seg: &Segment) -> Option<&Self>;
}

macro_rules! segment_variant {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl SegmentVariant for $ty {
                fn from_segment(seg: &Segment) -> Option<&Self> {
                    match seg {
                        Segment::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for Segment {
                fn from(value: $ty) -> Self {
                    Segment::$variant(value)
                }
            }
        )*
    };
}

segment_variant! {
    Text => Text,
    At => At,
    AtAll => AtAll,
    Emoji => Emoji,
    Media => Media,
    Reply => Reply,
    Hyper => Hyper,
    Reference => Reference,
    Button => Button,
    Keyboard => Keyboard,
    Other => Other,
    Custom => Custom,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_of_media_follows_subtype() {
        let seg = Segment::Media(Media::from_url(MediaType::Voice, "http://x/a.amr"));
        assert_eq!(seg.kind(), SegmentKind::Voice);
        assert!(seg.kind().is_media());
    }

    #[test]
    fn test_origin_does_not_affect_equality() {
        let mut with_origin = Segment::at("42");
        with_origin.set_origin(Origin::new("onebot", json!({"type": "at"})));
        assert_eq!(with_origin, Segment::at("42"));
        assert!(with_origin.without_origin().origin().is_none());
    }

    #[test]
    fn test_native_for_checks_platform() {
        let mut seg = Segment::emoji("178");
        seg.set_origin(Origin::new("onebot", json!({"type": "face"})));
        assert!(seg.native_for("onebot").is_some());
        assert!(seg.native_for("discord").is_none());
    }

    #[test]
    fn test_kind_from_name() {
        assert_eq!(SegmentKind::from_name("At"), Some(SegmentKind::At));
        assert_eq!(SegmentKind::from_name("image"), Some(SegmentKind::Image));
        assert_eq!(SegmentKind::from_name("sticker"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Segment::at("42").to_string(), "@42");
        assert_eq!(Segment::at_all().to_string(), "@all");
        assert_eq!(Segment::image_url("u").to_string(), "[image]");
    }

    #[test]
    fn test_children_of_keyboard() {
        let keyboard = Keyboard::new(vec![Button::action("ok"), Button::link("docs", "http://d")]);
        let children = Segment::Keyboard(keyboard).children();
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|c| c.kind() == SegmentKind::Button));
    }
}
