//! OneBot v11 wire segments.
//!
//! Segments travel as `{"type": "...", "data": {...}}` objects. All numeric
//! ids are carried as strings, as most implementations send them.
//!
//! ```rust
//! use unimsg_adapter_onebot::OneBotSegment;
//!
//! let at = OneBotSegment::at("10001000");
//! let json = serde_json::to_string(&at).unwrap();
//! assert_eq!(json, r#"{"type":"at","data":{"qq":"10001000"}}"#);
//! ```

use serde::{Deserialize, Serialize};
use unimsg_core::NativeSegment;

/// A OneBot v11 message segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OneBotSegment {
    Text(TextData),
    /// QQ face.
    Face(FaceData),
    Image(FileData),
    /// Voice message.
    Record(FileData),
    Video(FileData),
    /// A mention; `qq = "all"` mentions everyone.
    At(AtData),
    Rps(EmptyData),
    Dice(EmptyData),
    Poke(PokeData),
    /// Link share card.
    Share(ShareData),
    Reply(ReplyData),
    /// A received forward bundle, fetched by id.
    Forward(ForwardData),
    /// One entry of a forward bundle being sent.
    Node(NodeData),
    Xml(CardData),
    Json(CardData),
}

impl NativeSegment for OneBotSegment {
    fn text(text: impl Into<String>) -> Self {
        OneBotSegment::Text(TextData { text: text.into() })
    }

    fn wire_type(&self) -> &str {
        match self {
            OneBotSegment::Text(_) => "text",
            OneBotSegment::Face(_) => "face",
            OneBotSegment::Image(_) => "image",
            OneBotSegment::Record(_) => "record",
            OneBotSegment::Video(_) => "video",
            OneBotSegment::At(_) => "at",
            OneBotSegment::Rps(_) => "rps",
            OneBotSegment::Dice(_) => "dice",
            OneBotSegment::Poke(_) => "poke",
            OneBotSegment::Share(_) => "share",
            OneBotSegment::Reply(_) => "reply",
            OneBotSegment::Forward(_) => "forward",
            OneBotSegment::Node(_) => "node",
            OneBotSegment::Xml(_) => "xml",
            OneBotSegment::Json(_) => "json",
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            OneBotSegment::Text(data) => Some(&data.text),
            _ => None,
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl OneBotSegment {
    pub fn face(id: impl Into<String>) -> Self {
        OneBotSegment::Face(FaceData { id: id.into() })
    }

    /// An image from a file name, `file://` path, URL or `base64://` payload.
    pub fn image(file: impl Into<String>) -> Self {
        OneBotSegment::Image(FileData::new(file))
    }

    pub fn record(file: impl Into<String>) -> Self {
        OneBotSegment::Record(FileData::new(file))
    }

    pub fn video(file: impl Into<String>) -> Self {
        OneBotSegment::Video(FileData::new(file))
    }

    pub fn at(qq: impl Into<String>) -> Self {
        OneBotSegment::At(AtData {
            qq: qq.into(),
            name: None,
        })
    }

    pub fn at_all() -> Self {
        Self::at(AtData::ALL)
    }

    pub fn dice() -> Self {
        OneBotSegment::Dice(EmptyData {})
    }

    pub fn poke(poke_type: impl Into<String>, id: impl Into<String>) -> Self {
        OneBotSegment::Poke(PokeData {
            poke_type: poke_type.into(),
            id: id.into(),
            name: None,
        })
    }

    pub fn reply(id: impl Into<String>) -> Self {
        OneBotSegment::Reply(ReplyData { id: id.into() })
    }

    pub fn forward(id: impl Into<String>) -> Self {
        OneBotSegment::Forward(ForwardData { id: id.into() })
    }

    /// A forward node referencing an existing message.
    pub fn node(id: impl Into<String>) -> Self {
        OneBotSegment::Node(NodeData {
            id: Some(id.into()),
            ..NodeData::default()
        })
    }

    /// A forward node with synthesized sender and content.
    pub fn node_custom(
        user_id: impl Into<String>,
        nickname: impl Into<String>,
        content: Vec<OneBotSegment>,
    ) -> Self {
        OneBotSegment::Node(NodeData {
            id: None,
            user_id: Some(user_id.into()),
            nickname: Some(nickname.into()),
            content: Some(content),
        })
    }

    pub fn xml(data: impl Into<String>) -> Self {
        OneBotSegment::Xml(CardData { data: data.into() })
    }

    pub fn json(data: impl Into<String>) -> Self {
        OneBotSegment::Json(CardData { data: data.into() })
    }
}

// ============================================================================
// Segment Data Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextData {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceData {
    pub id: String,
}

/// Data of `image`, `record` and `video` segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileData {
    /// File name, `file://` path, URL or `base64://` payload.
    pub file: String,
    /// Download URL (receive only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl FileData {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtData {
    /// QQ number, or `"all"`.
    pub qq: String,
    /// Display name, sent by some implementations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl AtData {
    pub const ALL: &'static str = "all";
}

/// Data of segments without fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmptyData {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokeData {
    #[serde(rename = "type")]
    pub poke_type: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareData {
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyData {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardData {
    pub id: String,
}

/// Forward node data: either `id` or the custom sender fields are set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<OneBotSegment>>,
}

/// Data of `xml` and `json` card segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardData {
    pub data: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_serialize() {
        let face = OneBotSegment::face("178");
        let json = serde_json::to_string(&face).unwrap();
        assert_eq!(json, r#"{"type":"face","data":{"id":"178"}}"#);

        let node = OneBotSegment::node_custom("1", "bot", vec![OneBotSegment::text("hi")]);
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            serde_json::json!({
                "type": "node",
                "data": {
                    "user_id": "1",
                    "nickname": "bot",
                    "content": [{"type": "text", "data": {"text": "hi"}}]
                }
            })
        );
    }

    #[test]
    fn test_segment_deserialize() {
        let json = r#"{"type":"image","data":{"file":"123.jpg","url":"http://example.com/123.jpg"}}"#;
        let segment: OneBotSegment = serde_json::from_str(json).unwrap();
        assert!(matches!(
            segment,
            OneBotSegment::Image(FileData { ref file, url: Some(_) }) if file == "123.jpg"
        ));

        let json = r#"{"type":"at","data":{"qq":"all"}}"#;
        let segment: OneBotSegment = serde_json::from_str(json).unwrap();
        assert_eq!(segment, OneBotSegment::at_all());
        assert_eq!(segment.wire_type(), "at");

        let segment: OneBotSegment = serde_json::from_str(r#"{"type":"dice","data":{}}"#).unwrap();
        assert_eq!(segment, OneBotSegment::dice());
    }

    #[test]
    fn test_value_round_trip() {
        let poke = OneBotSegment::poke("126", "2003");
        assert_eq!(OneBotSegment::from_value(&poke.to_value()), Some(poke));
        assert!(OneBotSegment::text("x").is_text());
    }
}
