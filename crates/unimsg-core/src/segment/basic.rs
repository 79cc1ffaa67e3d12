use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Origin, Segment};

/// What an [`At`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtFlag {
    #[default]
    User,
    Role,
    Channel,
}

/// A mention of a user, role or channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct At {
    #[serde(default)]
    pub flag: AtFlag,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(skip)]
    pub origin: Origin,
}

impl At {
    pub fn new(flag: AtFlag, target: impl Into<String>) -> Self {
        Self {
            flag,
            target: target.into(),
            display: None,
            origin: Origin::none(),
        }
    }

    pub fn user(target: impl Into<String>) -> Self {
        Self::new(AtFlag::User, target)
    }

    pub fn role(target: impl Into<String>) -> Self {
        Self::new(AtFlag::Role, target)
    }

    pub fn channel(target: impl Into<String>) -> Self {
        Self::new(AtFlag::Channel, target)
    }

    /// Sets the display name shown by clients.
    pub fn display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }
}

impl fmt::Display for At {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sigil = match self.flag {
            AtFlag::User => "@",
            AtFlag::Role => "@&",
            AtFlag::Channel => "#",
        };
        match &self.display {
            Some(display) => write!(f, "{sigil}{display}"),
            None => write!(f, "{sigil}{}", self.target),
        }
    }
}

/// A mention of everyone in the conversation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AtAll {
    /// Only members currently online.
    #[serde(default)]
    pub here: bool,
    #[serde(skip)]
    pub origin: Origin,
}

/// A platform emoji, face or sticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emoji {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip)]
    pub origin: Origin,
}

impl Emoji {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            origin: Origin::none(),
        }
    }

    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(id)
        }
    }
}

/// Encoding of a [`Hyper`] card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HyperFormat {
    Xml,
    Json,
}

impl fmt::Display for HyperFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HyperFormat::Xml => f.write_str("xml"),
            HyperFormat::Json => f.write_str("json"),
        }
    }
}

/// Card content in XML or JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyper {
    pub format: HyperFormat,
    pub raw: String,
    /// Parsed JSON content; always `None` for XML.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(skip)]
    pub origin: Origin,
}

impl Hyper {
    /// JSON card; `content` is filled in when `raw` parses.
    pub fn json(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let content = serde_json::from_str(&raw).ok();
        Self {
            format: HyperFormat::Json,
            raw,
            content,
            origin: Origin::none(),
        }
    }

    pub fn xml(raw: impl Into<String>) -> Self {
        Self {
            format: HyperFormat::Xml,
            raw: raw.into(),
            content: None,
            origin: Origin::none(),
        }
    }
}

/// A native segment preserved verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Other {
    /// Platform the segment was received from.
    pub platform: String,
    /// The native segment as received.
    pub raw: Value,
    #[serde(skip)]
    pub origin: Origin,
}

impl Other {
    pub fn new(platform: impl Into<String>, raw: Value) -> Self {
        Self {
            platform: platform.into(),
            raw,
            origin: Origin::none(),
        }
    }

    /// Best-effort wire type: the `type` field of an object payload.
    pub fn wire_type(&self) -> &str {
        self.raw
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("other")
    }
}

/// A plugin-defined segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Custom {
    /// Registered name; doubles as the dispatch key.
    pub name: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Segment>,
    #[serde(skip)]
    pub origin: Origin,
}

impl Custom {
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
            children: Vec::new(),
            origin: Origin::none(),
        }
    }

    /// Attaches fallback children used when the segment cannot be exported.
    pub fn with_children(mut self, children: impl IntoIterator<Item = Segment>) -> Self {
        self.children = children.into_iter().collect();
        self
    }
}
