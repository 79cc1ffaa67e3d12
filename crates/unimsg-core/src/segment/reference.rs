use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Origin;
use crate::message::UniMessage;

/// The quoted message carried by a [`Reply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ReplyContent {
    Text(String),
    Message(UniMessage),
    /// The platform's own message object.
    Native(Value),
}

/// A reply marker pointing at message `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<ReplyContent>,
    #[serde(skip)]
    pub origin: Origin,
}

impl Reply {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            msg: None,
            origin: Origin::none(),
        }
    }

    pub fn with_msg(mut self, msg: ReplyContent) -> Self {
        self.msg = Some(msg);
        self
    }
}

/// A forwarded reference to an existing message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefNode {
    pub id: String,
    /// Conversation the message lives in, when not the current one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// A synthesized message embedded in a forward bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomNode {
    pub uid: String,
    pub name: String,
    /// Unix timestamp in seconds.
    pub time: i64,
    pub content: UniMessage,
}

/// One entry of a [`Reference`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum ForwardNode {
    Ref(RefNode),
    Custom(CustomNode),
}

/// A forwarded message bundle.
///
/// A bundle with an `id` is fetched by id when sent and needs no children.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ForwardNode>,
    #[serde(skip)]
    pub origin: Origin,
}

impl Reference {
    /// A bundle identified by platform id.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            children: Vec::new(),
            origin: Origin::none(),
        }
    }

    /// A bundle assembled from nodes.
    pub fn from_nodes(children: impl IntoIterator<Item = ForwardNode>) -> Self {
        Self {
            id: None,
            children: children.into_iter().collect(),
            origin: Origin::none(),
        }
    }

    /// Adds a node referencing message `id`.
    pub fn push_ref(&mut self, id: impl Into<String>) -> &mut Self {
        self.children.push(ForwardNode::Ref(RefNode {
            id: id.into(),
            context: None,
        }));
        self
    }

    /// Adds a synthesized node.
    pub fn push_custom(
        &mut self,
        uid: impl Into<String>,
        name: impl Into<String>,
        time: i64,
        content: impl Into<UniMessage>,
    ) -> &mut Self {
        self.children.push(ForwardNode::Custom(CustomNode {
            uid: uid.into(),
            name: name.into(),
            time,
            content: content.into(),
        }));
        self
    }

    /// Returns `true` if the bundle is resolved by id rather than by children.
    pub fn is_by_id(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.is_empty())
    }
}
