use serde::{Deserialize, Serialize};

/// Where an outbound message is delivered.
///
/// The core never interprets a target beyond passing it to the platform's
/// [`Sender`](crate::Sender).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Target {
    /// User, group or channel id.
    pub id: String,
    /// Guild or parent scope of a channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub is_channel: bool,
    #[serde(default)]
    pub is_private: bool,
    /// Account that should send the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_id: Option<String>,
    /// Platform selector, for hosts serving several platforms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl Target {
    /// A private conversation with `user_id`.
    pub fn private(user_id: impl Into<String>) -> Self {
        Self {
            id: user_id.into(),
            is_private: true,
            ..Default::default()
        }
    }

    /// A group conversation.
    pub fn group(group_id: impl Into<String>) -> Self {
        Self {
            id: group_id.into(),
            ..Default::default()
        }
    }

    /// A channel inside `parent_id`.
    pub fn channel(channel_id: impl Into<String>, parent_id: impl Into<String>) -> Self {
        Self {
            id: channel_id.into(),
            parent_id: Some(parent_id.into()),
            is_channel: true,
            ..Default::default()
        }
    }

    pub fn self_id(mut self, self_id: impl Into<String>) -> Self {
        self.self_id = Some(self_id.into());
        self
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let target = Target::channel("c1", "g1").self_id("bot").platform("discord");
        assert!(target.is_channel);
        assert!(!target.is_private);
        assert_eq!(target.parent_id.as_deref(), Some("g1"));
        assert!(Target::private("u").is_private);
    }

    #[test]
    fn test_serde_skips_empty() {
        let value = serde_json::to_value(Target::group("123")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"id": "123", "is_channel": false, "is_private": false})
        );
    }
}
