//! Serde-enabled settings for the command engine.
//!
//! These are the `command` section of the runtime configuration file.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use unimsg_core::FallbackPolicy;

/// Interactive completion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Prompt for missing arguments instead of failing.
    pub enabled: bool,
    /// Seconds to wait for each reply.
    pub timeout_secs: u64,
    /// Cycles through candidates; may be followed by a step count.
    pub tab: String,
    /// Confirms the shown candidate, or the literal that follows it.
    pub enter: String,
    /// Abandons the session.
    pub exit: String,
    /// Upper bound on prompts per session.
    pub max_rounds: usize,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 30,
            tab: ".tab".to_string(),
            enter: ".enter".to_string(),
            exit: ".exit".to_string(),
            max_rounds: 8,
        }
    }
}

impl CompletionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Command engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Send rendered failures and help text back to the conversation.
    pub auto_send_output: bool,
    /// Abort on the first argument that fails its pattern.
    pub strict: bool,
    /// Suggest near-miss names.
    pub fuzzy_match: bool,
    /// Minimum similarity for a suggestion, in `(0, 1]`.
    pub fuzzy_threshold: f64,
    pub completion: CompletionConfig,
    /// Export fallback used for replies.
    pub fallback: FallbackPolicy,
    /// Encode media bytes as base64 when dumping messages.
    pub media_save_safe: bool,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            auto_send_output: true,
            strict: true,
            fuzzy_match: false,
            fuzzy_threshold: 0.6,
            completion: CompletionConfig::default(),
            fallback: FallbackPolicy::Auto,
            media_save_safe: false,
        }
    }
}
