//! Error types for the command engine.
//!
//! Only grammar construction and session plumbing produce Rust errors. The
//! outcome of a parse, including every kind of mismatch, is reported through
//! [`ErrorInfo`] inside the returned [`Arparma`](crate::Arparma).

use std::fmt;

use thiserror::Error;

// =============================================================================
// Grammar Errors
// =============================================================================

/// Programmer errors detected while building a grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    /// The command name (or regex header) is empty.
    #[error("command name must not be empty")]
    EmptyCommand,

    /// Two siblings share a name or alias.
    #[error("duplicate name '{name}' in scope '{scope}'")]
    DuplicateName { scope: String, name: String },

    /// A declared name collides with a built-in option of the namespace.
    #[error("'{name}' collides with a built-in option of namespace '{namespace}'")]
    NamespaceCollision { namespace: String, name: String },

    /// A regex pattern, header or shortcut failed to compile.
    #[error("invalid regex '{source_text}': {reason}")]
    InvalidRegex { source_text: String, reason: String },

    /// A pattern name in a declaration is not known.
    #[error("unknown pattern '{0}'")]
    UnknownPattern(String),

    /// An argument definition cannot be matched as declared.
    #[error("invalid argument '{name}': {reason}")]
    InvalidArg { name: String, reason: String },

    /// An exclusivity group names something undeclared or is too small.
    #[error("invalid exclusivity group: {0}")]
    ExclusiveGroup(String),

    /// A declaration string is malformed.
    #[error("declaration error at offset {offset}: {reason}")]
    Declaration { offset: usize, reason: String },

    /// A command with the same path is already registered.
    #[error("command '{0}' is already registered")]
    DuplicateCommand(String),
}

impl GrammarError {
    pub(crate) fn regex(source_text: &str, err: regex::Error) -> Self {
        Self::InvalidRegex {
            source_text: source_text.to_string(),
            reason: err.to_string(),
        }
    }
}

// =============================================================================
// Session Errors
// =============================================================================

/// Errors raised by a [`Conversation`](crate::Conversation).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The conversation has been closed by the host.
    #[error("conversation closed")]
    Closed,

    /// Delivering a message failed.
    #[error("failed to deliver message: {0}")]
    Send(String),
}

/// Returned by [`AlconnaService`](crate::AlconnaService) when an event is not
/// addressed to its command.
///
/// Hosts should treat this as "not for me" and move on silently.
#[derive(Debug, Clone, Error)]
#[error("event skipped by command header")]
pub struct EventSkipped;

// =============================================================================
// Parse Outcomes
// =============================================================================

/// Built-in options that redirect a parse instead of failing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialOption {
    Help,
    Shortcut,
    Completion,
}

impl fmt::Display for SpecialOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SpecialOption::Help => "help",
            SpecialOption::Shortcut => "shortcut",
            SpecialOption::Completion => "completion",
        })
    }
}

/// Why a parse did not produce a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The prefix or command did not match; the input is not for this command.
    HeaderUnmatched,
    /// A required argument had no token.
    ArgumentMissing,
    /// A token failed its argument's pattern.
    ParamsUnmatched,
    /// Mutually exclusive options were both given.
    OptionConflict,
    /// A built-in option was recognised.
    SpecialOptionTriggered(SpecialOption),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::HeaderUnmatched => f.write_str("header unmatched"),
            ErrorKind::ArgumentMissing => f.write_str("argument missing"),
            ErrorKind::ParamsUnmatched => f.write_str("params unmatched"),
            ErrorKind::OptionConflict => f.write_str("option conflict"),
            ErrorKind::SpecialOptionTriggered(option) => {
                write!(f, "special option '{option}' triggered")
            }
        }
    }
}

/// Structured diagnostics of a failed or redirected parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    /// Dotted path of the argument or the names involved.
    pub target: Option<String>,
    /// The offending token, rendered as text.
    pub token: Option<String>,
    /// What was expected instead.
    pub expected: Option<String>,
    /// A near-miss name, never applied automatically.
    pub suggestion: Option<String>,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            target: None,
            token: None,
            expected: None,
            suggestion: None,
        }
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn suggestion(mut self, suggestion: Option<String>) -> Self {
        self.suggestion = suggestion;
        self
    }

    /// Renders a message suitable for sending back to the user.
    pub fn render(&self) -> String {
        let target = self.target.as_deref().unwrap_or("?");
        let mut out = match self.kind {
            ErrorKind::HeaderUnmatched => "command not recognised".to_string(),
            ErrorKind::ArgumentMissing => match &self.expected {
                Some(expected) => format!("missing argument '{target}', expected {expected}"),
                None => format!("missing argument '{target}'"),
            },
            ErrorKind::ParamsUnmatched => {
                let token = self.token.as_deref().unwrap_or("");
                match &self.expected {
                    Some(expected) => {
                        format!("parameter '{token}' is invalid for '{target}', expected {expected}")
                    }
                    None => format!("unexpected parameter '{token}'"),
                }
            }
            ErrorKind::OptionConflict => format!("options {target} cannot be used together"),
            ErrorKind::SpecialOptionTriggered(option) => format!("{option} requested"),
        };
        if let Some(suggestion) = &self.suggestion {
            out.push_str(&format!("; did you mean '{suggestion}'?"));
        }
        out
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for grammar construction.
pub type GrammarResult<T> = Result<T, GrammarError>;

/// Result type for conversation operations.
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let info = ErrorInfo::new(ErrorKind::ParamsUnmatched)
            .target("age")
            .token("abc")
            .expected("int");
        assert_eq!(info.render(), "parameter 'abc' is invalid for 'age', expected int");

        let info = ErrorInfo::new(ErrorKind::HeaderUnmatched).suggestion(Some("weather".into()));
        assert_eq!(info.render(), "command not recognised; did you mean 'weather'?");
    }
}
