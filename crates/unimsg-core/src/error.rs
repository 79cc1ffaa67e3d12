//! Unified error types for the unimsg core.
//!
//! Parse-time command failures are not represented here; they live in the
//! result type of the command engine. These errors cover export, persistence,
//! templating and sending.

use thiserror::Error;

use crate::segment::SegmentKind;

// =============================================================================
// Serialize Errors
// =============================================================================

/// Errors raised while exporting a message to a platform wire format.
#[derive(Debug, Clone, Error)]
pub enum SerializeError {
    /// No exporter entry, origin or fallback policy could place the segment.
    #[error("cannot serialize segment '{kind}' for platform '{platform}'")]
    SerializeFailed {
        /// Discriminator of the offending segment.
        kind: SegmentKind,
        /// Platform the export targeted.
        platform: String,
    },

    /// An exporter entry rejected a segment it is registered for.
    #[error("exporter for '{kind}' on '{platform}' rejected the segment: {reason}")]
    Rejected {
        kind: SegmentKind,
        platform: String,
        reason: String,
    },
}

impl SerializeError {
    /// Returns the kind of segment that failed to serialize.
    pub fn kind(&self) -> &SegmentKind {
        match self {
            Self::SerializeFailed { kind, .. } | Self::Rejected { kind, .. } => kind,
        }
    }
}

// =============================================================================
// Load Errors
// =============================================================================

/// Errors raised by [`UniMessage::load`](crate::UniMessage::load).
#[derive(Debug, Error)]
pub enum LoadError {
    /// The persisted structure does not match the dump shape.
    #[error("malformed message dump: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The dump is not a list of segments.
    #[error("expected a list of segments, got {0}")]
    NotAList(&'static str),
}

// =============================================================================
// Template Errors
// =============================================================================

/// Errors raised while formatting a [`Template`](crate::Template).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// Unbalanced braces or a malformed constructor call.
    #[error("template syntax error at offset {offset}: {reason}")]
    Syntax { offset: usize, reason: String },

    /// A `{name}` or `{0}` placeholder had no binding.
    #[error("missing template binding '{0}'")]
    MissingBinding(String),

    /// A `{:Ctor(..)}` constructor is not registered.
    #[error("unknown template constructor '{0}'")]
    UnknownFactory(String),

    /// A constructor was called with unusable arguments.
    #[error("constructor '{name}' failed: {reason}")]
    FactoryFailed { name: String, reason: String },

    /// Nested template expansion went deeper than allowed.
    #[error("template nesting deeper than {0} levels")]
    RecursionLimit(usize),

    /// A nested template referred back to a binding already being expanded.
    #[error("template binding '{0}' refers to itself")]
    Cycle(String),
}

// =============================================================================
// Send Errors
// =============================================================================

/// Errors reported by a [`Sender`](crate::Sender).
#[derive(Debug, Clone, Error)]
pub enum SendError {
    /// The message could not be exported first.
    #[error(transparent)]
    Serialize(#[from] SerializeError),

    /// The platform call failed.
    #[error("platform call failed: {0}")]
    Platform(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for export operations.
pub type SerializeResult<T> = Result<T, SerializeError>;

/// Result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for template formatting.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Result type for sender operations.
pub type SendResult<T> = Result<T, SendError>;
