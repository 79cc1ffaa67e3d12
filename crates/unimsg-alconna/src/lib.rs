//! Declarative command matching over [`UniMessage`](unimsg_core::UniMessage).
//!
//! A grammar ([`Alconna`]) is declared once, with typed arguments, options
//! and subcommands, and then matched against messages whose segments may mix
//! text with mentions, images and other content:
//!
//! ```text
//!   UniMessage ──tokenize──► Argv ──Analyser──► Arparma
//!                              ▲                   │ missing argument?
//!                              └── reply ◄── CompletionSession
//! ```
//!
//! Matching never fails with a Rust error. Every outcome is an [`Arparma`]
//! whose [`ErrorInfo`] tells a mismatch, a missing argument, an option
//! conflict and a built-in help or shortcut request apart. Only malformed
//! grammars are rejected with a [`GrammarError`], when they are built.
//!
//! # Example
//!
//! ```rust
//! use unimsg_alconna::{Alconna, Arg, Pattern};
//! use unimsg_core::UniMessage;
//!
//! let grammar = Alconna::builder("greet")
//!     .prefix("/")
//!     .arg(Arg::new("name", Pattern::Str))
//!     .build()
//!     .unwrap();
//!
//! let result = grammar.parse(&UniMessage::new().text("/greet alice"));
//! assert!(result.matched);
//! assert_eq!(result.query("name").and_then(|v| v.as_str()), Some("alice"));
//! ```

pub mod alconna;
mod analyser;
pub mod args;
pub mod argv;
pub mod arparma;
pub mod completion;
pub mod component;
pub mod config;
pub mod declaration;
pub mod error;
mod formatter;
pub mod fuzzy;
pub mod namespace;
pub mod pattern;
pub mod registry;
pub mod service;
pub mod session;
pub mod shortcut;
pub mod value;

pub use alconna::{
    Alconna, AlconnaBuilder, CommandHeader, DEFAULT_SEPARATORS, HeaderMatch, Prefix,
};
pub use args::{Arg, ArgDefault, ArgKind};
pub use argv::{Argv, Token, shell_split};
pub use arparma::{Arparma, OptionResult, PendingSlot, SubcommandResult};
pub use completion::{
    ChannelConversation, CompletionSession, Conversation, ConversationPeer, SessionState,
    prompt_text,
};
pub use component::{Action, Opt, Subcommand};
pub use config::{CommandConfig, CompletionConfig};
pub use error::{
    ErrorInfo, ErrorKind, EventSkipped, GrammarError, GrammarResult, SessionError, SessionResult,
    SpecialOption,
};
pub use namespace::{CommandMeta, Namespace};
pub use pattern::{Pattern, Validator};
pub use registry::CommandRegistry;
pub use service::{AlconnaLayer, AlconnaService, CommandEvent, CommandMatch, on_alconna};
pub use session::{SessionGuard, SessionLocks};
pub use shortcut::{Shortcut, ShortcutTable};
pub use value::ArgValue;
