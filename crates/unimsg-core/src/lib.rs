//! # UniMsg Core
//!
//! The universal message model shared by every platform.
//!
//! ## Contents
//!
//! - **Segments**: the closed set of content units ([`Segment`]) with a
//!   [`Custom`] escape path and [`Origin`] back-references
//! - **Messages**: [`UniMessage`], an ordered sequence that keeps adjacent
//!   text merged, with query, slice and transform operations
//! - **Templates**: [`Template`] formatting with inline constructors
//! - **Persistence**: [`UniMessage::dump`] / [`UniMessage::load`]
//! - **Platform bridges**: [`BuilderTable`] (wire → universal), [`Exporter`]
//!   (universal → wire) with [`FallbackPolicy`], and the [`Sender`]
//!   capability
//!
//! ## Data Flow
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ wire message │────▶│ BuilderTable │────▶│  UniMessage  │
//! └──────────────┘     └──────────────┘     └──────┬───────┘
//!                                                  │
//! ┌──────────────┐     ┌──────────────┐            │
//! │    Sender    │◀────│   Exporter   │◀───────────┘
//! └──────────────┘     └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use unimsg_core::{DumpOptions, SegmentKind, UniMessage};
//!
//! let msg = UniMessage::new().text("ping ").at("10001").text("!");
//! assert_eq!(msg.count(&SegmentKind::At), 1);
//!
//! let dumped = msg.dump(DumpOptions::default()).unwrap();
//! assert_eq!(UniMessage::load(&dumped).unwrap(), msg);
//! ```

pub mod builder;
pub mod dump;
pub mod error;
pub mod export;
pub mod message;
pub mod segment;
pub mod target;
pub mod template;

pub use builder::{BuildFn, BuilderTable, NativeSegment};
pub use dump::DumpOptions;
pub use error::{
    LoadError, LoadResult, SendError, SendResult, SerializeError, SerializeResult, TemplateError,
    TemplateResult,
};
pub use export::{
    Capability, ExportFn, Exporter, ExporterBuilder, FallbackPolicy, Receipt, SendContext, Sender,
};
pub use message::UniMessage;
pub use segment::{
    At, AtAll, AtFlag, Button, ButtonFlag, Custom, CustomNode, Emoji, ForwardNode, Hyper,
    HyperFormat, Keyboard, Media, MediaSource, MediaType, Origin, Other, Permission, RefNode,
    Reference, Reply, ReplyContent, Segment, SegmentKind, SegmentVariant, Styles, Text,
};
pub use target::Target;
pub use template::{Bindings, Factory, Template, TemplateValue};
