//! OneBot v11 bridge for unimsg.
//!
//! Provides the wire segment model ([`OneBotSegment`]), the build table
//! that turns received segments into a [`UniMessage`](unimsg_core::UniMessage)
//! and the exporter that turns one back into wire segments.
//!
//! ```rust
//! use unimsg_adapter_onebot::{OneBotSegment, build_message, builder_table, exporter};
//!
//! let incoming: Vec<OneBotSegment> = serde_json::from_str(
//!     r#"[{"type":"text","data":{"text":"hi "}},{"type":"at","data":{"qq":"10001"}}]"#,
//! )
//! .unwrap();
//!
//! let msg = build_message(&builder_table(), &incoming);
//! assert_eq!(msg.to_string(), "hi @10001");
//!
//! let outgoing = exporter().export(&msg, None).unwrap();
//! assert_eq!(outgoing, incoming);
//! ```

pub mod builder;
pub mod exporter;
pub mod segment;

/// Platform name recorded in segment origins.
pub const PLATFORM: &str = "onebot11";

pub use builder::{build_message, builder_table, extract_reply};
pub use exporter::exporter;
pub use segment::{
    AtData, CardData, EmptyData, FaceData, FileData, ForwardData, NodeData, OneBotSegment,
    PokeData, ReplyData, ShareData, TextData,
};
