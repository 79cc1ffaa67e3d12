//! Exporter tables, fallback policy and the sending capability.
//!
//! An [`Exporter`] maps universal segments to a platform's wire segments
//! through one entry per [`SegmentKind`]. A segment without an entry is
//! resolved in this order:
//!
//! 1. its origin, when it was built on the same platform;
//! 2. the [`FallbackPolicy`] in effect.
//!
//! Sending is a separate capability ([`Sender`]) so that exporters stay pure.

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::builder::NativeSegment;
use crate::error::{SendResult, SerializeError, SerializeResult};
use crate::message::UniMessage;
use crate::segment::{Reply, Segment, SegmentKind};
use crate::target::Target;

// ============================================================================
// Fallback Policy
// ============================================================================

/// What to do with a segment the exporter cannot place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Drop the segment.
    Ignore,
    /// Replace it with its text representation.
    ToText,
    /// Export its children in its place.
    Rollback,
    /// Fail with [`SerializeError::SerializeFailed`].
    Forbid,
    /// `Rollback` for segments with children, `ToText` otherwise.
    #[default]
    Auto,
}

// ============================================================================
// Exporter
// ============================================================================

/// Per-call data passed to export entries.
#[derive(Debug, Clone, Copy)]
pub struct SendContext<'a> {
    pub platform: &'a str,
    pub target: Option<&'a Target>,
}

/// Converts one universal segment into wire segments, or rejects it.
pub type ExportFn<N> =
    Arc<dyn Fn(&Segment, &SendContext<'_>) -> Result<Vec<N>, String> + Send + Sync + 'static>;

/// Builder for an [`Exporter`].
pub struct ExporterBuilder<N> {
    platform: String,
    entries: HashMap<SegmentKind, ExportFn<N>>,
    fallback: FallbackPolicy,
}

impl<N: NativeSegment> ExporterBuilder<N> {
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            entries: HashMap::new(),
            fallback: FallbackPolicy::default(),
        }
    }

    /// Registers the entry for `kind`, replacing any previous one.
    pub fn on<F>(mut self, kind: SegmentKind, export: F) -> Self
    where
        F: Fn(&Segment, &SendContext<'_>) -> Result<Vec<N>, String> + Send + Sync + 'static,
    {
        self.entries.insert(kind, Arc::new(export));
        self
    }

    /// Sets the default fallback policy.
    pub fn fallback(mut self, policy: FallbackPolicy) -> Self {
        self.fallback = policy;
        self
    }

    pub fn build(self) -> Exporter<N> {
        Exporter {
            platform: self.platform,
            entries: Arc::new(self.entries),
            fallback: self.fallback,
        }
    }
}

/// Export entries of one platform.
pub struct Exporter<N> {
    platform: String,
    entries: Arc<HashMap<SegmentKind, ExportFn<N>>>,
    fallback: FallbackPolicy,
}

impl<N> Clone for Exporter<N> {
    fn clone(&self) -> Self {
        Self {
            platform: self.platform.clone(),
            entries: Arc::clone(&self.entries),
            fallback: self.fallback,
        }
    }
}

impl<N> Debug for Exporter<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.entries.keys().collect();
        kinds.sort();
        f.debug_struct("Exporter")
            .field("platform", &self.platform)
            .field("kinds", &kinds)
            .field("fallback", &self.fallback)
            .finish()
    }
}

impl<N: NativeSegment> Exporter<N> {
    pub fn builder(platform: impl Into<String>) -> ExporterBuilder<N> {
        ExporterBuilder::new(platform)
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// The default fallback policy.
    pub fn fallback(&self) -> FallbackPolicy {
        self.fallback
    }

    /// Returns a copy using `policy` by default.
    pub fn with_fallback(&self, policy: FallbackPolicy) -> Self {
        Self {
            fallback: policy,
            ..self.clone()
        }
    }

    /// Returns `true` if `kind` has an entry.
    pub fn supports(&self, kind: &SegmentKind) -> bool {
        self.entries.contains_key(kind)
    }

    /// Exports `msg` with the default fallback policy.
    pub fn export(&self, msg: &UniMessage, target: Option<&Target>) -> SerializeResult<Vec<N>> {
        self.export_with(msg, target, self.fallback)
    }

    /// Exports `msg` with an explicit fallback policy.
    pub fn export_with(
        &self,
        msg: &UniMessage,
        target: Option<&Target>,
        policy: FallbackPolicy,
    ) -> SerializeResult<Vec<N>> {
        let ctx = SendContext {
            platform: &self.platform,
            target,
        };
        let mut out = Vec::with_capacity(msg.len());
        for seg in msg {
            self.export_segment(seg, &ctx, policy, &mut out)?;
        }
        Ok(out)
    }

    fn export_segment(
        &self,
        seg: &Segment,
        ctx: &SendContext<'_>,
        policy: FallbackPolicy,
        out: &mut Vec<N>,
    ) -> SerializeResult<()> {
        let kind = seg.kind();
        if let Some(export) = self.entries.get(&kind) {
            let natives = export(seg, ctx).map_err(|reason| SerializeError::Rejected {
                kind,
                platform: self.platform.clone(),
                reason,
            })?;
            out.extend(natives);
            return Ok(());
        }

        if let Some(native) = seg.native_for(&self.platform).and_then(N::from_value) {
            out.push(native);
            return Ok(());
        }

        let children = seg.children();
        let resolved = match policy {
            FallbackPolicy::Auto if children.is_empty() => FallbackPolicy::ToText,
            FallbackPolicy::Auto => FallbackPolicy::Rollback,
            other => other,
        };
        debug!(
            platform = %self.platform,
            %kind,
            policy = ?resolved,
            "segment has no exporter entry"
        );
        match resolved {
            FallbackPolicy::Ignore => Ok(()),
            FallbackPolicy::ToText => self.export_text(seg.to_string(), ctx, out),
            FallbackPolicy::Rollback => {
                for child in &children {
                    self.export_segment(child, ctx, policy, out)?;
                }
                Ok(())
            }
            FallbackPolicy::Forbid | FallbackPolicy::Auto => Err(SerializeError::SerializeFailed {
                kind,
                platform: self.platform.clone(),
            }),
        }
    }

    fn export_text(
        &self,
        text: String,
        ctx: &SendContext<'_>,
        out: &mut Vec<N>,
    ) -> SerializeResult<()> {
        match self.entries.get(&SegmentKind::Text) {
            Some(export) => {
                let natives = export(&Segment::text(text), ctx).map_err(|reason| {
                    SerializeError::Rejected {
                        kind: SegmentKind::Text,
                        platform: self.platform.clone(),
                        reason,
                    }
                })?;
                out.extend(natives);
            }
            None => out.push(N::text(text)),
        }
        Ok(())
    }
}

// ============================================================================
// Sender Capability
// ============================================================================

/// Handle to a message the platform accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub message_id: String,
    pub target: Target,
}

/// Outcome of an optional platform capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability<T> {
    Done(T),
    /// The platform does not offer this operation.
    Unsupported,
}

impl<T> Capability<T> {
    pub fn is_supported(&self) -> bool {
        matches!(self, Capability::Done(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Capability::Done(value) => Some(value),
            Capability::Unsupported => None,
        }
    }
}

/// Delivers exported messages to a platform.
///
/// Only [`send_to`](Sender::send_to) is required; the other operations
/// default to [`Capability::Unsupported`].
#[async_trait]
pub trait Sender<N: NativeSegment>: Send + Sync {
    /// Sends `message` to `target`.
    async fn send_to(&self, target: &Target, message: Vec<N>) -> SendResult<Receipt>;

    /// Withdraws a sent message.
    async fn recall(&self, _receipt: &Receipt) -> SendResult<Capability<()>> {
        Ok(Capability::Unsupported)
    }

    /// Replaces the content of a sent message.
    async fn edit(&self, _receipt: &Receipt, _message: Vec<N>) -> SendResult<Capability<()>> {
        Ok(Capability::Unsupported)
    }

    /// Fetches the reply marker a sent message carries.
    async fn get_reply(&self, _receipt: &Receipt) -> SendResult<Capability<Reply>> {
        Ok(Capability::Unsupported)
    }
}

impl UniMessage {
    /// Exports the message with `exporter` and hands it to `sender`.
    pub async fn send<N, S>(
        &self,
        target: &Target,
        exporter: &Exporter<N>,
        sender: &S,
    ) -> SendResult<Receipt>
    where
        N: NativeSegment,
        S: Sender<N> + ?Sized,
    {
        let natives = exporter.export(self, Some(target))?;
        sender.send_to(target, natives).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::tests::{Wire, table};
    use crate::segment::{Button, Custom, Keyboard, Media, MediaType};
    use parking_lot::Mutex;
    use serde_json::json;

    fn exporter() -> Exporter<Wire> {
        Exporter::builder("test")
            .on(SegmentKind::Text, |seg, _| {
                Ok(seg.as_text().map(|t| Wire::text(t)).into_iter().collect())
            })
            .on(SegmentKind::At, |seg, _| match seg {
                Segment::At(at) => Ok(vec![Wire::Mention {
                    id: Some(at.target.clone()),
                }]),
                _ => Err("not a mention".into()),
            })
            .on(SegmentKind::Image, |seg, _| match seg {
                Segment::Media(Media { url: Some(url), .. }) => {
                    Ok(vec![Wire::Picture { url: url.clone() }])
                }
                _ => Err("image needs a url".into()),
            })
            .build()
    }

    fn plain_text(natives: &[Wire]) -> String {
        natives.iter().filter_map(NativeSegment::as_text).collect()
    }

    #[test]
    fn test_mapped_segments() {
        let msg = UniMessage::new().text("hi ").at("1").image_url("http://p");
        let out = exporter().export(&msg, None).unwrap();
        assert_eq!(
            out,
            vec![
                Wire::text("hi "),
                Wire::Mention { id: Some("1".into()) },
                Wire::Picture { url: "http://p".into() },
            ]
        );
    }

    #[test]
    fn test_entry_rejection() {
        let msg = UniMessage::new().with(Media::from_raw(MediaType::Image, vec![1]));
        let err = exporter().export(&msg, None).unwrap_err();
        assert!(matches!(err, SerializeError::Rejected { .. }));
        assert_eq!(err.kind(), &SegmentKind::Image);
    }

    #[test]
    fn test_fallback_policies() {
        let msg = UniMessage::new()
            .text("go ")
            .with(Button::link("docs", "http://d"));
        let exporter = exporter();

        let err = exporter
            .export_with(&msg, None, FallbackPolicy::Forbid)
            .unwrap_err();
        assert!(matches!(
            err,
            SerializeError::SerializeFailed { kind: SegmentKind::Button, .. }
        ));

        let as_text = exporter
            .export_with(&msg, None, FallbackPolicy::ToText)
            .unwrap();
        assert!(plain_text(&as_text).contains(&msg[1].to_string()));

        let ignored = exporter
            .export_with(&msg, None, FallbackPolicy::Ignore)
            .unwrap();
        assert_eq!(ignored.len(), 1);
    }

    #[test]
    fn test_rollback_and_auto() {
        let custom = Custom::new("poll", json!({})).with_children([
            Segment::text("vote "),
            Segment::at("9"),
        ]);
        let msg = UniMessage::new().with(custom);
        let exporter = exporter();

        let rolled = exporter
            .export_with(&msg, None, FallbackPolicy::Rollback)
            .unwrap();
        assert_eq!(rolled.len(), 2);

        let auto = exporter.export(&msg, None).unwrap();
        assert_eq!(auto, rolled);

        let keyboard = UniMessage::new().with(Keyboard::new(vec![Button::action("ok")]));
        let auto = exporter.export(&keyboard, None).unwrap();
        assert_eq!(plain_text(&auto), "[button:ok]");
    }

    #[test]
    fn test_origin_reused_on_same_platform_only() {
        let built = table().build(&[Wire::Dice {}]);
        let out = exporter()
            .with_fallback(FallbackPolicy::Forbid)
            .export(&built, None)
            .unwrap();
        assert_eq!(out, vec![Wire::Dice {}]);

        let foreign = Exporter::<Wire>::builder("elsewhere")
            .fallback(FallbackPolicy::Forbid)
            .build();
        assert!(foreign.export(&built, None).is_err());
        assert!(!foreign.supports(&SegmentKind::Text));
    }

    struct Recorder {
        sent: Mutex<Vec<(Target, Vec<Wire>)>>,
    }

    #[async_trait]
    impl Sender<Wire> for Recorder {
        async fn send_to(&self, target: &Target, message: Vec<Wire>) -> SendResult<Receipt> {
            let mut sent = self.sent.lock();
            sent.push((target.clone(), message));
            Ok(Receipt {
                message_id: sent.len().to_string(),
                target: target.clone(),
            })
        }
    }

    #[tokio::test]
    async fn test_send_and_unsupported_capabilities() {
        let recorder = Recorder {
            sent: Mutex::new(Vec::new()),
        };
        let target = Target::group("g");
        let receipt = UniMessage::from("hello")
            .send(&target, &exporter(), &recorder)
            .await
            .unwrap();
        assert_eq!(receipt.message_id, "1");
        assert_eq!(recorder.sent.lock()[0].1, vec![Wire::text("hello")]);

        assert_eq!(recorder.recall(&receipt).await.unwrap(), Capability::Unsupported);
        assert!(!recorder.get_reply(&receipt).await.unwrap().is_supported());
    }
}
