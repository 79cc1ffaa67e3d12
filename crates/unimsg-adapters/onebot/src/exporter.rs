//! [`UniMessage`](unimsg_core::UniMessage) to OneBot v11 wire segments.
//!
//! Buttons, keyboards, files and custom segments have no OneBot v11 form.
//! They are left unmapped so that the fallback policy decides what to send.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use unimsg_core::{
    AtAll, AtFlag, Exporter, ForwardNode, HyperFormat, Media, MediaSource, MediaType,
    NativeSegment, Segment, SegmentKind, SendContext,
};

use crate::PLATFORM;
use crate::segment::{AtData, FileData, NodeData, OneBotSegment};

/// Creates the exporter for OneBot v11.
pub fn exporter() -> Exporter<OneBotSegment> {
    Exporter::builder(PLATFORM)
        .on(SegmentKind::Text, |seg, _| match seg {
            Segment::Text(text) => Ok(vec![OneBotSegment::text(text.text.clone())]),
            _ => Err(unexpected(seg)),
        })
        .on(SegmentKind::At, |seg, _| match seg {
            Segment::At(at) if at.flag == AtFlag::User => Ok(vec![OneBotSegment::At(AtData {
                qq: at.target.clone(),
                name: None,
            })]),
            Segment::At(at) => Err(format!("cannot mention a {:?} target", at.flag)),
            _ => Err(unexpected(seg)),
        })
        .on(SegmentKind::AtAll, |seg, _| match seg {
            Segment::AtAll(AtAll { here: false, .. }) => Ok(vec![OneBotSegment::at_all()]),
            Segment::AtAll(_) => Err("online-only mentions are not supported".to_string()),
            _ => Err(unexpected(seg)),
        })
        .on(SegmentKind::Emoji, |seg, _| match seg {
            Segment::Emoji(emoji) => Ok(vec![OneBotSegment::face(emoji.id.clone())]),
            _ => Err(unexpected(seg)),
        })
        .on(SegmentKind::Image, export_media)
        .on(SegmentKind::Voice, export_media)
        .on(SegmentKind::Audio, export_media)
        .on(SegmentKind::Video, export_media)
        .on(SegmentKind::Reply, |seg, _| match seg {
            Segment::Reply(reply) => Ok(vec![OneBotSegment::reply(reply.id.clone())]),
            _ => Err(unexpected(seg)),
        })
        .on(SegmentKind::Hyper, |seg, _| match seg {
            Segment::Hyper(card) => Ok(vec![match card.format {
                HyperFormat::Xml => OneBotSegment::xml(card.raw.clone()),
                HyperFormat::Json => OneBotSegment::json(card.raw.clone()),
            }]),
            _ => Err(unexpected(seg)),
        })
        .on(SegmentKind::Reference, |seg, ctx| match seg {
            Segment::Reference(bundle) if bundle.children.is_empty() => match &bundle.id {
                Some(id) => Ok(vec![OneBotSegment::forward(id.clone())]),
                None => Err("empty forward bundle".to_string()),
            },
            Segment::Reference(bundle) => bundle
                .children
                .iter()
                .map(|child| -> Result<OneBotSegment, String> {
                    match child {
                        ForwardNode::Ref(node) => Ok(OneBotSegment::node(node.id.clone())),
                        ForwardNode::Custom(node) => {
                            let content = exporter()
                                .export(&node.content, ctx.target)
                                .map_err(|err| err.to_string())?;
                            Ok(OneBotSegment::Node(NodeData {
                                id: None,
                                user_id: Some(node.uid.clone()),
                                nickname: Some(node.name.clone()),
                                content: Some(content),
                            }))
                        }
                    }
                })
                .collect(),
            _ => Err(unexpected(seg)),
        })
        .build()
}

fn unexpected(seg: &Segment) -> String {
    format!("unexpected {} segment", seg.kind())
}

fn export_media(seg: &Segment, _ctx: &SendContext<'_>) -> Result<Vec<OneBotSegment>, String> {
    let Segment::Media(media) = seg else {
        return Err(unexpected(seg));
    };
    let data = FileData::new(media_file(media)?);
    Ok(vec![match media.media_type {
        MediaType::Image => OneBotSegment::Image(data),
        MediaType::Voice | MediaType::Audio => OneBotSegment::Record(data),
        MediaType::Video => OneBotSegment::Video(data),
        MediaType::File => return Err("files are sent through the upload API".to_string()),
    }])
}

/// The `file` field for `media`, preferring inline bytes.
fn media_file(media: &Media) -> Result<String, String> {
    match media.source() {
        Some(MediaSource::Raw(raw)) => Ok(format!("base64://{}", STANDARD.encode(raw))),
        Some(MediaSource::Path(path)) if path.starts_with("file://") => Ok(path.to_string()),
        Some(MediaSource::Path(path)) => Ok(format!("file://{path}")),
        Some(MediaSource::Url(url)) => Ok(url.to_string()),
        Some(MediaSource::Id(id)) => Ok(id.to_string()),
        None => Err(format!("{} has no source", media.name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{build_message, builder_table};
    use serde_json::json;
    use unimsg_core::{
        At, Button, Custom, Emoji, FallbackPolicy, Hyper, Keyboard, Reference, Reply,
        SerializeError, UniMessage,
    };

    #[test]
    fn test_basic_mapping() {
        let msg = UniMessage::new()
            .with(Reply::new("9"))
            .text("hi ")
            .at("10001")
            .at_all()
            .with(Emoji::new("14"));
        let out = exporter().export(&msg, None).unwrap();
        assert_eq!(
            out,
            vec![
                OneBotSegment::reply("9"),
                OneBotSegment::text("hi "),
                OneBotSegment::at("10001"),
                OneBotSegment::at_all(),
                OneBotSegment::face("14"),
            ]
        );
    }

    #[test]
    fn test_media_file_field() {
        let msg = UniMessage::new()
            .with(Media::from_raw(MediaType::Image, b"hi".to_vec()))
            .with(Media::from_path(MediaType::Audio, "/tmp/a.mp3"))
            .with(Media::from_url(MediaType::Video, "https://v"));
        let out = exporter().export(&msg, None).unwrap();
        assert_eq!(
            out,
            vec![
                OneBotSegment::image("base64://aGk="),
                OneBotSegment::record("file:///tmp/a.mp3"),
                OneBotSegment::video("https://v"),
            ]
        );
    }

    #[test]
    fn test_role_mention_rejected() {
        let msg = UniMessage::new().with(At::role("admins"));
        let err = exporter().export(&msg, None).unwrap_err();
        assert!(matches!(err, SerializeError::Rejected { kind: SegmentKind::At, .. }));
    }

    #[test]
    fn test_cards_and_forward() {
        let mut bundle = Reference::default();
        bundle.push_ref("1").push_custom("7", "alice", 0, "hello");
        let msg = UniMessage::new()
            .with(Hyper::xml("<x/>"))
            .with(bundle)
            .with(Reference::by_id("fw"));
        let out = exporter().export(&msg, None).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], OneBotSegment::xml("<x/>"));
        assert_eq!(out[1], OneBotSegment::node("1"));
        assert_eq!(
            out[2],
            OneBotSegment::node_custom("7", "alice", vec![OneBotSegment::text("hello")])
        );
        assert_eq!(out[3], OneBotSegment::forward("fw"));
    }

    #[test]
    fn test_unsupported_kinds_use_fallback() {
        let keyboard = Keyboard::new(vec![Button::link("docs", "https://d")]);
        let msg = UniMessage::new().text("see ").with(keyboard);
        let exporter = exporter();
        assert!(!exporter.supports(&SegmentKind::Keyboard));

        let err = exporter
            .export_with(&msg, None, FallbackPolicy::Forbid)
            .unwrap_err();
        assert!(matches!(err, SerializeError::SerializeFailed { .. }));

        let out = exporter
            .export_with(&msg, None, FallbackPolicy::Ignore)
            .unwrap();
        assert_eq!(out, vec![OneBotSegment::text("see ")]);

        let poll = Custom::new("poll", json!({})).with_children([Segment::text("vote")]);
        let out = exporter.export(&UniMessage::new().with(poll), None).unwrap();
        assert_eq!(out, vec![OneBotSegment::text("vote")]);
    }

    #[test]
    fn test_unknown_wire_segments_survive() {
        let incoming = [
            OneBotSegment::text("look "),
            OneBotSegment::poke("1", "2"),
            OneBotSegment::dice(),
        ];
        let msg = build_message(&builder_table(), &incoming);
        let out = exporter()
            .with_fallback(FallbackPolicy::Forbid)
            .export(&msg, None)
            .unwrap();
        assert_eq!(out, incoming);
        assert!(out[0].is_text());
    }
}
