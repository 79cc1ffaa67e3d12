//! OneBot v11 wire segments to [`UniMessage`].

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{trace, warn};
use unimsg_core::{
    At, AtAll, BuilderTable, CustomNode, Emoji, ForwardNode, Hyper, Media, MediaType,
    NativeSegment, RefNode, Reference, Reply, Segment, UniMessage,
};

use crate::PLATFORM;
use crate::segment::{AtData, FileData, NodeData, OneBotSegment};

/// Creates the build table for OneBot v11.
///
/// `poke`, `share`, `rps` and `dice` have no universal counterpart and are
/// kept as [`Other`](unimsg_core::Other) segments.
pub fn builder_table() -> BuilderTable<OneBotSegment> {
    BuilderTable::new(PLATFORM)
        .on("text", |seg| match seg {
            OneBotSegment::Text(data) => vec![Segment::text(data.text.clone())],
            _ => vec![],
        })
        .on("face", |seg| match seg {
            OneBotSegment::Face(data) => vec![Emoji::new(data.id.clone()).into()],
            _ => vec![],
        })
        .on("image", |seg| match seg {
            OneBotSegment::Image(data) => media(MediaType::Image, data),
            _ => vec![],
        })
        .on("record", |seg| match seg {
            OneBotSegment::Record(data) => media(MediaType::Voice, data),
            _ => vec![],
        })
        .on("video", |seg| match seg {
            OneBotSegment::Video(data) => media(MediaType::Video, data),
            _ => vec![],
        })
        .on("at", |seg| match seg {
            OneBotSegment::At(data) => vec![mention(data)],
            _ => vec![],
        })
        .on("reply", |seg| match seg {
            OneBotSegment::Reply(data) => vec![Reply::new(data.id.clone()).into()],
            _ => vec![],
        })
        .on("forward", |seg| match seg {
            OneBotSegment::Forward(data) => vec![Reference::by_id(data.id.clone()).into()],
            _ => vec![],
        })
        .on("node", |seg| match seg {
            OneBotSegment::Node(data) => node(data).map(Segment::from).into_iter().collect(),
            _ => vec![],
        })
        .on("xml", |seg| match seg {
            OneBotSegment::Xml(card) => vec![Hyper::xml(card.data.clone()).into()],
            _ => vec![],
        })
        .on("json", |seg| match seg {
            OneBotSegment::Json(card) => vec![Hyper::json(card.data.clone()).into()],
            _ => vec![],
        })
}

fn mention(data: &AtData) -> Segment {
    if data.qq == AtData::ALL {
        return AtAll::default().into();
    }
    let mut at = At::user(data.qq.clone());
    if let Some(name) = &data.name {
        at = at.display(name.clone());
    }
    at.into()
}

fn media(media_type: MediaType, data: &FileData) -> Vec<Segment> {
    let file = data.file.as_str();
    let media = if let Some(url) = &data.url {
        Media {
            id: Some(file.to_string()),
            ..Media::from_url(media_type, url.clone())
        }
    } else if file.starts_with("http://") || file.starts_with("https://") {
        Media::from_url(media_type, file)
    } else if let Some(payload) = file.strip_prefix("base64://") {
        match STANDARD.decode(payload) {
            Ok(raw) => Media::from_raw(media_type, raw),
            Err(err) => {
                warn!(error = %err, "dropping media with invalid base64 payload");
                return vec![];
            }
        }
    } else if let Some(path) = file.strip_prefix("file://") {
        Media::from_path(media_type, path)
    } else {
        Media::from_id(media_type, file)
    };
    vec![media.into()]
}

fn node(data: &NodeData) -> Option<Reference> {
    if let Some(id) = &data.id {
        return Some(Reference::from_nodes([ForwardNode::Ref(RefNode {
            id: id.clone(),
            context: None,
        })]));
    }
    let uid = data.user_id.clone()?;
    let content = data
        .content
        .as_deref()
        .map(|segments| builder_table().build(segments))
        .unwrap_or_default();
    Some(Reference::from_nodes([ForwardNode::Custom(CustomNode {
        name: data.nickname.clone().unwrap_or_else(|| uid.clone()),
        uid,
        time: 0,
        content,
    })]))
}

/// Splits a leading reply off `segments`.
///
/// Whitespace text directly after the reply is skipped with it.
pub fn extract_reply(segments: &[OneBotSegment]) -> (Option<Reply>, &[OneBotSegment]) {
    let Some((OneBotSegment::Reply(data), rest)) = segments.split_first() else {
        return (None, segments);
    };
    let mut rest = rest;
    while let Some((first, tail)) = rest.split_first()
        && first.as_text().is_some_and(|t| t.trim().is_empty())
    {
        rest = tail;
    }
    trace!(reply = %data.id, "extracted leading reply");
    (Some(Reply::new(data.id.clone())), rest)
}

/// Builds a message as received in an event.
///
/// A leading reply is moved to the front and consecutive forward nodes are
/// merged into one [`Reference`].
pub fn build_message(
    table: &BuilderTable<OneBotSegment>,
    segments: &[OneBotSegment],
) -> UniMessage {
    let (reply, rest) = extract_reply(segments);
    let built = table.build_with_reply(rest, reply);

    let mut merged: Vec<Segment> = Vec::with_capacity(built.len());
    for seg in built {
        if let Segment::Reference(next) = &seg
            && next.id.is_none()
            && let Some(Segment::Reference(prev)) = merged.last_mut()
            && prev.id.is_none()
        {
            prev.children.extend(next.children.iter().cloned());
            continue;
        }
        merged.push(seg);
    }
    UniMessage::from(merged)
}
