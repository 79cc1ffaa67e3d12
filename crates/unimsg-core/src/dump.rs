//! Structural persistence of messages.
//!
//! A dump is a JSON list of `{"type": ..., <variant fields>}` objects, with
//! nested messages (reply content, custom forward nodes, custom children)
//! dumped recursively in the same shape. Media bytes are written as a byte
//! array, or as a base64 string when [`DumpOptions::media_save_safe`] is set;
//! [`UniMessage::load`] accepts both.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

use crate::error::{LoadError, LoadResult};
use crate::message::UniMessage;
use crate::segment::Segment;

/// Options for [`UniMessage::dump`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpOptions {
    /// Encode media bytes as base64 strings.
    pub media_save_safe: bool,
}

impl DumpOptions {
    /// Options producing a storage-safe dump.
    pub const fn safe() -> Self {
        Self {
            media_save_safe: true,
        }
    }
}

impl UniMessage {
    /// Dumps the message into its persisted form.
    pub fn dump(&self, options: DumpOptions) -> serde_json::Result<Value> {
        let mut value = serde_json::to_value(self)?;
        if options.media_save_safe {
            encode_message(&mut value);
        }
        Ok(value)
    }

    /// Restores a message from its persisted form.
    pub fn load(value: &Value) -> LoadResult<UniMessage> {
        if !value.is_array() {
            return Err(LoadError::NotAList(json_type(value)));
        }
        Ok(serde_json::from_value(value.clone())?)
    }
}

impl Segment {
    /// Dumps one segment.
    pub fn dump(&self, options: DumpOptions) -> serde_json::Result<Value> {
        let mut value = serde_json::to_value(self)?;
        if options.media_save_safe {
            encode_segment(&mut value);
        }
        Ok(value)
    }

    /// Restores one segment.
    pub fn load(value: &Value) -> LoadResult<Segment> {
        Ok(serde_json::from_value(value.clone())?)
    }
}

/// Rewrites the media `raw` byte arrays of a dumped message as base64.
fn encode_message(value: &mut Value) {
    if let Value::Array(segments) = value {
        segments.iter_mut().for_each(encode_segment);
    }
}

/// Descends only into fields holding nested messages: custom `children`,
/// forward node `content` and reply `msg`. Opaque JSON such as custom `data`
/// or other `raw` is left as dumped.
fn encode_segment(value: &mut Value) {
    let Value::Object(map) = value else {
        return;
    };
    match map.get("type").and_then(Value::as_str) {
        Some("media") => {
            if let Some(raw) = map.get_mut("raw")
                && let Some(bytes) = as_bytes(raw)
            {
                *raw = Value::String(STANDARD.encode(bytes));
            }
        }
        Some("custom") => {
            if let Some(children) = map.get_mut("children") {
                encode_message(children);
            }
        }
        Some("reference") => {
            if let Some(Value::Array(nodes)) = map.get_mut("children") {
                for content in nodes.iter_mut().filter_map(|node| node.get_mut("content")) {
                    encode_message(content);
                }
            }
        }
        Some("reply") => {
            if let Some(msg) = map.get_mut("msg")
                && msg.get("kind").and_then(Value::as_str) == Some("message")
                && let Some(content) = msg.get_mut("value")
            {
                encode_message(content);
            }
        }
        _ => {}
    }
}

fn as_bytes(value: &Value) -> Option<Vec<u8>> {
    value
        .as_array()?
        .iter()
        .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
        .collect()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::*;
    use serde_json::json;

    fn every_variant() -> UniMessage {
        let mut reference = Reference::default();
        reference.push_ref("100");
        reference.push_custom(
            "1",
            "alice",
            1_700_000_000,
            UniMessage::new()
                .text("inner")
                .with(Media::from_raw(MediaType::Voice, vec![9, 8, 7])),
        );
        UniMessage::new()
            .with(Reply::new("5").with_msg(ReplyContent::Message("quoted".into())))
            .with(Text::new("hello").bold().mark(1, 3, ["italic"]))
            .with(At::role("r1").display("Admins"))
            .with(AtAll { here: true, origin: Origin::none() })
            .with(Emoji::named("178", "smile"))
            .with(Media::from_raw(MediaType::Image, vec![0, 255, 16]).mimetype("image/png"))
            .with(Media::from_url(MediaType::File, "http://f").name("doc.pdf"))
            .with(Hyper::json(r#"{"app":"x"}"#))
            .with(Hyper::xml("<msg/>"))
            .with(reference)
            .with(Reference::by_id("fw1"))
            .with(Button::link("docs", "http://d").permission(Permission::Users(vec!["1".into()])))
            .with(Keyboard::new(vec![Button::action("a"), Button::enter("b", "/b")]))
            .with(Other::new("onebot", json!({"type": "dice", "data": {}})))
            .with(Custom::new("poll", json!({"q": "?"})).with_children([Segment::text("poll")]))
    }

    #[test]
    fn test_round_trip_every_variant() {
        let msg = every_variant();
        let dumped = msg.dump(DumpOptions::default()).unwrap();
        assert_eq!(UniMessage::load(&dumped).unwrap(), msg);
    }

    #[test]
    fn test_round_trip_safe_mode_uses_base64() {
        let msg = every_variant();
        let dumped = msg.dump(DumpOptions::safe()).unwrap();
        let image = dumped
            .as_array()
            .unwrap()
            .iter()
            .find(|seg| seg["subtype"] == "image")
            .unwrap();
        assert_eq!(image["raw"], json!("AP8Q"));
        let nested = &dumped[9]["children"][1]["content"][1];
        assert!(nested["raw"].is_string());
        assert_eq!(UniMessage::load(&dumped).unwrap(), msg);
    }

    #[test]
    fn test_safe_mode_leaves_opaque_json_alone() {
        let lookalike = json!({"type": "media", "raw": [1, 2]});
        let quoted = UniMessage::new().with(Media::from_raw(MediaType::Image, vec![7]));
        let msg = UniMessage::new()
            .with(Custom::new("box", json!({"inner": lookalike.clone()})))
            .with(Other::new("onebot", lookalike.clone()))
            .with(Reply::new("3").with_msg(ReplyContent::Message(quoted)));
        let dumped = msg.dump(DumpOptions::safe()).unwrap();
        assert_eq!(dumped[0]["data"]["inner"], lookalike);
        assert_eq!(dumped[1]["raw"], lookalike);
        assert_eq!(dumped[2]["msg"]["value"][0]["raw"], json!("Bw=="));
        assert_eq!(UniMessage::load(&dumped).unwrap(), msg);
    }

    #[test]
    fn test_dump_shape() {
        let dumped = UniMessage::new()
            .text("hi")
            .at("42")
            .dump(DumpOptions::default())
            .unwrap();
        assert_eq!(
            dumped,
            json!([
                {"type": "text", "text": "hi"},
                {"type": "at", "flag": "user", "target": "42"}
            ])
        );
    }

    #[test]
    fn test_load_rejects_non_list() {
        assert!(matches!(
            UniMessage::load(&json!({"type": "text"})),
            Err(LoadError::NotAList("object"))
        ));
        assert!(UniMessage::load(&json!([{"type": "nope"}])).is_err());
    }

    #[test]
    fn test_load_clamps_style_spans() {
        let msg = UniMessage::load(&json!([
            {
                "type": "text",
                "text": "ab",
                "styles": {"0:99": ["bold"], "5:2": ["x"], "1:1": ["y"]}
            }
        ]))
        .unwrap();
        let Segment::Text(text) = &msg[0] else {
            panic!("expected text");
        };
        let spans: Vec<_> = text.styles.iter().map(|(range, _)| *range).collect();
        assert_eq!(spans, vec![(0, 2)]);
        assert_eq!(text.styles_at(1), vec!["bold"]);
    }

    #[test]
    fn test_segment_round_trip() {
        let seg = Segment::Media(Media::from_raw(MediaType::Video, vec![1, 2, 3]));
        let dumped = seg.dump(DumpOptions::safe()).unwrap();
        assert_eq!(dumped["raw"], json!("AQID"));
        assert_eq!(Segment::load(&dumped).unwrap(), seg);
    }
}
