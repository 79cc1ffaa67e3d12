use unimsg_adapter_onebot::{OneBotSegment, build_message, builder_table, exporter, extract_reply};
use unimsg_alconna::{Alconna, ArgValue};
use unimsg_core::{Segment, UniMessage};

fn ban_command() -> Alconna {
    Alconna::declare("ban <target:at> [minutes:int=10]")
        .unwrap()
        .prefix("/")
        .build()
        .unwrap()
}

fn wire(json: &str) -> Vec<OneBotSegment> {
    serde_json::from_str(json).unwrap()
}

#[test]
fn received_mention_matches_segment_argument() {
    let incoming = wire(
        r#"[
            {"type": "text", "data": {"text": "/ban "}},
            {"type": "at", "data": {"qq": "42"}},
            {"type": "text", "data": {"text": " 30"}}
        ]"#,
    );
    let msg = build_message(&builder_table(), &incoming);
    let result = ban_command().parse(&msg);
    assert!(result.matched);
    assert_eq!(result.get("target"), Some(&ArgValue::Segment(Segment::at("42"))));
    assert_eq!(result.get("minutes"), Some(&ArgValue::Int(30)));

    let result = ban_command().parse(&build_message(&builder_table(), &incoming[..2]));
    assert_eq!(result.get("minutes"), Some(&ArgValue::Int(10)));
}

#[test]
fn reply_is_split_off_before_parsing() {
    let incoming = wire(
        r#"[
            {"type": "reply", "data": {"id": "7781"}},
            {"type": "text", "data": {"text": " "}},
            {"type": "text", "data": {"text": "/ban "}},
            {"type": "at", "data": {"qq": "42"}}
        ]"#,
    );
    let (reply, rest) = extract_reply(&incoming);
    assert_eq!(reply.map(|r| r.id), Some("7781".to_string()));

    let result = ban_command().parse(&builder_table().build(rest));
    assert!(result.matched);
}

#[test]
fn response_exports_to_wire() {
    let response = UniMessage::new().text("banned ").at("42").text(" for 30 minutes");
    let out = exporter().export(&response, None).unwrap();
    assert_eq!(
        serde_json::to_value(&out).unwrap(),
        serde_json::json!([
            {"type": "text", "data": {"text": "banned "}},
            {"type": "at", "data": {"qq": "42"}},
            {"type": "text", "data": {"text": " for 30 minutes"}}
        ])
    );
}
