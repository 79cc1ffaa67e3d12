use serde_json::json;
use unimsg_core::{
    At, Bindings, BuilderTable, DumpOptions, Exporter, FallbackPolicy, Media, MediaType,
    NativeSegment, Reference, Segment, SegmentKind, SerializeError, Text, UniMessage,
};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
enum Native {
    Text { text: String },
    At { qq: String },
    Poke { id: String },
}

impl NativeSegment for Native {
    fn text(text: impl Into<String>) -> Self {
        Native::Text { text: text.into() }
    }

    fn wire_type(&self) -> &str {
        match self {
            Native::Text { .. } => "text",
            Native::At { .. } => "at",
            Native::Poke { .. } => "poke",
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            Native::Text { text } => Some(text),
            _ => None,
        }
    }
}

fn exporter() -> Exporter<Native> {
    Exporter::builder("native")
        .on(SegmentKind::Text, |seg, _| {
            Ok(vec![Native::text(seg.as_text().unwrap_or_default())])
        })
        .on(SegmentKind::At, |seg, _| match seg {
            Segment::At(at) => Ok(vec![Native::At {
                qq: at.target.clone(),
            }]),
            _ => Ok(vec![]),
        })
        .build()
}

#[test]
fn merge_invariant_holds_for_any_append_order() {
    let pieces = [
        Segment::text("a"),
        Segment::text(""),
        Segment::Text(Text::new("bc").bold()),
        Segment::at("1"),
        Segment::text("d"),
        Segment::text("e"),
        Segment::image_url("u"),
        Segment::Text(Text::new("fg").mark(1, 2, ["italic"])),
    ];
    for start in 0..pieces.len() {
        let mut msg = UniMessage::new();
        for seg in pieces.iter().cycle().skip(start).take(pieces.len() * 2) {
            msg.push(seg.clone());
        }
        assert!(
            msg.windows(2)
                .all(|w| !(w[0].kind() == SegmentKind::Text && w[1].kind() == SegmentKind::Text)),
            "adjacent text after rotation {start}"
        );
    }
}

#[test]
fn concat_translates_style_offsets() {
    let a = Text::new("hello").mark(0, 2, ["bold"]).mark(1, 5, ["code"]);
    let b = Text::new("world").mark(2, 4, ["italic"]);
    let merged = UniMessage::from(Segment::Text(a.clone())) + UniMessage::from(Segment::Text(b));
    let Segment::Text(text) = &merged[0] else {
        panic!("expected text");
    };
    for (range, styles) in a.styles.iter() {
        assert_eq!(text.styles.get(*range), Some(styles.as_slice()));
    }
    assert_eq!(text.styles.get((7, 9)), Some(&["italic".to_string()][..]));
}

#[test]
fn nested_reference_round_trips_through_safe_dump() {
    let mut inner = Reference::default();
    inner.push_custom(
        "2",
        "bob",
        1,
        UniMessage::new().with(Media::from_raw(MediaType::Audio, vec![0xde, 0xad])),
    );
    let mut outer = Reference::default();
    outer.push_custom("1", "alice", 0, UniMessage::new().with(inner).text("tail"));
    let msg = UniMessage::new().with(outer);

    for options in [DumpOptions::default(), DumpOptions::safe()] {
        let dumped = msg.dump(options).unwrap();
        assert_eq!(UniMessage::load(&dumped).unwrap(), msg);
    }
    let safe = msg.dump(DumpOptions::safe()).unwrap();
    let media = &safe[0]["children"][0]["content"][0]["children"][0]["content"][0];
    assert_eq!(media["raw"], json!("3q0="));
}

#[test]
fn fallback_policy_selection() {
    let msg = UniMessage::new()
        .text("hi ")
        .with(Segment::Media(Media::from_url(MediaType::Video, "http://v")));
    let exporter = exporter();

    assert!(matches!(
        exporter.export_with(&msg, None, FallbackPolicy::Forbid),
        Err(SerializeError::SerializeFailed { .. })
    ));

    let text: String = exporter
        .export_with(&msg, None, FallbackPolicy::ToText)
        .unwrap()
        .iter()
        .filter_map(NativeSegment::as_text)
        .collect();
    assert!(text.contains(&msg[1].to_string()));

    let ignored = exporter
        .export_with(&msg, None, FallbackPolicy::Ignore)
        .unwrap();
    assert_eq!(ignored.len(), msg.len() - 1);
}

#[test]
fn stripped_origins_still_export_across_platforms() {
    let table = BuilderTable::<Native>::new("native")
        .on("text", |seg| seg.as_text().map(|t| Segment::text(t)).into_iter().collect())
        .on("at", |seg| match seg {
            Native::At { qq } => vec![Segment::At(At::user(qq.clone()))],
            _ => vec![],
        });
    let natives = [
        Native::text("hey "),
        Native::At { qq: "5".into() },
        Native::Poke { id: "1".into() },
    ];
    let built = table.build(&natives);
    assert_eq!(built.len(), 3);

    let same = exporter()
        .with_fallback(FallbackPolicy::Forbid)
        .export(&built, None)
        .unwrap();
    assert_eq!(same, natives);

    let stripped: UniMessage = built.iter().map(Segment::without_origin).collect();
    let other = Exporter::builder("other")
        .on(SegmentKind::Text, |seg, _| {
            Ok(vec![Native::text(seg.as_text().unwrap_or_default())])
        })
        .fallback(FallbackPolicy::ToText)
        .build();
    let out = other.export(&stripped, None).unwrap();
    assert_eq!(out.len(), 3);
}

#[test]
fn template_builds_mentions_from_bindings() {
    let msg = UniMessage::template("{:AtAll()} meeting at {time}, ping {:At(channel, room)}")
        .format(&Bindings::new().named("time", "9:00").named("room", "general"))
        .unwrap();
    assert_eq!(msg.count(&SegmentKind::AtAll), 1);
    assert_eq!(msg.count(&SegmentKind::At), 1);
    assert_eq!(msg.extract_plain_text(), " meeting at 9:00, ping ");
}
