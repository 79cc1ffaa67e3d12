use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tower::{BoxError, ServiceExt};
use unimsg_alconna::{
    Action, Alconna, Arg, ArgValue, ChannelConversation, CommandConfig, CommandEvent,
    CommandMatch, CompletionSession, Conversation, ErrorKind, Opt, Pattern, SessionLocks,
    SessionState, SpecialOption, on_alconna,
};
use unimsg_core::{Segment, SegmentKind, UniMessage};

fn text(text: &str) -> UniMessage {
    UniMessage::new().text(text)
}

#[test]
fn basic_command() {
    let grammar = Alconna::builder("cmd")
        .arg(Arg::new("name", Pattern::Str))
        .build()
        .unwrap();
    let result = grammar.parse(&text("cmd alice"));
    assert!(result.matched);
    assert_eq!(result.all_matched_args.len(), 1);
    assert_eq!(result.get("name"), Some(&ArgValue::from("alice")));
}

#[test]
fn union_type_argument() {
    let grammar = Alconna::declare("cmd <target:int|at>").unwrap().build().unwrap();

    let result = grammar.parse(&text("cmd ").at("42"));
    assert!(result.matched);
    assert_eq!(result.get("target"), Some(&ArgValue::Segment(Segment::at("42"))));

    let result = grammar.parse(&text("cmd 42"));
    assert!(result.matched);
    assert_eq!(result.get("target"), Some(&ArgValue::Int(42)));

    let result = grammar.parse(&text("cmd ").image_url("https://example.com/a.png"));
    assert!(!result.matched);
    assert_eq!(result.error_kind(), Some(ErrorKind::ParamsUnmatched));
}

#[test]
fn union_built_programmatically() {
    let grammar = Alconna::builder("cmd")
        .arg(Arg::new(
            "target",
            Pattern::union([Pattern::Int, Pattern::Segment(SegmentKind::At)]),
        ))
        .build()
        .unwrap();
    assert!(grammar.parse(&text("cmd ").at("7")).matched);
}

#[test]
fn option_repetition_counts() {
    let grammar = Alconna::builder("cmd")
        .option(Opt::new("-v").action(Action::Count))
        .build()
        .unwrap();
    let result = grammar.parse(&text("cmd -v -v -v"));
    assert!(result.matched);
    assert_eq!(result.query("v"), Some(&ArgValue::Int(3)));
}

#[test]
fn header_mismatch_has_no_side_effects() {
    let grammar = Alconna::builder("cmd")
        .prefix("/")
        .arg(Arg::new("name", Pattern::Str))
        .build()
        .unwrap();
    for input in ["cmd alice", "/other alice", "/cmdx --shortcut k v", ""] {
        let result = grammar.parse(&text(input));
        assert!(!result.header_matched, "{input}");
        assert!(!result.matched);
        assert_eq!(result.error_kind(), Some(ErrorKind::HeaderUnmatched));
        assert!(result.main_args.is_empty());
        assert!(result.options.is_empty());
        assert!(result.output.is_none());
    }
    assert!(grammar.shortcut_keys().is_empty());
}

#[tokio::test]
async fn completion_happy_path_and_exit() {
    let grammar = Alconna::builder("cmd")
        .arg(Arg::new("target", Pattern::Str))
        .build()
        .unwrap();
    let config = CommandConfig::default();

    let first = grammar.parse(&text("cmd"));
    assert_eq!(first.error_kind(), Some(ErrorKind::ArgumentMissing));

    let (conversation, peer) = ChannelConversation::pair("c1");
    peer.reply("bob");
    let mut session = CompletionSession::new(&grammar, &config.completion);
    let result = session.run(first.clone(), &conversation).await;
    assert!(result.matched);
    assert_eq!(result.get("target"), Some(&ArgValue::from("bob")));

    let (conversation, peer) = ChannelConversation::pair("c2");
    peer.reply(".exit");
    let mut session = CompletionSession::new(&grammar, &config.completion);
    let result = session.run(first, &conversation).await;
    assert!(!result.matched);
    assert_eq!(
        result.error_kind(),
        Some(ErrorKind::SpecialOptionTriggered(SpecialOption::Completion))
    );
    assert_eq!(session.state(), &SessionState::Exited);
}

#[derive(Clone)]
struct ChatEvent {
    message: UniMessage,
    conversation: Arc<ChannelConversation>,
}

impl CommandEvent for ChatEvent {
    fn message(&self) -> &UniMessage {
        &self.message
    }

    fn conversation(&self) -> Arc<dyn Conversation> {
        self.conversation.clone()
    }
}

#[tokio::test(start_paused = true)]
async fn at_most_one_session_per_conversation() {
    let grammar = Alconna::builder("pick")
        .arg(Arg::new("fruit", Pattern::Str))
        .build()
        .unwrap();
    let locks = SessionLocks::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&order);
    let service = on_alconna(Arc::new(grammar))
        .locks(locks.clone())
        .service(tower::service_fn(move |req: CommandMatch<ChatEvent>| {
            let sink = Arc::clone(&sink);
            async move {
                if let Some(fruit) = req.result.get("fruit") {
                    sink.lock().push(fruit.to_string());
                }
                Ok::<(), BoxError>(())
            }
        }));

    let (conversation, mut peer) = ChannelConversation::pair("group-1");
    let conversation = Arc::new(conversation);
    let event = |input: &str| ChatEvent {
        message: text(input),
        conversation: Arc::clone(&conversation),
    };

    let first = tokio::spawn(service.clone().oneshot(event("pick")));
    let prompt = peer.sent.recv().await.unwrap();
    assert!(prompt.extract_plain_text().starts_with("please enter fruit"));

    let second = tokio::spawn(service.clone().oneshot(event("pick apple")));
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(order.lock().is_empty());
    assert!(!second.is_finished());
    assert!(locks.is_busy("group-1"));

    peer.reply("banana");
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    assert_eq!(*order.lock(), vec!["banana".to_string(), "apple".to_string()]);
    assert_eq!(locks.active(), 0);
}

#[tokio::test(start_paused = true)]
async fn timed_out_session_releases_the_conversation() {
    let grammar = Alconna::builder("pick")
        .arg(Arg::new("fruit", Pattern::Str))
        .build()
        .unwrap();
    let mut config = CommandConfig::default();
    config.completion.timeout_secs = 2;
    config.auto_send_output = false;
    let locks = SessionLocks::new();
    let service = on_alconna(Arc::new(grammar))
        .config(config)
        .locks(locks.clone())
        .service(tower::service_fn(|_: CommandMatch<ChatEvent>| async {
            Ok::<(), BoxError>(())
        }));

    let (conversation, _peer) = ChannelConversation::pair("dm-9");
    let event = ChatEvent {
        message: text("pick"),
        conversation: Arc::new(conversation),
    };
    service.oneshot(event).await.unwrap();
    assert!(!locks.is_busy("dm-9"));
    assert_eq!(locks.active(), 0);
}
