//! Tower integration.
//!
//! [`AlconnaLayer`] wraps a handler service. For every event it:
//!
//! 1. rejects events whose header does not match, with [`EventSkipped`]
//! 2. waits for the conversation's session lock
//! 3. parses the message and runs completion rounds if an argument is missing
//! 4. calls the inner service with a [`CommandMatch`] on success, or sends
//!    the rendered failure or help text back on failure

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use tower::{BoxError, Layer, Service, ServiceBuilder};
use tower_layer::{Identity, Stack};
use tracing::{debug, warn};
use unimsg_core::UniMessage;

use crate::alconna::Alconna;
use crate::arparma::Arparma;
use crate::completion::{CompletionSession, Conversation};
use crate::config::CommandConfig;
use crate::error::{ErrorKind, EventSkipped};
use crate::registry::CommandRegistry;
use crate::session::SessionLocks;

/// An inbound event carrying a message.
pub trait CommandEvent: Send + Sync + 'static {
    fn message(&self) -> &UniMessage;

    /// The conversation the event arrived in.
    fn conversation(&self) -> Arc<dyn Conversation>;
}

/// Request passed to the inner service after a successful parse.
#[derive(Debug, Clone)]
pub struct CommandMatch<E> {
    pub event: E,
    pub result: Arparma,
}

/// Creates an [`AlconnaLayer`] for `grammar`.
///
/// ```rust,ignore
/// let service = on_alconna(grammar)
///     .config(config.command.clone())
///     .locks(locks.clone())
///     .service(service_fn(handle_weather));
/// ```
pub fn on_alconna(grammar: Arc<Alconna>) -> AlconnaLayer {
    AlconnaLayer::new(grammar)
}

/// A tower [`Layer`] that matches events against a grammar before calling
/// the inner service.
#[derive(Clone)]
pub struct AlconnaLayer {
    grammar: Arc<Alconna>,
    config: Arc<CommandConfig>,
    locks: SessionLocks,
    registry: Option<CommandRegistry>,
}

impl AlconnaLayer {
    pub fn new(grammar: Arc<Alconna>) -> Self {
        Self {
            grammar,
            config: Arc::new(CommandConfig::default()),
            locks: SessionLocks::default(),
            registry: None,
        }
    }

    pub fn config(mut self, config: CommandConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    /// Shares session locks with other layers; commands sharing locks never
    /// interleave within one conversation.
    pub fn locks(mut self, locks: SessionLocks) -> Self {
        self.locks = locks;
        self
    }

    /// Skips events while the grammar is disabled in `registry`.
    pub fn registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Converts to a [`ServiceBuilder`] for stacking further layers.
    pub fn build(self) -> ServiceBuilder<Stack<AlconnaLayer, Identity>> {
        ServiceBuilder::new().layer(self)
    }

    /// Wraps `inner` with this layer.
    pub fn service<S>(self, inner: S) -> AlconnaService<S> {
        self.layer(inner)
    }
}

impl<S> Layer<S> for AlconnaLayer {
    type Service = AlconnaService<S>;

    fn layer(&self, inner: S) -> AlconnaService<S> {
        AlconnaService {
            grammar: Arc::clone(&self.grammar),
            config: Arc::clone(&self.config),
            locks: self.locks.clone(),
            registry: self.registry.clone(),
            inner,
        }
    }
}

/// The [`Service`] produced by [`AlconnaLayer`].
#[derive(Clone)]
pub struct AlconnaService<S> {
    grammar: Arc<Alconna>,
    config: Arc<CommandConfig>,
    locks: SessionLocks,
    registry: Option<CommandRegistry>,
    inner: S,
}

impl<E, S> Service<E> for AlconnaService<S>
where
    E: CommandEvent,
    S: Service<CommandMatch<E>, Response = (), Error = BoxError> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = ();
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<(), Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: E) -> Self::Future {
        let grammar = Arc::clone(&self.grammar);
        let config = Arc::clone(&self.config);
        let locks = self.locks.clone();
        let registry = self.registry.clone();
        let mut inner = self.inner.clone();

        async move {
            let argv = grammar.tokenize(event.message());
            if !grammar.accepts(argv.tokens()) {
                return Err(Box::new(EventSkipped) as BoxError);
            }
            if registry.is_some_and(|r| !r.is_enabled(&grammar.path())) {
                return Err(Box::new(EventSkipped) as BoxError);
            }

            let conversation = event.conversation();
            let _guard = locks.acquire(conversation.session_id()).await;

            let mut result = grammar.parse_argv(argv);
            if config.completion.enabled && CompletionSession::wants_input(&result) {
                let mut session = CompletionSession::new(&grammar, &config.completion);
                result = session.run(result, conversation.as_ref()).await;
            }

            if result.matched {
                return inner.call(CommandMatch { event, result }).await;
            }

            debug!(
                command = %grammar.path(),
                session = %conversation.session_id(),
                error = ?result.error_kind(),
                "command not matched"
            );
            let auto_send = config.auto_send_output && grammar.meta().auto_send_output;
            if auto_send
                && result.error_kind() != Some(ErrorKind::HeaderUnmatched)
                && let Some(output) = result.output
                && let Err(err) = conversation.send(UniMessage::new().text(output)).await
            {
                warn!(session = %conversation.session_id(), error = %err, "failed to send output");
            }
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Arg;
    use crate::completion::{ChannelConversation, ConversationPeer};
    use crate::pattern::Pattern;
    use crate::value::ArgValue;
    use parking_lot::Mutex;
    use tower::ServiceExt;

    #[derive(Clone)]
    struct TestEvent {
        message: UniMessage,
        conversation: Arc<ChannelConversation>,
    }

    impl CommandEvent for TestEvent {
        fn message(&self) -> &UniMessage {
            &self.message
        }

        fn conversation(&self) -> Arc<dyn Conversation> {
            self.conversation.clone()
        }
    }

    fn setup() -> (AlconnaLayer, Arc<ChannelConversation>, ConversationPeer) {
        let grammar = Alconna::builder("echo")
            .prefix("/")
            .arg(Arg::new("times", Pattern::Int))
            .build()
            .unwrap();
        let (conversation, peer) = ChannelConversation::pair("chat-1");
        (on_alconna(Arc::new(grammar)), Arc::new(conversation), peer)
    }

    fn event(conversation: &Arc<ChannelConversation>, text: &str) -> TestEvent {
        TestEvent {
            message: UniMessage::new().text(text),
            conversation: Arc::clone(conversation),
        }
    }

    #[tokio::test]
    async fn test_matched_reaches_inner() {
        let (layer, conversation, _peer) = setup();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let service = layer.service(tower::service_fn(move |req: CommandMatch<TestEvent>| {
            let sink = Arc::clone(&sink);
            async move {
                *sink.lock() = req.result.query("times").cloned();
                Ok::<(), BoxError>(())
            }
        }));

        service.oneshot(event(&conversation, "/echo 3")).await.unwrap();
        assert_eq!(*seen.lock(), Some(ArgValue::Int(3)));
    }

    #[tokio::test]
    async fn test_header_mismatch_is_skipped() {
        let (layer, conversation, _peer) = setup();
        let service = layer.service(tower::service_fn(|_: CommandMatch<TestEvent>| async {
            Ok::<(), BoxError>(())
        }));
        let err = service.oneshot(event(&conversation, "hello")).await.unwrap_err();
        assert!(err.downcast_ref::<EventSkipped>().is_some());
    }

    #[tokio::test]
    async fn test_failure_output_sent() {
        let (layer, conversation, mut peer) = setup();
        let service = layer.service(tower::service_fn(|_: CommandMatch<TestEvent>| async {
            Ok::<(), BoxError>(())
        }));
        service.oneshot(event(&conversation, "/echo x")).await.unwrap();
        let sent = peer.sent.recv().await.unwrap();
        assert_eq!(
            sent.extract_plain_text(),
            "parameter 'x' is invalid for 'times', expected int"
        );
    }

    #[tokio::test]
    async fn test_disabled_in_registry_is_skipped() {
        let (layer, conversation, _peer) = setup();
        let registry = CommandRegistry::new();
        let service = layer
            .registry(registry.clone())
            .service(tower::service_fn(|_: CommandMatch<TestEvent>| async {
                Ok::<(), BoxError>(())
            }));
        let err = service.oneshot(event(&conversation, "/echo 1")).await.unwrap_err();
        assert!(err.downcast_ref::<EventSkipped>().is_some());
    }
}
