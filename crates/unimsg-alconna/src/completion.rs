//! Interactive completion of missing arguments.
//!
//! When a parse stops on a missing argument, a [`CompletionSession`] prompts
//! the conversation for it and re-parses with the reply inserted where the
//! parse stopped. Each reply is interpreted as:
//!
//! - the tab token, optionally followed by a step count: moves the cursor
//!   through the candidates and prompts again
//! - the enter token, optionally followed by a value: supplies that value, or
//!   the candidate under the cursor
//! - the exit token: abandons the parse
//! - anything else: the value itself
//!
//! A round with no reply within the configured timeout ends like exit.

use std::fmt::Write;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};
use unimsg_core::UniMessage;

use crate::alconna::Alconna;
use crate::argv::{Argv, Token};
use crate::arparma::{Arparma, PendingSlot};
use crate::config::CompletionConfig;
use crate::error::{ErrorInfo, ErrorKind, SessionError, SessionResult, SpecialOption};

// =============================================================================
// Conversation
// =============================================================================

/// The channel a completion session talks through.
#[async_trait]
pub trait Conversation: Send + Sync {
    /// Key for per-conversation mutual exclusion.
    fn session_id(&self) -> &str;

    /// Sends a message to the user.
    async fn send(&self, message: UniMessage) -> SessionResult<()>;

    /// Waits for the next message from the user; `None` once closed.
    async fn receive(&self) -> Option<UniMessage>;
}

/// A [`Conversation`] over tokio channels.
#[derive(Debug)]
pub struct ChannelConversation {
    session_id: String,
    outgoing: mpsc::UnboundedSender<UniMessage>,
    incoming: Mutex<mpsc::UnboundedReceiver<UniMessage>>,
}

/// The other end of a [`ChannelConversation`].
#[derive(Debug)]
pub struct ConversationPeer {
    /// Delivers user messages to the conversation.
    pub replies: mpsc::UnboundedSender<UniMessage>,
    /// Messages the conversation sent.
    pub sent: mpsc::UnboundedReceiver<UniMessage>,
}

impl ChannelConversation {
    pub fn pair(session_id: impl Into<String>) -> (Self, ConversationPeer) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let conversation = Self {
            session_id: session_id.into(),
            outgoing: out_tx,
            incoming: Mutex::new(in_rx),
        };
        let peer = ConversationPeer {
            replies: in_tx,
            sent: out_rx,
        };
        (conversation, peer)
    }
}

#[async_trait]
impl Conversation for ChannelConversation {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn send(&self, message: UniMessage) -> SessionResult<()> {
        self.outgoing.send(message).map_err(|_| SessionError::Closed)
    }

    async fn receive(&self) -> Option<UniMessage> {
        self.incoming.lock().await.recv().await
    }
}

impl ConversationPeer {
    /// Sends a text reply.
    pub fn reply(&self, text: &str) -> bool {
        self.replies.send(UniMessage::new().text(text)).is_ok()
    }
}

// =============================================================================
// Session
// =============================================================================

/// Where a completion session stands.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingInput(PendingSlot),
    /// A reply arrived and is being parsed.
    Resumed(Vec<Token>),
    TimedOut,
    Exited,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::TimedOut | SessionState::Exited)
    }
}

/// Prompt for `pending` with the candidate at `cursor` highlighted.
pub fn prompt_text(pending: Option<&PendingSlot>, cursor: usize) -> String {
    let Some(pending) = pending else {
        return "nothing to complete".to_string();
    };
    let mut out = format!("please enter {}: {}", pending.path(), pending.expected);
    if !pending.candidates.is_empty() {
        out.push_str("\ncandidates:");
        let selected = cursor % pending.candidates.len();
        for (index, candidate) in pending.candidates.iter().enumerate() {
            let marker = if index == selected { '>' } else { ' ' };
            let _ = write!(out, "\n{marker} {candidate}");
        }
    }
    out
}

/// Drives completion rounds for one parse.
pub struct CompletionSession<'a> {
    grammar: &'a Alconna,
    config: &'a CompletionConfig,
    state: SessionState,
    rounds: usize,
}

impl<'a> CompletionSession<'a> {
    pub fn new(grammar: &'a Alconna, config: &'a CompletionConfig) -> Self {
        Self {
            grammar,
            config,
            state: SessionState::Idle,
            rounds: 0,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Number of prompts sent so far.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Returns `true` if `result` stopped on a missing argument the session
    /// can ask for.
    pub fn wants_input(result: &Arparma) -> bool {
        result.pending.is_some()
            && matches!(
                result.error_kind(),
                Some(
                    ErrorKind::ArgumentMissing
                        | ErrorKind::SpecialOptionTriggered(SpecialOption::Completion)
                )
            )
    }

    /// Completes `result` through `conversation` until it no longer misses
    /// an argument, or the session exits.
    pub async fn run(&mut self, mut result: Arparma, conversation: &dyn Conversation) -> Arparma {
        let session = conversation.session_id().to_string();
        let mut last_hash = Argv::new(result.tokens.clone()).token_hash();

        while Self::wants_input(&result) {
            let Some(pending) = result.pending.clone() else {
                break;
            };
            if self.rounds >= self.config.max_rounds {
                debug!(session = %session, "completion round limit reached");
                self.state = SessionState::Exited;
                return exited(result);
            }
            self.rounds += 1;
            debug!(session = %session, arg = %pending.path(), "awaiting completion input");
            self.state = SessionState::AwaitingInput(pending.clone());

            let mut cursor = 0;
            let tokens = loop {
                if let Err(err) = conversation.send(self.prompt(&pending, cursor)).await {
                    warn!(session = %session, error = %err, "failed to send completion prompt");
                    self.state = SessionState::Exited;
                    return exited(result);
                }
                let received =
                    tokio::time::timeout(self.config.timeout(), conversation.receive()).await;
                let reply = match received {
                    Ok(Some(reply)) => reply,
                    Ok(None) => {
                        self.state = SessionState::Exited;
                        return exited(result);
                    }
                    Err(_) => {
                        debug!(session = %session, "completion timed out");
                        self.state = SessionState::TimedOut;
                        return exited(result);
                    }
                };

                let words = self.grammar.tokenize(&reply).into_tokens();
                let control = words.first().and_then(Token::as_text);
                if control == Some(self.config.exit.as_str()) {
                    debug!(session = %session, "completion exited");
                    self.state = SessionState::Exited;
                    return exited(result);
                }
                if control == Some(self.config.tab.as_str()) {
                    let step = words
                        .get(1)
                        .and_then(Token::as_text)
                        .and_then(|n| n.parse::<usize>().ok())
                        .unwrap_or(1);
                    cursor += step;
                    continue;
                }
                if control == Some(self.config.enter.as_str()) {
                    if words.len() > 1 {
                        break words[1..].to_vec();
                    }
                    match selected(&pending, cursor) {
                        Some(candidate) => break vec![Token::text(candidate)],
                        None => continue,
                    }
                }
                if words.is_empty() {
                    continue;
                }
                break words;
            };

            self.state = SessionState::Resumed(tokens.clone());
            let mut argv = Argv::new(result.tokens.clone());
            argv.insert_at(pending.position, tokens);
            let hash = argv.token_hash();
            if hash == last_hash {
                continue;
            }
            last_hash = hash;
            result = self.grammar.parse_argv(argv);
        }

        self.state = SessionState::Idle;
        result
    }

    fn prompt(&self, pending: &PendingSlot, cursor: usize) -> UniMessage {
        let mut text = prompt_text(Some(pending), cursor);
        let _ = write!(
            text,
            "\n({} to cycle, {} to confirm, {} to cancel)",
            self.config.tab, self.config.enter, self.config.exit
        );
        UniMessage::new().text(text)
    }
}

fn selected(pending: &PendingSlot, cursor: usize) -> Option<&str> {
    if pending.candidates.is_empty() {
        return None;
    }
    pending
        .candidates
        .get(cursor % pending.candidates.len())
        .map(String::as_str)
}

fn exited(mut result: Arparma) -> Arparma {
    result.matched = false;
    result.pending = None;
    result.output = None;
    result.error_info = Some(ErrorInfo::new(ErrorKind::SpecialOptionTriggered(
        SpecialOption::Completion,
    )));
    result
}
