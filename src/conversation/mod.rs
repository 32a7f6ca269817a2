//! 会话控制器：唯一持有会话状态与对话记录，并负责调用外部解释器。

mod interpreter;
mod suggestions;
mod types;

pub use interpreter::{CommandInterpreter, TurnContext};
pub use suggestions::PromptSuggestions;
pub use types::{ConversationEvent, ConversationState, InputSource, Message, Role, SubmitOutcome};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::ConversationConfig;
use crate::dispatch::MapActionDispatcher;
use crate::telemetry::events::record_turn;
use crate::util::lock;

const INTERPRETER_FAILURE_PREFIX: &str = "Sorry, something went wrong while handling that request";

#[derive(Clone)]
pub struct ConversationController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    interpreter: Arc<dyn CommandInterpreter>,
    dispatcher: MapActionDispatcher,
    core: Mutex<ConversationCore>,
    suggestions: Mutex<PromptSuggestions>,
    events_tx: broadcast::Sender<ConversationEvent>,
    next_turn: AtomicU64,
}

#[derive(Default)]
struct ConversationCore {
    state: ConversationState,
    transcript: Vec<Message>,
    active_turn: Option<ActiveTurn>,
}

struct ActiveTurn {
    id: u64,
    assistant_index: Option<usize>,
}

impl ConversationCore {
    fn set_state(
        &mut self,
        state: ConversationState,
        events: &broadcast::Sender<ConversationEvent>,
    ) {
        if self.state == state {
            return;
        }
        debug!(
            target: "conversation",
            from = self.state.as_str(),
            to = state.as_str(),
            "state transition"
        );
        self.state = state;
        emit(events, ConversationEvent::StateChanged(state));
    }

    fn append(
        &mut self,
        message: Message,
        events: &broadcast::Sender<ConversationEvent>,
    ) -> usize {
        let index = self.transcript.len();
        self.transcript.push(message.clone());
        emit(events, ConversationEvent::MessageAppended { index, message });
        index
    }
}

fn emit(events: &broadcast::Sender<ConversationEvent>, event: ConversationEvent) {
    // No subscribers is normal for a headless host.
    if events.send(event).is_err() {
        debug!(target: "conversation", "no transcript subscribers");
    }
}

impl std::fmt::Debug for ConversationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationController")
            .field("state", &self.state())
            .field("transcript_len", &self.transcript_len())
            .finish_non_exhaustive()
    }
}

/// Returns the controller to `Idle` even if the submission future is dropped.
struct TurnGuard<'a> {
    controller: &'a ConversationController,
    turn_id: u64,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.controller.finish_turn(self.turn_id);
    }
}

impl ConversationController {
    pub fn new(
        interpreter: Arc<dyn CommandInterpreter>,
        dispatcher: MapActionDispatcher,
        config: ConversationConfig,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            inner: Arc::new(ControllerInner {
                interpreter,
                dispatcher,
                core: Mutex::new(ConversationCore::default()),
                suggestions: Mutex::new(PromptSuggestions::new(config.suggested_prompts)),
                events_tx,
                next_turn: AtomicU64::new(1),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.inner.events_tx.subscribe()
    }

    pub fn state(&self) -> ConversationState {
        lock(&self.inner.core).state
    }

    pub fn transcript(&self) -> Vec<Message> {
        lock(&self.inner.core).transcript.clone()
    }

    pub fn transcript_len(&self) -> usize {
        lock(&self.inner.core).transcript.len()
    }

    pub fn current_suggestion(&self) -> Option<String> {
        lock(&self.inner.suggestions).current().map(str::to_string)
    }

    pub fn dispatcher(&self) -> &MapActionDispatcher {
        &self.inner.dispatcher
    }

    /// Progress report from the interpreter. Any state is accepted.
    pub fn set_state(&self, state: ConversationState) {
        lock(&self.inner.core).set_state(state, &self.inner.events_tx);
    }

    /// Programmatic submission.
    pub async fn submit(&self, text: &str, role: Role) -> SubmitOutcome {
        self.submit_from(text, role, InputSource::Programmatic).await
    }

    pub async fn submit_from(&self, text: &str, role: Role, source: InputSource) -> SubmitOutcome {
        let text = text.trim();
        let turn_id = {
            let mut core = lock(&self.inner.core);
            if !core.state.is_idle() {
                debug!(
                    target: "conversation",
                    state = core.state.as_str(),
                    "submission dropped while busy"
                );
                return SubmitOutcome::Busy;
            }

            if text.is_empty() {
                drop(core);
                if source.is_interactive() {
                    self.rotate_suggestion();
                }
                return SubmitOutcome::Empty;
            }

            let turn_id = self.inner.next_turn.fetch_add(1, Ordering::SeqCst);
            // The transcript records the utterance as the user's; `role` only
            // reaches the interpreter.
            core.append(Message::new(Role::User, text), &self.inner.events_tx);
            core.active_turn = Some(ActiveTurn {
                id: turn_id,
                assistant_index: None,
            });
            core.set_state(ConversationState::Generating, &self.inner.events_tx);
            turn_id
        };

        let _guard = TurnGuard {
            controller: self,
            turn_id,
        };
        let started = Instant::now();
        info!(target: "conversation", turn_id, ?source, "submitting to interpreter");

        let turn = TurnContext::new(self.clone(), turn_id);
        let outcome = match self.inner.interpreter.interpret(text, role, turn).await {
            Ok(()) => SubmitOutcome::Completed,
            Err(err) => {
                warn!(target: "conversation", turn_id, %err, "interpreter failed");
                lock(&self.inner.core).append(
                    Message::system(format!("{INTERPRETER_FAILURE_PREFIX}: {err}")),
                    &self.inner.events_tx,
                );
                SubmitOutcome::Failed
            }
        };

        record_turn(
            turn_id,
            match outcome {
                SubmitOutcome::Failed => "failed",
                _ => "completed",
            },
            started.elapsed(),
        );
        outcome
    }

    pub(crate) fn is_turn_active(&self, turn_id: u64) -> bool {
        lock(&self.inner.core)
            .active_turn
            .as_ref()
            .map(|turn| turn.id == turn_id)
            .unwrap_or(false)
    }

    /// Applies `update` to the turn's assistant message; false if the turn ended.
    pub(crate) fn stream_assistant<F>(&self, turn_id: u64, update: F) -> bool
    where
        F: FnOnce(&mut Message),
    {
        let mut guard = lock(&self.inner.core);
        let core = &mut *guard;
        let existing = match core.active_turn.as_ref() {
            Some(turn) if turn.id == turn_id => turn.assistant_index,
            _ => {
                debug!(target: "conversation", turn_id, "ignoring stream for finished turn");
                return false;
            }
        };

        let index = match existing {
            Some(index) => index,
            None => {
                let index = core.append(Message::new(Role::Assistant, ""), &self.inner.events_tx);
                if let Some(turn) = core.active_turn.as_mut() {
                    turn.assistant_index = Some(index);
                }
                index
            }
        };

        let Some(message) = core.transcript.get_mut(index) else {
            return false;
        };
        update(message);
        let message = message.clone();
        emit(
            &self.inner.events_tx,
            ConversationEvent::MessageUpdated { index, message },
        );
        true
    }

    fn finish_turn(&self, turn_id: u64) {
        let mut core = lock(&self.inner.core);
        if core.active_turn.as_ref().map(|turn| turn.id) != Some(turn_id) {
            return;
        }
        core.active_turn = None;
        core.set_state(ConversationState::Idle, &self.inner.events_tx);
    }

    fn rotate_suggestion(&self) {
        let next = lock(&self.inner.suggestions).advance();
        if let Some(prompt) = next {
            emit(
                &self.inner.events_tx,
                ConversationEvent::SuggestionChanged(prompt),
            );
        }
    }
}
