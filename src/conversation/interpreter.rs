use anyhow::Result;
use async_trait::async_trait;

use crate::conversation::types::{ConversationState, Role};
use crate::conversation::ConversationController;
use crate::dispatch::{CommandResult, DispatchOutcome, MapActionDispatcher};

/// External language model turning utterances into map commands.
///
/// The interpreter decides whether a map action follows; when it does it calls
/// [`TurnContext::dispatch`] (or the dispatcher directly) itself.
#[async_trait]
pub trait CommandInterpreter: Send + Sync {
    async fn interpret(&self, text: &str, role: Role, turn: TurnContext) -> Result<()>;
}

/// Capabilities granted to the interpreter for one submission.
///
/// Once the submission completes, every mutation through the context is ignored.
#[derive(Clone)]
pub struct TurnContext {
    controller: ConversationController,
    turn_id: u64,
}

impl std::fmt::Debug for TurnContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnContext")
            .field("turn_id", &self.turn_id)
            .finish_non_exhaustive()
    }
}

impl TurnContext {
    pub(crate) fn new(controller: ConversationController, turn_id: u64) -> Self {
        Self {
            controller,
            turn_id,
        }
    }

    pub fn turn_id(&self) -> u64 {
        self.turn_id
    }

    pub fn is_active(&self) -> bool {
        self.controller.is_turn_active(self.turn_id)
    }

    pub fn state(&self) -> ConversationState {
        self.controller.state()
    }

    pub fn set_state(&self, state: ConversationState) {
        if self.is_active() {
            self.controller.set_state(state);
        }
    }

    /// Appends to the assistant message of this turn, creating it on first use.
    pub fn stream_text(&self, delta: &str) -> bool {
        self.controller
            .stream_assistant(self.turn_id, |message| message.text.push_str(delta))
    }

    pub fn stream_reasoning(&self, delta: &str) -> bool {
        self.controller.stream_assistant(self.turn_id, |message| {
            message
                .reasoning
                .get_or_insert_with(String::new)
                .push_str(delta)
        })
    }

    pub fn map_actions(&self) -> &MapActionDispatcher {
        self.controller.dispatcher()
    }

    /// Reports `Executing` around the map action, then `Generating` again.
    pub async fn dispatch(&self, command: CommandResult) -> DispatchOutcome {
        self.set_state(ConversationState::Executing);
        let outcome = self.map_actions().handle_map_query(command).await;
        self.set_state(ConversationState::Generating);
        outcome
    }
}
