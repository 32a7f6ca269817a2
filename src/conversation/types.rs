use serde::{Deserialize, Serialize};

/// Lifecycle of a submission. Cycles back to `Idle`; there is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    #[default]
    Idle,
    Generating,
    Thinking,
    Executing,
}

impl ConversationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationState::Idle => "idle",
            ConversationState::Generating => "generating",
            ConversationState::Thinking => "thinking",
            ConversationState::Executing => "executing",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ConversationState::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Where a submission came from. Only interactive sources rotate the
/// suggested prompt on empty input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Typed,
    Voice,
    Programmatic,
}

impl InputSource {
    pub fn is_interactive(&self) -> bool {
        matches!(self, InputSource::Typed | InputSource::Voice)
    }
}

/// One transcript entry. Only the in-flight assistant message is ever updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl Message {
    pub fn new<S: Into<String>>(role: Role, text: S) -> Self {
        Self {
            role,
            text: text.into(),
            reasoning: None,
        }
    }

    pub fn system<S: Into<String>>(text: S) -> Self {
        Self::new(Role::System, text)
    }
}

/// Broadcast to the transcript renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationEvent {
    MessageAppended { index: usize, message: Message },
    MessageUpdated { index: usize, message: Message },
    StateChanged(ConversationState),
    SuggestionChanged(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Completed,
    /// The interpreter returned an error; a system message was appended.
    Failed,
    /// Another submission is in flight. Dropped, never queued.
    Busy,
    Empty,
}
