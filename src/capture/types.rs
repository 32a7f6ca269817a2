use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::SpeechError;

/// 语音识别能力：单次语句采集，事件通过返回的通道推送。
#[async_trait]
pub trait SpeechCapture: Send + Sync {
    async fn start(&self, options: SpeechOptions)
        -> Result<mpsc::Receiver<SpeechEvent>, SpeechError>;

    /// Requests end of utterance. The engine still flushes pending finals and `End`.
    async fn stop(&self);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechOptions {
    pub language: String,
    pub continuous: bool,
    pub interim_results: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    Interim { segment: usize, text: String },
    Final { segment: usize, text: String },
    Error(SpeechError),
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapturePhase {
    #[default]
    Stopped,
    Listening,
}

impl CapturePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapturePhase::Stopped => "stopped",
            CapturePhase::Listening => "listening",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// 面向用户的一次性提示。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionNotice {
    pub level: NoticeLevel,
    pub message: String,
}

impl SessionNotice {
    pub fn new<S: Into<String>>(level: NoticeLevel, message: S) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn speech_unsupported() -> Self {
        Self::new(
            NoticeLevel::Warning,
            "Voice input is not supported here. Please type your request instead.",
        )
    }

    pub fn microphone_denied() -> Self {
        Self::new(
            NoticeLevel::Error,
            "Microphone access was denied. Allow microphone access and try again.",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureUpdate {
    Phase(CapturePhase),
    /// `text` is the live transcript; `committed` marks a final segment.
    Transcript { text: String, committed: bool },
    Notice(SessionNotice),
}
