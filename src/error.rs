//! 命令层错误分类。

use thiserror::Error;

/// Failure reported by the geocoding or routing capability.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("no result found for query")]
    NotFound,
    #[error("service returned status {0}")]
    Status(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

impl RequestError {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestError::NotFound => "not_found",
            RequestError::Status(_) => "status",
            RequestError::Transport(_) => "transport",
        }
    }
}

/// Errors surfaced by the speech-capture capability.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpeechError {
    #[error("microphone permission denied")]
    PermissionDenied,
    #[error("no speech detected")]
    NoSpeech,
    #[error("recognition aborted")]
    Aborted,
    #[error("audio capture failed: {0}")]
    AudioCapture(String),
    #[error("recognition network failure: {0}")]
    Network(String),
    #[error("speech engine error: {0}")]
    Other(String),
}

impl SpeechError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, SpeechError::PermissionDenied)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("speech capture is not supported by this host")]
    Unsupported,
    #[error("microphone permission denied")]
    PermissionDenied,
    #[error("speech engine failed to start: {0}")]
    Engine(SpeechError),
}

impl From<SpeechError> for CaptureError {
    fn from(error: SpeechError) -> Self {
        match error {
            SpeechError::PermissionDenied => CaptureError::PermissionDenied,
            other => CaptureError::Engine(other),
        }
    }
}

/// Top-level taxonomy of the command layer. None of these are fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandLayerError {
    #[error("capability unavailable: {0}")]
    CapabilityUnavailable(String),
    #[error("request failed: {0}")]
    RequestFailure(#[from] RequestError),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}

impl CommandLayerError {
    pub fn unavailable<S: Into<String>>(capability: S) -> Self {
        Self::CapabilityUnavailable(capability.into())
    }
}

impl From<CaptureError> for CommandLayerError {
    fn from(error: CaptureError) -> Self {
        match error {
            CaptureError::Unsupported => Self::unavailable("speech capture"),
            CaptureError::PermissionDenied => Self::PermissionDenied("microphone".into()),
            CaptureError::Engine(inner) => Self::unavailable(format!("speech engine: {inner}")),
        }
    }
}
