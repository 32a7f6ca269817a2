//! Geovoice Core Library
//!
//! This crate provides the command layer behind the Geovoice map assistant:
//! conversation state, voice capture, camera animation and map dispatch.

pub mod camera;
pub mod capture;
pub mod config;
pub mod conversation;
pub mod dispatch;
pub mod error;
pub mod map;
pub mod session;
pub mod telemetry;

pub(crate) mod util;

#[cfg(test)]
mod test_support;

pub use camera::{CameraAnimator, SpaceViewTransition};
pub use capture::{CapturePhase, CaptureSession, CaptureUpdate, SessionNotice, SpeechCapture};
pub use config::CommandLayerConfig;
pub use conversation::{
    CommandInterpreter, ConversationController, ConversationState, Message, Role, TurnContext,
};
pub use dispatch::{CommandResult, DispatchOutcome, MapActionDispatcher};
pub use error::CommandLayerError;
pub use session::{MapSession, MapSessionBuilder};
