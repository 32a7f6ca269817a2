use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::util::duration_to_ms;

pub(crate) const TARGET: &str = "telemetry::command_layer";
pub(crate) const EVENT_DISPATCH: &str = "map_dispatch";
pub(crate) const EVENT_ORBIT: &str = "camera_orbit";
pub(crate) const EVENT_CAPTURE_END: &str = "capture_end";
pub(crate) const EVENT_TURN: &str = "conversation_turn";

#[derive(Debug, Serialize)]
pub struct DispatchEvent {
    pub kind: &'static str,
    pub outcome: &'static str,
    pub latency_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct OrbitEvent {
    pub action: &'static str,
    pub degrees_per_second: f64,
}

#[derive(Debug, Serialize)]
pub struct CaptureEndEvent {
    pub session_id: u64,
    pub committed_chars: usize,
    pub auto_submitted: bool,
}

#[derive(Debug, Serialize)]
pub struct TurnEvent {
    pub turn_id: u64,
    pub outcome: &'static str,
    pub latency_ms: u64,
}

pub fn record_dispatch(kind: &'static str, outcome: &'static str, latency: Duration) {
    let event = DispatchEvent {
        kind,
        outcome,
        latency_ms: duration_to_ms(latency),
    };

    match serde_json::to_string(&event) {
        Ok(payload) => info!(
            target: TARGET,
            event = EVENT_DISPATCH,
            kind = event.kind,
            outcome = event.outcome,
            latency_ms = event.latency_ms,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_DISPATCH,
            %err,
            "failed to encode dispatch event"
        ),
    }
}

pub fn record_orbit(action: &'static str, degrees_per_second: f64) {
    let event = OrbitEvent {
        action,
        degrees_per_second,
    };

    match serde_json::to_string(&event) {
        Ok(payload) => info!(
            target: TARGET,
            event = EVENT_ORBIT,
            action = event.action,
            degrees_per_second = event.degrees_per_second,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_ORBIT,
            %err,
            "failed to encode orbit event"
        ),
    }
}

pub fn record_capture_end(session_id: u64, committed_chars: usize, auto_submitted: bool) {
    let event = CaptureEndEvent {
        session_id,
        committed_chars,
        auto_submitted,
    };

    match serde_json::to_string(&event) {
        Ok(payload) => info!(
            target: TARGET,
            event = EVENT_CAPTURE_END,
            session_id = event.session_id,
            committed_chars = event.committed_chars,
            auto_submitted = event.auto_submitted,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_CAPTURE_END,
            %err,
            "failed to encode capture end event"
        ),
    }
}

pub fn record_turn(turn_id: u64, outcome: &'static str, latency: Duration) {
    let event = TurnEvent {
        turn_id,
        outcome,
        latency_ms: duration_to_ms(latency),
    };

    match serde_json::to_string(&event) {
        Ok(payload) => info!(
            target: TARGET,
            event = EVENT_TURN,
            turn_id = event.turn_id,
            outcome = event.outcome,
            latency_ms = event.latency_ms,
            payload = %payload
        ),
        Err(err) => warn!(
            target: TARGET,
            event = EVENT_TURN,
            %err,
            "failed to encode conversation turn event"
        ),
    }
}
