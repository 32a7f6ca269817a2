//! 语音采集会话：管理单次语句的监听生命周期，并在语句结束时自动提交。

mod buffer;
mod types;

pub use buffer::TranscriptBuffer;
pub use types::{
    CapturePhase, CaptureUpdate, NoticeLevel, SessionNotice, SpeechCapture, SpeechEvent,
    SpeechOptions,
};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::camera::CameraAnimator;
use crate::config::CaptureConfig;
use crate::conversation::{ConversationController, InputSource, Role};
use crate::error::{CaptureError, SpeechError};
use crate::telemetry::events::record_capture_end;
use crate::util::lock;

#[derive(Clone)]
pub struct CaptureSession {
    inner: Arc<CaptureInner>,
}

struct CaptureInner {
    speech: Option<Arc<dyn SpeechCapture>>,
    camera: CameraAnimator,
    controller: ConversationController,
    config: CaptureConfig,
    state: Mutex<CaptureState>,
    updates_tx: broadcast::Sender<CaptureUpdate>,
    notices_tx: broadcast::Sender<SessionNotice>,
    next_session: AtomicU64,
}

#[derive(Default)]
struct CaptureState {
    phase: CapturePhase,
    /// Session whose end has not been finalized yet.
    session_id: Option<u64>,
    buffer: TranscriptBuffer,
    pump: Option<JoinHandle<()>>,
}

impl Drop for CaptureInner {
    fn drop(&mut self) {
        if let Some(pump) = lock(&self.state).pump.take() {
            pump.abort();
        }
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("supported", &self.is_supported())
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl CaptureSession {
    pub fn new(
        speech: Option<Arc<dyn SpeechCapture>>,
        camera: CameraAnimator,
        controller: ConversationController,
        config: CaptureConfig,
    ) -> Self {
        let capacity = config.buffer_capacity.max(1);
        let (updates_tx, _) = broadcast::channel(capacity);
        let (notices_tx, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(CaptureInner {
                speech,
                camera,
                controller,
                config,
                state: Mutex::new(CaptureState::default()),
                updates_tx,
                notices_tx,
                next_session: AtomicU64::new(1),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CaptureUpdate> {
        self.inner.updates_tx.subscribe()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.inner.notices_tx.subscribe()
    }

    pub fn is_supported(&self) -> bool {
        self.inner.speech.is_some()
    }

    pub fn phase(&self) -> CapturePhase {
        lock(&self.inner.state).phase
    }

    pub fn live_transcript(&self) -> String {
        lock(&self.inner.state).buffer.live()
    }

    pub fn committed_transcript(&self) -> String {
        lock(&self.inner.state).buffer.committed()
    }

    fn options(&self) -> SpeechOptions {
        SpeechOptions {
            language: self.inner.config.language.clone(),
            continuous: false,
            interim_results: self.inner.config.interim_results,
        }
    }

    /// Begins listening for one utterance. Already listening is a no-op.
    pub async fn start(&self) -> Result<(), CaptureError> {
        let Some(speech) = self.inner.speech.clone() else {
            warn!(target: "capture_session", "speech capture unavailable");
            self.notify(SessionNotice::speech_unsupported());
            return Err(CaptureError::Unsupported);
        };

        self.inner.camera.stop_orbit();

        let session_id = {
            let mut state = lock(&self.inner.state);
            if state.phase == CapturePhase::Listening {
                debug!(target: "capture_session", "start ignored while listening");
                return Ok(());
            }
            if let Some(stale) = state.pump.take() {
                stale.abort();
            }
            let session_id = self.inner.next_session.fetch_add(1, Ordering::SeqCst);
            state.phase = CapturePhase::Listening;
            state.session_id = Some(session_id);
            state.buffer.clear();
            session_id
        };
        self.publish(CaptureUpdate::Phase(CapturePhase::Listening));
        info!(target: "capture_session", session_id, "listening");

        match speech.start(self.options()).await {
            Ok(events) => {
                let pump = tokio::spawn(pump_events(
                    Arc::downgrade(&self.inner),
                    session_id,
                    events,
                ));
                let mut state = lock(&self.inner.state);
                if state.session_id == Some(session_id) {
                    state.pump = Some(pump);
                } else {
                    pump.abort();
                }
                Ok(())
            }
            Err(err) => {
                debug!(target: "capture_session", session_id, %err, "speech engine refused to start");
                self.fail(session_id, err.clone());
                Err(CaptureError::from(err))
            }
        }
    }

    /// Asks the engine to end the utterance. Committed text is still auto-sent
    /// once the engine reports the end of the session.
    pub async fn stop(&self) {
        let Some(speech) = self.inner.speech.clone() else {
            return;
        };
        let changed = {
            let mut state = lock(&self.inner.state);
            let changed = state.phase == CapturePhase::Listening;
            state.phase = CapturePhase::Stopped;
            changed
        };
        if changed {
            self.publish(CaptureUpdate::Phase(CapturePhase::Stopped));
        }
        speech.stop().await;
    }

    fn apply(&self, session_id: u64, event: &SpeechEvent) {
        let update = {
            let mut state = lock(&self.inner.state);
            if state.session_id != Some(session_id) {
                return;
            }
            let committed = match event {
                SpeechEvent::Interim { segment, text } => {
                    state.buffer.apply_interim(*segment, text);
                    false
                }
                SpeechEvent::Final { segment, text } => {
                    state.buffer.apply_final(*segment, text);
                    true
                }
                SpeechEvent::Error(_) | SpeechEvent::End => return,
            };
            CaptureUpdate::Transcript {
                text: state.buffer.live(),
                committed,
            }
        };
        self.publish(update);
    }

    /// Ends the session without auto-sending.
    fn fail(&self, session_id: u64, err: SpeechError) {
        if !self.close(session_id) {
            return;
        }
        warn!(target: "capture_session", session_id, %err, "capture error");
        if err.is_permission_denied() {
            self.notify(SessionNotice::microphone_denied());
        }
        record_capture_end(session_id, 0, false);
    }

    /// End of utterance: auto-sends the committed text once per session.
    async fn finish(&self, session_id: u64) {
        let committed = {
            let state = lock(&self.inner.state);
            if state.session_id != Some(session_id) {
                return;
            }
            state.buffer.committed()
        };
        if !self.close(session_id) {
            return;
        }

        let auto_submit = !committed.is_empty() && self.inner.controller.state().is_idle();
        record_capture_end(session_id, committed.chars().count(), auto_submit);
        if !auto_submit {
            debug!(
                target: "capture_session",
                session_id,
                committed_chars = committed.chars().count(),
                "utterance ended without submission"
            );
            return;
        }

        info!(target: "capture_session", session_id, "auto-submitting utterance");
        let outcome = self
            .inner
            .controller
            .submit_from(&committed, Role::User, InputSource::Voice)
            .await;
        debug!(target: "capture_session", session_id, ?outcome, "voice submission finished");
    }

    /// Marks the session finalized. False when it was already closed or replaced.
    fn close(&self, session_id: u64) -> bool {
        let changed = {
            let mut state = lock(&self.inner.state);
            if state.session_id != Some(session_id) {
                return false;
            }
            state.session_id = None;
            // The pump may be the caller; detach instead of aborting.
            drop(state.pump.take());
            let changed = state.phase == CapturePhase::Listening;
            state.phase = CapturePhase::Stopped;
            changed
        };
        if changed {
            self.publish(CaptureUpdate::Phase(CapturePhase::Stopped));
        }
        true
    }

    fn notify(&self, notice: SessionNotice) {
        let _ = self.inner.notices_tx.send(notice.clone());
        self.publish(CaptureUpdate::Notice(notice));
    }

    fn publish(&self, update: CaptureUpdate) {
        if self.inner.updates_tx.send(update).is_err() {
            debug!(target: "capture_session", "no capture subscribers");
        }
    }
}

async fn pump_events(
    owner: Weak<CaptureInner>,
    session_id: u64,
    mut events: mpsc::Receiver<SpeechEvent>,
) {
    loop {
        let event = events.recv().await;
        let Some(inner) = owner.upgrade() else {
            return;
        };
        let session = CaptureSession { inner };
        match event {
            Some(SpeechEvent::Error(err)) => {
                session.fail(session_id, err);
                return;
            }
            Some(SpeechEvent::End) | None => {
                session.finish(session_id).await;
                return;
            }
            Some(event) => session.apply(session_id, &event),
        }
    }
}

#[cfg(test)]
mod tests;
