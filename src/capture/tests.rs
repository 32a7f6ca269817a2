use super::*;
use crate::config::{CameraConfig, ConversationConfig, DispatchConfig};
use crate::conversation::{ConversationState, SubmitOutcome};
use crate::dispatch::MapActionDispatcher;
use crate::test_support::{
    london_paris_route, pose, ProgrammedGeocoder, ProgrammedRouter, RecordingMap,
    ScriptedInterpreter, ScriptedSpeech,
};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::timeout;

struct Harness {
    capture: CaptureSession,
    controller: ConversationController,
    camera: CameraAnimator,
    interpreter: Arc<ScriptedInterpreter>,
}

fn harness(speech: Option<Arc<ScriptedSpeech>>, interpreter: ScriptedInterpreter) -> Harness {
    let map = RecordingMap::new(pose(35.0, 139.0, 0.0, 25_000_000.0));
    let camera = CameraAnimator::new(map, CameraConfig::default());
    let dispatcher = MapActionDispatcher::new(
        camera.clone(),
        Arc::new(ProgrammedGeocoder::default()),
        Arc::new(ProgrammedRouter::returning(london_paris_route())),
        DispatchConfig::default(),
    );
    let interpreter = Arc::new(interpreter);
    let controller = ConversationController::new(
        interpreter.clone(),
        dispatcher,
        ConversationConfig::default(),
    );
    let capture = CaptureSession::new(
        speech.map(|speech| speech as Arc<dyn SpeechCapture>),
        camera.clone(),
        controller.clone(),
        CaptureConfig::default(),
    );
    Harness {
        capture,
        controller,
        camera,
        interpreter,
    }
}

async fn eventually<F>(mut condition: F, what: &str)
where
    F: FnMut() -> bool,
{
    let waited = timeout(Duration::from_secs(1), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {what}");
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

fn final_text(segment: usize, text: &str) -> SpeechEvent {
    SpeechEvent::Final {
        segment,
        text: text.to_string(),
    }
}

fn interim_text(segment: usize, text: &str) -> SpeechEvent {
    SpeechEvent::Interim {
        segment,
        text: text.to_string(),
    }
}

#[tokio::test]
async fn end_of_utterance_submits_committed_text_once() {
    let speech = Arc::new(ScriptedSpeech::default());
    let h = harness(Some(speech.clone()), ScriptedInterpreter::default());

    h.capture.start().await.expect("start");
    let events = speech.events();
    events.send(interim_text(0, "fly to")).await.expect("send");
    events.send(final_text(0, "fly to Tokyo")).await.expect("send");
    events.send(SpeechEvent::End).await.expect("send");
    // The second end may land after the pump has closed the channel.
    let _ = events.send(SpeechEvent::End).await;

    eventually(|| !h.interpreter.calls().is_empty(), "voice submission").await;
    settle().await;

    assert_eq!(
        h.interpreter.calls(),
        vec![("fly to Tokyo".to_string(), Role::User)]
    );
    assert_eq!(h.capture.phase(), CapturePhase::Stopped);
    assert_eq!(h.capture.committed_transcript(), "fly to Tokyo");
    eventually(|| h.controller.state().is_idle(), "controller idle").await;
}

#[tokio::test]
async fn repeated_finalization_of_one_session_submits_once() {
    let speech = Arc::new(ScriptedSpeech::default());
    let h = harness(Some(speech.clone()), ScriptedInterpreter::default());

    h.capture.start().await.expect("start");
    speech
        .events()
        .send(final_text(0, "fly to Tokyo"))
        .await
        .expect("send");
    eventually(|| !h.capture.committed_transcript().is_empty(), "commit").await;
    let session_id = lock(&h.capture.inner.state)
        .session_id
        .expect("open session");

    tokio::join!(h.capture.finish(session_id), h.capture.finish(session_id));
    h.capture.finish(session_id).await;

    assert!(!h.capture.close(session_id));
    assert_eq!(
        h.interpreter.calls(),
        vec![("fly to Tokyo".to_string(), Role::User)]
    );
    assert_eq!(h.capture.phase(), CapturePhase::Stopped);
}

#[tokio::test]
async fn interim_only_utterance_is_not_sent() {
    let speech = Arc::new(ScriptedSpeech::default());
    let h = harness(Some(speech.clone()), ScriptedInterpreter::default());

    h.capture.start().await.expect("start");
    let events = speech.events();
    events.send(interim_text(0, "show me")).await.expect("send");
    events.send(SpeechEvent::End).await.expect("send");

    eventually(|| h.capture.phase() == CapturePhase::Stopped, "capture stop").await;
    settle().await;

    assert_eq!(h.capture.live_transcript(), "show me");
    assert!(h.interpreter.calls().is_empty());
    assert_eq!(h.controller.transcript_len(), 0);
}

#[tokio::test]
async fn busy_controller_skips_auto_send() {
    let gate = Arc::new(Notify::new());
    let speech = Arc::new(ScriptedSpeech::default());
    let h = harness(
        Some(speech.clone()),
        ScriptedInterpreter::default().gated(gate.clone()),
    );

    let typed = {
        let controller = h.controller.clone();
        tokio::spawn(async move {
            controller
                .submit_from("show me Paris", Role::User, InputSource::Typed)
                .await
        })
    };
    eventually(|| !h.controller.state().is_idle(), "typed submission").await;

    h.capture.start().await.expect("start");
    let events = speech.events();
    events.send(final_text(0, "fly to Tokyo")).await.expect("send");
    events.send(SpeechEvent::End).await.expect("send");
    eventually(|| h.capture.phase() == CapturePhase::Stopped, "capture stop").await;
    settle().await;

    gate.notify_one();
    assert_eq!(typed.await.expect("typed task"), SubmitOutcome::Completed);
    assert_eq!(
        h.interpreter.calls(),
        vec![("show me Paris".to_string(), Role::User)]
    );
}

#[tokio::test]
async fn missing_speech_capability_notifies_without_state_change() {
    let h = harness(None, ScriptedInterpreter::default());
    let mut notices = h.capture.subscribe_notices();
    h.camera.start_orbit();

    let result = h.capture.start().await;

    assert_eq!(result, Err(CaptureError::Unsupported));
    assert_eq!(h.capture.phase(), CapturePhase::Stopped);
    assert!(h.camera.is_orbiting());
    let notice = notices.try_recv().expect("notice");
    assert_eq!(notice, SessionNotice::speech_unsupported());
    h.camera.stop_orbit();
}

#[tokio::test]
async fn permission_denied_at_start_surfaces_notice() {
    let speech = Arc::new(ScriptedSpeech::failing_start(SpeechError::PermissionDenied));
    let h = harness(Some(speech), ScriptedInterpreter::default());
    let mut notices = h.capture.subscribe_notices();

    let result = h.capture.start().await;

    assert_eq!(result, Err(CaptureError::PermissionDenied));
    assert_eq!(h.capture.phase(), CapturePhase::Stopped);
    assert_eq!(
        notices.try_recv().expect("notice"),
        SessionNotice::microphone_denied()
    );
}

#[tokio::test]
async fn runtime_error_resets_without_notice() {
    let speech = Arc::new(ScriptedSpeech::default());
    let h = harness(Some(speech.clone()), ScriptedInterpreter::default());
    let mut notices = h.capture.subscribe_notices();

    h.capture.start().await.expect("start");
    let events = speech.events();
    events.send(final_text(0, "fly to")).await.expect("send");
    events
        .send(SpeechEvent::Error(SpeechError::Network("offline".into())))
        .await
        .expect("send");

    eventually(|| h.capture.phase() == CapturePhase::Stopped, "capture stop").await;
    settle().await;

    assert!(notices.try_recv().is_err());
    assert!(h.interpreter.calls().is_empty());
}

#[tokio::test]
async fn permission_denied_mid_session_surfaces_notice() {
    let speech = Arc::new(ScriptedSpeech::default());
    let h = harness(Some(speech.clone()), ScriptedInterpreter::default());
    let mut notices = h.capture.subscribe_notices();

    h.capture.start().await.expect("start");
    speech
        .events()
        .send(SpeechEvent::Error(SpeechError::PermissionDenied))
        .await
        .expect("send");

    eventually(|| h.capture.phase() == CapturePhase::Stopped, "capture stop").await;
    assert_eq!(
        notices.try_recv().expect("notice"),
        SessionNotice::microphone_denied()
    );
}

#[tokio::test]
async fn start_cancels_orbit_and_requests_single_utterance() {
    let speech = Arc::new(ScriptedSpeech::default());
    let h = harness(Some(speech.clone()), ScriptedInterpreter::default());
    h.camera.start_orbit();
    assert!(h.camera.is_orbiting());

    h.capture.start().await.expect("start");

    assert!(!h.camera.is_orbiting());
    assert_eq!(h.capture.phase(), CapturePhase::Listening);
    let starts = speech.starts();
    assert_eq!(starts.len(), 1);
    assert!(!starts[0].continuous);
    assert!(starts[0].interim_results);
    assert_eq!(starts[0].language, "en-US");
}

#[tokio::test]
async fn start_while_listening_is_a_no_op() {
    let speech = Arc::new(ScriptedSpeech::default());
    let h = harness(Some(speech.clone()), ScriptedInterpreter::default());

    h.capture.start().await.expect("first start");
    h.capture.start().await.expect("second start");

    assert_eq!(speech.starts().len(), 1);
}

#[tokio::test]
async fn stop_still_sends_what_was_committed() {
    let speech = Arc::new(ScriptedSpeech::default());
    let h = harness(Some(speech.clone()), ScriptedInterpreter::default());
    let mut updates = h.capture.subscribe();

    h.capture.start().await.expect("start");
    let events = speech.events();
    events.send(final_text(0, "show me Rome")).await.expect("send");
    eventually(|| !h.capture.committed_transcript().is_empty(), "commit").await;

    h.capture.stop().await;
    assert_eq!(h.capture.phase(), CapturePhase::Stopped);
    assert_eq!(speech.stops(), 1);

    events.send(SpeechEvent::End).await.expect("send");
    eventually(|| !h.interpreter.calls().is_empty(), "voice submission").await;

    let mut seen = Vec::new();
    while let Ok(update) = updates.try_recv() {
        seen.push(update);
    }
    assert_eq!(
        seen,
        vec![
            CaptureUpdate::Phase(CapturePhase::Listening),
            CaptureUpdate::Transcript {
                text: "show me Rome".into(),
                committed: true,
            },
            CaptureUpdate::Phase(CapturePhase::Stopped),
        ]
    );
    eventually(
        || h.controller.state() == ConversationState::Idle,
        "controller idle",
    )
    .await;
}
