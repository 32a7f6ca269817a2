//! Shared fakes for the capability traits.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};
use tokio::time::sleep;

use crate::capture::{SpeechCapture, SpeechEvent, SpeechOptions};
use crate::conversation::{CommandInterpreter, ConversationState, Role, TurnContext};
use crate::dispatch::CommandResult;
use crate::error::{RequestError, SpeechError};
use crate::map::{
    CameraPose, EntityId, Geocoder, LatLng, LatLngAltitude, LatLngBounds, MapSurface, MarkerSpec,
    PolylineSpec, Route, RouteService, TravelMode,
};

pub(crate) fn pose(lat: f64, lng: f64, altitude: f64, range: f64) -> CameraPose {
    CameraPose {
        center: LatLngAltitude::new(lat, lng, altitude),
        heading: 0.0,
        tilt: 0.0,
        range,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RecordedEntity {
    Marker(MarkerSpec),
    Polyline(PolylineSpec),
}

#[derive(Default)]
struct MapState {
    pose: CameraPose,
    entities: BTreeMap<EntityId, RecordedEntity>,
    flights: Vec<(CameraPose, Duration)>,
    center_writes: usize,
    next_id: u64,
}

/// Map surface whose flights land immediately.
pub(crate) struct RecordingMap {
    state: Mutex<MapState>,
}

impl RecordingMap {
    pub(crate) fn new(initial: CameraPose) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MapState {
                pose: initial,
                ..MapState::default()
            }),
        })
    }

    pub(crate) fn pose(&self) -> CameraPose {
        self.state.lock().expect("map lock poisoned").pose
    }

    pub(crate) fn set_pose(&self, pose: CameraPose) {
        self.state.lock().expect("map lock poisoned").pose = pose;
    }

    pub(crate) fn flights(&self) -> Vec<(CameraPose, Duration)> {
        self.state.lock().expect("map lock poisoned").flights.clone()
    }

    pub(crate) fn center_writes(&self) -> usize {
        self.state.lock().expect("map lock poisoned").center_writes
    }

    pub(crate) fn markers(&self) -> Vec<MarkerSpec> {
        self.state
            .lock()
            .expect("map lock poisoned")
            .entities
            .values()
            .filter_map(|entity| match entity {
                RecordedEntity::Marker(marker) => Some(marker.clone()),
                RecordedEntity::Polyline(_) => None,
            })
            .collect()
    }

    pub(crate) fn polylines(&self) -> Vec<PolylineSpec> {
        self.state
            .lock()
            .expect("map lock poisoned")
            .entities
            .values()
            .filter_map(|entity| match entity {
                RecordedEntity::Polyline(polyline) => Some(polyline.clone()),
                RecordedEntity::Marker(_) => None,
            })
            .collect()
    }

    pub(crate) fn entity_count(&self) -> usize {
        self.state.lock().expect("map lock poisoned").entities.len()
    }

    fn insert(&self, entity: RecordedEntity) -> EntityId {
        let mut state = self.state.lock().expect("map lock poisoned");
        state.next_id += 1;
        let id = EntityId(state.next_id);
        state.entities.insert(id, entity);
        id
    }
}

impl MapSurface for RecordingMap {
    fn camera(&self) -> CameraPose {
        self.pose()
    }

    fn set_center(&self, center: LatLngAltitude) {
        let mut state = self.state.lock().expect("map lock poisoned");
        state.pose.center = center;
        state.center_writes += 1;
    }

    fn fly_camera_to(&self, target: CameraPose, duration: Duration) {
        let mut state = self.state.lock().expect("map lock poisoned");
        state.flights.push((target, duration));
        state.pose = target;
    }

    fn add_marker(&self, marker: MarkerSpec) -> EntityId {
        self.insert(RecordedEntity::Marker(marker))
    }

    fn add_polyline(&self, polyline: PolylineSpec) -> EntityId {
        self.insert(RecordedEntity::Polyline(polyline))
    }

    fn remove_entity(&self, entity: EntityId) {
        self.state
            .lock()
            .expect("map lock poisoned")
            .entities
            .remove(&entity);
    }
}

#[derive(Default)]
pub(crate) struct ProgrammedGeocoder {
    places: HashMap<String, LatLng>,
    delays: HashMap<String, Duration>,
}

impl ProgrammedGeocoder {
    pub(crate) fn with_place(mut self, address: &str, position: LatLng) -> Self {
        self.places.insert(address.to_string(), position);
        self
    }

    pub(crate) fn with_delay(mut self, address: &str, delay: Duration) -> Self {
        self.delays.insert(address.to_string(), delay);
        self
    }
}

#[async_trait]
impl Geocoder for ProgrammedGeocoder {
    async fn geocode(&self, address: &str) -> Result<LatLng, RequestError> {
        if let Some(delay) = self.delays.get(address) {
            sleep(*delay).await;
        }
        self.places
            .get(address)
            .copied()
            .ok_or(RequestError::NotFound)
    }
}

pub(crate) struct ProgrammedRouter {
    result: Result<Route, RequestError>,
    gate: Option<Arc<Notify>>,
    calls: Mutex<Vec<(String, String, TravelMode)>>,
}

impl ProgrammedRouter {
    pub(crate) fn returning(route: Route) -> Self {
        Self {
            result: Ok(route),
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(error: RequestError) -> Self {
        Self {
            result: Err(error),
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn calls(&self) -> Vec<(String, String, TravelMode)> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }
}

#[async_trait]
impl RouteService for ProgrammedRouter {
    async fn route(
        &self,
        origin: &str,
        destination: &str,
        mode: TravelMode,
    ) -> Result<Route, RequestError> {
        self.calls.lock().expect("calls lock poisoned").push((
            origin.to_string(),
            destination.to_string(),
            mode,
        ));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.result.clone()
    }
}

pub(crate) fn london_paris_route() -> Route {
    let london = LatLng::new(51.5074, -0.1278);
    let paris = LatLng::new(48.8566, 2.3522);
    Route {
        overview_path: vec![london, LatLng::new(50.9513, 1.8587), paris],
        start: london,
        end: paris,
        bounds: LatLngBounds {
            south: 48.8566,
            west: -0.1278,
            north: 51.5074,
            east: 2.3522,
        },
    }
}

/// Speech engine driven by the test through the returned event sender.
#[derive(Default)]
pub(crate) struct ScriptedSpeech {
    start_error: Mutex<Option<SpeechError>>,
    sender: Mutex<Option<mpsc::Sender<SpeechEvent>>>,
    starts: Mutex<Vec<SpeechOptions>>,
    stops: Mutex<usize>,
}

impl ScriptedSpeech {
    pub(crate) fn failing_start(error: SpeechError) -> Self {
        Self {
            start_error: Mutex::new(Some(error)),
            ..Self::default()
        }
    }

    pub(crate) fn events(&self) -> mpsc::Sender<SpeechEvent> {
        self.sender
            .lock()
            .expect("sender lock poisoned")
            .clone()
            .expect("speech session not started")
    }

    pub(crate) fn starts(&self) -> Vec<SpeechOptions> {
        self.starts.lock().expect("starts lock poisoned").clone()
    }

    pub(crate) fn stops(&self) -> usize {
        *self.stops.lock().expect("stops lock poisoned")
    }
}

#[async_trait]
impl SpeechCapture for ScriptedSpeech {
    async fn start(
        &self,
        options: SpeechOptions,
    ) -> Result<mpsc::Receiver<SpeechEvent>, SpeechError> {
        if let Some(error) = self.start_error.lock().expect("error lock poisoned").clone() {
            return Err(error);
        }
        self.starts
            .lock()
            .expect("starts lock poisoned")
            .push(options);
        let (tx, rx) = mpsc::channel(16);
        *self.sender.lock().expect("sender lock poisoned") = Some(tx);
        Ok(rx)
    }

    async fn stop(&self) {
        *self.stops.lock().expect("stops lock poisoned") += 1;
    }
}

#[derive(Debug, Clone)]
pub(crate) enum ScriptStep {
    Reply(String),
    Reason(String, String),
    Dispatch(CommandResult),
    Fail(String),
}

/// Interpreter that replays a script and can be held in flight by a gate.
#[derive(Default)]
pub(crate) struct ScriptedInterpreter {
    script: Mutex<VecDeque<ScriptStep>>,
    calls: Mutex<Vec<(String, Role)>>,
    gate: Option<Arc<Notify>>,
    observed_states: Mutex<Vec<ConversationState>>,
}

impl ScriptedInterpreter {
    pub(crate) fn with_steps(steps: Vec<ScriptStep>) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            ..Self::default()
        }
    }

    pub(crate) fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn calls(&self) -> Vec<(String, Role)> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    pub(crate) fn observed_states(&self) -> Vec<ConversationState> {
        self.observed_states
            .lock()
            .expect("states lock poisoned")
            .clone()
    }
}

#[async_trait]
impl CommandInterpreter for ScriptedInterpreter {
    async fn interpret(&self, text: &str, role: Role, turn: TurnContext) -> Result<()> {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push((text.to_string(), role));
        self.observed_states
            .lock()
            .expect("states lock poisoned")
            .push(turn.state());

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let step = self.script.lock().expect("script lock poisoned").pop_front();
        match step {
            Some(ScriptStep::Reply(text)) => {
                turn.stream_text(&text);
                Ok(())
            }
            Some(ScriptStep::Reason(trace, text)) => {
                turn.set_state(ConversationState::Thinking);
                turn.stream_reasoning(&trace);
                turn.stream_text(&text);
                Ok(())
            }
            Some(ScriptStep::Dispatch(command)) => {
                turn.dispatch(command).await;
                Ok(())
            }
            Some(ScriptStep::Fail(message)) => Err(anyhow!(message)),
            None => Ok(()),
        }
    }
}
