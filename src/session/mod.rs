//! 地图会话装配：把各能力接口组装成控制器、语音采集、相机与派发器。

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::camera::{CameraAnimator, SpaceViewTransition};
use crate::capture::{CaptureSession, SessionNotice, SpeechCapture};
use crate::config::CommandLayerConfig;
use crate::conversation::{
    CommandInterpreter, ConversationController, InputSource, Role, SubmitOutcome,
};
use crate::dispatch::MapActionDispatcher;
use crate::error::CommandLayerError;
use crate::map::{Geocoder, MapSurface, RouteService};

/// Collects the host capabilities. Every capability except speech capture is
/// mandatory.
#[derive(Default)]
pub struct MapSessionBuilder {
    config: CommandLayerConfig,
    surface: Option<Arc<dyn MapSurface>>,
    geocoder: Option<Arc<dyn Geocoder>>,
    router: Option<Arc<dyn RouteService>>,
    interpreter: Option<Arc<dyn CommandInterpreter>>,
    speech: Option<Arc<dyn SpeechCapture>>,
    runtime: Option<Handle>,
}

impl MapSessionBuilder {
    pub fn config(mut self, config: CommandLayerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn map_surface(mut self, surface: Arc<dyn MapSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    pub fn route_service(mut self, router: Arc<dyn RouteService>) -> Self {
        self.router = Some(router);
        self
    }

    pub fn interpreter(mut self, interpreter: Arc<dyn CommandInterpreter>) -> Self {
        self.interpreter = Some(interpreter);
        self
    }

    pub fn speech_capture(mut self, speech: Arc<dyn SpeechCapture>) -> Self {
        self.speech = Some(speech);
        self
    }

    /// Runtime for camera animation tasks. Defaults to the runtime `build()`
    /// is called from.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<MapSession, CommandLayerError> {
        let surface = self
            .surface
            .ok_or_else(|| CommandLayerError::unavailable("map surface"))?;
        let geocoder = self
            .geocoder
            .ok_or_else(|| CommandLayerError::unavailable("geocoder"))?;
        let router = self
            .router
            .ok_or_else(|| CommandLayerError::unavailable("route service"))?;
        let interpreter = self
            .interpreter
            .ok_or_else(|| CommandLayerError::unavailable("command interpreter"))?;
        let runtime = self
            .runtime
            .or_else(|| Handle::try_current().ok())
            .ok_or_else(|| CommandLayerError::unavailable("tokio runtime"))?;

        let config = self.config;
        let camera =
            CameraAnimator::with_runtime(surface, config.camera.clone(), Some(runtime));
        let dispatcher = MapActionDispatcher::new(
            camera.clone(),
            geocoder,
            router,
            config.dispatch.clone(),
        );
        let controller = ConversationController::new(
            interpreter,
            dispatcher.clone(),
            config.conversation.clone(),
        );
        let capture = CaptureSession::new(
            self.speech,
            camera.clone(),
            controller.clone(),
            config.capture.clone(),
        );

        info!(
            target: "map_session",
            speech = capture.is_supported(),
            "map session assembled"
        );
        Ok(MapSession {
            config,
            camera,
            dispatcher,
            controller,
            capture,
        })
    }
}

/// Entry point for the host: one per rendered map.
///
/// The sync hooks (`on_pointer_down`, `on_wheel`, `toggle_space_view`) may be
/// called from any thread; camera tasks run on the runtime captured at build.
/// The async methods must be awaited on a tokio runtime.
#[derive(Clone, Debug)]
pub struct MapSession {
    config: CommandLayerConfig,
    camera: CameraAnimator,
    dispatcher: MapActionDispatcher,
    controller: ConversationController,
    capture: CaptureSession,
}

impl MapSession {
    pub fn builder() -> MapSessionBuilder {
        MapSessionBuilder::default()
    }

    pub fn config(&self) -> &CommandLayerConfig {
        &self.config
    }

    pub fn controller(&self) -> &ConversationController {
        &self.controller
    }

    pub fn capture(&self) -> &CaptureSession {
        &self.capture
    }

    pub fn camera(&self) -> &CameraAnimator {
        &self.camera
    }

    pub fn dispatcher(&self) -> &MapActionDispatcher {
        &self.dispatcher
    }

    /// Text typed into the input box.
    pub async fn submit_typed(&self, text: &str) -> SubmitOutcome {
        self.controller
            .submit_from(text, Role::User, InputSource::Typed)
            .await
    }

    pub fn on_pointer_down(&self) {
        if self.camera.stop_orbit() {
            debug!(target: "map_session", "orbit stopped by pointer");
        }
    }

    pub fn on_wheel(&self) {
        if self.camera.stop_orbit() {
            debug!(target: "map_session", "orbit stopped by wheel");
        }
    }

    pub fn toggle_space_view(&self) -> SpaceViewTransition {
        self.camera.toggle_space_view()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.capture.subscribe_notices()
    }
}
