//! Realizes interpreted commands as camera moves and map overlays.

mod command;
mod scene;

pub use command::{CommandResult, MapIntent};
pub use scene::{marker_label, SceneEntities};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{debug, info};

use crate::camera::CameraAnimator;
use crate::config::DispatchConfig;
use crate::error::RequestError;
use crate::map::geo::bounds_diagonal;
use crate::map::{
    CameraPose, Geocoder, LatLng, LatLngBounds, MapSurface, MarkerSpec, MarkerTint,
    PolylineSpec, RouteService, TravelMode,
};
use crate::telemetry::events::record_dispatch;
use crate::util::lock;

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Location {
        query: String,
        position: LatLng,
    },
    Directions {
        origin: String,
        destination: String,
        range: f64,
    },
    /// Nothing actionable in the command.
    Ignored,
    /// The geocoder or router reported failure; the scene stays empty.
    Failed(RequestError),
    /// A newer dispatch cleared the scene while this one was waiting.
    Superseded,
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Location { .. } => "location_shown",
            DispatchOutcome::Directions { .. } => "route_shown",
            DispatchOutcome::Ignored => "ignored",
            DispatchOutcome::Failed(_) => "failed",
            DispatchOutcome::Superseded => "superseded",
        }
    }
}

/// Camera range that frames a route's bounding region.
pub fn route_framing_range(bounds: &LatLngBounds, scale: f64, min_range: f64) -> f64 {
    (bounds_diagonal(bounds) * scale).max(min_range)
}

#[derive(Clone)]
pub struct MapActionDispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    surface: Arc<dyn MapSurface>,
    geocoder: Arc<dyn Geocoder>,
    router: Arc<dyn RouteService>,
    camera: CameraAnimator,
    config: DispatchConfig,
    scene: Mutex<SceneEntities>,
    generation: AtomicU64,
}

impl std::fmt::Debug for MapActionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapActionDispatcher")
            .field("config", &self.inner.config)
            .field("scene", &self.scene())
            .finish_non_exhaustive()
    }
}

impl MapActionDispatcher {
    pub fn new(
        camera: CameraAnimator,
        geocoder: Arc<dyn Geocoder>,
        router: Arc<dyn RouteService>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                surface: camera.surface(),
                geocoder,
                router,
                camera,
                config,
                scene: Mutex::new(SceneEntities::default()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn scene(&self) -> SceneEntities {
        lock(&self.inner.scene).clone()
    }

    /// Entry point handed to the interpreter. Never fails; failures leave
    /// the scene empty and are only reported through the outcome.
    pub async fn handle_map_query(&self, command: CommandResult) -> DispatchOutcome {
        let started = Instant::now();
        let (kind, outcome) = match command.intent() {
            MapIntent::Location(query) => ("location", self.show_location(&query).await),
            MapIntent::Directions {
                origin,
                destination,
            } => (
                "directions",
                self.show_directions(&origin, &destination).await,
            ),
            MapIntent::None => {
                debug!(target: "map_dispatch", ?command, "command carries no map action");
                ("none", DispatchOutcome::Ignored)
            }
        };

        record_dispatch(kind, outcome.as_str(), started.elapsed());
        outcome
    }

    /// Stops the orbit and removes every overlay of the current scene.
    pub fn clear_scene(&self) {
        self.begin_scene();
    }

    fn begin_scene(&self) -> u64 {
        self.inner.camera.stop_orbit();

        let mut scene = lock(&self.inner.scene);
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let removed = scene.clear(self.inner.surface.as_ref());
        debug!(target: "map_dispatch", generation, removed, "scene cleared");
        generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == generation
    }

    fn failure(&self, generation: u64, error: RequestError) -> DispatchOutcome {
        if self.is_current(generation) {
            DispatchOutcome::Failed(error)
        } else {
            DispatchOutcome::Superseded
        }
    }

    async fn show_location(&self, query: &str) -> DispatchOutcome {
        let generation = self.begin_scene();
        let config = &self.inner.config;

        let position = match self.inner.geocoder.geocode(query).await {
            Ok(position) => position,
            Err(err) => {
                info!(target: "map_dispatch", query, %err, "geocoding failed");
                return self.failure(generation, err);
            }
        };

        let mut scene = lock(&self.inner.scene);
        if !self.is_current(generation) {
            debug!(target: "map_dispatch", query, "discarding stale geocode result");
            return DispatchOutcome::Superseded;
        }

        self.inner.camera.fly_to(
            CameraPose {
                center: position.with_altitude(config.location_altitude),
                heading: 0.0,
                tilt: config.location_tilt,
                range: config.location_range,
            },
            config.location_flight,
        );
        scene.marker = Some(self.inner.surface.add_marker(MarkerSpec {
            position: position.with_altitude(0.0),
            label: Some(marker_label(query, config.label_max_chars)),
            tint: MarkerTint::Default,
        }));

        DispatchOutcome::Location {
            query: query.to_string(),
            position,
        }
    }

    async fn show_directions(&self, origin: &str, destination: &str) -> DispatchOutcome {
        let generation = self.begin_scene();
        let config = &self.inner.config;

        let route = match self
            .inner
            .router
            .route(origin, destination, TravelMode::Driving)
            .await
        {
            Ok(route) => route,
            Err(err) => {
                info!(target: "map_dispatch", origin, destination, %err, "routing failed");
                return self.failure(generation, err);
            }
        };

        let mut scene = lock(&self.inner.scene);
        if !self.is_current(generation) {
            debug!(target: "map_dispatch", origin, destination, "discarding stale route");
            return DispatchOutcome::Superseded;
        }

        let path = route
            .overview_path
            .iter()
            .map(|point| point.with_altitude(config.route_altitude_offset))
            .collect();
        scene.polyline = Some(self.inner.surface.add_polyline(PolylineSpec {
            path,
            stroke: config.route_stroke.clone(),
        }));
        scene.origin = Some(self.inner.surface.add_marker(MarkerSpec {
            position: route.start.with_altitude(0.0),
            label: Some(marker_label(origin, config.label_max_chars)),
            tint: MarkerTint::Origin,
        }));
        scene.destination = Some(self.inner.surface.add_marker(MarkerSpec {
            position: route.end.with_altitude(0.0),
            label: Some(marker_label(destination, config.label_max_chars)),
            tint: MarkerTint::Destination,
        }));

        let range = route_framing_range(
            &route.bounds,
            config.route_range_scale,
            config.route_min_range,
        );
        self.inner.camera.fly_to(
            CameraPose {
                center: route.bounds.center().with_altitude(0.0),
                heading: 0.0,
                tilt: config.route_tilt,
                range,
            },
            config.route_flight,
        );

        DispatchOutcome::Directions {
            origin: origin.to_string(),
            destination: destination.to_string(),
            range,
        }
    }
}
