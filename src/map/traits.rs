use std::time::Duration;

use async_trait::async_trait;

use crate::error::RequestError;
use crate::map::types::{CameraPose, EntityId, LatLng, LatLngAltitude, MarkerSpec, PolylineSpec};
use crate::map::types::{Route, TravelMode};

/// Rendering surface of the 3D map engine.
///
/// Camera writes are requests: the engine owns in-flight interpolation and may
/// override an earlier `fly_camera_to` with a later one.
pub trait MapSurface: Send + Sync {
    fn camera(&self) -> CameraPose;

    fn set_center(&self, center: LatLngAltitude);

    fn fly_camera_to(&self, target: CameraPose, duration: Duration);

    fn add_marker(&self, marker: MarkerSpec) -> EntityId;

    fn add_polyline(&self, polyline: PolylineSpec) -> EntityId;

    fn remove_entity(&self, entity: EntityId);
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolves an address to its first matching coordinate.
    async fn geocode(&self, address: &str) -> Result<LatLng, RequestError>;
}

#[async_trait]
pub trait RouteService: Send + Sync {
    async fn route(
        &self,
        origin: &str,
        destination: &str,
        mode: TravelMode,
    ) -> Result<Route, RequestError>;
}
