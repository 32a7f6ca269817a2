//! 地图引擎能力接口与几何类型。

pub mod geo;
pub mod traits;
pub mod types;

pub use traits::{Geocoder, MapSurface, RouteService};
pub use types::{
    CameraPose, EntityId, LatLng, LatLngAltitude, LatLngBounds, MarkerSpec, MarkerTint,
    PolylineSpec, Route, StrokeStyle, TravelMode,
};
