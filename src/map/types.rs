use serde::{Deserialize, Serialize};

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn with_altitude(self, altitude: f64) -> LatLngAltitude {
        LatLngAltitude {
            lat: self.lat,
            lng: self.lng,
            altitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLngAltitude {
    pub lat: f64,
    pub lng: f64,
    pub altitude: f64,
}

impl LatLngAltitude {
    pub const fn new(lat: f64, lng: f64, altitude: f64) -> Self {
        Self { lat, lng, altitude }
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// Camera framing owned by the map engine. The core only reads and writes it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CameraPose {
    pub center: LatLngAltitude,
    pub heading: f64,
    pub tilt: f64,
    pub range: f64,
}

impl CameraPose {
    /// True when every field is within `tolerance` of `other`.
    pub fn approx_eq(&self, other: &CameraPose, tolerance: f64) -> bool {
        let close = |a: f64, b: f64| (a - b).abs() <= tolerance;
        close(self.center.lat, other.center.lat)
            && close(self.center.lng, other.center.lng)
            && close(self.center.altitude, other.center.altitude)
            && close(self.heading, other.heading)
            && close(self.tilt, other.tilt)
            && close(self.range, other.range)
    }
}

/// South-west / north-east bounding region of a route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl LatLngBounds {
    pub fn south_west(&self) -> LatLng {
        LatLng::new(self.south, self.west)
    }

    pub fn north_east(&self) -> LatLng {
        LatLng::new(self.north, self.east)
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    Driving,
}

/// Route returned by the routing capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub overview_path: Vec<LatLng>,
    pub start: LatLng,
    pub end: LatLng,
    pub bounds: LatLngBounds,
}

/// Opaque handle of an overlay appended to the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerTint {
    Default,
    Origin,
    Destination,
}

impl MarkerTint {
    /// Pin colour handed to the renderer, `None` keeps the engine default.
    pub fn color(&self) -> Option<&'static str> {
        match self {
            MarkerTint::Default => None,
            MarkerTint::Origin => Some("#0F9D58"),
            MarkerTint::Destination => Some("#DB4437"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSpec {
    pub position: LatLngAltitude,
    pub label: Option<String>,
    pub tint: MarkerTint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub color: String,
    pub width: f64,
    pub outer_color: String,
    pub outer_width: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: "#4285F4".to_string(),
            width: 10.0,
            outer_color: "#185ABC".to_string(),
            outer_width: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolylineSpec {
    pub path: Vec<LatLngAltitude>,
    pub stroke: StrokeStyle,
}
