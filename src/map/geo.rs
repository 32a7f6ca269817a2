//! Small geodesy helpers used for camera framing.

use crate::map::types::{LatLng, LatLngBounds};

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Wraps a longitude into `[-180, 180)`.
pub fn normalize_longitude(lng: f64) -> f64 {
    let wrapped = (lng + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if wrapped >= 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Great-circle distance between two coordinates (haversine).
pub fn geodesic_distance(from: LatLng, to: LatLng) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_METERS * c
}

pub fn bounds_diagonal(bounds: &LatLngBounds) -> f64 {
    geodesic_distance(bounds.south_west(), bounds.north_east())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_into_half_open_range() {
        assert_eq!(normalize_longitude(0.0), 0.0);
        assert_eq!(normalize_longitude(180.0), -180.0);
        assert_eq!(normalize_longitude(-180.0), -180.0);
        assert!((normalize_longitude(-181.5) - 178.5).abs() < 1e-9);
        assert!((normalize_longitude(540.25) - -179.75).abs() < 1e-9);
        assert!((normalize_longitude(-725.0) - -5.0).abs() < 1e-9);
    }

    #[test]
    fn london_to_paris_is_about_344_km() {
        let london = LatLng::new(51.5074, -0.1278);
        let paris = LatLng::new(48.8566, 2.3522);
        let distance = geodesic_distance(london, paris);
        assert!((distance - 343_500.0).abs() < 2_000.0, "distance {distance}");
    }

    #[test]
    fn degenerate_bounds_have_zero_diagonal() {
        let bounds = LatLngBounds {
            south: 10.0,
            west: 20.0,
            north: 10.0,
            east: 20.0,
        };
        assert_eq!(bounds_diagonal(&bounds), 0.0);
    }
}
