//! Distances on a spherical Earth

use crate::coordinate::Coordinate;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine great-circle distance between two points, in meters.
///
/// Not reliable for antipodal points.
pub fn great_circle_distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Distance in meters from `point` to the segment `start`..`end`.
///
/// The nearest point is found by projecting in degree space as if latitude
/// and longitude were planar axes; only the final distance is geodesic. This
/// is good enough for the short segments of a road route and degrades for
/// segments spanning large longitude ranges or close to the poles.
pub fn point_to_segment_distance(point: Coordinate, start: Coordinate, end: Coordinate) -> f64 {
    let d_lat = end.lat - start.lat;
    let d_lon = end.lon - start.lon;

    if d_lat == 0.0 && d_lon == 0.0 {
        return great_circle_distance(point, start);
    }

    let t = ((point.lat - start.lat) * d_lat + (point.lon - start.lon) * d_lon)
        / (d_lat * d_lat + d_lon * d_lon);
    let t = t.clamp(0.0, 1.0);

    let nearest = Coordinate::new(start.lat + t * d_lat, start.lon + t * d_lon);
    great_circle_distance(point, nearest)
}
