//! Route deviation detection

use tracing::trace;

use crate::coordinate::Coordinate;
use crate::geodesic::point_to_segment_distance;

/// Distance from the route beyond which a position counts as deviating.
pub const DEFAULT_DEVIATION_THRESHOLD_METERS: f64 = 50.0;

/// Whether `position` is farther than `threshold_meters` from every segment of
/// `route`.
///
/// Stops at the first segment within the threshold. A route with fewer than
/// two points has no segment to be near, so it always reports `true`.
pub fn is_deviating(route: &[Coordinate], position: Coordinate, threshold_meters: f64) -> bool {
    for (index, segment) in route.windows(2).enumerate() {
        let distance = point_to_segment_distance(position, segment[0], segment[1]);
        if distance <= threshold_meters {
            trace!(segment = index, distance, "position is on route");
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon)
    }

    #[test]
    fn empty_and_single_point_routes_always_deviate() {
        assert!(is_deviating(&[], pt(0.0, 0.0), DEFAULT_DEVIATION_THRESHOLD_METERS));
        assert!(is_deviating(
            &[pt(0.0, 0.0)],
            pt(0.0, 0.0),
            DEFAULT_DEVIATION_THRESHOLD_METERS
        ));
    }

    #[test]
    fn position_on_segment_is_on_route() {
        let route = [pt(0.0, 0.0), pt(0.0, 1.0)];
        assert!(!is_deviating(
            &route,
            pt(0.0, 0.5),
            DEFAULT_DEVIATION_THRESHOLD_METERS
        ));
    }

    #[test]
    fn position_far_from_segment_deviates() {
        let route = [pt(0.0, 0.0), pt(0.0, 1.0)];
        assert!(is_deviating(
            &route,
            pt(1.0, 0.5),
            DEFAULT_DEVIATION_THRESHOLD_METERS
        ));
    }

    #[test]
    fn threshold_is_inclusive_and_configurable() {
        let route = [pt(0.0, 0.0), pt(0.0, 1.0)];
        // Roughly 33 m north of the segment.
        let near = pt(0.0003, 0.5);
        assert!(!is_deviating(&route, near, 50.0));
        assert!(is_deviating(&route, near, 10.0));
        assert!(!is_deviating(&route, pt(0.0, 0.5), 0.0));
    }

    #[test]
    fn any_close_segment_is_enough() {
        let route = [pt(0.0, 0.0), pt(0.0, 1.0), pt(1.0, 1.0)];
        assert!(!is_deviating(&route, pt(0.5, 1.0), 50.0));
    }
}
