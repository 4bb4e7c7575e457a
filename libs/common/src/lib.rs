//! Common library for the RouteWatch service
//!
//! This crate holds the geometry engine used to follow users along a planned
//! route (polyline decoding, geodesic distances, deviation detection) together
//! with the shared error types and database connectivity.

pub mod coordinate;
pub mod database;
pub mod deviation;
pub mod error;
pub mod geodesic;
pub mod polyline;

pub use coordinate::{Coordinate, Path};
pub use deviation::{DEFAULT_DEVIATION_THRESHOLD_METERS, is_deviating};
pub use geodesic::{great_circle_distance, point_to_segment_distance};

/// Example usage of the geometry modules
///
/// ```rust
/// use common::{Coordinate, is_deviating, polyline};
///
/// let route = polyline::decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
/// assert_eq!(route.len(), 3);
///
/// let far_away = Coordinate::new(0.0, 0.0);
/// assert!(is_deviating(&route, far_away, 50.0));
/// ```
pub fn example_usage() {}
