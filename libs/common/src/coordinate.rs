//! Geographic coordinate and path types

use serde::{Deserialize, Serialize};

use crate::error::CoordinateError;

/// A (latitude, longitude) pair in decimal degrees.
///
/// Serialized as a two-element array `[lat, lon]`. No range check is applied;
/// callers are expected to pass real geographic values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

/// Ordered route shape. Consecutive points form the segments.
pub type Path = Vec<Coordinate>;

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Build a coordinate from two raw text components.
    ///
    /// Surrounding whitespace is ignored. Non-numeric and non-finite values
    /// are rejected.
    pub fn parse(lat: &str, lon: &str) -> Result<Self, CoordinateError> {
        Ok(Self {
            lat: parse_component("lat", lat)?,
            lon: parse_component("lon", lon)?,
        })
    }
}

fn parse_component(field: &'static str, raw: &str) -> Result<f64, CoordinateError> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| CoordinateError::NotANumber {
            field,
            value: raw.to_string(),
        })?;
    finite(field, value)
}

fn finite(field: &'static str, value: f64) -> Result<f64, CoordinateError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CoordinateError::NotFinite { field })
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from([lat, lon]: [f64; 2]) -> Self {
        Self { lat, lon }
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(c: Coordinate) -> Self {
        [c.lat, c.lon]
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self { lat, lon }
    }
}
