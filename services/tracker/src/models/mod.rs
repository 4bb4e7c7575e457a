//! Tracker models and request payloads

use std::borrow::Cow;

use common::{Coordinate, Path, error::CoordinateError, polyline};
use serde::{Deserialize, Serialize};

use crate::error::TrackerResult;

pub mod user;

pub use user::{User, UserResponse};

/// Request for user registration and login
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

/// Response carrying only a username
#[derive(Debug, Serialize)]
pub struct UsernameResponse {
    pub username: String,
}

/// A coordinate component as sent by clients: either a JSON number or text
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CoordinateComponent {
    Number(f64),
    Text(String),
}

impl CoordinateComponent {
    fn as_text(&self) -> Cow<'_, str> {
        match self {
            CoordinateComponent::Number(n) => Cow::Owned(n.to_string()),
            CoordinateComponent::Text(s) => Cow::Borrowed(s),
        }
    }
}

/// Request for a live position update
#[derive(Debug, Deserialize)]
pub struct LocationUpdateRequest {
    pub lat: CoordinateComponent,
    pub lon: CoordinateComponent,
}

impl LocationUpdateRequest {
    /// Normalize both components to numbers
    pub fn coordinate(&self) -> Result<Coordinate, CoordinateError> {
        Coordinate::parse(&self.lat.as_text(), &self.lon.as_text())
    }
}

/// Response for a live position update
#[derive(Debug, Serialize)]
pub struct LocationUpdateResponse {
    pub alert: bool,
}

/// Request replacing a user's route, either encoded or as explicit points
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RouteUpdateRequest {
    Encoded { polyline: String },
    Points { points: Vec<Coordinate> },
}

impl RouteUpdateRequest {
    /// Resolve the request into a route.
    ///
    /// Explicit points must still fit the encoded form so the route can be
    /// served back compactly.
    pub fn into_route(self) -> TrackerResult<Path> {
        match self {
            RouteUpdateRequest::Encoded { polyline: encoded } => Ok(polyline::decode(&encoded)?),
            RouteUpdateRequest::Points { points } => {
                polyline::encode(&points)?;
                Ok(points)
            }
        }
    }
}

/// A user's route in both encoded and explicit form
#[derive(Debug, Serialize)]
pub struct RouteResponse {
    pub username: String,
    pub polyline: String,
    pub points: Path,
}

/// Request starting a journey between two place identifiers
#[derive(Debug, Deserialize)]
pub struct StartJourneyRequest {
    pub origin: String,
    pub destination: String,
}

/// Query for candidate routes
#[derive(Debug, Deserialize)]
pub struct RoutesQuery {
    pub p1: String,
    pub p2: String,
}

/// Query for place search; `q` is accepted as a short alias
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub q: Option<String>,
}

impl SearchQuery {
    pub fn text(&self) -> Option<&str> {
        self.query
            .as_deref()
            .or(self.q.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

/// Query for a driving distance between two raw positions
#[derive(Debug, Deserialize)]
pub struct DistanceQuery {
    pub lat1: String,
    pub lon1: String,
    pub lat2: String,
    pub lon2: String,
}

/// Query for users around a raw position
#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub lat: String,
    pub lon: String,
}
