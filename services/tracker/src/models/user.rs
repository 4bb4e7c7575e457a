//! Tracked user and its journey state machine

use chrono::{DateTime, Utc};
use common::{Coordinate, Path, great_circle_distance, is_deviating};
use serde::Serialize;

/// Where a user stands with respect to their journey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    NoJourney,
    OnRoute,
    Deviating,
}

/// User entity
///
/// `position` and `last_update` only change through [`User::update_position`];
/// `route` and `journey_active` only through [`User::start_journey`] and
/// [`User::update_route`].
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub position: Coordinate,
    /// Position held right before the most recent update
    pub previous_position: Coordinate,
    pub last_update: DateTime<Utc>,
    pub alert: bool,
    pub route: Path,
    pub journey_active: bool,
}

impl User {
    /// A freshly registered user at the origin with no route
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
            position: Coordinate::default(),
            previous_position: Coordinate::default(),
            last_update: Utc::now(),
            alert: false,
            route: Vec::new(),
            journey_active: false,
        }
    }

    /// Record a new live position and recompute the alert flag against the
    /// current route. Returns the new alert flag.
    ///
    /// With no route installed the position is always reported as deviating.
    pub fn update_position(&mut self, position: Coordinate, threshold_meters: f64) -> bool {
        self.previous_position = self.position;
        self.position = position;
        self.alert = is_deviating(&self.route, self.position, threshold_meters);
        self.last_update = Utc::now();
        self.alert
    }

    /// Install a route and mark the journey active. The alert flag is left
    /// alone until the next position update.
    pub fn start_journey(&mut self, route: Path) {
        self.route = route;
        self.journey_active = true;
    }

    pub fn update_route(&mut self, route: Path) {
        self.route = route;
    }

    pub fn tracking_state(&self) -> TrackingState {
        match (self.journey_active, self.alert) {
            (false, _) => TrackingState::NoJourney,
            (true, false) => TrackingState::OnRoute,
            (true, true) => TrackingState::Deviating,
        }
    }

    /// Great-circle distance in meters from the current position
    pub fn distance_to(&self, point: Coordinate) -> f64 {
        great_circle_distance(self.position, point)
    }
}

/// Public view of a user; never carries the credential hash
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub username: String,
    pub position: Coordinate,
    pub previous_position: Coordinate,
    pub last_update: DateTime<Utc>,
    pub alert: bool,
    pub route: Path,
    pub journey_active: bool,
    pub state: TrackingState,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            position: user.position,
            previous_position: user.previous_position,
            last_update: user.last_update,
            alert: user.alert,
            route: user.route.clone(),
            journey_active: user.journey_active,
            state: user.tracking_state(),
        }
    }
}
