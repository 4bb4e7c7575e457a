//! Application state shared across handlers

use crate::{
    config::TrackerConfig, maps::MapsClient, registry::UserRegistry,
    repositories::UserRepository,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: TrackerConfig,
    pub registry: UserRegistry,
    pub user_repository: UserRepository,
    pub maps: MapsClient,
}
