//! In-memory user registry
//!
//! Holds every tracked user behind its own mutex so that the read-modify-write
//! of a position update is serialized per user while different users proceed
//! in parallel. The map lock is only taken for writing when a user is added.

use std::collections::HashMap;
use std::sync::Arc;

use common::{Coordinate, Path};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::{TrackerError, TrackerResult};
use crate::models::User;

type UserHandle = Arc<Mutex<User>>;

/// Registry of tracked users keyed by username
#[derive(Debug, Clone)]
pub struct UserRegistry {
    users: Arc<RwLock<HashMap<String, UserHandle>>>,
    threshold_meters: f64,
}

impl UserRegistry {
    /// Create a registry seeded with previously persisted users, using
    /// `threshold_meters` for deviation checks
    pub fn with_users(threshold_meters: f64, users: Vec<User>) -> Self {
        let users = users
            .into_iter()
            .map(|user| (user.username.clone(), Arc::new(Mutex::new(user))))
            .collect();

        Self {
            users: Arc::new(RwLock::new(users)),
            threshold_meters,
        }
    }

    async fn handle(&self, username: &str) -> TrackerResult<UserHandle> {
        self.users
            .read()
            .await
            .get(username)
            .cloned()
            .ok_or_else(|| TrackerError::NotFound(format!("user {}", username)))
    }

    /// Add a new user. Fails if the username is taken.
    pub async fn register(&self, username: &str, password_hash: String) -> TrackerResult<User> {
        let mut users = self.users.write().await;
        if users.contains_key(username) {
            return Err(TrackerError::AlreadyExists(username.to_string()));
        }

        let user = User::new(username, password_hash);
        users.insert(username.to_string(), Arc::new(Mutex::new(user.clone())));
        info!("Registered user: {}", username);

        Ok(user)
    }

    pub async fn contains(&self, username: &str) -> bool {
        self.users.read().await.contains_key(username)
    }

    /// Snapshot of a single user
    pub async fn get(&self, username: &str) -> TrackerResult<User> {
        let handle = self.handle(username).await?;
        let user = handle.lock().await;
        Ok(user.clone())
    }

    /// Record a live position; returns the recomputed alert flag
    pub async fn update_position(
        &self,
        username: &str,
        position: Coordinate,
    ) -> TrackerResult<bool> {
        let handle = self.handle(username).await?;
        let mut user = handle.lock().await;
        let alert = user.update_position(position, self.threshold_meters);
        debug!(
            "Position update for {}: ({}, {}) alert={}",
            username, position.lat, position.lon, alert
        );
        Ok(alert)
    }

    /// Replace a user's route without touching the journey or alert flags
    pub async fn update_route(&self, username: &str, route: Path) -> TrackerResult<()> {
        let handle = self.handle(username).await?;
        handle.lock().await.update_route(route);
        Ok(())
    }

    /// Install a route and mark the user's journey active
    pub async fn start_journey(&self, username: &str, route: Path) -> TrackerResult<()> {
        let handle = self.handle(username).await?;
        let points = route.len();
        handle.lock().await.start_journey(route);
        info!("Started journey for {} ({} route points)", username, points);
        Ok(())
    }

    /// Copy of every user, ordered by username
    pub async fn snapshot(&self) -> Vec<User> {
        let handles: Vec<UserHandle> = self.users.read().await.values().cloned().collect();

        let mut users = Vec::with_capacity(handles.len());
        for handle in handles {
            users.push(handle.lock().await.clone());
        }
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users
    }

    /// Users whose current position is strictly within `radius_meters` of `point`
    pub async fn nearby(&self, point: Coordinate, radius_meters: f64) -> Vec<User> {
        self.snapshot()
            .await
            .into_iter()
            .filter(|user| user.distance_to(point) < radius_meters)
            .collect()
    }
}
