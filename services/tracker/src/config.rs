//! Service configuration

use anyhow::{Context, Result};
use common::DEFAULT_DEVIATION_THRESHOLD_METERS;

/// Tracker service configuration
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Port the HTTP server listens on
    pub port: u16,
    /// Distance from the route beyond which a user is deviating
    pub deviation_threshold_meters: f64,
    /// Radius used by the nearby-users query
    pub nearby_radius_meters: f64,
}

impl TrackerConfig {
    /// Create a new TrackerConfig from environment variables
    ///
    /// # Environment Variables
    /// - `PORT`: HTTP port (default: 8080)
    /// - `DEVIATION_THRESHOLD_METERS`: deviation threshold (default: 50)
    /// - `NEARBY_RADIUS_METERS`: nearby-users radius (default: 1000)
    pub fn from_env() -> Result<Self> {
        Ok(TrackerConfig {
            port: env_or("PORT", 8080)?,
            deviation_threshold_meters: env_or(
                "DEVIATION_THRESHOLD_METERS",
                DEFAULT_DEVIATION_THRESHOLD_METERS,
            )?,
            nearby_radius_meters: env_or("NEARBY_RADIUS_METERS", 1000.0)?,
        })
    }
}

/// Mapping service configuration
#[derive(Debug, Clone)]
pub struct MapsConfig {
    /// API key for the mapping service
    pub api_key: String,
    /// Base URL of the mapping API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl MapsConfig {
    /// Create a new MapsConfig from environment variables
    ///
    /// # Environment Variables
    /// - `GMAPS_KEY`: API key (required)
    /// - `GMAPS_BASE_URL`: API base URL (default: "https://maps.googleapis.com/maps/api")
    /// - `GMAPS_TIMEOUT_SECS`: request timeout (default: 10)
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GMAPS_KEY")
            .map_err(|_| anyhow::anyhow!("GMAPS_KEY environment variable not set"))?;

        let base_url = std::env::var("GMAPS_BASE_URL")
            .unwrap_or_else(|_| "https://maps.googleapis.com/maps/api".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(MapsConfig {
            api_key,
            base_url,
            timeout_secs: env_or("GMAPS_TIMEOUT_SECS", 10)?,
        })
    }
}

fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", name, raw)),
        Err(_) => Ok(default),
    }
}
