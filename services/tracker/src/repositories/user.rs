//! User repository for database operations
//!
//! Persists the whole user table in one go: `load_all` at startup and
//! `save_all` when the registry is flushed. Routes are stored as JSON text of
//! `[lat, lon]` pairs and read back through a typed parser.

use chrono::{DateTime, NaiveDateTime, Utc};
use common::{
    Coordinate, Path,
    error::{DatabaseError, DatabaseResult},
};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;

use crate::models::User;

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the users table if it does not exist yet
    pub async fn ensure_schema(&self) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tracked_users (
                username TEXT PRIMARY KEY,
                password_hash TEXT NOT NULL,
                lat DOUBLE PRECISION NOT NULL,
                lon DOUBLE PRECISION NOT NULL,
                last_lat DOUBLE PRECISION NOT NULL,
                last_lon DOUBLE PRECISION NOT NULL,
                last_update TEXT NOT NULL,
                alert BOOLEAN NOT NULL,
                route TEXT NOT NULL,
                journey_active BOOLEAN NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(())
    }

    /// Load every stored user
    pub async fn load_all(&self) -> DatabaseResult<Vec<User>> {
        let rows = sqlx::query(
            r#"
            SELECT username, password_hash, lat, lon, last_lat, last_lon,
                   last_update, alert, route, journey_active
            FROM tracked_users
            ORDER BY username
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        let users = rows
            .iter()
            .map(user_from_row)
            .collect::<DatabaseResult<Vec<_>>>()?;

        info!("Loaded {} users from the database", users.len());
        Ok(users)
    }

    /// Upsert every given user in a single transaction
    pub async fn save_all(&self, users: &[User]) -> DatabaseResult<()> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::Query)?;

        for user in users {
            sqlx::query(
                r#"
                INSERT INTO tracked_users (username, password_hash, lat, lon, last_lat, last_lon,
                                           last_update, alert, route, journey_active)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (username) DO UPDATE SET
                    password_hash = EXCLUDED.password_hash,
                    lat = EXCLUDED.lat,
                    lon = EXCLUDED.lon,
                    last_lat = EXCLUDED.last_lat,
                    last_lon = EXCLUDED.last_lon,
                    last_update = EXCLUDED.last_update,
                    alert = EXCLUDED.alert,
                    route = EXCLUDED.route,
                    journey_active = EXCLUDED.journey_active
                "#,
            )
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.position.lat)
            .bind(user.position.lon)
            .bind(user.previous_position.lat)
            .bind(user.previous_position.lon)
            .bind(user.last_update.to_rfc3339())
            .bind(user.alert)
            .bind(encode_route(&user.route)?)
            .bind(user.journey_active)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::Query)?;
        }

        tx.commit().await.map_err(DatabaseError::Query)?;
        info!("Saved {} users to the database", users.len());
        Ok(())
    }
}

fn user_from_row(row: &PgRow) -> DatabaseResult<User> {
    let username: String = row.try_get("username").map_err(DatabaseError::Query)?;
    let get_f64 = |column: &str| -> DatabaseResult<f64> {
        row.try_get::<f64, _>(column).map_err(DatabaseError::Query)
    };

    let last_update: String = row.try_get("last_update").map_err(DatabaseError::Query)?;
    let route: String = row.try_get("route").map_err(DatabaseError::Query)?;

    Ok(User {
        password_hash: row.try_get("password_hash").map_err(DatabaseError::Query)?,
        position: Coordinate::new(get_f64("lat")?, get_f64("lon")?),
        previous_position: Coordinate::new(get_f64("last_lat")?, get_f64("last_lon")?),
        last_update: parse_timestamp(&last_update)
            .map_err(|e| DatabaseError::Row(format!("user {}: {}", username, e)))?,
        alert: row.try_get("alert").map_err(DatabaseError::Query)?,
        route: decode_route(&route)
            .map_err(|e| DatabaseError::Row(format!("user {}: {}", username, e)))?,
        journey_active: row.try_get("journey_active").map_err(DatabaseError::Query)?,
        username,
    })
}

/// Serialize a route as JSON `[[lat, lon], ...]`
pub fn encode_route(route: &[Coordinate]) -> DatabaseResult<String> {
    serde_json::to_string(route)
        .map_err(|e| DatabaseError::Row(format!("route is not serializable: {}", e)))
}

/// Parse a stored route; anything other than an array of numeric pairs is rejected
pub fn decode_route(text: &str) -> DatabaseResult<Path> {
    serde_json::from_str::<Path>(text)
        .map_err(|e| DatabaseError::Row(format!("stored route is invalid: {}", e)))
}

/// Parse an ISO-8601 timestamp, treating a missing offset as UTC
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| format!("invalid timestamp {:?}: {}", text, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn route_text_is_json_pairs() {
        let route = vec![Coordinate::new(38.5, -120.2), Coordinate::new(40.7, -120.95)];
        let text = encode_route(&route).unwrap();
        assert_eq!(text, "[[38.5,-120.2],[40.7,-120.95]]");
        assert_eq!(decode_route(&text).unwrap(), route);
        assert_eq!(decode_route("[]").unwrap(), Vec::new());
    }

    #[test]
    fn stored_route_rejects_anything_else() {
        for bad in [
            "[(38.5, -120.2)]",
            "__import__('os').system('true')",
            "[[1.0, 2.0, 3.0]]",
            "[[\"1.0\", 2.0]]",
            "{\"lat\": 1, \"lon\": 2}",
            "",
        ] {
            assert!(
                matches!(decode_route(bad), Err(DatabaseError::Row(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn timestamps_with_and_without_offset() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T12:30:00+00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-01T14:30:00+02:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-01T12:30:00").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2024-03-01T12:30:00.250000").unwrap(),
            expected + chrono::Duration::milliseconds(250)
        );
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn timestamp_round_trips_through_rfc3339() {
        let now = Utc::now();
        assert_eq!(parse_timestamp(&now.to_rfc3339()).unwrap(), now);
    }
}
