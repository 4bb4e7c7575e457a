//! Tracker service routes

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use common::{Coordinate, polyline};
use serde_json::json;
use tracing::{error, info, warn};

use crate::{
    credentials,
    error::{TrackerError, TrackerResult},
    maps::journey_path,
    models::{
        CredentialsRequest, DistanceQuery, LocationUpdateRequest, LocationUpdateResponse,
        NearbyQuery, RouteResponse, RouteUpdateRequest, RoutesQuery, SearchQuery,
        StartJourneyRequest,
        UserResponse, UsernameResponse,
    },
    state::AppState,
    validation,
};

/// Create the router for the tracker service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/routes", get(find_routes))
        .route("/search", get(search_places))
        .route("/distance", get(driving_distance))
        .route("/users", post(register_user).get(get_users))
        .route("/users/login", post(login))
        .route("/users/:username", get(get_user))
        .route("/users/:username/location", post(update_location))
        .route(
            "/users/:username/route",
            get(get_route).put(update_route),
        )
        .route("/users/:username/journey", post(start_journey))
        .route("/nearby", get(nearby_users))
        .route("/commit", post(commit))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "tracker-service"
    }))
}

/// Candidate routes between two places
pub async fn find_routes(
    State(state): State<AppState>,
    Query(query): Query<RoutesQuery>,
) -> TrackerResult<impl IntoResponse> {
    validation::validate_place_id("p1", &query.p1).map_err(TrackerError::MalformedInput)?;
    validation::validate_place_id("p2", &query.p2).map_err(TrackerError::MalformedInput)?;

    let routes = state.maps.find_routes(&query.p1, &query.p2).await?;
    Ok(Json(routes))
}

/// Place text search
pub async fn search_places(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> TrackerResult<impl IntoResponse> {
    let text = query
        .text()
        .ok_or_else(|| TrackerError::MalformedInput("Missing 'query'".to_string()))?;

    let places = state.maps.search_places(text).await?;
    Ok(Json(places))
}

/// Driving distance between two raw positions
pub async fn driving_distance(
    State(state): State<AppState>,
    Query(query): Query<DistanceQuery>,
) -> TrackerResult<impl IntoResponse> {
    let from = Coordinate::parse(&query.lat1, &query.lon1)?;
    let to = Coordinate::parse(&query.lat2, &query.lon2)?;

    let distance = state.maps.driving_distance(from, to).await?;
    Ok(Json(json!({ "distance": distance })))
}

/// Register a new user
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> TrackerResult<impl IntoResponse> {
    validation::validate_username(&payload.username).map_err(TrackerError::MalformedInput)?;
    validation::validate_password(&payload.password).map_err(TrackerError::MalformedInput)?;

    if state.registry.contains(&payload.username).await {
        return Err(TrackerError::AlreadyExists(payload.username));
    }

    let password_hash = credentials::hash_password(&payload.password)?;
    let user = state
        .registry
        .register(&payload.username, password_hash)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UsernameResponse {
            username: user.username,
        }),
    ))
}

/// Check a user's credentials
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> TrackerResult<impl IntoResponse> {
    info!("Login attempt for user: {}", payload.username);

    let user = state.registry.get(&payload.username).await?;
    credentials::verify_password(&user.password_hash, &payload.password).inspect_err(|_| {
        warn!("Rejected credentials for user: {}", payload.username);
    })?;

    Ok(Json(UsernameResponse {
        username: user.username,
    }))
}

/// All users keyed by username
pub async fn get_users(State(state): State<AppState>) -> impl IntoResponse {
    let users: BTreeMap<String, UserResponse> = state
        .registry
        .snapshot()
        .await
        .iter()
        .map(|user| (user.username.clone(), UserResponse::from(user)))
        .collect();

    Json(users)
}

/// A single user
pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> TrackerResult<impl IntoResponse> {
    let user = state.registry.get(&username).await?;
    Ok(Json(UserResponse::from(&user)))
}

/// Record a live position and report whether the user strays from the route
pub async fn update_location(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(payload): Json<LocationUpdateRequest>,
) -> TrackerResult<impl IntoResponse> {
    let position = payload.coordinate()?;
    let alert = state.registry.update_position(&username, position).await?;

    if alert {
        info!(
            "User {} is off route at ({}, {})",
            username, position.lat, position.lon
        );
    }

    Ok(Json(LocationUpdateResponse { alert }))
}

/// A user's route, encoded and as explicit points
pub async fn get_route(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> TrackerResult<impl IntoResponse> {
    let user = state.registry.get(&username).await?;
    let encoded = polyline::encode(&user.route).map_err(|e| {
        error!("Stored route of {} cannot be encoded: {}", username, e);
        TrackerError::Internal
    })?;

    Ok(Json(RouteResponse {
        username: user.username,
        polyline: encoded,
        points: user.route,
    }))
}

/// Replace a user's route
pub async fn update_route(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(payload): Json<RouteUpdateRequest>,
) -> TrackerResult<impl IntoResponse> {
    let route = payload.into_route()?;

    let points = route.len();
    state.registry.update_route(&username, route).await?;

    Ok(Json(json!({
        "username": username,
        "points": points,
    })))
}

/// Start a journey along the first route the mapping service suggests
pub async fn start_journey(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(payload): Json<StartJourneyRequest>,
) -> TrackerResult<impl IntoResponse> {
    validation::validate_place_id("origin", &payload.origin)
        .map_err(TrackerError::MalformedInput)?;
    validation::validate_place_id("destination", &payload.destination)
        .map_err(TrackerError::MalformedInput)?;

    // Fail fast before calling out to the mapping service.
    if !state.registry.contains(&username).await {
        return Err(TrackerError::NotFound(format!("user {}", username)));
    }

    let routes = state
        .maps
        .find_routes(&payload.origin, &payload.destination)
        .await?;
    let route = journey_path(&routes).ok_or_else(|| {
        TrackerError::NotFound(format!(
            "route from {} to {}",
            payload.origin, payload.destination
        ))
    })?;

    state.registry.start_journey(&username, route).await?;

    Ok(Json(UsernameResponse { username }))
}

/// Users around a position
pub async fn nearby_users(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> TrackerResult<impl IntoResponse> {
    let point = Coordinate::parse(&query.lat, &query.lon)?;
    let users: Vec<UserResponse> = state
        .registry
        .nearby(point, state.config.nearby_radius_meters)
        .await
        .iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(users))
}

/// Persist every user
pub async fn commit(State(state): State<AppState>) -> TrackerResult<impl IntoResponse> {
    let users = state.registry.snapshot().await;
    state.user_repository.save_all(&users).await?;

    Ok(Json(json!({ "success": true, "users": users.len() })))
}
