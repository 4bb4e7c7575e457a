//! Client for the mapping service (directions, place search, distance matrix)
//!
//! Directions steps come back with encoded polylines; they are decoded here so
//! the rest of the service only ever sees [`Path`] fragments.

use std::sync::OnceLock;
use std::time::Duration;

use common::{Coordinate, Path, polyline};
use regex::Regex;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{error, info, warn};

use crate::config::MapsConfig;
use crate::error::{TrackerError, TrackerResult};

/// One candidate route between two places
#[derive(Debug, Clone, Serialize)]
pub struct RouteSummary {
    pub distance: String,
    pub duration: String,
    pub steps: Vec<RouteStep>,
}

/// A single maneuver of a route with its decoded shape
#[derive(Debug, Clone, Serialize)]
pub struct RouteStep {
    pub distance: String,
    pub duration: String,
    pub instruction: String,
    pub start_location: Coordinate,
    pub end_location: Coordinate,
    pub maneuver: String,
    pub polyline: Path,
}

/// A place returned by text search
#[derive(Debug, Clone, Serialize)]
pub struct Place {
    pub name: String,
    pub address: String,
    pub location: Coordinate,
    pub place_id: String,
}

/// Concatenate the step shapes of the first candidate route, in order.
///
/// Returns `None` when there is no candidate.
pub fn journey_path(routes: &[RouteSummary]) -> Option<Path> {
    let first = routes.first()?;
    Some(
        first
            .steps
            .iter()
            .flat_map(|step| step.polyline.iter().copied())
            .collect(),
    )
}

/// Strip markup from a directions instruction
pub fn clean_instruction(html: &str) -> String {
    static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex =
        TAG_REGEX.get_or_init(|| Regex::new(r"<[^>]*>").expect("Failed to compile tag regex"));

    let text = regex.replace_all(html, "");
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Mapping service client
#[derive(Clone)]
pub struct MapsClient {
    http: reqwest::Client,
    config: MapsConfig,
}

impl MapsClient {
    /// Create a new mapping service client
    pub fn new(config: MapsConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        info!("Mapping service client targeting {}", config.base_url);
        Ok(Self { http, config })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> TrackerResult<T> {
        let url = format!("{}/{}/json", self.config.base_url, endpoint);
        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[("key", self.config.api_key.as_str())])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                error!(
                    "Mapping service request to {} failed: {}",
                    endpoint,
                    describe_failure(e)
                );
                TrackerError::Routing(format!("{} request failed", endpoint))
            })?;

        response.json::<T>().await.map_err(|e| {
            error!(
                "Mapping service returned an unreadable {} body: {}",
                endpoint,
                describe_failure(e)
            );
            TrackerError::Routing(format!("{} response could not be read", endpoint))
        })
    }

    /// Candidate routes between two place identifiers
    pub async fn find_routes(
        &self,
        origin: &str,
        destination: &str,
    ) -> TrackerResult<Vec<RouteSummary>> {
        let response: DirectionsResponse = self
            .get_json(
                "directions",
                &[
                    ("origin", format!("place_id:{}", origin)),
                    ("destination", format!("place_id:{}", destination)),
                ],
            )
            .await?;

        let routes = parse_directions(response)?;
        info!(
            "Found {} routes from {} to {}",
            routes.len(),
            origin,
            destination
        );
        Ok(routes)
    }

    /// Places matching a free-text query
    pub async fn search_places(&self, query: &str) -> TrackerResult<Vec<Place>> {
        let response: TextSearchResponse = self
            .get_json("place/textsearch", &[("query", query.to_string())])
            .await?;

        parse_places(response)
    }

    /// Driving distance in meters, or `None` when the service has no answer
    pub async fn driving_distance(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> TrackerResult<Option<f64>> {
        let response: DistanceMatrixResponse = self
            .get_json(
                "distancematrix",
                &[
                    ("origins", format!("{},{}", from.lat, from.lon)),
                    ("destinations", format!("{},{}", to.lat, to.lon)),
                ],
            )
            .await?;

        Ok(parse_distance(response))
    }
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl From<LatLng> for Coordinate {
    fn from(p: LatLng) -> Self {
        Coordinate::new(p.lat, p.lng)
    }
}

#[derive(Debug, Deserialize)]
struct TextValue {
    #[serde(default)]
    text: String,
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct EncodedPolyline {
    points: String,
}

#[derive(Debug, Deserialize)]
struct DirectionsStep {
    distance: TextValue,
    duration: TextValue,
    #[serde(default)]
    html_instructions: String,
    start_location: LatLng,
    end_location: LatLng,
    maneuver: Option<String>,
    polyline: EncodedPolyline,
}

#[derive(Debug, Deserialize)]
struct DirectionsLeg {
    distance: TextValue,
    duration: TextValue,
    #[serde(default)]
    steps: Vec<DirectionsStep>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    #[serde(default)]
    legs: Vec<DirectionsLeg>,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    name: String,
    #[serde(default)]
    formatted_address: String,
    geometry: Geometry,
    place_id: String,
}

#[derive(Debug, Deserialize)]
struct TextSearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<PlaceResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    distance: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

/// Error text without the request URL, which carries the API key.
fn describe_failure(e: reqwest::Error) -> String {
    e.without_url().to_string()
}

fn check_status(endpoint: &str, status: &str, message: Option<String>) -> TrackerResult<()> {
    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        other => {
            let detail = message.unwrap_or_default();
            warn!("{} answered {}: {}", endpoint, other, detail);
            Err(TrackerError::Routing(format!("{} answered {}", endpoint, other)))
        }
    }
}

fn parse_directions(response: DirectionsResponse) -> TrackerResult<Vec<RouteSummary>> {
    check_status("directions", &response.status, response.error_message)?;

    let mut routes = Vec::with_capacity(response.routes.len());
    for route in response.routes {
        // Only single-leg routes are requested, so the first leg is the route.
        let Some(leg) = route.legs.into_iter().next() else {
            continue;
        };

        let steps = leg
            .steps
            .into_iter()
            .map(|step| -> TrackerResult<RouteStep> {
                Ok(RouteStep {
                    distance: step.distance.text,
                    duration: step.duration.text,
                    instruction: clean_instruction(&step.html_instructions),
                    start_location: step.start_location.into(),
                    end_location: step.end_location.into(),
                    maneuver: step.maneuver.unwrap_or_default(),
                    polyline: polyline::decode(&step.polyline.points)?,
                })
            })
            .collect::<TrackerResult<Vec<_>>>()?;

        routes.push(RouteSummary {
            distance: leg.distance.text,
            duration: leg.duration.text,
            steps,
        });
    }

    Ok(routes)
}

fn parse_places(response: TextSearchResponse) -> TrackerResult<Vec<Place>> {
    check_status("place/textsearch", &response.status, response.error_message)?;

    Ok(response
        .results
        .into_iter()
        .map(|place| Place {
            name: place.name,
            address: place.formatted_address,
            location: place.geometry.location.into(),
            place_id: place.place_id,
        })
        .collect())
}

fn parse_distance(response: DistanceMatrixResponse) -> Option<f64> {
    let element = response.rows.into_iter().next()?.elements.into_iter().next()?;
    if element.status != "OK" {
        return None;
    }
    element.distance?.value
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIRECTIONS: &str = r#"{
        "status": "OK",
        "routes": [
            {
                "legs": [{
                    "distance": {"text": "12 km", "value": 12000},
                    "duration": {"text": "15 mins", "value": 900},
                    "steps": [
                        {
                            "distance": {"text": "5 km", "value": 5000},
                            "duration": {"text": "6 mins", "value": 360},
                            "html_instructions": "Head <b>north</b> on <div style=\"x\">Main&nbsp;St</div>",
                            "start_location": {"lat": 38.5, "lng": -120.2},
                            "end_location": {"lat": 40.7, "lng": -120.95},
                            "polyline": {"points": "_p~iF~ps|U_ulLnnqC"}
                        },
                        {
                            "distance": {"text": "7 km", "value": 7000},
                            "duration": {"text": "9 mins", "value": 540},
                            "html_instructions": "Turn <b>left</b>",
                            "start_location": {"lat": 40.7, "lng": -120.95},
                            "end_location": {"lat": 43.252, "lng": -126.453},
                            "maneuver": "turn-left",
                            "polyline": {"points": "_flwFn`faV_mqNvxq`@"}
                        }
                    ]
                }]
            },
            {
                "legs": [{
                    "distance": {"text": "20 km"},
                    "duration": {"text": "30 mins"},
                    "steps": []
                }]
            }
        ]
    }"#;

    fn directions() -> Vec<RouteSummary> {
        let response: DirectionsResponse = serde_json::from_str(DIRECTIONS).unwrap();
        parse_directions(response).unwrap()
    }

    #[test]
    fn parses_directions_and_decodes_steps() {
        let routes = directions();
        assert_eq!(routes.len(), 2);

        let first = &routes[0];
        assert_eq!(first.distance, "12 km");
        assert_eq!(first.steps.len(), 2);
        assert_eq!(first.steps[0].instruction, "Head north on Main St");
        assert_eq!(first.steps[0].maneuver, "");
        assert_eq!(first.steps[1].maneuver, "turn-left");
        assert_eq!(first.steps[0].polyline.len(), 2);
        assert_eq!(first.steps[0].start_location, Coordinate::new(38.5, -120.2));
    }

    #[test]
    fn journey_path_concatenates_first_route_steps() {
        let path = journey_path(&directions()).unwrap();
        let expected = [
            (38.5, -120.2),
            (40.7, -120.95),
            (40.7, -120.95),
            (43.252, -126.453),
        ];
        assert_eq!(path.len(), expected.len());
        for (got, (lat, lon)) in path.iter().zip(expected) {
            assert!((got.lat - lat).abs() < 1e-5);
            assert!((got.lon - lon).abs() < 1e-5);
        }

        assert!(journey_path(&[]).is_none());
    }

    #[test]
    fn bad_step_polyline_is_a_decode_error() {
        let body = DIRECTIONS.replace("_flwFn`faV_mqNvxq`@", "_flwFn`faV_mqN");
        let response: DirectionsResponse = serde_json::from_str(&body).unwrap();
        assert!(matches!(
            parse_directions(response),
            Err(TrackerError::Decode(_))
        ));
    }

    #[test]
    fn error_status_is_a_routing_error() {
        let response: DirectionsResponse = serde_json::from_str(
            r#"{"status": "REQUEST_DENIED", "routes": [], "error_message": "bad key"}"#,
        )
        .unwrap();
        assert!(matches!(
            parse_directions(response),
            Err(TrackerError::Routing(_))
        ));

        let empty: DirectionsResponse =
            serde_json::from_str(r#"{"status": "ZERO_RESULTS", "routes": []}"#).unwrap();
        assert!(parse_directions(empty).unwrap().is_empty());
    }

    #[test]
    fn parses_place_search() {
        let response: TextSearchResponse = serde_json::from_str(
            r#"{
                "status": "OK",
                "results": [{
                    "name": "Ferry Building",
                    "formatted_address": "1 Ferry Building, San Francisco",
                    "geometry": {"location": {"lat": 37.7955, "lng": -122.3937}},
                    "place_id": "ChIJWTGPjmaAhYARxz6l1hOj92w"
                }]
            }"#,
        )
        .unwrap();

        let places = parse_places(response).unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].name, "Ferry Building");
        assert_eq!(places[0].location, Coordinate::new(37.7955, -122.3937));
    }

    #[test]
    fn distance_matrix_value_or_none() {
        let ok: DistanceMatrixResponse = serde_json::from_str(
            r#"{"rows": [{"elements": [{"status": "OK", "distance": {"text": "1.2 km", "value": 1234}}]}]}"#,
        )
        .unwrap();
        assert_eq!(parse_distance(ok), Some(1234.0));

        let missing: DistanceMatrixResponse = serde_json::from_str(
            r#"{"rows": [{"elements": [{"status": "NOT_FOUND"}]}]}"#,
        )
        .unwrap();
        assert_eq!(parse_distance(missing), None);

        let empty: DistanceMatrixResponse = serde_json::from_str(r#"{"rows": []}"#).unwrap();
        assert_eq!(parse_distance(empty), None);
    }

    #[test]
    fn cleans_entities_after_tags() {
        assert_eq!(clean_instruction("A &amp; B <i>x</i>"), "A & B x");
    }

    const SECRET: &str = "SECRET-KEY-123";

    fn unreachable_client() -> MapsClient {
        MapsClient::new(MapsConfig {
            api_key: SECRET.to_string(),
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 2,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn failure_text_omits_api_key() {
        let client = unreachable_client();
        let err = client
            .http
            .get("http://127.0.0.1:1/directions/json")
            .query(&[("key", SECRET)])
            .send()
            .await
            .unwrap_err();
        assert!(err.to_string().contains(SECRET));

        let logged = describe_failure(err);
        assert!(!logged.contains(SECRET), "{logged}");
        assert!(!logged.contains("127.0.0.1"), "{logged}");
    }

    #[tokio::test]
    async fn unreachable_service_is_a_routing_error() {
        let err = unreachable_client().search_places("museum").await.unwrap_err();
        assert!(matches!(&err, TrackerError::Routing(_)));
        assert!(!err.to_string().contains(SECRET));
    }
}
