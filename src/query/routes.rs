//! HTTP routes for the query server.
//!
//! Every response uses the same envelope: `{"success": bool, "data": ...}`
//! on success and `{"success": false, "error": "..."}` on failure.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use incountry::loader::decode_polygon_data;
use incountry::pip::{BoundaryRecord, PipService, StoreError};
use incountry::CountrySummary;

/// Application state shared across handlers
pub struct AppState {
    pub service: PipService,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route(
            "/api/v1/countries",
            get(list_countries_handler).post(add_country_handler),
        )
        .route(
            "/api/v1/countries/{code}",
            get(get_country_handler)
                .put(replace_country_handler)
                .delete(delete_country_handler),
        )
        .route("/api/v1/check", post(check_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

/// Success envelope
#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            count: None,
            message: None,
        }
    }

    fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Error envelope
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "success": false,
            "error": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::bad_request(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(rejection.status(), "No valid JSON data provided")
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Health check endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
        countries: state.service.store().len(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    version: &'static str,
    countries: usize,
}

/// List all loaded countries (no geometry)
async fn list_countries_handler(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<Vec<CountrySummary>>> {
    let countries: Vec<CountrySummary> = state.service.store().all().collect();
    let count = countries.len();
    Json(ApiResponse::ok(countries).with_count(count))
}

#[derive(Serialize)]
struct CountryDetail {
    #[serde(flatten)]
    summary: CountrySummary,
    geometry: Value,
}

/// Single country, including its geometry
async fn get_country_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> ApiResult<Json<ApiResponse<CountryDetail>>> {
    let record = state
        .service
        .lookup_boundary(&code)
        .ok_or_else(|| country_not_found(&code))?;

    Ok(Json(ApiResponse::ok(CountryDetail {
        summary: record.summary(),
        geometry: record.boundary.to_geojson(),
    })))
}

/// Add a new country; fails with 409 if the code is already loaded
async fn add_country_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<CountrySummary>>)> {
    let Json(body) = body?;
    let fields = required_fields(&body, &["country_code", "country_name", "polygon_data"])?;

    let code = string_field(fields, "country_code")?;
    let name = string_field(fields, "country_name")?;
    let geometry = decode_polygon_data(fields["polygon_data"].clone());

    let record = BoundaryRecord::from_value(code, name, &geometry)?;
    let summary = record.summary();
    if !state.service.store().insert_if_absent(record) {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            format!("Country with code {} already exists", summary.country_code),
        ));
    }

    info!("Added country {} ({})", summary.country_name, summary.country_code);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(summary).with_message("Country added successfully")),
    ))
}

/// Create or wholesale-replace a country
async fn replace_country_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<CountrySummary>>> {
    let Json(body) = body?;
    let fields = required_fields(&body, &["country_name", "polygon_data"])?;

    let name = string_field(fields, "country_name")?;
    let geometry = decode_polygon_data(fields["polygon_data"].clone());

    let record = BoundaryRecord::from_value(&code, name, &geometry)?;
    let summary = record.summary();
    let message = match state.service.store().insert(record) {
        Some(_) => "Country replaced successfully",
        None => "Country added successfully",
    };

    info!("{}: {}", message, summary.country_code);
    Ok(Json(ApiResponse::ok(summary).with_message(message)))
}

async fn delete_country_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    if !state.service.store().remove(&code) {
        return Err(country_not_found(&code));
    }
    Ok(Json(
        ApiResponse::ok(Value::Null).with_message(format!(
            "Country {} removed",
            code.trim().to_ascii_uppercase()
        )),
    ))
}

#[derive(Serialize)]
struct CheckResponse {
    is_inside_country: bool,
    matched_polygon: Option<usize>,
    latitude: f64,
    longitude: f64,
    country_code: String,
    country_name: String,
    checked_at: String,
}

/// Main endpoint: is `(latitude, longitude)` inside `country_code`?
///
/// Expected JSON payload:
/// `{"latitude": 40.7128, "longitude": -74.0060, "country_code": "USA"}`
async fn check_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<CheckResponse>>> {
    let Json(body) = body?;
    let fields = required_fields(&body, &["latitude", "longitude", "country_code"])?;

    let (Some(latitude), Some(longitude)) = (
        number_field(fields, "latitude"),
        number_field(fields, "longitude"),
    ) else {
        return Err(ApiError::bad_request("Invalid latitude or longitude format"));
    };

    if !(-90.0..=90.0).contains(&latitude) {
        return Err(ApiError::bad_request("Latitude must be between -90 and 90"));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(ApiError::bad_request("Longitude must be between -180 and 180"));
    }

    let code = string_field(fields, "country_code")?;
    let handle = state
        .service
        .lookup_boundary(code)
        .ok_or_else(|| country_not_found(code))?;

    let outcome = state.service.check_point(&handle, longitude, latitude);

    Ok(Json(ApiResponse::ok(CheckResponse {
        is_inside_country: outcome.inside,
        matched_polygon: outcome.matched_polygon,
        latitude,
        longitude,
        country_code: handle.code.to_string(),
        country_name: handle.name.clone(),
        checked_at: Utc::now().to_rfc3339(),
    })))
}

async fn not_found_handler() -> ApiError {
    ApiError::not_found("Endpoint not found")
}

fn country_not_found(code: &str) -> ApiError {
    ApiError::not_found(format!(
        "Country with code {} not found",
        code.trim().to_ascii_uppercase()
    ))
}

/// Ensure the body is an object carrying every named field
fn required_fields<'a>(body: &'a Value, names: &[&str]) -> ApiResult<&'a Map<String, Value>> {
    let Some(fields) = body.as_object() else {
        return Err(ApiError::bad_request("No JSON data provided"));
    };
    let missing: Vec<&str> = names
        .iter()
        .copied()
        .filter(|name| fields.get(*name).map_or(true, Value::is_null))
        .collect();
    if !missing.is_empty() {
        return Err(ApiError::bad_request(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }
    Ok(fields)
}

fn string_field<'a>(fields: &'a Map<String, Value>, name: &str) -> ApiResult<&'a str> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::bad_request(format!("Field {} must be a string", name)))
}

/// Accept JSON numbers and numeric strings ("40.7128"); reject non-finite
fn number_field(fields: &Map<String, Value>, name: &str) -> Option<f64> {
    let value = match fields.get(name)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use incountry::loader::DuplicatePolicy;
    use incountry::{samples, BoundaryStore};
    use serde_json::json;
    use tower::ServiceExt;

    fn app() -> Router {
        let store = Arc::new(BoundaryStore::new());
        samples::load_into(&store, DuplicatePolicy::Replace).unwrap();
        router(Arc::new(AppState {
            service: PipService::new(store),
        }))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let app = app();
        let (status, body) = send(&app, "GET", "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["countries"], 25);
    }

    #[tokio::test]
    async fn test_check_inside_and_outside() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/check",
            Some(json!({"latitude": 40.7128, "longitude": -74.0060, "country_code": "usa"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["is_inside_country"], true);
        assert_eq!(body["data"]["matched_polygon"], 0);
        assert_eq!(body["data"]["country_code"], "USA");
        assert_eq!(body["data"]["country_name"], "United States");

        let (_, body) = send(
            &app,
            "POST",
            "/api/v1/check",
            Some(json!({"latitude": "31.7683", "longitude": "35.2137", "country_code": "USA"})),
        )
        .await;
        assert_eq!(body["data"]["is_inside_country"], false);
        assert!(body["data"]["matched_polygon"].is_null());
    }

    #[tokio::test]
    async fn test_check_validation() {
        let app = app();

        let (status, body) = send(&app, "POST", "/api/v1/check", Some(json!({"latitude": 1.0}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required fields: longitude, country_code");

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/check",
            Some(json!({"latitude": "north", "longitude": 0, "country_code": "USA"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid latitude or longitude format");

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/check",
            Some(json!({"latitude": 91, "longitude": 0, "country_code": "USA"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Latitude must be between -90 and 90");

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/check",
            Some(json!({"latitude": 0, "longitude": 0, "country_code": "ATL"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Country with code ATL not found");
    }

    #[tokio::test]
    async fn test_list_countries_has_no_geometry() {
        let app = app();
        let (status, body) = send(&app, "GET", "/api/v1/countries", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 25);
        let first = &body["data"][0];
        assert_eq!(first["country_code"], "ARG");
        assert!(first.get("geometry").is_none());
    }

    #[tokio::test]
    async fn test_get_country_includes_geometry() {
        let app = app();
        let (status, body) = send(&app, "GET", "/api/v1/countries/gbr", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["country_name"], "United Kingdom");
        assert_eq!(body["data"]["geometry"]["type"], "Polygon");

        let (status, _) = send(&app, "GET", "/api/v1/countries/XYZ", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_add_replace_delete_lifecycle() {
        let app = app();
        let square = "{\"type\":\"Polygon\",\"coordinates\":[[[0,0],[10,0],[10,10],[0,10],[0,0]],[[4,4],[6,4],[6,6],[4,6],[4,4]]]}";

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/countries",
            Some(json!({"country_code": "sqr", "country_name": "Squareland", "polygon_data": square})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["country_code"], "SQR");

        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/countries",
            Some(json!({"country_code": "SQR", "country_name": "Again", "polygon_data": square})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, body) = send(
            &app,
            "POST",
            "/api/v1/check",
            Some(json!({"latitude": 5, "longitude": 5, "country_code": "SQR"})),
        )
        .await;
        assert_eq!(body["data"]["is_inside_country"], false);

        // malformed replacement leaves the record alone
        let (status, body) = send(
            &app,
            "PUT",
            "/api/v1/countries/SQR",
            Some(json!({"country_name": "Broken", "polygon_data": {"type": "Polygon", "coordinates": [[[0, 0], [1, 1]]]}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("malformed geometry"));

        let (_, body) = send(&app, "GET", "/api/v1/countries/SQR", None).await;
        assert_eq!(body["data"]["country_name"], "Squareland");

        let (status, body) = send(
            &app,
            "PUT",
            "/api/v1/countries/SQR",
            Some(json!({"country_name": "Solid Squareland", "polygon_data": {"type": "Polygon", "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]]]}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Country replaced successfully");

        let (_, body) = send(
            &app,
            "POST",
            "/api/v1/check",
            Some(json!({"latitude": 5, "longitude": 5, "country_code": "SQR"})),
        )
        .await;
        assert_eq!(body["data"]["is_inside_country"], true);

        let (status, _) = send(&app, "DELETE", "/api/v1/countries/sqr", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, "DELETE", "/api/v1/countries/sqr", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_add_country_rejects_bad_input() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/countries",
            Some(json!({"country_code": "US", "country_name": "Short", "polygon_data": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("invalid country code"));

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/countries",
            Some(json!({"country_code": "NEW", "country_name": "Nowhere", "polygon_data": "not json"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_invalid_json_and_unknown_route() {
        let app = app();
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/check")
            .header("content-type", "application/json")
            .body(Body::from("{ nope"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, "GET", "/api/v2/anything", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Endpoint not found");
    }
}
