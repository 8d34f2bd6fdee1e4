//! HTTP API routes
//!
//! Every endpoint lives under `/api/v1`.

use crate::config::defaults::DEFAULT_ALERT_LIMIT;
use crate::constants::api::API_PREFIX;
use crate::error::Error;
use crate::server::state::AppState;
use crate::sos::{Acknowledgement, SosAlertRequest, TriggerResponse};
use crate::store::{AlertStore, SosAlertRecord};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};
use uuid::Uuid;

/// Upper bound on `limit` for the alert listing
const MAX_ALERT_LIMIT: usize = 500;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/sos/trigger", post(trigger_handler))
        .route("/sos/alerts", get(alerts_handler))
        .route("/sos/alerts/:id", get(alert_handler))
        .route("/status", get(status_handler));

    Router::new()
        .nest(API_PREFIX, api)
        .layer(cors_layer(&state.config.server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy; an empty origin list allows any origin
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, error: impl Into<String>) -> (StatusCode, Json<ApiError>) {
        (
            status,
            Json(ApiError {
                error: error.into(),
                code: code.to_string(),
            }),
        )
    }

    fn store(err: Error) -> (StatusCode, Json<ApiError>) {
        error!(error = %err, "Alert history query failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR", err.to_string())
    }
}

/// Failure answer of the trigger endpoint
///
/// Unknown drivers get a 404; anything else is reported as busy.
#[derive(Debug)]
pub struct TriggerError(Error);

impl From<Error> for TriggerError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for TriggerError {
    fn into_response(self) -> Response {
        match self.0 {
            Error::ActorNotFound(id) => {
                warn!(driver = %id, "SOS from unknown driver");
                (StatusCode::NOT_FOUND, Json(TriggerResponse::not_found())).into_response()
            }
            err => {
                error!(stage = "trigger", error = %err, "SOS route error");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(TriggerResponse::busy())).into_response()
            }
        }
    }
}

/// Trigger an SOS
///
/// POST /api/v1/sos/trigger
async fn trigger_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SosAlertRequest>,
) -> Result<Acknowledgement, TriggerError> {
    Ok(state.sos.trigger(req).await?)
}

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    pub limit: Option<usize>,
}

/// Alert list response
#[derive(Debug, Serialize, Deserialize)]
pub struct AlertsResponse {
    pub alerts: Vec<SosAlertRecord>,
    pub count: usize,
}

/// Recent alerts, newest first
///
/// GET /api/v1/sos/alerts?limit=N
async fn alerts_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AlertsQuery>,
) -> Result<Json<AlertsResponse>, (StatusCode, Json<ApiError>)> {
    let limit = query.limit.unwrap_or(DEFAULT_ALERT_LIMIT).min(MAX_ALERT_LIMIT);
    let alerts = state.alerts.recent_alerts(limit).await.map_err(ApiError::store)?;

    Ok(Json(AlertsResponse {
        count: alerts.len(),
        alerts,
    }))
}

/// A single alert
///
/// GET /api/v1/sos/alerts/:id
async fn alert_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SosAlertRecord>, (StatusCode, Json<ApiError>)> {
    let alert_id = Uuid::parse_str(&id).map_err(|_| {
        ApiError::new(StatusCode::BAD_REQUEST, "INVALID_ID", format!("Invalid alert id: {}", id))
    })?;

    state
        .alerts
        .get_alert(alert_id)
        .await
        .map_err(ApiError::store)?
        .map(Json)
        .ok_or_else(|| {
            ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", format!("Alert not found: {}", id))
        })
}

/// Status response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Server is running
    pub running: bool,
    /// Server version
    pub version: String,
    /// Uptime in seconds
    pub uptime_secs: u64,
    /// Reverse geocoding provider
    pub geocoder: String,
    /// Notification channels
    pub channels: Vec<String>,
}

/// Server status endpoint
///
/// GET /api/v1/status
async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        running: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.uptime_secs(),
        geocoder: state.sos.geocoder().to_string(),
        channels: state.sos.channels().into_iter().map(str::to_string).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::Result;
    use crate::geo::{AddressResolver, GeoBackend, GeoLocation};
    use crate::sos::{SosService, SosSettings};
    use crate::store::{Driver, DriverRegistry, NewDriver, NewSosAlert, SqliteStore};
    use axum::body::Body;
    use axum::http::Request;
    use futures::future::BoxFuture;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    struct FixedGeo;

    impl GeoBackend for FixedGeo {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn reverse_geocode(&self, lat: f64, lng: f64) -> BoxFuture<'_, Result<Option<GeoLocation>>> {
            Box::pin(async move {
                Ok(Some(GeoLocation {
                    lat,
                    lng,
                    display_name: "MG Road, Bhubaneswar".to_string(),
                }))
            })
        }
    }

    /// Never answers
    struct StalledGeo;

    impl GeoBackend for StalledGeo {
        fn name(&self) -> &'static str {
            "stalled"
        }

        fn reverse_geocode(&self, _lat: f64, _lng: f64) -> BoxFuture<'_, Result<Option<GeoLocation>>> {
            Box::pin(futures::future::pending())
        }
    }

    struct BrokenRegistry;

    impl DriverRegistry for BrokenRegistry {
        fn find_by_reg_no<'a>(&'a self, _reg_no: &'a str) -> BoxFuture<'a, Result<Option<Driver>>> {
            Box::pin(async { Err(Error::Decode("connection reset".to_string())) })
        }
    }

    async fn seeded_store() -> Arc<SqliteStore> {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store
            .add_driver(NewDriver {
                first_name: "Ravi".to_string(),
                last_name: "Kumar".to_string(),
                phone: "+919999999999".to_string(),
                reg_no: "DR100".to_string(),
            })
            .await
            .unwrap();
        Arc::new(store)
    }

    fn state_with(
        config: Config,
        registry: Arc<dyn DriverRegistry>,
        store: Arc<SqliteStore>,
        geo: Arc<dyn GeoBackend>,
    ) -> Arc<AppState> {
        let sos = SosService::new(
            registry,
            store.clone(),
            AddressResolver::new(geo, Duration::from_secs(5)),
            Vec::new(),
            SosSettings::default(),
        );
        Arc::new(AppState::new(config, sos, store))
    }

    async fn create_test_state() -> (Arc<AppState>, Arc<SqliteStore>) {
        let store = seeded_store().await;
        let state = state_with(Config::default(), store.clone(), store.clone(), Arc::new(FixedGeo));
        (state, store)
    }

    fn trigger_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/sos/trigger")
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    /// Poll the store until `count` alerts exist or two seconds pass
    async fn wait_for_alerts(store: &SqliteStore, count: usize) -> Vec<SosAlertRecord> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let alerts = store.recent_alerts(10).await.unwrap();
            if alerts.len() >= count || tokio::time::Instant::now() > deadline {
                return alerts;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    #[tokio::test]
    async fn test_trigger_known_driver() {
        let (state, store) = create_test_state().await;
        let app = create_router(state);

        let response = app
            .oneshot(trigger_request(serde_json::json!({
                "driverId": "DR100",
                "latitude": 20.29,
                "longitude": 85.82
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({"success": true, "message": "SOS Triggered Successfully"})
        );

        let alerts = wait_for_alerts(&store, 1).await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].location_name, "MG Road, Bhubaneswar");
        assert_eq!(alerts[0].latitude, 20.29);
    }

    #[tokio::test]
    async fn test_trigger_unknown_driver() {
        let (state, store) = create_test_state().await;
        let app = create_router(state);

        let response = app
            .oneshot(trigger_request(serde_json::json!({
                "driverId": "DR999",
                "latitude": 20.29,
                "longitude": 85.82
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({"message": "Driver not found"})
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(wait_for_alerts(&store, 0).await.is_empty());
    }

    #[tokio::test]
    async fn test_trigger_registry_failure_is_busy() {
        let store = seeded_store().await;
        let state = state_with(
            Config::default(),
            Arc::new(BrokenRegistry),
            store.clone(),
            Arc::new(FixedGeo),
        );

        let response = create_router(state)
            .oneshot(trigger_request(serde_json::json!({
                "driverId": "DR100",
                "latitude": 20.29,
                "longitude": 85.82
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({"success": false, "message": "Server busy"})
        );
    }

    #[tokio::test]
    async fn test_trigger_answers_while_geocoder_stalls() {
        let store = seeded_store().await;
        let state = state_with(Config::default(), store.clone(), store.clone(), Arc::new(StalledGeo));

        let response = tokio::time::timeout(
            Duration::from_secs(1),
            create_router(state).oneshot(trigger_request(serde_json::json!({
                "driverId": "DR100",
                "latitude": 20.29,
                "longitude": 85.82
            }))),
        )
        .await
        .expect("acknowledgement must not wait for geocoding")
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["success"], true);
    }

    #[tokio::test]
    async fn test_trigger_out_of_range_coordinates_accepted() {
        let (state, store) = create_test_state().await;

        let response = create_router(state)
            .oneshot(trigger_request(serde_json::json!({
                "driverId": "DR100",
                "latitude": 123.0,
                "longitude": 85.82
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        drop(response);
        assert_eq!(wait_for_alerts(&store, 1).await.len(), 1);
    }

    #[tokio::test]
    async fn test_trigger_malformed_body_rejected() {
        let (state, store) = create_test_state().await;

        let response = create_router(state)
            .oneshot(trigger_request(serde_json::json!({
                "driverId": "DR100",
                "latitude": "north",
                "longitude": 85.82
            })))
            .await
            .unwrap();

        assert!(response.status().is_client_error());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(wait_for_alerts(&store, 0).await.is_empty());
    }

    #[tokio::test]
    async fn test_alerts_listing() {
        let (state, store) = create_test_state().await;
        for name in ["Depot", "Toll Plaza", "Ring Road"] {
            store
                .insert_alert(NewSosAlert {
                    driver_id: 1,
                    latitude: 20.29,
                    longitude: 85.82,
                    location_name: name.to_string(),
                })
                .await
                .unwrap();
        }

        let response = create_router(state)
            .oneshot(get_request("/api/v1/sos/alerts?limit=2"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let list: AlertsResponse = serde_json::from_slice(&body).unwrap();

        assert_eq!(list.count, 2);
        assert_eq!(list.alerts[0].location_name, "Ring Road");
    }

    #[tokio::test]
    async fn test_alert_lookup() {
        let (state, store) = create_test_state().await;
        let record = store
            .insert_alert(NewSosAlert {
                driver_id: 1,
                latitude: 20.29,
                longitude: 85.82,
                location_name: "Depot".to_string(),
            })
            .await
            .unwrap();
        let app = create_router(state);

        let found = app
            .clone()
            .oneshot(get_request(&format!("/api/v1/sos/alerts/{}", record.alert_id)))
            .await
            .unwrap();
        assert_eq!(found.status(), StatusCode::OK);
        assert_eq!(json_body(found).await["location_name"], "Depot");

        let missing = app
            .clone()
            .oneshot(get_request(&format!("/api/v1/sos/alerts/{}", Uuid::new_v4())))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let invalid = app
            .oneshot(get_request("/api/v1/sos/alerts/not-a-uuid"))
            .await
            .unwrap();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(invalid).await["code"], "INVALID_ID");
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let (state, _store) = create_test_state().await;

        let response = create_router(state)
            .oneshot(get_request("/api/v1/status"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let status: StatusResponse = serde_json::from_slice(&body).unwrap();

        assert!(status.running);
        assert_eq!(status.geocoder, "fixed");
        assert!(status.channels.is_empty());
    }

    #[tokio::test]
    async fn test_routes_are_prefixed() {
        let (state, _store) = create_test_state().await;

        let response = create_router(state)
            .oneshot(get_request("/status"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_allowed_origin() {
        let store = seeded_store().await;
        let mut config = Config::default();
        config.server.cors_origins = vec!["http://dispatch.fleet.test".to_string()];
        let state = state_with(config, store.clone(), store, Arc::new(FixedGeo));

        let response = create_router(state)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/status")
                    .header("Origin", "http://dispatch.fleet.test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://dispatch.fleet.test"
        );
    }
}
