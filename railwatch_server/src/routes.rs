//! HTTP routes.
//!
//! Command handlers translate JSON bodies into engine calls and map
//! [`CoreError`] onto status codes: `InvalidInput` → 400, `NotFound` → 404.

use axum::{
    extract::{rejection::JsonRejection, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use railwatch_core::{
    CoreError, PositionCommand, RailEngine, RailEvent, SignalCommand, SignalTable, Snapshot,
    StopCommand, StopRecord,
};
use railwatch_env::TokioContext;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::ws;

// Application state
#[derive(Clone)]
pub struct AppState {
    pub engine: RailEngine<TokioContext>,
}

impl AppState {
    pub fn new(engine: RailEngine<TokioContext>) -> Self {
        Self { engine }
    }
}

// API types
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SignalResponse {
    pub success: bool,
    pub signals: SignalTable,
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub success: bool,
    pub message: String,
    pub stop: StopRecord,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub observers: usize,
}

/// A rejected command, rendered as `{success: false, error}`.
#[derive(Debug)]
pub struct ApiError(pub CoreError);

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            CoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::TransportFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
    
    fn message(&self) -> String {
        match &self.0 {
            CoreError::InvalidInput(msg)
            | CoreError::NotFound(msg)
            | CoreError::TransportFailure(msg) => msg.clone(),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(CoreError::invalid_input(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.message()),
        };
        (status, Json(body)).into_response()
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Commands
        .route("/update-location", post(update_location))
        .route("/update-signal", post(update_signal))
        .route("/emergency-stop", post(emergency_stop))
        
        // Queries
        .route("/live", get(live))
        .route("/health", get(health))
        
        // Push channel
        .route("/", get(root))
        .route("/ws", get(ws::ws_handler))
        
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

async fn update_location(
    State(state): State<AppState>,
    body: Result<Json<PositionCommand>, JsonRejection>,
) -> Result<Json<ApiResponse<RailEvent>>, ApiError> {
    let Json(command) = body?;
    let report = state.engine.submit_position(&command).map_err(rejected)?;
    Ok(Json(ApiResponse::ok(report.to_event())))
}

async fn update_signal(
    State(state): State<AppState>,
    body: Result<Json<SignalCommand>, JsonRejection>,
) -> Result<Json<SignalResponse>, ApiError> {
    let Json(command) = body?;
    let signals = state.engine.submit_signal(&command).map_err(rejected)?;
    Ok(Json(SignalResponse {
        success: true,
        signals,
    }))
}

async fn emergency_stop(
    State(state): State<AppState>,
    body: Result<Json<StopCommand>, JsonRejection>,
) -> Result<Json<StopResponse>, ApiError> {
    let Json(command) = body?;
    let stop = state.engine.submit_stop(&command).map_err(rejected)?;
    Ok(Json(StopResponse {
        success: true,
        message: format!("Emergency stop triggered for {}", stop.entity_id),
        stop,
    }))
}

async fn live(State(state): State<AppState>) -> Json<Snapshot> {
    Json(state.engine.snapshot())
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        observers: state.engine.observer_count(),
    })
}

/// Same origin serves both the banner and the push channel.
async fn root(State(state): State<AppState>, upgrade: Option<WebSocketUpgrade>) -> Response {
    match upgrade {
        Some(upgrade) => ws::upgrade(upgrade, state),
        None => "Railwatch backend running".into_response(),
    }
}

fn rejected(err: CoreError) -> ApiError {
    warn!("Rejected command: {}", err);
    ApiError(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use railwatch_core::{EngineConfig, WaypointCatalog};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    
    fn state() -> AppState {
        AppState::new(RailEngine::new(
            TokioContext::shared(),
            WaypointCatalog::coimbatore(),
            EngineConfig::default(),
        ))
    }
    
    async fn call(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        
        let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
    
    #[tokio::test]
    async fn test_update_location_returns_event() {
        let app = create_router(state());
        let (status, body) = call(
            app,
            Method::POST,
            "/update-location",
            Some(json!({ "lat": 10.975, "lng": 76.934 })),
        )
        .await;
        
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["type"], "LOCATION_UPDATE");
        assert_eq!(body["data"]["nearest"]["code"], "PTJ");
        assert_eq!(body["data"]["nearest"]["risk"], true);
    }
    
    #[tokio::test]
    async fn test_update_location_missing_field_is_bad_request() {
        let app = create_router(state());
        let (status, body) = call(app, Method::POST, "/update-location", Some(json!({ "lat": 11.0 }))).await;
        
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }
    
    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let app = create_router(state());
        let request = Request::builder()
            .method(Method::POST)
            .uri("/update-location")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
    
    #[tokio::test]
    async fn test_update_signal_cycles_one_step() {
        let state = state();
        let (status, body) = call(
            create_router(state.clone()),
            Method::POST,
            "/update-signal",
            Some(json!({ "trackId": "track-up", "left": "danger" })),
        )
        .await;
        
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["signals"]["track-up"]["left"], "caution");
        assert_eq!(body["signals"]["track-up"]["right"], "safe");
        assert_eq!(body["signals"]["track-down"]["left"], "safe");
    }
    
    #[tokio::test]
    async fn test_update_signal_unknown_track_is_not_found() {
        let app = create_router(state());
        let (status, body) = call(
            app,
            Method::POST,
            "/update-signal",
            Some(json!({ "trackId": "track-siding", "side": "left" })),
        )
        .await;
        
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Track ID not found: track-siding");
    }
    
    #[tokio::test]
    async fn test_emergency_stop_and_live_snapshot() {
        let state = state();
        let (status, body) = call(
            create_router(state.clone()),
            Method::POST,
            "/emergency-stop",
            Some(json!({ "trainId": "train-7" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stop"]["entity_id"], "train-7");
        
        let (status, live) = call(create_router(state), Method::GET, "/live", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(live["emergency_stop"]["entity_id"], "train-7");
        assert_eq!(live["signals"]["track-up"]["left"], "safe");
        assert_eq!(live["nearest"]["code"], "CBE");
    }
    
    #[tokio::test]
    async fn test_emergency_stop_without_id_is_bad_request() {
        let app = create_router(state());
        let (status, _) = call(app, Method::POST, "/emergency-stop", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    
    #[tokio::test]
    async fn test_health_and_banner() {
        let state = state();
        let _observer = state.engine.connect();
        
        let (status, health) = call(create_router(state.clone()), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["observers"], 1);
        
        let response = create_router(state)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Railwatch backend running");
    }
}
