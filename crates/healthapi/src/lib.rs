//! Sample Health API.
//!
//! Hardcoded endpoints that exist only as a target for the QA suite: probes,
//! metrics, and stub patient/appointment listings. No persistence. Every
//! route sits behind a CORS layer for the configured origins.

use axum::extract::{Json, State};
use axum::http::{HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

pub const SERVICE_NAME: &str = "health-api";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Methods a cross-origin caller may use.
pub const CORS_METHODS: [Method; 5] = [Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::PATCH];

/// Deployment environment; controls whether docs links are advertised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Environment {
    Development,
    Testing,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Testing => "testing",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    fn docs_url(&self) -> Option<&'static str> {
        match self {
            Environment::Production => None,
            _ => Some("/docs"),
        }
    }
}

/// Shared, read-only state for handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub environment: Environment,
    pub started_at: Instant,
    /// Origins allowed by CORS; `*` allows any.
    pub allowed_origins: Vec<String>,
}

impl AppState {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            started_at: Instant::now(),
            allowed_origins: vec!["*".to_string()],
        }
    }

    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }
}

/// Errors rendered as `{"error": {"code", "message", "timestamp"}}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not Found: {0}")]
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        tracing::warn!(code = status.as_u16(), error = %self, "request failed");
        let body = json!({
            "error": {
                "code": status.as_u16(),
                "message": status.canonical_reason().unwrap_or("Error"),
                "timestamp": unix_timestamp(),
            }
        });
        (status, axum::Json(body)).into_response()
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.allowed_origins);
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/live", get(live))
        .route("/metrics", get(metrics))
        .route("/api/v1/patients", get(list_patients).post(create_patient))
        .route("/api/v1/appointments", get(list_appointments))
        .fallback(not_found)
        .layer(cors)
        .with_state(Arc::new(state))
}

/// CORS for `origins`. A `*` entry mirrors the caller's origin, which keeps
/// credentialed requests allowed; other entries must match exactly.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(origins.iter().filter_map(|o| HeaderValue::from_str(o).ok()))
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(CORS_METHODS.to_vec())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Serve the API on an already-bound listener until the future is dropped
/// or `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

fn unix_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1e6
}

async fn root(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "message": "Health API QA Framework",
        "version": VERSION,
        "status": "operational",
        "environment": state.environment.as_str(),
        "docs_url": state.environment.docs_url(),
        "timestamp": unix_timestamp(),
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": VERSION,
        "environment": state.environment.as_str(),
        "database": "simulated",
        "timestamp": unix_timestamp(),
        "uptime": state.started_at.elapsed().as_secs_f64(),
    }))
}

async fn ready() -> Json<Value> {
    Json(json!({
        "status": "ready",
        "service": SERVICE_NAME,
        "timestamp": unix_timestamp(),
    }))
}

async fn live() -> Json<Value> {
    Json(json!({
        "status": "alive",
        "service": SERVICE_NAME,
        "timestamp": unix_timestamp(),
    }))
}

async fn metrics() -> Json<Value> {
    Json(json!({
        "http_requests_total": 1000,
        "http_request_duration_seconds": 0.1,
        "database_connections_active": 5,
        "memory_usage_bytes": 104_857_600u64,
    }))
}

async fn list_patients() -> Json<Value> {
    Json(json!({
        "patients": [
            {"id": 1, "name": "João Silva", "age": 35, "email": "joao@email.com"},
            {"id": 2, "name": "Maria Santos", "age": 28, "email": "maria@email.com"}
        ],
        "total": 2,
    }))
}

async fn create_patient(Json(payload): Json<Value>) -> Json<Value> {
    Json(json!({
        "message": "Patient created successfully",
        "patient": {
            "id": 3,
            "name": payload.get("name").and_then(Value::as_str).unwrap_or("Unknown"),
            "age": payload.get("age").and_then(Value::as_i64).unwrap_or(0),
            "email": payload.get("email").and_then(Value::as_str).unwrap_or(""),
        }
    }))
}

async fn list_appointments() -> Json<Value> {
    Json(json!({
        "appointments": [
            {"id": 1, "patient_id": 1, "doctor": "Dr. Silva", "date": "2025-07-10", "time": "10:00"},
            {"id": 2, "patient_id": 2, "doctor": "Dr. Santos", "date": "2025-07-11", "time": "14:30"}
        ],
        "total": 2,
    }))
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}
