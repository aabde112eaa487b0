//! HTTP API for the assistant.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/query` | Answer a question (`{query, location?, sessionId?}`) |
//! | `GET`  | `/api/recycle` | Same, from `q` and `location` parameters |
//! | `POST` | `/api/vision` | Describe a base64 photo |
//! | `GET`  | `/api/waste-rules` | Discharge rules for `sido` and `sigungu` |
//! | `GET`  | `/api/schedule` | Weekly schedule for `sido` and `sigungu` |
//! | `GET`  | `/api/holidays` | Public holidays for `year` and `month` |
//! | `GET`  | `/api/services/fees` | Large-waste fees, optionally for one `item` |
//! | `GET`  | `/api/services/region-info` | Collection summary for `loc` (home address if absent) |
//! | `GET`  | `/api/sessions/{id}/messages` | Conversation log of a session |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Errors are `{ "error": "..." }` with 400 for bad input and 500 for
//! configuration or analysis failures.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use ecosort_core::{Holiday, Message, RegionSummary, RuleRecord};
use ecosort_runtime::{
    Assistant, FeeLookup, ImageRequest, QueryRequest, QueryResponse, ScheduleLookup, ServiceError,
};

#[derive(Clone)]
struct AppState {
    assistant: Arc<Assistant>,
}

/// Bind `bind` and serve until the process exits.
pub async fn run_server(assistant: Arc<Assistant>, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "Ecosort API listening");
    axum::serve(listener, router(assistant)).await?;
    Ok(())
}

pub fn router(assistant: Arc<Assistant>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/query", post(handle_query))
        .route("/api/recycle", get(handle_recycle))
        .route("/api/vision", post(handle_vision))
        .route("/api/waste-rules", get(handle_waste_rules))
        .route("/api/schedule", get(handle_schedule))
        .route("/api/holidays", get(handle_holidays))
        .route("/api/services/fees", get(handle_fees))
        .route("/api/services/region-info", get(handle_region_info))
        .route("/api/sessions/{id}/messages", get(handle_messages))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { assistant })
}

// ============ Errors ============

struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        if e.is_client_error() {
            return bad_request(e.to_string());
        }
        tracing::error!(error = %e, "Request failed");
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        bad_request(e.body_text())
    }
}

/// Required, non-blank query parameter.
fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, AppError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| bad_request(format!("{} is required", name)))
}

// ============ Queries ============

async fn handle_query(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, AppError> {
    let Json(request) = body?;
    Ok(Json(state.assistant.ask(request).await?))
}

#[derive(Deserialize)]
struct RecycleParams {
    q: Option<String>,
    location: Option<String>,
}

async fn handle_recycle(
    State(state): State<AppState>,
    Query(params): Query<RecycleParams>,
) -> Result<Json<QueryResponse>, AppError> {
    let query = required(&params.q, "q")?.to_string();
    let response = state
        .assistant
        .ask(QueryRequest {
            query,
            location: params.location,
            session_id: None,
        })
        .await?;
    Ok(Json(response))
}

async fn handle_vision(
    State(state): State<AppState>,
    body: Result<Json<ImageRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(request) = body?;
    let message = state.assistant.describe_image(request).await?;
    Ok(Json(json!({ "resultType": "gemini", "message": message })))
}

// ============ Regions ============

#[derive(Deserialize)]
struct RegionParams {
    sido: Option<String>,
    sigungu: Option<String>,
}

#[derive(Serialize)]
struct RulesResponse {
    rules: Vec<RuleRecord>,
}

async fn handle_waste_rules(
    State(state): State<AppState>,
    Query(params): Query<RegionParams>,
) -> Result<Json<RulesResponse>, AppError> {
    let sido = required(&params.sido, "sido")?;
    let sigungu = required(&params.sigungu, "sigungu")?;
    let rules = state.assistant.lookup_rules(sido, sigungu).await?;
    Ok(Json(RulesResponse { rules }))
}

async fn handle_schedule(
    State(state): State<AppState>,
    Query(params): Query<RegionParams>,
) -> Result<Json<ScheduleLookup>, AppError> {
    let sido = required(&params.sido, "sido")?;
    let sigungu = required(&params.sigungu, "sigungu")?;
    Ok(Json(state.assistant.lookup_schedule(sido, sigungu).await?))
}

#[derive(Deserialize)]
struct HolidayParams {
    year: Option<String>,
    month: Option<String>,
}

#[derive(Serialize)]
struct HolidaysResponse {
    holidays: Vec<Holiday>,
}

async fn handle_holidays(
    State(state): State<AppState>,
    Query(params): Query<HolidayParams>,
) -> Result<Json<HolidaysResponse>, AppError> {
    let year: i32 = required(&params.year, "year")?
        .parse()
        .map_err(|_| bad_request("year must be a number"))?;
    let month: u32 = required(&params.month, "month")?
        .parse()
        .map_err(|_| bad_request("month must be a number"))?;
    let holidays = state.assistant.lookup_holidays(year, month).await?;
    Ok(Json(HolidaysResponse { holidays }))
}

// ============ Services ============

#[derive(Deserialize)]
struct FeeParams {
    item: Option<String>,
}

async fn handle_fees(
    State(state): State<AppState>,
    Query(params): Query<FeeParams>,
) -> Json<FeeLookup> {
    let item = params.item.unwrap_or_default();
    Json(state.assistant.lookup_fees(&item).await)
}

#[derive(Deserialize)]
struct RegionInfoParams {
    loc: Option<String>,
}

async fn handle_region_info(
    State(state): State<AppState>,
    Query(params): Query<RegionInfoParams>,
) -> Result<Json<RegionSummary>, AppError> {
    let today = chrono::Local::now().date_naive();
    let summary = state
        .assistant
        .region_info(params.loc.as_deref(), today)
        .await?;
    Ok(Json(summary))
}

// ============ Sessions ============

#[derive(Serialize)]
struct MessagesResponse {
    messages: Vec<Message>,
}

async fn handle_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<MessagesResponse> {
    let conversation = state.assistant.conversation(&id);
    Json(MessagesResponse {
        messages: conversation.messages().to_vec(),
    })
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
