//! University catalog HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/api/health` | Health check (returns version) |
//! | `GET`  | `/api/meta` | Countries/programs/exams for filter UIs |
//! | `GET`  | `/api/universities` | Filtered, paginated listing |
//! | `GET`  | `/api/universities/{id}` | Full university detail |
//! | `POST` | `/api/chat` | Ask the admissions assistant a question |
//!
//! # Error Contract
//!
//! All error responses share one JSON schema:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "page must be >= 1" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `agent_unavailable`
//! (500), `agent_error` (500), `internal` (500). Malformed paths, query
//! strings, and JSON bodies are reported in the same shape.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser frontends can
//! call the API directly.

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, Request, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::agent::{ChatAgent, ChatTurn};
use crate::config::Config;
use crate::db;
use crate::filters::UniversityFilters;
use crate::service::{Meta, UniversityDetail, UniversityListItem, UniversityService};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    service: UniversityService,
    /// Present only when an API key was available at startup.
    agent: Option<Arc<ChatAgent>>,
}

impl AppState {
    pub fn new(service: UniversityService, agent: Option<Arc<ChatAgent>>) -> Self {
        Self { service, agent }
    }
}

/// Starts the catalog HTTP server on the configured bind address.
///
/// The chat agent is constructed here, once, and injected into the router
/// state. Without `OPENAI_API_KEY` the API still serves the catalog
/// endpoints; `/api/chat` reports `agent_unavailable`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    let service = UniversityService::new(pool.clone());

    let agent = match ChatAgent::from_env(&config.agent, pool) {
        Ok(agent) => Some(Arc::new(agent)),
        Err(e) => {
            eprintln!("Chat assistant disabled: {}", e);
            None
        }
    };

    let app = build_router(AppState::new(service, agent));

    println!("API server listening on http://{}", config.server.bind);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Assemble the router. Split out so tests can serve the app on an
/// ephemeral port.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(handle_health))
        .route("/api/meta", get(handle_meta))
        .route("/api/universities", get(handle_list_universities))
        .route("/api/universities/{id}", get(handle_get_university))
        .route("/api/chat", post(handle_chat))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"not_found"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        internal(e.to_string())
    }
}

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// Constructs a 404 Not Found error.
fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

/// Constructs a 500 error for storage or other unexpected faults.
fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

// ============ Extractors ============

// Axum's default Path/Query/Json rejections are plain-text responses.
// These wrappers keep malformed input on the JSON error contract.

struct ApiPath<T>(T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(AppError {
                status: rejection.status(),
                code: "bad_request".to_string(),
                message: rejection.body_text(),
            }),
        }
    }
}

struct ApiQuery<T>(T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(AppError {
                status: rejection.status(),
                code: "bad_request".to_string(),
                message: rejection.body_text(),
            }),
        }
    }
}

struct ApiJson<T>(T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(AppError {
                status: rejection.status(),
                code: "bad_request".to_string(),
                message: rejection.body_text(),
            }),
        }
    }
}

// ============ GET /api/health ============

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

// ============ GET /api/meta ============

async fn handle_meta(State(state): State<AppState>) -> Result<Json<Meta>, AppError> {
    let meta = state.service.get_meta().await?;
    Ok(Json(meta))
}

// ============ GET /api/universities ============

/// Raw query parameters for the listing endpoint.
#[derive(Deserialize)]
struct ListParams {
    country: Option<String>,
    program: Option<String>,
    exam: Option<String>,
    min_score: Option<f64>,
    q: Option<String>,
    page: Option<i64>,
    limit: Option<i64>,
}

#[derive(Serialize)]
struct ListResponse {
    items: Vec<UniversityListItem>,
    page: i64,
    limit: i64,
    total: i64,
}

/// Handler for `GET /api/universities`.
///
/// Range validation happens here, at the transport boundary: the filter
/// builder itself never sees out-of-range pagination or negative scores.
async fn handle_list_universities(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<ListResponse>, AppError> {
    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(20);

    if page < 1 {
        return Err(bad_request("page must be >= 1"));
    }
    if !(1..=100).contains(&limit) {
        return Err(bad_request("limit must be between 1 and 100"));
    }
    if let Some(min_score) = params.min_score {
        if min_score < 0.0 {
            return Err(bad_request("min_score must be >= 0"));
        }
    }

    let filters = UniversityFilters {
        country_code: params.country,
        program: params.program,
        exam: params.exam,
        min_score: params.min_score,
        query: params.q,
        page,
        limit,
    };

    let (items, total) = state.service.list_universities(&filters).await?;

    Ok(Json(ListResponse {
        items,
        page,
        limit,
        total,
    }))
}

// ============ GET /api/universities/{id} ============

async fn handle_get_university(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<UniversityDetail>, AppError> {
    let detail = state
        .service
        .get_university(id)
        .await?
        .ok_or_else(|| not_found("University not found"))?;

    Ok(Json(detail))
}

// ============ POST /api/chat ============

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    chat_history: Vec<ChatTurn>,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
    tool_calls: Vec<String>,
}

async fn handle_chat(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if request.message.trim().is_empty() {
        return Err(bad_request("message must not be empty"));
    }

    let agent = state.agent.as_ref().ok_or_else(|| AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "agent_unavailable".to_string(),
        message: "Chat assistant is not configured (OPENAI_API_KEY not set)".to_string(),
    })?;

    let outcome = agent
        .chat(&request.message, &request.chat_history)
        .await
        .map_err(|e| AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "agent_error".to_string(),
            message: e.to_string(),
        })?;

    Ok(Json(ChatResponse {
        response: outcome.response,
        tool_calls: outcome.tool_calls,
    }))
}
