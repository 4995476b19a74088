//! REST transport over the task store.
//!
//! | Method | Path              | Success                         |
//! |--------|-------------------|---------------------------------|
//! | GET    | `/api/tasks`      | 200, array of tasks             |
//! | POST   | `/api/tasks`      | 201, the created task           |
//! | PUT    | `/api/tasks/:id`  | 200, `{"message": "Updated"}`   |
//! | DELETE | `/api/tasks/:id`  | 200, `{"message": "Deleted"}`   |
//! | GET    | `/api/board`      | 200, classified views           |
//! | GET    | `/healthz`        | 200, `{"status": "ok"}`         |
//!
//! Failures answer `{"error": "<message>"}` with 400, 404 or 500.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, Method, Request, StatusCode};
use axum::middleware::{from_fn, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::Instrument;
use uuid::Uuid;

use crate::board::{reference_for_day, BoardView};
use crate::clock::Clock;
use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::store::TaskStore;
use crate::task::{NewTask, Task, TaskPatch};

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TaskStore>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(store: Arc<dyn TaskStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/api/tasks", get(list_tasks_handler).post(create_task_handler))
        .route(
            "/api/tasks/:id",
            put(update_task_handler).delete(delete_task_handler),
        )
        .route("/api/board", get(board_handler))
        .layer(from_fn(cors_middleware))
        .layer(from_fn(request_tracing_middleware))
        .with_state(state)
}

/// Binds and serves until Ctrl-C.
pub async fn serve(config: &ServerConfig, state: AppState) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.bind.trim(), config.port)
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("invalid bind address {}", config.bind)))?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, backend = state.store.backend_tag(), "server running");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown requested");
            }
        })
        .await?;
    Ok(())
}

/// Store errors as HTTP responses.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::warn!(error = %self.0, status = status.as_u16(), "request rejected");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

fn body_or_400<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError(Error::Validation(rejection.body_text())))
}

async fn healthz_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_tasks_handler(State(state): State<AppState>) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.store.list_tasks().await?))
}

async fn create_task_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewTask>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let fields = body_or_400(payload)?;
    tracing::debug!(?fields, "create task");
    let task = state.store.insert_task(fields).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<TaskPatch>, JsonRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let patch = body_or_400(payload)?;
    state.store.update_task(&id, patch).await?;
    Ok(Json(json!({ "message": "Updated" })))
}

async fn delete_task_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.store.delete_task(&id).await?;
    Ok(Json(json!({ "message": "Deleted" })))
}

#[derive(Debug, Deserialize)]
struct BoardQuery {
    today: Option<String>,
}

async fn board_handler(
    State(state): State<AppState>,
    Query(query): Query<BoardQuery>,
) -> ApiResult<Json<BoardView>> {
    let reference = reference_for_day(query.today.as_deref(), state.clock.as_ref())?;
    let tasks = state.store.list_tasks().await?;
    Ok(Json(BoardView::build(&tasks, &reference)))
}

/// Permissive CORS: the browser UI is served from another origin.
async fn cors_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };
    let headers = response.headers_mut();
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,PUT,DELETE,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type"),
    );
    response
}

async fn request_tracing_middleware(request: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let route = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty() && value.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let span = tracing::info_span!(
        "http.request",
        request_id = %request_id,
        method = %method,
        route = %route,
    );

    let mut response = next.run(request).instrument(span.clone()).await;
    span.in_scope(|| {
        tracing::info!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request complete"
        );
    });
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
