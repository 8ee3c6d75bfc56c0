//! HTTP server implementation for the board.
//!
//! This module provides the axum-based HTTP server that serves the board UI
//! and exposes the task API.

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::{get, patch, post},
};
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use super::templates;
use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::markdown;
use crate::types::{Task, TaskChanges, TimestampInput};

/// Board server state shared across handlers.
#[derive(Clone)]
pub struct BoardServer {
    /// Reference to the task database.
    db: Arc<Database>,
}

impl BoardServer {
    /// Create a new board server instance.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Get the database reference.
    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }
}

/// Health check response.
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Deserialize a field that distinguishes "absent" from "present null":
/// absent stays `None` via the serde default, `null` becomes `Some(None)`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// JS-truthiness coercion for `isCompleted`, matching what loose clients
/// actually send (booleans, 0/1, strings).
fn truthy_option<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Value = Deserialize::deserialize(deserializer)?;
    Ok(Some(truthy(&value)))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Spawn position for cards created without coordinates.
/// Nanosecond jitter is plenty of randomness here and avoids a rand dependency.
fn spawn_offset() -> (f64, f64) {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);

    let x = 100.0 + (nanos % 50) as f64;
    let y = 100.0 + ((nanos / 50) % 50) as f64;
    (x, y)
}

/// Request body for task creation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTaskRequest {
    content: Option<String>,
    x: Option<f64>,
    y: Option<f64>,
    deadline: Option<TimestampInput>,
    shame_message: Option<String>,
    webhook_url: Option<String>,
}

/// Request body for partial task updates. `isPunished` is not a field
/// here: the punished flag belongs to the sweep alone, and unknown JSON
/// fields are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateTaskRequest {
    content: Option<String>,
    x: Option<f64>,
    y: Option<f64>,
    #[serde(default, deserialize_with = "truthy_option")]
    is_completed: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    deadline: Option<Option<TimestampInput>>,
    shame_message: Option<String>,
    webhook_url: Option<String>,
}

/// Request body for checkbox toggling. `line` is the 1-based source line.
#[derive(Debug, Deserialize)]
struct ToggleCheckboxRequest {
    line: usize,
}

/// Root endpoint - serves the board page.
async fn board() -> Html<&'static str> {
    Html(templates::BOARD_TEMPLATE)
}

/// List all tasks.
async fn list_tasks(State(state): State<BoardServer>) -> ApiResult<Json<Vec<Task>>> {
    let tasks = state.db().list_tasks().map_err(ApiError::database)?;
    Ok(Json(tasks))
}

/// Create a task. `content` is required and non-blank; position defaults
/// to a randomized on-screen offset.
async fn create_task(
    State(state): State<BoardServer>,
    Json(request): Json<CreateTaskRequest>,
) -> ApiResult<impl IntoResponse> {
    let content = request.content.unwrap_or_default();
    if content.trim().is_empty() {
        return Err(ApiError::missing_field("content"));
    }

    let deadline = match request.deadline {
        Some(input) => Some(
            input
                .into_millis()
                .map_err(|e| ApiError::invalid_value("deadline", e))?,
        ),
        None => None,
    };

    let (default_x, default_y) = spawn_offset();
    let task = state
        .db()
        .create_task(
            content,
            request.x.unwrap_or(default_x),
            request.y.unwrap_or(default_y),
            deadline,
            request.shame_message.unwrap_or_default(),
            request.webhook_url.unwrap_or_default(),
        )
        .map_err(ApiError::database)?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// Partially update a task. Unset fields retain their stored values;
/// `deadline: null` clears the deadline.
async fn update_task(
    State(state): State<BoardServer>,
    Path(task_id): Path<String>,
    Json(request): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    let deadline = match request.deadline {
        Some(Some(input)) => Some(Some(
            input
                .into_millis()
                .map_err(|e| ApiError::invalid_value("deadline", e))?,
        )),
        Some(None) => Some(None),
        None => None,
    };

    let changes = TaskChanges {
        content: request.content,
        x: request.x,
        y: request.y,
        is_completed: request.is_completed,
        deadline,
        shame_message: request.shame_message,
        webhook_url: request.webhook_url,
    };

    match state
        .db()
        .update_task(&task_id, changes)
        .map_err(ApiError::database)?
    {
        Some(task) => Ok(Json(task)),
        None => Err(ApiError::task_not_found(&task_id)),
    }
}

/// Delete a task.
async fn delete_task(
    State(state): State<BoardServer>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<Value>> {
    if state
        .db()
        .delete_task(&task_id)
        .map_err(ApiError::database)?
    {
        Ok(Json(json!({ "message": "Task deleted successfully" })))
    } else {
        Err(ApiError::task_not_found(&task_id))
    }
}

/// Toggle the checkbox on one source line of the task content. When the
/// line has no checkbox token the store write is suppressed and the task
/// comes back unchanged.
async fn toggle_checkbox(
    State(state): State<BoardServer>,
    Path(task_id): Path<String>,
    Json(request): Json<ToggleCheckboxRequest>,
) -> ApiResult<Json<Task>> {
    let Some(task) = state.db().get_task(&task_id).map_err(ApiError::database)? else {
        return Err(ApiError::task_not_found(&task_id));
    };

    let Some(content) = markdown::toggle_checkbox(&task.content, request.line) else {
        debug!(task_id = %task_id, line = request.line, "checkbox toggle was a no-op");
        return Ok(Json(task));
    };

    let changes = TaskChanges {
        content: Some(content),
        ..TaskChanges::default()
    };
    match state
        .db()
        .update_task(&task_id, changes)
        .map_err(ApiError::database)?
    {
        Some(task) => Ok(Json(task)),
        None => Err(ApiError::task_not_found(&task_id)),
    }
}

/// Render a task's markdown content to an HTML fragment.
async fn render_task(
    State(state): State<BoardServer>,
    Path(task_id): Path<String>,
) -> ApiResult<Html<String>> {
    let Some(task) = state.db().get_task(&task_id).map_err(ApiError::database)? else {
        return Err(ApiError::task_not_found(&task_id));
    };
    Ok(Html(markdown::render_markdown(&task.content)))
}

/// Health check endpoint.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the router with all routes.
pub fn build_router(state: BoardServer) -> Router {
    // Single-user tool; keep CORS wide open
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(board))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/{task_id}",
            patch(update_task).delete(delete_task),
        )
        .route("/api/tasks/{task_id}/checkbox", post(toggle_checkbox))
        .route("/api/tasks/{task_id}/render", get(render_task))
        .route("/api/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on the specified port.
///
/// Returns a oneshot sender that can be used to signal shutdown,
/// and the actual address the server is bound to.
pub async fn start_server(
    db: Arc<Database>,
    port: u16,
) -> anyhow::Result<(oneshot::Sender<()>, SocketAddr)> {
    let state = BoardServer::new(db);
    let app = build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("Board server listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Board server shutting down");
            })
            .await
        {
            tracing::error!("Board server error: {}", e);
        }
    });

    Ok((shutdown_tx, bound_addr))
}
