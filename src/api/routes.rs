//! HTTP route handlers.

use std::sync::Arc;

use axum::middleware;
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::accounts::AccountService;
use crate::config::Config;
use crate::error::Error;
use crate::store::{self, NewTask, Task, TaskFilter, TaskPatch};
use crate::tasks::TaskService;

use super::auth::{self, AuthUser};
use super::types::*;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Registration and login
    pub accounts: AccountService,
    /// Owner-scoped task operations
    pub tasks: TaskService,
}

/// Map a service error to an HTTP response.
pub(super) fn error_response(err: Error) -> (StatusCode, String) {
    let status = match &err {
        Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::NotFound => StatusCode::NOT_FOUND,
        Error::Conflict(_) => StatusCode::CONFLICT,
        Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
        Error::Storage(_) => {
            tracing::error!("Storage failure: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let stores = store::create_store(config.store, config.data_dir.clone()).await?;

    let state = Arc::new(AppState {
        accounts: AccountService::new(stores.users),
        tasks: TaskService::new(stores.tasks),
        config: config.clone(),
    });

    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/api/tasks", post(create_task))
        .route("/api/tasks", get(list_tasks))
        .route("/api/tasks/:id", get(get_task))
        .route("/api/tasks/:id", axum::routing::patch(update_task))
        .route("/api/tasks/:id", axum::routing::delete(delete_task))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_auth,
        ));

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::clone(&state));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for SIGINT/SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(draft): Json<NewTask>,
) -> Result<Json<Task>, (StatusCode, String)> {
    state
        .tasks
        .create(user.id, draft)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(filter): Query<TaskFilter>,
) -> Result<Json<Vec<Task>>, (StatusCode, String)> {
    state
        .tasks
        .list(user.id, filter)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<Task>, (StatusCode, String)> {
    state
        .tasks
        .get(user.id, id)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>, (StatusCode, String)> {
    state
        .tasks
        .update(user.id, id, patch)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteTaskResponse>, (StatusCode, String)> {
    state
        .tasks
        .delete(user.id, id)
        .await
        .map(|success| Json(DeleteTaskResponse { success }))
        .map_err(error_response)
}
