//! HTTP surface for pivot associations.
//!
//! Handlers run the synchronous core on the blocking pool, one request at a
//! time per connection lock, and answer the action envelope with its status.
//! Bodies are JSON only; unreadable bodies and queries answer the same
//! envelope with status 400.

pub mod config;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use log::{error, warn};
use pivot_core::action::{
    AddRequest, BelongsToRequest, CreateRequest, ListRequest, RemovePairRequest, RemoveRequest,
    SaveObjectRequest, WidgetRequest,
};
use pivot_core::{ActionResponse, ObjectRegistry, PivotActions};
use rusqlite::Connection;
use serde_json::json;
use std::fmt::Display;
use std::sync::{Arc, Mutex};

/// Shared server state: one connection and the object registry.
#[derive(Clone)]
pub struct AppState {
    conn: Arc<Mutex<Connection>>,
    registry: Arc<ObjectRegistry>,
}

impl AppState {
    pub fn new(conn: Connection, registry: ObjectRegistry) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            registry: Arc::new(registry),
        }
    }

    /// Runs one action against the locked connection on the blocking pool.
    async fn run<F>(&self, action: &'static str, run: F) -> Response
    where
        F: FnOnce(&PivotActions<'_>) -> ActionResponse + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let registry = Arc::clone(&self.registry);
        let joined = tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| "connection lock poisoned")?;
            Ok::<_, &'static str>(run(&PivotActions::new(&guard, &registry)))
        })
        .await;

        match joined {
            Ok(Ok(response)) => reply(response),
            Ok(Err(reason)) => internal_error(action, reason),
            Err(err) => internal_error(action, &err.to_string()),
        }
    }
}

/// Builds the router with every pivot route.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/pivot/add", post(add_pivots))
        .route("/pivot/create", post(create_pivots))
        .route("/pivot/remove", post(remove_pivot))
        .route("/pivot/remove-pair", post(remove_pivot_pair))
        .route("/pivot/list", get(list_pivots))
        .route("/pivot/belongs-to", get(belongs_to))
        .route("/pivot/widget", get(pivot_widget))
        .route("/object/save", post(save_object))
        .with_state(state)
}

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": pivot_core::core_version() }))
}

/// POST /pivot/add
async fn add_pivots(
    State(state): State<AppState>,
    body: Result<Json<AddRequest>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(req)) => state.run("add", move |actions| actions.add(&req)).await,
        Err(rejection) => rejected("add", &rejection),
    }
}

/// POST /pivot/create
async fn create_pivots(
    State(state): State<AppState>,
    body: Result<Json<CreateRequest>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(req)) => state.run("create", move |actions| actions.create(&req)).await,
        Err(rejection) => rejected("create", &rejection),
    }
}

/// POST /pivot/remove
async fn remove_pivot(
    State(state): State<AppState>,
    body: Result<Json<RemoveRequest>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(req)) => state.run("remove", move |actions| actions.remove(&req)).await,
        Err(rejection) => rejected("remove", &rejection),
    }
}

/// POST /pivot/remove-pair
async fn remove_pivot_pair(
    State(state): State<AppState>,
    body: Result<Json<RemovePairRequest>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(req)) => {
            state
                .run("remove_pair", move |actions| actions.remove_pair(&req))
                .await
        }
        Err(rejection) => rejected("remove_pair", &rejection),
    }
}

/// GET /pivot/list
async fn list_pivots(
    State(state): State<AppState>,
    query: Result<Query<ListRequest>, QueryRejection>,
) -> Response {
    match query {
        Ok(Query(req)) => state.run("list", move |actions| actions.list(&req)).await,
        Err(rejection) => rejected("list", &rejection),
    }
}

/// GET /pivot/belongs-to
async fn belongs_to(
    State(state): State<AppState>,
    query: Result<Query<BelongsToRequest>, QueryRejection>,
) -> Response {
    match query {
        Ok(Query(req)) => {
            state
                .run("belongs_to", move |actions| actions.belongs_to(&req))
                .await
        }
        Err(rejection) => rejected("belongs_to", &rejection),
    }
}

/// GET /pivot/widget
async fn pivot_widget(
    State(state): State<AppState>,
    query: Result<Query<WidgetRequest>, QueryRejection>,
) -> Response {
    match query {
        Ok(Query(req)) => state.run("widget", move |actions| actions.widget(&req)).await,
        Err(rejection) => rejected("widget", &rejection),
    }
}

/// POST /object/save
async fn save_object(
    State(state): State<AppState>,
    body: Result<Json<SaveObjectRequest>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(req)) => {
            state
                .run("save_object", move |actions| actions.save_object(&req))
                .await
        }
        Err(rejection) => rejected("save_object", &rejection),
    }
}

/// Answers an unreadable body or query with the 400 feedback envelope.
fn rejected(action: &str, rejection: &dyn Display) -> Response {
    warn!(
        "event=http_request module=server status=rejected action={} error={}",
        action, rejection
    );
    reply(ActionResponse::invalid(format!("Invalid request: {rejection}")))
}

fn reply(response: ActionResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response)).into_response()
}

fn internal_error(action: &str, reason: &str) -> Response {
    error!(
        "event=http_request module=server status=error action={} error={}",
        action, reason
    );
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "feedbacks": [{ "level": "error", "msg": "Internal server error." }]
        })),
    )
        .into_response()
}
