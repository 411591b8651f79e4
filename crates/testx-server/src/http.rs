//! HTTP routes of a running server

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use enumset::EnumSet;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::{debug, trace};

use crate::api::{ApiMethod, ApiSurface};
use crate::backend::Backend;
use crate::errors::ServerError;
use crate::graphql::{GraphQLRequest, GraphQLResponse};
use crate::health::{Health, HealthCheck};
use crate::server::ServerOptions;

/// Route of the remote control surface
pub const CONTROL_PATH: &str = "/testx/{method}";

pub(crate) fn router(
    backend: Arc<Backend>,
    options: &ServerOptions,
    health_check: Option<HealthCheck>,
) -> Router {
    let mut router = Router::new()
        .route(&options.graphql_path, post(graphql_endpoint))
        .with_state(backend.clone());

    if options.control {
        let control_router = Router::new()
            .route(CONTROL_PATH, post(control_endpoint))
            .with_state(ControlState { backend });
        router = router.merge(control_router);
    }

    if let Some(health_check) = health_check {
        let health_router = Router::new()
            .route(&health_check.config().path, get(health_endpoint))
            .with_state(health_check.clone());
        router = router.merge(health_router);
    }

    router.layer(TraceLayer::new_for_http())
}

async fn graphql_endpoint(
    State(backend): State<Arc<Backend>>,
    Json(request): Json<GraphQLRequest>,
) -> Json<GraphQLResponse> {
    Json(backend.execute(request).await)
}

/// Health check endpoint handler
async fn health_endpoint(State(health_check): State<HealthCheck>) -> (StatusCode, Json<Health>) {
    let (health, status_code) = health_check.get_health_state();

    trace!(?health, "health check");

    (status_code, Json(health))
}

#[derive(Clone)]
struct ControlState {
    backend: Arc<Backend>,
}

impl ApiSurface for ControlState {
    fn api_methods(&self) -> EnumSet<ApiMethod> {
        EnumSet::all()
    }
}

#[derive(Debug, thiserror::Error)]
enum ControlError {
    #[error("Unknown testx API method: {0}")]
    UnknownMethod(String),

    #[error("{0} can't be invoked remotely")]
    Lifecycle(ApiMethod),

    #[error(transparent)]
    Server(#[from] ServerError),
}

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        let status = match &self {
            ControlError::UnknownMethod(_) => StatusCode::NOT_FOUND,
            ControlError::Lifecycle(_) => StatusCode::METHOD_NOT_ALLOWED,
            ControlError::Server(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

async fn control_endpoint(
    State(state): State<ControlState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ControlError> {
    let method = match ApiMethod::from_name(&name) {
        Some(method) if state.api_methods().contains(method) => method,
        _ => return Err(ControlError::UnknownMethod(name)),
    };
    debug!(%method, "Control request");

    let backend = &state.backend;
    let reply = match method {
        ApiMethod::SetData => {
            let data: Value = serde_json::from_slice(&body).map_err(ServerError::from)?;
            backend.set_data(&data).await?;
            json!({ "ok": true })
        }
        ApiMethod::GetData => backend.get_data().await,
        ApiMethod::ResetData => {
            backend.reset_data().await;
            json!({ "ok": true })
        }
        ApiMethod::GetGraphQlSchema => json!({ "schema": backend.graphql_schema() }),
        ApiMethod::GetDatabaseSchema => json!({ "schema": backend.database_schema() }),
        ApiMethod::Bootstrap | ApiMethod::Start | ApiMethod::Close => {
            return Err(ControlError::Lifecycle(method));
        }
    };
    Ok(Json(reply))
}
