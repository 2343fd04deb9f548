use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::types::{Ack, HealthStatus, ServiceStatus, SessionCreated, VersionInfo};
use service::db::fuel_session_service;

use crate::errors::ApiError;

pub const SERVICE_NAME: &str = "fuelsplit-backend";

/// Shared handler state: the pooled store connection.
#[derive(Clone)]
pub struct ServerState {
    pub db: DatabaseConnection,
}

#[utoipa::path(get, path = "/", tag = "status", responses((status = 200, description = "Service marker")))]
pub async fn root() -> Json<ServiceStatus> {
    Json(ServiceStatus { ok: true, service: SERVICE_NAME })
}

#[utoipa::path(get, path = "/api/health", tag = "status", responses((status = 200, description = "Liveness probe with server time")))]
pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus { ok: true, service: SERVICE_NAME, time: Utc::now().to_rfc3339() })
}

#[utoipa::path(get, path = "/api/version", tag = "status", responses((status = 200, description = "Deploy marker")))]
pub async fn version() -> Json<VersionInfo> {
    Json(VersionInfo { ok: true, version: env!("CARGO_PKG_VERSION"), time: Utc::now().to_rfc3339() })
}

/// Up to 50 most recent sessions, newest first, as merged documents.
#[utoipa::path(get, path = "/api/sessions", tag = "sessions", responses((status = 200, description = "Merged session documents, newest first"), (status = 500, description = "Storage failure")))]
pub async fn list_sessions(State(state): State<ServerState>) -> Result<Json<Vec<Value>>, ApiError> {
    let docs = fuel_session_service::list_recent_sessions(&state.db).await?;
    Ok(Json(docs))
}

/// Persist one session document; responds with the store-assigned id.
#[utoipa::path(post, path = "/api/sessions", tag = "sessions", request_body = crate::openapi::SessionPayloadDoc, responses((status = 200, description = "Created"), (status = 400, description = "Malformed body"), (status = 500, description = "Storage failure")))]
pub async fn create_session(
    State(state): State<ServerState>,
    Json(body): Json<Value>,
) -> Result<Json<SessionCreated>, ApiError> {
    let row = fuel_session_service::create_session(&state.db, &body).await?;
    Ok(Json(SessionCreated { ok: true, id: row.id }))
}

/// Delete every stored session. Global and irreversible.
#[utoipa::path(delete, path = "/api/sessions", tag = "sessions", responses((status = 200, description = "All rows deleted"), (status = 500, description = "Storage failure")))]
pub async fn clear_sessions(State(state): State<ServerState>) -> Result<Json<Ack>, ApiError> {
    fuel_session_service::clear_sessions(&state.db).await?;
    Ok(Json(Ack { ok: true }))
}

/// Build the full application router: the root marker, the CORS-wrapped
/// /api group, and the OpenAPI UI.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    // Cross-origin access applies to the /api prefix only; the browser
    // client lives on a separate origin.
    let api = Router::new()
        .route("/api/health", get(health))
        .route("/api/version", get(version))
        .route(
            "/api/sessions",
            get(list_sessions).post(create_session).delete(clear_sessions),
        )
        .layer(cors);

    let app = Router::new()
        .route("/", get(root))
        .merge(api)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        );

    app.merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", crate::openapi::ApiDoc::openapi()))
}
