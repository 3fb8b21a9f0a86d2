//! `GET /healthz` — liveness/readiness probe, pinging the database pool.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::state::AppState;

pub async fn healthz(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.pool.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ok",
                "database": state.pool.id(),
                "postgres": state.pool.postgres_version().to_string(),
                "postgis": state.pool.postgis_version().to_string(),
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "error", "message": e.to_string() })),
        ),
    }
}
