use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Error taxonomy per spec: each kind maps to exactly one HTTP status.
#[derive(Error, Debug)]
pub enum TileServerError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("permission denied")]
    PermissionDenied,

    #[error("invalid tile coordinates: z={z}, x={x}, y={y}")]
    InvalidCoordinates { z: u8, x: u32, y: u32 },

    #[error("invalid relationship: {0}")]
    InvalidRelationship(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<deadpool_postgres::PoolError> for TileServerError {
    fn from(e: deadpool_postgres::PoolError) -> Self {
        TileServerError::Internal(anyhow::anyhow!("connection pool error: {e}"))
    }
}

impl From<tokio_postgres::Error> for TileServerError {
    fn from(e: tokio_postgres::Error) -> Self {
        TileServerError::Internal(anyhow::anyhow!("postgres error: {e}"))
    }
}

impl IntoResponse for TileServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            TileServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            TileServerError::InvalidCoordinates { .. } => StatusCode::BAD_REQUEST,
            TileServerError::InvalidRelationship(_) => StatusCode::BAD_REQUEST,
            TileServerError::NotFound(_) => StatusCode::NOT_FOUND,
            TileServerError::Unauthorized => StatusCode::UNAUTHORIZED,
            TileServerError::PermissionDenied => StatusCode::FORBIDDEN,
            TileServerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TileServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({
            "status": "error",
            "message": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, TileServerError>;
