use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::agent::checkpoint::CheckpointError;
use crate::agent::graph::GraphError;
use crate::pipeline::index::IndexError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// HTTP-boundary error type (spec §6: "Status 500 with `detail` on
/// internal failure"; spec §7: `IndexAbsent`/`CheckpointUnavailable`
/// also map to a 5xx-class error).
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("no index has been built or loaded")]
    IndexAbsent,
    #[error("checkpoint store unreachable")]
    CheckpointUnavailable,
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            AppError::IndexAbsent => (
                StatusCode::SERVICE_UNAVAILABLE,
                "no vector index is available".to_string(),
            ),
            AppError::CheckpointUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "checkpoint store is unreachable".to_string(),
            ),
            AppError::Internal(detail) => {
                tracing::error!(%detail, "internal error handling request");
                (StatusCode::INTERNAL_SERVER_ERROR, detail.clone())
            }
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

impl From<GraphError> for AppError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Checkpoint(CheckpointError::StoreUnreachable(_)) => {
                AppError::CheckpointUnavailable
            }
            GraphError::Retrieval(IndexError::IndexAbsent) => AppError::IndexAbsent,
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<CheckpointError> for AppError {
    fn from(_: CheckpointError) -> Self {
        AppError::CheckpointUnavailable
    }
}

impl From<IndexError> for AppError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::IndexAbsent => AppError::IndexAbsent,
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn index_absent_returns_503() {
        let response = AppError::IndexAbsent.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn internal_returns_500_with_detail() {
        let response = AppError::Internal("boom".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["detail"], "boom");
    }

    #[test]
    fn graph_error_retrieval_index_absent_maps_to_index_absent() {
        let err: AppError = GraphError::Retrieval(IndexError::IndexAbsent).into();
        assert!(matches!(err, AppError::IndexAbsent));
    }
}
