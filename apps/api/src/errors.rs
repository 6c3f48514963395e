use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::generation::pipeline::{Rejection, RejectionKind};

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A pipeline terminal state other than `Accepted`.
    #[error("Generation rejected ({:?}): {}", .0.kind, .0.detail)]
    Rejected(Rejection),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Rejected(rejection) => {
                // The detail stays in the logs; the pipeline already logged the specifics.
                tracing::debug!("Rejection detail: {}", rejection.detail);
                (
                    rejection_status(rejection.kind),
                    rejection.kind.code(),
                    rejection.human_message.clone(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

fn rejection_status(kind: RejectionKind) -> StatusCode {
    match kind {
        RejectionKind::GenerationTimeout => StatusCode::GATEWAY_TIMEOUT,
        RejectionKind::GenerationProviderError => StatusCode::BAD_GATEWAY,
        // Client went away; nobody reads this response.
        RejectionKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        RejectionKind::InputBlocked
        | RejectionKind::UnparseableResponse
        | RejectionKind::InvalidArtifactStructure
        | RejectionKind::FabricationDetected => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_rejection_maps_to_generic_message() {
        let rejection = Rejection::new(
            RejectionKind::FabricationDetected,
            "suspicious claims: [\"worked at Google\"]",
        );
        let response = AppError::Rejected(rejection).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "FABRICATION_DETECTED");
        assert!(!body.to_string().contains("Google"));
    }

    #[test]
    fn test_transient_kinds_map_to_gateway_statuses() {
        assert_eq!(
            rejection_status(RejectionKind::GenerationTimeout),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            rejection_status(RejectionKind::GenerationProviderError),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            rejection_status(RejectionKind::InputBlocked),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn test_internal_error_hides_cause() {
        let response = AppError::Internal(anyhow::anyhow!("store exploded")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(!body.to_string().contains("exploded"));
    }
}
