use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use comment_queue::error::PublishError;
use serde_json::json;
use tracing::{error, warn};

#[derive(Debug)]
pub enum ApplicationError {
    InvalidArgument {
        message: &'static str,
        error: Option<String>,
    },
    Internal {
        message: &'static str,
    },
    Unavailable(PublishError),
}

impl From<PublishError> for ApplicationError {
    fn from(value: PublishError) -> Self {
        match value {
            PublishError::Validation(e) => ApplicationError::InvalidArgument {
                message: "Invalid comment",
                error: Some(e.to_string()),
            },
            e @ (PublishError::Connection(_) | PublishError::Send { .. }) => {
                ApplicationError::Unavailable(e)
            }
        }
    }
}

impl IntoResponse for ApplicationError {
    fn into_response(self) -> Response {
        match self {
            ApplicationError::InvalidArgument { message, error } => {
                warn!("Rejected request: {message}");
                let body = match error {
                    Some(error) => json!({ "success": false, "message": message, "error": error }),
                    None => json!({ "success": false, "message": message }),
                };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApplicationError::Internal { message } => {
                let body = json!({ "success": false, "message": message });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
            ApplicationError::Unavailable(e) => {
                error!("Failed to push comment to queue: {:?}", anyhow::Error::from(e));
                let body = json!({ "success": false, "message": "Failed to queue comment" });
                (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    #[tokio::test]
    async fn internal_error_is_500() {
        let response = ApplicationError::Internal {
            message: "Failed to process comment",
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            json!({ "success": false, "message": "Failed to process comment" })
        );
    }

    #[tokio::test]
    async fn send_failure_is_503() {
        let error = PublishError::Send {
            topic: "comments".to_owned(),
            source: anyhow::anyhow!("Broker refused write"),
        };

        let response = ApplicationError::from(error).into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
