use crate::error::ApplicationError;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use comment_queue::broker::Broker;
use comment_queue::producer::Publisher;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub success: bool,
    pub message: &'static str,
    pub comment: Comment,
    pub partition: i32,
    pub offset: i64,
}

pub struct ApiState<B> {
    pub publisher: Arc<Publisher<B>>,
    pub topic: Arc<str>,
}

impl<B> Clone for ApiState<B> {
    fn clone(&self) -> Self {
        Self {
            publisher: self.publisher.clone(),
            topic: self.topic.clone(),
        }
    }
}

pub fn router<B: Broker>(state: ApiState<B>) -> Router {
    Router::new()
        .route("/api/v1/comments", post(create_comment::<B>))
        .with_state(state)
}

async fn create_comment<B: Broker>(
    State(state): State<ApiState<B>>,
    body: Result<Json<Comment>, JsonRejection>,
) -> Result<Json<CommentResponse>, ApplicationError> {
    let Json(comment) = body.map_err(|e| ApplicationError::InvalidArgument {
        message: "Invalid request body",
        error: Some(e.body_text()),
    })?;

    if comment.text.is_empty() {
        return Err(ApplicationError::InvalidArgument {
            message: "Comment text cannot be empty",
            error: None,
        });
    }

    let payload = serde_json::to_vec(&comment).map_err(|e| {
        error!("Failed to marshal comment: {:?}", e);
        ApplicationError::Internal {
            message: "Failed to process comment",
        }
    })?;

    let partition_offset = state.publisher.publish(&state.topic, payload).await?;

    Ok(Json(CommentResponse {
        success: true,
        message: "Comment pushed successfully",
        comment,
        partition: *partition_offset.partition(),
        offset: *partition_offset.offset(),
    }))
}
