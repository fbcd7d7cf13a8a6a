use axum::extract::{Extension, State};
use serde_json::{json, Value};

use super::{ContentBody, PageParams};
use crate::app::AppState;
use crate::database::models::Comment;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody, Path, Query};
use crate::services::{CommentService, Page};

/// GET /api/v1/comments/:videoId
pub async fn list(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    Query(params): Query<PageParams>,
) -> ApiResult<Page<Comment>> {
    let page = CommentService::new(&state)
        .list_for_video(&video_id, params.page.as_deref(), params.limit.as_deref())
        .await?;
    Ok(ApiResponse::ok(page, "Comments fetched successfully"))
}

/// POST /api/v1/comments/:videoId
pub async fn add(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<String>,
    JsonBody(body): JsonBody<ContentBody>,
) -> ApiResult<Comment> {
    let comment = CommentService::new(&state).add(user.id, &video_id, body.content.as_deref()).await?;
    Ok(ApiResponse::created(comment, "Comment added successfully"))
}

/// PATCH /api/v1/comments/c/:commentId
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(comment_id): Path<String>,
    JsonBody(body): JsonBody<ContentBody>,
) -> ApiResult<Comment> {
    let comment = CommentService::new(&state)
        .update(user.id, &comment_id, body.content.as_deref())
        .await?;
    Ok(ApiResponse::ok(comment, "Comment updated successfully"))
}

/// DELETE /api/v1/comments/c/:commentId
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(comment_id): Path<String>,
) -> ApiResult<Value> {
    CommentService::new(&state).delete(user.id, &comment_id).await?;
    Ok(ApiResponse::ok(json!({}), "Comment deleted successfully"))
}
