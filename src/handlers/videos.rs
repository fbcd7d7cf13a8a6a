use axum::extract::{Extension, State};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::Video;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Path, Query, UploadForm};
use crate::services::{Page, PublishInput, VideoListQuery, VideoService};

/// GET /api/v1/videos
pub async fn list(State(state): State<AppState>, Query(params): Query<VideoListQuery>) -> ApiResult<Page<Video>> {
    let page = VideoService::new(&state).list(&params).await?;
    Ok(ApiResponse::ok(page, "Videos fetched successfully"))
}

/// POST /api/v1/videos (multipart `title`, `description`, `videoFile`, `thumbnail`)
pub async fn publish(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    form: UploadForm,
) -> ApiResult<Video> {
    let input = PublishInput {
        title: form.text("title").map(str::to_string),
        description: form.text("description").map(str::to_string),
        video_file: form.file("videoFile"),
        thumbnail: form.file("thumbnail"),
    };
    let video = VideoService::new(&state).publish(user.id, input).await?;
    Ok(ApiResponse::created(video, "Video published successfully"))
}

/// GET /api/v1/videos/:videoId
pub async fn get(State(state): State<AppState>, Path(video_id): Path<String>) -> ApiResult<Video> {
    let video = VideoService::new(&state).get(&video_id).await?;
    Ok(ApiResponse::ok(video, "Video fetched successfully"))
}

/// PATCH /api/v1/videos/:videoId (multipart `title`, `description`, `thumbnail`)
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<String>,
    form: UploadForm,
) -> ApiResult<Video> {
    let video = VideoService::new(&state)
        .update(user.id, &video_id, form.text("title"), form.text("description"), form.file("thumbnail"))
        .await?;
    Ok(ApiResponse::ok(video, "Video updated successfully"))
}

/// DELETE /api/v1/videos/:videoId
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<String>,
) -> ApiResult<Value> {
    VideoService::new(&state).delete(user.id, &video_id).await?;
    Ok(ApiResponse::ok(json!({}), "Video deleted successfully"))
}

/// PATCH /api/v1/videos/toggle/publish/:videoId
pub async fn toggle_publish(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<String>,
) -> ApiResult<Video> {
    let video = VideoService::new(&state).toggle_publish(user.id, &video_id).await?;
    let message = if video.is_published { "Video published" } else { "Video unpublished" };
    Ok(ApiResponse::ok(video, message))
}
