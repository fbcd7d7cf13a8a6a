use axum::extract::{Extension, State};
use uuid::Uuid;

use crate::app::AppState;
use crate::database::models::{Like, LikeTarget};
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Path};
use crate::services::{parse_id, LikeService, Toggle};

pub async fn toggle_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<String>,
) -> ApiResult<Toggle<Like>> {
    let target = LikeTarget::Video(parse_id(&video_id, "videoId")?);
    toggle(&state, user.id, target).await
}

pub async fn toggle_comment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(comment_id): Path<String>,
) -> ApiResult<Toggle<Like>> {
    let target = LikeTarget::Comment(parse_id(&comment_id, "commentId")?);
    toggle(&state, user.id, target).await
}

pub async fn toggle_tweet(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(tweet_id): Path<String>,
) -> ApiResult<Toggle<Like>> {
    let target = LikeTarget::Tweet(parse_id(&tweet_id, "tweetId")?);
    toggle(&state, user.id, target).await
}

/// GET /api/v1/likes/videos
pub async fn liked_videos(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Vec<Like>> {
    let likes = LikeService::new(&state).liked_videos(user.id).await?;
    Ok(ApiResponse::ok(likes, "Liked videos fetched successfully"))
}

async fn toggle(state: &AppState, user: Uuid, target: LikeTarget) -> ApiResult<Toggle<Like>> {
    let outcome = LikeService::new(state).toggle(user, target).await?;
    let message = if outcome.active { "Like added" } else { "Like removed" };
    Ok(ApiResponse::ok(outcome, message))
}
