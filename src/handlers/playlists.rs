use axum::extract::{Extension, State};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::Playlist;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody, Path};
use crate::services::PlaylistService;

#[derive(Debug, Default, Deserialize)]
pub struct PlaylistBody {
    pub name: Option<String>,
    pub description: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<PlaylistBody>,
) -> ApiResult<Playlist> {
    let playlist = PlaylistService::new(&state)
        .create(user.id, body.name.as_deref(), body.description.as_deref())
        .await?;
    Ok(ApiResponse::created(playlist, "Playlist created successfully"))
}

/// GET /api/v1/playlist/user/:userId
pub async fn for_user(State(state): State<AppState>, Path(user_id): Path<String>) -> ApiResult<Vec<Playlist>> {
    let playlists = PlaylistService::new(&state).for_user(&user_id).await?;
    Ok(ApiResponse::ok(playlists, "User playlists fetched successfully"))
}

pub async fn get(State(state): State<AppState>, Path(playlist_id): Path<String>) -> ApiResult<Playlist> {
    let playlist = PlaylistService::new(&state).get(&playlist_id).await?;
    Ok(ApiResponse::ok(playlist, "Playlist fetched successfully"))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(playlist_id): Path<String>,
    JsonBody(body): JsonBody<PlaylistBody>,
) -> ApiResult<Playlist> {
    let playlist = PlaylistService::new(&state)
        .update(user.id, &playlist_id, body.name.as_deref(), body.description.as_deref())
        .await?;
    Ok(ApiResponse::ok(playlist, "Playlist updated successfully"))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(playlist_id): Path<String>,
) -> ApiResult<Value> {
    PlaylistService::new(&state).delete(user.id, &playlist_id).await?;
    Ok(ApiResponse::ok(json!({}), "Playlist deleted successfully"))
}

/// PATCH /api/v1/playlist/add/:videoId/:playlistId
pub async fn add_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> ApiResult<Playlist> {
    let playlist = PlaylistService::new(&state).add_video(user.id, &video_id, &playlist_id).await?;
    Ok(ApiResponse::ok(playlist, "Video added to playlist"))
}

/// PATCH /api/v1/playlist/remove/:videoId/:playlistId
pub async fn remove_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> ApiResult<Playlist> {
    let playlist = PlaylistService::new(&state)
        .remove_video(user.id, &video_id, &playlist_id)
        .await?;
    Ok(ApiResponse::ok(playlist, "Video removed from playlist"))
}
