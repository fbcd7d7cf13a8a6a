use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

use super::{ensure_owner, optional, parse_id, required, ServiceError, ServiceResult};
use crate::app::AppState;
use crate::database::models::{NewPlaylist, Playlist, Video};
use crate::database::{FindOptions, Repository, Update};
use crate::filter::Filter;

pub struct PlaylistService {
    playlists: Repository<Playlist>,
    videos: Repository<Video>,
}

impl PlaylistService {
    pub fn new(state: &AppState) -> Self {
        Self {
            playlists: Repository::new(state.store.clone()),
            videos: Repository::new(state.store.clone()),
        }
    }

    pub async fn create(&self, owner: Uuid, name: Option<&str>, description: Option<&str>) -> ServiceResult<Playlist> {
        let name = required(name, "name")?;
        let playlist = self
            .playlists
            .create(&NewPlaylist {
                name,
                description: optional(description).unwrap_or_default(),
                videos: vec![],
                owner,
            })
            .await?;
        info!("User {} created playlist {}", owner, playlist.id);
        Ok(playlist)
    }

    pub async fn for_user(&self, user_id: &str) -> ServiceResult<Vec<Playlist>> {
        let owner = parse_id(user_id, "userId")?;
        Ok(self
            .playlists
            .select_any(&Filter::eq("owner", owner.to_string()), &FindOptions::default())
            .await?)
    }

    pub async fn get(&self, playlist_id: &str) -> ServiceResult<Playlist> {
        self.find(parse_id(playlist_id, "playlistId")?).await
    }

    pub async fn update(
        &self,
        requester: Uuid,
        playlist_id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> ServiceResult<Playlist> {
        let id = parse_id(playlist_id, "playlistId")?;
        let playlist = self.find(id).await?;
        ensure_owner(playlist.owner, requester, "update this playlist")?;

        let mut fields = Map::new();
        if let Some(name) = optional(name) {
            fields.insert("name".to_string(), Value::String(name));
        }
        if let Some(description) = optional(description) {
            fields.insert("description".to_string(), Value::String(description));
        }
        if fields.is_empty() {
            return Err(ServiceError::validation("name or description is required"));
        }

        self.playlists
            .update(id, &Update::Set(fields))
            .await?
            .ok_or_else(|| ServiceError::not_found("Playlist not found"))
    }

    pub async fn delete(&self, requester: Uuid, playlist_id: &str) -> ServiceResult<()> {
        let id = parse_id(playlist_id, "playlistId")?;
        let playlist = self.find(id).await?;
        ensure_owner(playlist.owner, requester, "delete this playlist")?;

        self.playlists.delete(id).await?;
        info!("User {} deleted playlist {}", requester, id);
        Ok(())
    }

    /// Append a video; adding one that is already present leaves the playlist unchanged
    pub async fn add_video(&self, requester: Uuid, video_id: &str, playlist_id: &str) -> ServiceResult<Playlist> {
        let video = parse_id(video_id, "videoId")?;
        let id = parse_id(playlist_id, "playlistId")?;
        let playlist = self.find(id).await?;
        ensure_owner(playlist.owner, requester, "add videos to this playlist")?;

        if !self.videos.exists(video).await? {
            return Err(ServiceError::not_found("Video not found"));
        }
        if playlist.videos.contains(&video) {
            return Ok(playlist);
        }

        self.playlists
            .update(id, &Update::Push { field: "videos".to_string(), value: Value::String(video.to_string()) })
            .await?
            .ok_or_else(|| ServiceError::not_found("Playlist not found"))
    }

    pub async fn remove_video(&self, requester: Uuid, video_id: &str, playlist_id: &str) -> ServiceResult<Playlist> {
        let video = parse_id(video_id, "videoId")?;
        let id = parse_id(playlist_id, "playlistId")?;
        let playlist = self.find(id).await?;
        ensure_owner(playlist.owner, requester, "remove videos from this playlist")?;

        if !playlist.videos.contains(&video) {
            return Err(ServiceError::not_found("Video is not in the playlist"));
        }

        self.playlists
            .update(id, &Update::Pull { field: "videos".to_string(), value: Value::String(video.to_string()) })
            .await?
            .ok_or_else(|| ServiceError::not_found("Playlist not found"))
    }

    async fn find(&self, id: Uuid) -> ServiceResult<Playlist> {
        self.playlists
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Playlist not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Collection;
    use crate::services::test_support::state;

    async fn video(state: &AppState) -> Uuid {
        state.store.insert(Collection::Videos, Map::new()).await.unwrap().id
    }

    #[tokio::test]
    async fn add_is_idempotent_and_remove_requires_presence() {
        let (state, _dir) = state();
        let service = PlaylistService::new(&state);
        let owner = Uuid::new_v4();
        let (v1, v2) = (video(&state).await, video(&state).await);
        let playlist = service.create(owner, Some("Favourites"), None).await.unwrap();
        let pid = playlist.id.to_string();
        assert_eq!(playlist.description, "");

        service.add_video(owner, &v1.to_string(), &pid).await.unwrap();
        service.add_video(owner, &v2.to_string(), &pid).await.unwrap();
        let again = service.add_video(owner, &v1.to_string(), &pid).await.unwrap();
        assert_eq!(again.videos, vec![v1, v2]);

        let missing = service.add_video(owner, &Uuid::new_v4().to_string(), &pid).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(m)) if m == "Video not found"));

        let removed = service.remove_video(owner, &v1.to_string(), &pid).await.unwrap();
        assert_eq!(removed.videos, vec![v2]);
        assert!(matches!(
            service.remove_video(owner, &v1.to_string(), &pid).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn ownership_guards_every_mutation() {
        let (state, _dir) = state();
        let service = PlaylistService::new(&state);
        let (owner, intruder) = (Uuid::new_v4(), Uuid::new_v4());
        let v = video(&state).await.to_string();
        let pid = service.create(owner, Some("Mine"), Some("d")).await.unwrap().id.to_string();

        assert!(matches!(service.update(intruder, &pid, None, None).await, Err(ServiceError::Authorization(_))));
        assert!(matches!(service.delete(intruder, &pid).await, Err(ServiceError::Authorization(_))));
        assert!(matches!(service.add_video(intruder, &v, &pid).await, Err(ServiceError::Authorization(_))));
        assert!(matches!(service.remove_video(intruder, &v, &pid).await, Err(ServiceError::Authorization(_))));

        assert!(matches!(service.update(owner, &pid, None, Some("")).await, Err(ServiceError::Validation(_))));
        let renamed = service.update(owner, &pid, Some("Renamed"), None).await.unwrap();
        assert_eq!((renamed.name.as_str(), renamed.description.as_str()), ("Renamed", "d"));

        assert_eq!(service.for_user(&owner.to_string()).await.unwrap().len(), 1);
        service.delete(owner, &pid).await.unwrap();
        assert!(matches!(service.get(&pid).await, Err(ServiceError::NotFound(_))));
        assert!(service.for_user(&owner.to_string()).await.unwrap().is_empty());
    }
}
