use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Map;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{ensure_owner, optional, parse_id, Page, PageRequest, PaginatedQueryService, ServiceError, ServiceResult};
use crate::app::AppState;
use crate::config::PaginationConfig;
use crate::database::models::{NewVideo, Video};
use crate::database::{Repository, Update};
use crate::filter::{Filter, SortDirection, SortSpec};
use crate::media::MediaStorage;

const SORTABLE_FIELDS: [&str; 4] = ["createdAt", "views", "duration", "title"];

/// Raw listing parameters as they arrive on the query string
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub query: Option<String>,
    pub user_id: Option<String>,
    pub sort_by: Option<String>,
    pub sort_type: Option<String>,
}

#[derive(Debug, Default)]
pub struct PublishInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub video_file: Option<PathBuf>,
    pub thumbnail: Option<PathBuf>,
}

pub struct VideoService {
    videos: Repository<Video>,
    pages: PaginatedQueryService,
    media: Arc<dyn MediaStorage>,
    pagination: PaginationConfig,
}

impl VideoService {
    pub fn new(state: &AppState) -> Self {
        Self {
            videos: Repository::new(state.store.clone()),
            pages: PaginatedQueryService::new(state.store.clone()),
            media: state.media.clone(),
            pagination: state.config.pagination.clone(),
        }
    }

    /// Paginated listing with optional owner filter, title search and sort
    pub async fn list(&self, params: &VideoListQuery) -> ServiceResult<Page<Video>> {
        let mut filter = Filter::all();
        if let Some(user_id) = optional(params.user_id.as_deref()) {
            filter = filter.and_eq("owner", parse_id(&user_id, "userId")?.to_string());
        }
        if let Some(query) = optional(params.query.as_deref()) {
            filter = filter
                .and_contains("title", &query)
                .map_err(|e| ServiceError::validation(e.to_string()))?;
        }
        let sort = sort_spec(params.sort_by.as_deref(), params.sort_type.as_deref())?;
        let request = PageRequest::from_raw(params.page.as_deref(), params.limit.as_deref(), &self.pagination);

        Ok(self.pages.query(&filter, sort, request).await?)
    }

    pub async fn publish(&self, owner: Uuid, input: PublishInput) -> ServiceResult<Video> {
        let (Some(title), Some(description)) = (optional(input.title.as_deref()), optional(input.description.as_deref()))
        else {
            return Err(ServiceError::validation("Title and description are required"));
        };
        let video_path = input.video_file.ok_or_else(|| ServiceError::validation("Video file is required"))?;
        let thumbnail_path = input.thumbnail.ok_or_else(|| ServiceError::validation("Thumbnail is required"))?;

        let (video_file, thumbnail) =
            futures::try_join!(self.media.upload(&video_path), self.media.upload(&thumbnail_path))?;

        let video = self
            .videos
            .create(&NewVideo {
                video_file: video_file.url,
                thumbnail: thumbnail.url,
                title,
                description,
                duration: video_file.duration.unwrap_or(0.0),
                views: 0,
                is_published: true,
                owner,
            })
            .await?;

        info!("User {} published video {}", owner, video.id);
        Ok(video)
    }

    pub async fn get(&self, video_id: &str) -> ServiceResult<Video> {
        let id = parse_id(video_id, "videoId")?;
        self.find(id).await
    }

    pub async fn update(
        &self,
        requester: Uuid,
        video_id: &str,
        title: Option<&str>,
        description: Option<&str>,
        thumbnail: Option<PathBuf>,
    ) -> ServiceResult<Video> {
        let id = parse_id(video_id, "videoId")?;
        let video = self.find(id).await?;
        ensure_owner(video.owner, requester, "update this video")?;

        let title = optional(title);
        let description = optional(description);
        if title.is_none() && description.is_none() && thumbnail.is_none() {
            return Err(ServiceError::validation("At least one field is required"));
        }

        let mut fields = Map::new();
        if let Some(title) = title {
            fields.insert("title".to_string(), title.into());
        }
        if let Some(description) = description {
            fields.insert("description".to_string(), description.into());
        }
        let new_thumbnail = match thumbnail {
            Some(path) => Some(self.media.upload(&path).await?),
            None => None,
        };
        if let Some(asset) = &new_thumbnail {
            fields.insert("thumbnail".to_string(), asset.url.clone().into());
        }

        let updated = self
            .videos
            .update(id, &Update::Set(fields))
            .await?
            .ok_or_else(|| ServiceError::not_found("Video not found"))?;

        if new_thumbnail.is_some() {
            if let Err(e) = self.media.delete(&video.thumbnail).await {
                warn!("Could not delete previous thumbnail of video {}: {}", id, e);
            }
        }
        Ok(updated)
    }

    /// Removes the record, then its media. Media failures surface without restoring the record.
    pub async fn delete(&self, requester: Uuid, video_id: &str) -> ServiceResult<()> {
        let id = parse_id(video_id, "videoId")?;
        let video = self.find(id).await?;
        ensure_owner(video.owner, requester, "delete this video")?;

        if !self.videos.delete(id).await? {
            return Err(ServiceError::not_found("Video not found"));
        }
        info!("User {} deleted video {}", requester, id);

        for url in [&video.video_file, &video.thumbnail] {
            if let Err(e) = self.media.delete(url).await {
                error!("Video {} deleted but media {} was not: {}", id, url, e);
                return Err(e.into());
            }
        }
        Ok(())
    }

    pub async fn toggle_publish(&self, requester: Uuid, video_id: &str) -> ServiceResult<Video> {
        let id = parse_id(video_id, "videoId")?;
        let video = self.find(id).await?;
        ensure_owner(video.owner, requester, "update this video")?;

        self.videos
            .update(id, &Update::set("isPublished", !video.is_published))
            .await?
            .ok_or_else(|| ServiceError::not_found("Video not found"))
    }

    async fn find(&self, id: Uuid) -> ServiceResult<Video> {
        self.videos
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Video not found"))
    }
}

fn sort_spec(sort_by: Option<&str>, sort_type: Option<&str>) -> ServiceResult<Vec<SortSpec>> {
    let direction = match optional(sort_type).map(|s| s.to_ascii_lowercase()).as_deref() {
        None | Some("asc") => SortDirection::Asc,
        Some("desc") => SortDirection::Desc,
        Some(other) => return Err(ServiceError::validation(format!("Invalid sortType '{}'", other))),
    };
    match optional(sort_by) {
        None => Ok(vec![]),
        Some(field) if SORTABLE_FIELDS.contains(&field.as_str()) => Ok(vec![SortSpec::new(field, direction)]),
        Some(field) => Err(ServiceError::validation(format!(
            "Invalid sortBy '{}', expected one of {}",
            field,
            SORTABLE_FIELDS.join(", ")
        ))),
    }
}
