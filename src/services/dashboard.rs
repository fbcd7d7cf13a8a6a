use serde::Serialize;
use uuid::Uuid;

use super::{Page, PageRequest, PaginatedQueryService, ServiceResult, SubscriptionService};
use crate::app::AppState;
use crate::config::PaginationConfig;
use crate::database::models::Video;
use crate::database::{FindOptions, Repository};
use crate::filter::Filter;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStats {
    pub total_videos: u64,
    pub total_views: u64,
    pub total_subscribers: u64,
}

pub struct DashboardService {
    videos: Repository<Video>,
    subscriptions: SubscriptionService,
    pages: PaginatedQueryService,
    pagination: PaginationConfig,
}

impl DashboardService {
    pub fn new(state: &AppState) -> Self {
        Self {
            videos: Repository::new(state.store.clone()),
            subscriptions: SubscriptionService::new(state),
            pages: PaginatedQueryService::new(state.store.clone()),
            pagination: state.config.pagination.clone(),
        }
    }

    pub async fn stats(&self, channel: Uuid) -> ServiceResult<ChannelStats> {
        let owned = Filter::eq("owner", channel.to_string());
        let videos = self.videos.select_any(&owned, &FindOptions::default()).await?;
        let total_subscribers = self.subscriptions.subscriber_count(channel).await?;

        Ok(ChannelStats {
            total_videos: videos.len() as u64,
            total_views: videos.iter().map(|v| v.views).fold(0u64, u64::saturating_add),
            total_subscribers,
        })
    }

    /// The channel's own videos, paginated in upload order
    pub async fn videos(&self, channel: Uuid, page: Option<&str>, limit: Option<&str>) -> ServiceResult<Page<Video>> {
        let request = PageRequest::from_raw(page, limit, &self.pagination);
        let filter = Filter::eq("owner", channel.to_string());
        Ok(self.pages.query(&filter, vec![], request).await?)
    }
}
