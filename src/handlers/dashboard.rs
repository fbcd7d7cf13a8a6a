use axum::extract::{Extension, State};

use super::PageParams;
use crate::app::AppState;
use crate::database::models::Video;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Query};
use crate::services::{ChannelStats, DashboardService, Page};

pub async fn stats(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<ChannelStats> {
    let stats = DashboardService::new(&state).stats(user.id).await?;
    Ok(ApiResponse::ok(stats, "Channel stats fetched successfully"))
}

pub async fn videos(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<PageParams>,
) -> ApiResult<Page<Video>> {
    let page = DashboardService::new(&state)
        .videos(user.id, params.page.as_deref(), params.limit.as_deref())
        .await?;
    Ok(ApiResponse::ok(page, "Channel videos fetched successfully"))
}
