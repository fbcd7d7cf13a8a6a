use axum::extract::{Extension, State};

use crate::app::AppState;
use crate::database::models::Subscription;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, Path};
use crate::services::{SubscriptionService, Toggle};

/// POST /api/v1/subscriptions/c/:channelId
pub async fn toggle(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(channel_id): Path<String>,
) -> ApiResult<Toggle<Subscription>> {
    let outcome = SubscriptionService::new(&state).toggle(user.id, &channel_id).await?;
    let message = if outcome.active { "Subscribed" } else { "Unsubscribed" };
    Ok(ApiResponse::ok(outcome, message))
}

/// GET /api/v1/subscriptions/c/:channelId
pub async fn subscribers(State(state): State<AppState>, Path(channel_id): Path<String>) -> ApiResult<Vec<Subscription>> {
    let subscribers = SubscriptionService::new(&state).subscribers_of(&channel_id).await?;
    Ok(ApiResponse::ok(subscribers, "Subscribers fetched successfully"))
}

/// GET /api/v1/subscriptions/u/:subscriberId
pub async fn channels(
    State(state): State<AppState>,
    Path(subscriber_id): Path<String>,
) -> ApiResult<Vec<Subscription>> {
    let channels = SubscriptionService::new(&state).channels_of(&subscriber_id).await?;
    Ok(ApiResponse::ok(channels, "Subscribed channels fetched successfully"))
}
