use axum::extract::{Extension, State};
use serde::Deserialize;
use serde_json::{json, Value};

use super::ContentBody;
use crate::app::AppState;
use crate::database::models::Tweet;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody};
use crate::services::TweetService;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetBody {
    pub tweet_id: Option<String>,
    pub content: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<ContentBody>,
) -> ApiResult<Tweet> {
    let tweet = TweetService::new(&state).create(user.id, body.content.as_deref()).await?;
    Ok(ApiResponse::created(tweet, "Tweet created successfully"))
}

pub async fn list(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Vec<Tweet>> {
    let tweets = TweetService::new(&state).list_for(user.id).await?;
    Ok(ApiResponse::ok(tweets, "Tweets fetched successfully"))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<TweetBody>,
) -> ApiResult<Tweet> {
    let tweet = TweetService::new(&state)
        .update(user.id, body.tweet_id.as_deref(), body.content.as_deref())
        .await?;
    Ok(ApiResponse::ok(tweet, "Tweet updated successfully"))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(body): JsonBody<TweetBody>,
) -> ApiResult<Value> {
    TweetService::new(&state).delete(user.id, body.tweet_id.as_deref()).await?;
    Ok(ApiResponse::ok(json!({}), "Tweet deleted successfully"))
}
