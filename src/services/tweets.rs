use tracing::info;
use uuid::Uuid;

use super::{ensure_owner, parse_id, required, ServiceError, ServiceResult};
use crate::app::AppState;
use crate::database::models::{NewTweet, Tweet};
use crate::database::{FindOptions, Repository, Update};
use crate::filter::Filter;

pub struct TweetService {
    tweets: Repository<Tweet>,
}

impl TweetService {
    pub fn new(state: &AppState) -> Self {
        Self { tweets: Repository::new(state.store.clone()) }
    }

    pub async fn create(&self, owner: Uuid, content: Option<&str>) -> ServiceResult<Tweet> {
        let content = required(content, "content")?;
        let tweet = self.tweets.create(&NewTweet { content, owner }).await?;
        info!("User {} created tweet {}", owner, tweet.id);
        Ok(tweet)
    }

    /// The requester's tweets in the order they were written
    pub async fn list_for(&self, owner: Uuid) -> ServiceResult<Vec<Tweet>> {
        Ok(self
            .tweets
            .select_any(&Filter::eq("owner", owner.to_string()), &FindOptions::default())
            .await?)
    }

    pub async fn update(&self, requester: Uuid, tweet_id: Option<&str>, content: Option<&str>) -> ServiceResult<Tweet> {
        let id = parse_id(tweet_id.unwrap_or_default(), "tweetId")?;
        let tweet = self.find(id).await?;
        ensure_owner(tweet.owner, requester, "update this tweet")?;
        let content = required(content, "content")?;

        self.tweets
            .update(id, &Update::set("content", content))
            .await?
            .ok_or_else(|| ServiceError::not_found("Tweet not found"))
    }

    pub async fn delete(&self, requester: Uuid, tweet_id: Option<&str>) -> ServiceResult<()> {
        let id = parse_id(tweet_id.unwrap_or_default(), "tweetId")?;
        let tweet = self.find(id).await?;
        ensure_owner(tweet.owner, requester, "delete this tweet")?;

        self.tweets.delete(id).await?;
        info!("User {} deleted tweet {}", requester, id);
        Ok(())
    }

    async fn find(&self, id: Uuid) -> ServiceResult<Tweet> {
        self.tweets
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Tweet not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::state;

    #[tokio::test]
    async fn tweets_are_listed_in_insertion_order() {
        let (state, _dir) = state();
        let service = TweetService::new(&state);
        let (me, other) = (Uuid::new_v4(), Uuid::new_v4());

        for content in ["one", "two", "three"] {
            service.create(me, Some(content)).await.unwrap();
        }
        service.create(other, Some("not mine")).await.unwrap();
        assert!(matches!(service.create(me, Some("   ")).await, Err(ServiceError::Validation(_))));

        let mine: Vec<String> = service.list_for(me).await.unwrap().into_iter().map(|t| t.content).collect();
        assert_eq!(mine, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn only_the_owner_can_edit_or_delete() {
        let (state, _dir) = state();
        let service = TweetService::new(&state);
        let (me, other) = (Uuid::new_v4(), Uuid::new_v4());
        let tweet = service.create(me, Some("hello")).await.unwrap();
        let id = tweet.id.to_string();

        assert!(matches!(service.update(other, Some(&id), Some("hijack")).await, Err(ServiceError::Authorization(_))));
        assert!(matches!(service.update(other, Some(&id), None).await, Err(ServiceError::Authorization(_))));
        assert!(matches!(service.delete(other, Some(&id)).await, Err(ServiceError::Authorization(_))));
        assert!(matches!(service.update(me, None, Some("x")).await, Err(ServiceError::Validation(_))));

        let edited = service.update(me, Some(&id), Some("hello, world")).await.unwrap();
        assert_eq!(edited.content, "hello, world");

        service.delete(me, Some(&id)).await.unwrap();
        assert!(matches!(service.delete(me, Some(&id)).await, Err(ServiceError::NotFound(_))));
    }
}
