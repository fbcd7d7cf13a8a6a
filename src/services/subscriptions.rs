use tracing::info;
use uuid::Uuid;

use super::{parse_id, ServiceError, ServiceResult, Toggle};
use crate::app::AppState;
use crate::database::models::{NewSubscription, Subscription, User};
use crate::database::{FindOptions, Repository};
use crate::filter::Filter;

pub struct SubscriptionService {
    subscriptions: Repository<Subscription>,
    users: Repository<User>,
}

impl SubscriptionService {
    pub fn new(state: &AppState) -> Self {
        Self {
            subscriptions: Repository::new(state.store.clone()),
            users: Repository::new(state.store.clone()),
        }
    }

    /// Subscribe to the channel, or unsubscribe when already subscribed.
    /// Same check-then-act caveat as like toggles.
    pub async fn toggle(&self, subscriber: Uuid, channel_id: &str) -> ServiceResult<Toggle<Subscription>> {
        let channel = parse_id(channel_id, "channelId")?;
        if !self.users.exists(channel).await? {
            return Err(ServiceError::not_found("Channel not found"));
        }

        let filter = Filter::eq("subscriber", subscriber.to_string()).and_eq("channel", channel.to_string());
        match self.subscriptions.select_one(&filter).await? {
            Some(existing) => {
                self.subscriptions.delete(existing.id).await?;
                info!("User {} unsubscribed from {}", subscriber, channel);
                Ok(Toggle::removed())
            }
            None => {
                let subscription = self.subscriptions.create(&NewSubscription { subscriber, channel }).await?;
                info!("User {} subscribed to {}", subscriber, channel);
                Ok(Toggle::created(subscription))
            }
        }
    }

    /// Subscriptions whose channel is `channel_id`
    pub async fn subscribers_of(&self, channel_id: &str) -> ServiceResult<Vec<Subscription>> {
        let channel = parse_id(channel_id, "channelId")?;
        Ok(self
            .subscriptions
            .select_any(&Filter::eq("channel", channel.to_string()), &FindOptions::default())
            .await?)
    }

    /// Subscriptions made by `subscriber_id`
    pub async fn channels_of(&self, subscriber_id: &str) -> ServiceResult<Vec<Subscription>> {
        let subscriber = parse_id(subscriber_id, "subscriberId")?;
        Ok(self
            .subscriptions
            .select_any(&Filter::eq("subscriber", subscriber.to_string()), &FindOptions::default())
            .await?)
    }

    pub async fn subscriber_count(&self, channel: Uuid) -> ServiceResult<u64> {
        Ok(self.subscriptions.count(&Filter::eq("channel", channel.to_string())).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Collection;
    use crate::services::test_support::state;
    use serde_json::json;

    async fn user(state: &AppState, name: &str) -> Uuid {
        let fields = json!({ "username": name, "email": format!("{}@example.com", name) });
        state.store.insert(Collection::Users, fields.as_object().unwrap().clone()).await.unwrap().id
    }

    #[tokio::test]
    async fn toggle_subscribe_and_list_both_directions() {
        let (state, _dir) = state();
        let service = SubscriptionService::new(&state);
        let (fan, creator, other) = (user(&state, "fan").await, user(&state, "creator").await, user(&state, "other").await);

        assert!(service.toggle(fan, &creator.to_string()).await.unwrap().active);
        assert!(service.toggle(other, &creator.to_string()).await.unwrap().active);
        assert!(service.toggle(fan, &other.to_string()).await.unwrap().active);

        assert_eq!(service.subscribers_of(&creator.to_string()).await.unwrap().len(), 2);
        assert_eq!(service.subscriber_count(creator).await.unwrap(), 2);
        let channels: Vec<Uuid> = service.channels_of(&fan.to_string()).await.unwrap().into_iter().map(|s| s.channel).collect();
        assert_eq!(channels, vec![creator, other]);

        assert!(!service.toggle(fan, &creator.to_string()).await.unwrap().active);
        assert_eq!(service.subscriber_count(creator).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_channel_is_rejected() {
        let (state, _dir) = state();
        let service = SubscriptionService::new(&state);
        let result = service.toggle(Uuid::new_v4(), &Uuid::new_v4().to_string()).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
        assert!(matches!(service.subscribers_of("nope").await, Err(ServiceError::Validation(_))));
    }
}
