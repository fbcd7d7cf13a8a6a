use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::{Collection, Entity};

/// `subscriber` follows `channel`; both are user ids
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub subscriber: Uuid,
    pub channel: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Subscription {
    const COLLECTION: Collection = Collection::Subscriptions;
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSubscription {
    pub subscriber: Uuid,
    pub channel: Uuid,
}
