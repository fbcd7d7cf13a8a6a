use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::{Collection, Entity};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tweet: Option<Uuid>,
    pub liked_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Like {
    const COLLECTION: Collection = Collection::Likes;
}

/// What a like points at; a like references exactly one target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeTarget {
    Video(Uuid),
    Comment(Uuid),
    Tweet(Uuid),
}

impl LikeTarget {
    /// Name of the reference field on the like document
    pub fn field(&self) -> &'static str {
        match self {
            LikeTarget::Video(_) => "video",
            LikeTarget::Comment(_) => "comment",
            LikeTarget::Tweet(_) => "tweet",
        }
    }

    /// Collection the target lives in
    pub fn collection(&self) -> Collection {
        match self {
            LikeTarget::Video(_) => Collection::Videos,
            LikeTarget::Comment(_) => Collection::Comments,
            LikeTarget::Tweet(_) => Collection::Tweets,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            LikeTarget::Video(id) | LikeTarget::Comment(id) | LikeTarget::Tweet(id) => *id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLike {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tweet: Option<Uuid>,
    pub liked_by: Uuid,
}

impl NewLike {
    pub fn new(target: LikeTarget, liked_by: Uuid) -> Self {
        let mut like = Self { video: None, comment: None, tweet: None, liked_by };
        match target {
            LikeTarget::Video(id) => like.video = Some(id),
            LikeTarget::Comment(id) => like.comment = Some(id),
            LikeTarget::Tweet(id) => like.tweet = Some(id),
        }
        like
    }
}
