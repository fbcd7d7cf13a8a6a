use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::{ServiceError, ServiceResult, Toggle};
use crate::app::AppState;
use crate::database::models::{Like, LikeTarget, NewLike};
use crate::database::{FindOptions, Repository, Store};
use crate::filter::{Condition, Filter};

pub struct LikeService {
    store: Arc<dyn Store>,
    likes: Repository<Like>,
}

impl LikeService {
    pub fn new(state: &AppState) -> Self {
        Self { store: state.store.clone(), likes: Repository::new(state.store.clone()) }
    }

    /// Like the target if the user has not, otherwise remove the existing like.
    ///
    /// Check-then-act: two concurrent toggles by the same user can both see
    /// "absent" and create two likes.
    pub async fn toggle(&self, user: Uuid, target: LikeTarget) -> ServiceResult<Toggle<Like>> {
        if self.store.find_by_id(target.collection(), target.id()).await?.is_none() {
            return Err(ServiceError::not_found(format!("{} not found", target_label(&target))));
        }

        let filter = Filter::eq(target.field(), target.id().to_string()).and_eq("likedBy", user.to_string());
        match self.likes.select_one(&filter).await? {
            Some(existing) => {
                self.likes.delete(existing.id).await?;
                info!("User {} unliked {} {}", user, target.field(), target.id());
                Ok(Toggle::removed())
            }
            None => {
                let like = self.likes.create(&NewLike::new(target, user)).await?;
                info!("User {} liked {} {}", user, target.field(), target.id());
                Ok(Toggle::created(like))
            }
        }
    }

    /// Video likes by the user, oldest first
    pub async fn liked_videos(&self, user: Uuid) -> ServiceResult<Vec<Like>> {
        let filter = Filter::eq("likedBy", user.to_string()).with(Condition::Exists {
            field: "video".to_string(),
            exists: true,
        });
        Ok(self.likes.select_any(&filter, &FindOptions::default()).await?)
    }
}

fn target_label(target: &LikeTarget) -> &'static str {
    match target {
        LikeTarget::Video(_) => "Video",
        LikeTarget::Comment(_) => "Comment",
        LikeTarget::Tweet(_) => "Tweet",
    }
}
