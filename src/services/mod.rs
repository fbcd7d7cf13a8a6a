pub mod comments;
pub mod dashboard;
pub mod error;
pub mod likes;
pub mod pagination;
pub mod playlists;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;

use serde::Serialize;
use uuid::Uuid;

pub use comments::CommentService;
pub use dashboard::{ChannelStats, DashboardService};
pub use error::{ServiceError, ServiceResult};
pub use likes::LikeService;
pub use pagination::{Page, PageRequest, PaginatedQueryService};
pub use playlists::PlaylistService;
pub use subscriptions::SubscriptionService;
pub use tweets::TweetService;
pub use users::{AuthSession, RegisterInput, UserService};
pub use videos::{PublishInput, VideoListQuery, VideoService};

/// Outcome of a toggle: whether the relation exists afterwards, and the record when it was created
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Toggle<T> {
    pub active: bool,
    pub record: Option<T>,
}

impl<T> Toggle<T> {
    pub fn created(record: T) -> Self {
        Self { active: true, record: Some(record) }
    }

    pub fn removed() -> Self {
        Self { active: false, record: None }
    }
}

/// Parse a path or body id; malformed ids are a validation failure
pub fn parse_id(raw: &str, what: &str) -> ServiceResult<Uuid> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ServiceError::validation(format!("{} is required", what)));
    }
    Uuid::parse_str(raw).map_err(|_| ServiceError::validation(format!("Invalid {}", what)))
}

/// A trimmed, non-blank text field
pub fn required(value: Option<&str>, field: &str) -> ServiceResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ServiceError::validation(format!("{} is required", field))),
    }
}

/// `Some(trimmed)` when present and non-blank
pub fn optional(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

pub fn ensure_owner(owner: Uuid, requester: Uuid, action: &str) -> ServiceResult<()> {
    if owner != requester {
        tracing::warn!("User {} attempted to {} a record owned by {}", requester, action, owner);
        return Err(ServiceError::authorization(format!("You are not authorized to {}", action)));
    }
    Ok(())
}
