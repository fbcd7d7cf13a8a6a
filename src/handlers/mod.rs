// Thin axum handlers: extract, call a service, wrap the result in the envelope.
pub mod comments;
pub mod dashboard;
pub mod likes;
pub mod playlists;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;

use serde::Deserialize;

/// `?page=&limit=` as raw strings; normalization happens in the service
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContentBody {
    pub content: Option<String>,
}
