pub mod document;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::filter::{Filter, FilterError, SortSpec};

pub use document::{Document, Update};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use repository::{Entity, Repository};

/// Errors from any store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Duplicate value for unique field: {0}")]
    Duplicate(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(#[from] FilterError),

    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    #[error("Corrupt document: {0}")]
    Corrupt(String),

    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// The document collections backing the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Videos,
    Tweets,
    Comments,
    Likes,
    Playlists,
    Subscriptions,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::Users,
        Collection::Videos,
        Collection::Tweets,
        Collection::Comments,
        Collection::Likes,
        Collection::Playlists,
        Collection::Subscriptions,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Videos => "videos",
            Collection::Tweets => "tweets",
            Collection::Comments => "comments",
            Collection::Likes => "likes",
            Collection::Playlists => "playlists",
            Collection::Subscriptions => "subscriptions",
        }
    }

    /// Fields whose values must be unique across the collection
    pub fn unique_fields(&self) -> &'static [&'static str] {
        match self {
            Collection::Users => &["username", "email"],
            _ => &[],
        }
    }

    /// Reference fields worth indexing for lookups
    pub fn indexed_fields(&self) -> &'static [&'static str] {
        match self {
            Collection::Videos | Collection::Tweets | Collection::Playlists => &["owner"],
            Collection::Comments => &["video", "owner"],
            Collection::Likes => &["likedBy", "video", "comment", "tweet"],
            Collection::Subscriptions => &["subscriber", "channel"],
            Collection::Users => &[],
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordering and windowing for [`Store::find`]
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub sort: Vec<SortSpec>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn sorted(sort: Vec<SortSpec>) -> Self {
        Self { sort, ..Default::default() }
    }

    pub fn window(mut self, skip: u64, limit: u64) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }
}

/// Document store used by every service. Each operation is a single atomic statement.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert(&self, collection: Collection, fields: Map<String, Value>) -> Result<Document, StoreError>;

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, StoreError>;

    async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Document>, StoreError>;

    /// Matching documents in `options.sort` order, ties broken by insertion order
    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError>;

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError>;

    /// Returns the updated document, or `None` when the id does not exist
    async fn update_by_id(
        &self,
        collection: Collection,
        id: Uuid,
        update: &Update,
    ) -> Result<Option<Document>, StoreError>;

    /// Returns whether a document was removed
    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
