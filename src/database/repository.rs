use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::{Collection, Document, FindOptions, Store, StoreError, Update};
use crate::filter::Filter;

/// A typed record living in one collection
pub trait Entity: DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;
}

/// Typed access to one collection through any [`Store`]
pub struct Repository<T> {
    store: Arc<dyn Store>,
    _phantom: PhantomData<T>,
}

impl<T: Entity> Repository<T> {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store, _phantom: PhantomData }
    }

    pub fn collection(&self) -> Collection {
        T::COLLECTION
    }

    pub async fn create<I: Serialize>(&self, input: &I) -> Result<T, StoreError> {
        let fields = match serde_json::to_value(input)? {
            Value::Object(map) => map,
            other => return Err(StoreError::InvalidUpdate(format!("insert payload must be an object, got {}", other))),
        };
        self.store.insert(T::COLLECTION, fields).await?.deserialize()
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        Self::decode(self.store.find_by_id(T::COLLECTION, id).await?)
    }

    pub async fn select_one(&self, filter: &Filter) -> Result<Option<T>, StoreError> {
        Self::decode(self.store.find_one(T::COLLECTION, filter).await?)
    }

    pub async fn select_any(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<T>, StoreError> {
        self.store
            .find(T::COLLECTION, filter, options)
            .await?
            .iter()
            .map(Document::deserialize)
            .collect()
    }

    pub async fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
        self.store.count(T::COLLECTION, filter).await
    }

    pub async fn update(&self, id: Uuid, update: &Update) -> Result<Option<T>, StoreError> {
        Self::decode(self.store.update_by_id(T::COLLECTION, id, update).await?)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        self.store.delete_by_id(T::COLLECTION, id).await
    }

    pub async fn exists(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.store.find_by_id(T::COLLECTION, id).await?.is_some())
    }

    fn decode(doc: Option<Document>) -> Result<Option<T>, StoreError> {
        doc.as_ref().map(Document::deserialize).transpose()
    }
}
