use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{Collection, Document, FindOptions, Store, StoreError, Update};
use crate::filter::filter_match::values_equal;
use crate::filter::{Filter, FilterOrder};

/// In-process store for development and tests.
///
/// Each collection is a `Vec` kept in insertion order, so a stable sort
/// gives the same tie-breaking as the `seq` column in PostgreSQL.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_unique(
        collection: Collection,
        docs: &[Document],
        data: &Map<String, Value>,
        skip_id: Option<Uuid>,
    ) -> Result<(), StoreError> {
        for field in collection.unique_fields() {
            let Some(value) = data.get(*field).filter(|v| !v.is_null()) else { continue };
            let taken = docs
                .iter()
                .filter(|d| Some(d.id) != skip_id)
                .any(|d| d.data.get(*field).is_some_and(|other| values_equal(other, value)));
            if taken {
                return Err(StoreError::Duplicate(format!("{}.{}", collection, field)));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert(&self, collection: Collection, fields: Map<String, Value>) -> Result<Document, StoreError> {
        let doc = Document::new(fields);
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();
        Self::check_unique(collection, docs, &doc.data, None)?;
        docs.push(doc.clone());
        debug!("Inserted {} into {}", doc.id, collection);
        Ok(doc)
    }

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(&d.data)))
            .cloned())
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(&collection) else { return Ok(vec![]) };

        let mut matched: Vec<&Document> = docs.iter().filter(|d| filter.matches(&d.data)).collect();
        if !options.sort.is_empty() {
            // sort_by is stable
            matched.sort_by(|a, b| FilterOrder::compare(&options.sort, &a.data, &b.data));
        }

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        Ok(matched.into_iter().skip(skip).take(limit).cloned().collect())
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        let collections = self.collections.read().await;
        let count = collections
            .get(&collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(&d.data)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: Uuid,
        update: &Update,
    ) -> Result<Option<Document>, StoreError> {
        update.validate()?;
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else { return Ok(None) };
        let Some(index) = docs.iter().position(|d| d.id == id) else { return Ok(None) };

        let mut data = docs[index].data.clone();
        update.apply(&mut data);
        Self::check_unique(collection, docs, &data, Some(id))?;
        docs[index].data = data;
        Ok(Some(docs[index].clone()))
    }

    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else { return Ok(false) };
        let before = docs.len();
        docs.retain(|d| d.id != id);
        Ok(docs.len() != before)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{SortDirection, SortSpec};
    use serde_json::json;

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn find_preserves_insertion_order_and_windows() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.insert(Collection::Tweets, body(json!({ "content": format!("t{}", i), "owner": "u1" }))).await.unwrap();
        }
        store.insert(Collection::Tweets, body(json!({ "content": "other", "owner": "u2" }))).await.unwrap();

        let filter = Filter::eq("owner", "u1");
        assert_eq!(store.count(Collection::Tweets, &filter).await.unwrap(), 5);

        let page = store
            .find(Collection::Tweets, &filter, &FindOptions::default().window(2, 2))
            .await
            .unwrap();
        let contents: Vec<_> = page.iter().map(|d| d.data["content"].clone()).collect();
        assert_eq!(contents, vec![json!("t2"), json!("t3")]);
    }

    #[tokio::test]
    async fn sort_ties_fall_back_to_insertion_order() {
        let store = MemoryStore::new();
        for (title, views) in [("a", 1), ("b", 5), ("c", 1), ("d", 5)] {
            store.insert(Collection::Videos, body(json!({ "title": title, "views": views }))).await.unwrap();
        }
        let options = FindOptions::sorted(vec![SortSpec::new("views", SortDirection::Desc)]);
        let docs = store.find(Collection::Videos, &Filter::all(), &options).await.unwrap();
        let titles: Vec<_> = docs.iter().map(|d| d.data["title"].as_str().unwrap().to_string()).collect();
        assert_eq!(titles, vec!["b", "d", "a", "c"]);
    }

    #[tokio::test]
    async fn unique_fields_are_enforced() {
        let store = MemoryStore::new();
        store.insert(Collection::Users, body(json!({ "username": "alice", "email": "a@x.io" }))).await.unwrap();
        let dup = store.insert(Collection::Users, body(json!({ "username": "alice", "email": "b@x.io" }))).await;
        assert!(matches!(dup, Err(StoreError::Duplicate(_))));

        let bob = store.insert(Collection::Users, body(json!({ "username": "bob", "email": "b@x.io" }))).await.unwrap();
        let clash = store.update_by_id(Collection::Users, bob.id, &Update::set("email", "a@x.io")).await;
        assert!(matches!(clash, Err(StoreError::Duplicate(_))));

        // Updating a user to its own value is not a clash
        let same = store.update_by_id(Collection::Users, bob.id, &Update::set("email", "b@x.io")).await.unwrap();
        assert!(same.is_some());
    }

    #[tokio::test]
    async fn update_and_delete_by_id() {
        let store = MemoryStore::new();
        let doc = store.insert(Collection::Playlists, body(json!({ "name": "mix", "videos": [] }))).await.unwrap();

        let updated = store
            .update_by_id(Collection::Playlists, doc.id, &Update::Push { field: "videos".into(), value: json!("v1") })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.data["videos"], json!(["v1"]));
        assert_eq!(updated.data["createdAt"], doc.data["createdAt"]);

        assert!(store.update_by_id(Collection::Playlists, Uuid::new_v4(), &Update::set("name", "x")).await.unwrap().is_none());
        assert!(store.delete_by_id(Collection::Playlists, doc.id).await.unwrap());
        assert!(!store.delete_by_id(Collection::Playlists, doc.id).await.unwrap());
        assert!(store.find_by_id(Collection::Playlists, doc.id).await.unwrap().is_none());
    }
}
