use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::config::PaginationConfig;
use crate::database::{Entity, FindOptions, Repository, Store, StoreError};
use crate::filter::{Filter, SortSpec};

/// A normalized page request; both fields are at least 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn new(page: u64, limit: u64) -> Self {
        Self { page: page.max(1), limit: limit.max(1) }
    }

    /// Normalize raw query-string values. Missing, non-numeric or non-positive
    /// values fall back to page 1 and the configured default limit.
    pub fn from_raw(page: Option<&str>, limit: Option<&str>, config: &PaginationConfig) -> Self {
        let page = parse_positive(page).unwrap_or(1);
        let limit = parse_positive(limit).unwrap_or(config.default_limit);
        Self::new(page, limit)
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

fn parse_positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .map(|n| n as u64)
}

/// One page of results plus the metadata needed to walk the rest
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub limit: u64,
    pub total_items: u64,
    pub total_pages: u64,
    pub has_prev_page: bool,
    pub has_next_page: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        let total_pages = total_items.div_ceil(request.limit);
        Self {
            items,
            page: request.page,
            limit: request.limit,
            total_items,
            total_pages,
            has_prev_page: request.page > 1,
            has_next_page: request.page < total_pages,
        }
    }
}

/// Count-then-slice pagination over any collection.
///
/// `totalItems` is the count of the full filtered set; the slice starts at
/// `(page - 1) * limit` in stable order (the requested sort, then insertion order).
pub struct PaginatedQueryService {
    store: Arc<dyn Store>,
}

impl PaginatedQueryService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn query<T: Entity>(
        &self,
        filter: &Filter,
        sort: Vec<SortSpec>,
        request: PageRequest,
    ) -> Result<Page<T>, StoreError> {
        let repo: Repository<T> = Repository::new(self.store.clone());
        let total_items = repo.count(filter).await?;

        let items = if request.offset() >= total_items {
            vec![]
        } else {
            let options = FindOptions::sorted(sort).window(request.offset(), request.limit);
            repo.select_any(filter, &options).await?
        };

        debug!(
            "Paginated {}: page={} limit={} total={} returned={}",
            repo.collection(),
            request.page,
            request.limit,
            total_items,
            items.len()
        );
        Ok(Page::new(items, request, total_items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::models::{NewTweet, Tweet};
    use crate::database::MemoryStore;
    use crate::filter::SortDirection;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::{Map, Value};
    use uuid::Uuid;

    use crate::database::{Collection, Document, Update};

    /// Every call fails as if the database connection dropped
    #[derive(Default)]
    struct DownStore {
        counts: AtomicUsize,
        finds: AtomicUsize,
    }

    fn down() -> StoreError {
        StoreError::Unavailable("connection refused".to_string())
    }

    #[async_trait]
    impl Store for DownStore {
        async fn insert(&self, _: Collection, _: Map<String, Value>) -> Result<Document, StoreError> {
            Err(down())
        }

        async fn find_by_id(&self, _: Collection, _: Uuid) -> Result<Option<Document>, StoreError> {
            Err(down())
        }

        async fn find_one(&self, _: Collection, _: &Filter) -> Result<Option<Document>, StoreError> {
            Err(down())
        }

        async fn find(&self, _: Collection, _: &Filter, _: &FindOptions) -> Result<Vec<Document>, StoreError> {
            self.finds.fetch_add(1, Ordering::SeqCst);
            Err(down())
        }

        async fn count(&self, _: Collection, _: &Filter) -> Result<u64, StoreError> {
            self.counts.fetch_add(1, Ordering::SeqCst);
            Err(down())
        }

        async fn update_by_id(&self, _: Collection, _: Uuid, _: &Update) -> Result<Option<Document>, StoreError> {
            Err(down())
        }

        async fn delete_by_id(&self, _: Collection, _: Uuid) -> Result<bool, StoreError> {
            Err(down())
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Err(down())
        }
    }

    fn config() -> PaginationConfig {
        AppConfig::development().pagination
    }

    async fn seed(store: &Arc<dyn Store>, owner: Uuid, n: usize) {
        let repo: Repository<Tweet> = Repository::new(store.clone());
        for i in 0..n {
            repo.create(&NewTweet { content: format!("tweet {}", i), owner }).await.unwrap();
        }
    }

    #[test]
    fn raw_values_are_normalized() {
        let cfg = config();
        assert_eq!(PageRequest::from_raw(None, None, &cfg), PageRequest::new(1, 10));
        assert_eq!(PageRequest::from_raw(Some("abc"), Some("x"), &cfg), PageRequest::new(1, 10));
        assert_eq!(PageRequest::from_raw(Some("0"), Some("-5"), &cfg), PageRequest::new(1, 10));
        assert_eq!(PageRequest::from_raw(Some("3"), Some("25"), &cfg), PageRequest::new(3, 25));
        assert_eq!(PageRequest::from_raw(Some("2"), Some("100000"), &cfg).limit, 100000);
    }

    #[test]
    fn page_metadata() {
        let page: Page<()> = Page::new(vec![], PageRequest::new(2, 10), 25);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_prev_page && page.has_next_page);

        let last: Page<()> = Page::new(vec![], PageRequest::new(3, 10), 25);
        assert!(!last.has_next_page);

        let empty: Page<()> = Page::new(vec![], PageRequest::new(1, 10), 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_prev_page && !empty.has_next_page);
    }

    #[tokio::test]
    async fn twenty_five_records_split_ten_ten_five() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        seed(&store, owner, 25).await;
        seed(&store, Uuid::new_v4(), 7).await;

        let service = PaginatedQueryService::new(store);
        let filter = Filter::eq("owner", owner.to_string());

        let sizes = [(1, 10), (2, 10), (3, 5), (4, 0)];
        for (page, expected) in sizes {
            let result: Page<Tweet> = service.query(&filter, vec![], PageRequest::new(page, 10)).await.unwrap();
            assert_eq!(result.items.len(), expected, "page {}", page);
            assert_eq!(result.total_items, 25);
            assert_eq!(result.total_pages, 3);
        }

        let second: Page<Tweet> = service.query(&filter, vec![], PageRequest::new(2, 10)).await.unwrap();
        assert_eq!(second.items[0].content, "tweet 10");
    }

    #[tokio::test]
    async fn pages_cover_the_set_exactly_once() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        seed(&store, owner, 23).await;
        let service = PaginatedQueryService::new(store);
        let filter = Filter::eq("owner", owner.to_string());

        for limit in [1u64, 4, 7, 23, 50] {
            let mut seen = HashSet::new();
            let mut total = 0;
            let mut page = 1;
            loop {
                let result: Page<Tweet> = service
                    .query(&filter, vec![SortSpec::new("content", SortDirection::Desc)], PageRequest::new(page, limit))
                    .await
                    .unwrap();
                let expected = limit.min(23u64.saturating_sub((page - 1) * limit));
                assert_eq!(result.items.len() as u64, expected);
                total += result.items.len();
                for item in result.items {
                    assert!(seen.insert(item.id), "duplicate across pages with limit {}", limit);
                }
                if !result.has_next_page {
                    break;
                }
                page += 1;
            }
            assert_eq!(total, 23);
        }
    }

    #[tokio::test]
    async fn large_limits_are_not_capped() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        seed(&store, owner, 250).await;
        let service = PaginatedQueryService::new(store);
        let filter = Filter::eq("owner", owner.to_string());

        let request = PageRequest::from_raw(Some("1"), Some("200"), &config());
        let first: Page<Tweet> = service.query(&filter, vec![], request).await.unwrap();
        assert_eq!(first.items.len(), 200);
        assert_eq!(first.limit, 200);
        assert_eq!(first.total_pages, 2);

        let request = PageRequest::from_raw(Some("2"), Some("200"), &config());
        let second: Page<Tweet> = service.query(&filter, vec![], request).await.unwrap();
        assert_eq!(second.items.len(), 50);
        assert!(!second.has_next_page);
    }

    #[tokio::test]
    async fn store_outage_aborts_without_retry() {
        let store = Arc::new(DownStore::default());
        let service = PaginatedQueryService::new(store.clone());

        let result = service.query::<Tweet>(&Filter::all(), vec![], PageRequest::new(1, 10)).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(store.counts.load(Ordering::SeqCst), 1);
        assert_eq!(store.finds.load(Ordering::SeqCst), 0);
    }
}
