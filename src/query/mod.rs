//! Cached queries and list orchestration
//!
//! Reads go through a [`QueryClient`] keyed by resource, scope and
//! parameters. Mutations mark a resource's list and stats entries stale so
//! the next read goes back to the network.

mod delete;
mod list;
mod params;

use crate::error::Result;
use log::{debug, trace};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

pub use delete::{ConfirmedDelete, DeleteRequest};
pub use list::{ListTicket, ListView, LoadState};
pub use params::{ListParams, SortOrder, ALL};

/// Entries kept before the oldest are evicted, stale ones first.
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryScope {
    List,
    Detail,
    Stats,
}

/// Identity of a cached read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub resource: String,
    pub scope: QueryScope,
    pub params: Vec<(String, String)>,
}

impl QueryKey {
    pub fn list(resource: &str, params: &ListParams) -> Self {
        Self {
            resource: resource.to_string(),
            scope: QueryScope::List,
            params: params.to_query(),
        }
    }

    pub fn detail(resource: &str, id: &str) -> Self {
        Self {
            resource: resource.to_string(),
            scope: QueryScope::Detail,
            params: vec![("id".to_string(), id.to_string())],
        }
    }

    pub fn stats(resource: &str) -> Self {
        Self {
            resource: resource.to_string(),
            scope: QueryScope::Stats,
            params: Vec::new(),
        }
    }
}

struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    stale: bool,
    fetched_at: Instant,
}

struct Cache {
    capacity: usize,
    entries: HashMap<QueryKey, Entry>,
    /// Bumped on every invalidation of a resource.
    epochs: HashMap<String, u64>,
    dependents: HashMap<String, Vec<String>>,
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            entries: HashMap::new(),
            epochs: HashMap::new(),
            dependents: HashMap::new(),
        }
    }
}

impl Cache {
    fn evict(&mut self) {
        while self.entries.len() > self.capacity {
            let victim = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| (!entry.stale, entry.fetched_at))
                .map(|(key, _)| key.clone());
            match victim {
                Some(key) => {
                    trace!("Evicting {:?}", key);
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }

    fn epoch(&self, resource: &str) -> u64 {
        self.epochs.get(resource).copied().unwrap_or(0)
    }

    fn closure(&self, resource: &str) -> Vec<String> {
        let mut out = vec![resource.to_string()];
        let mut i = 0;
        while i < out.len() {
            if let Some(deps) = self.dependents.get(&out[i]) {
                for dep in deps {
                    if !out.contains(dep) {
                        out.push(dep.clone());
                    }
                }
            }
            i += 1;
        }
        out
    }
}

/// Shared query cache. Cloning yields another handle to the same cache.
#[derive(Clone, Default)]
pub struct QueryClient {
    cache: Arc<Mutex<Cache>>,
}

impl QueryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache holding at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        let cache = Cache {
            capacity: capacity.max(1),
            ..Cache::default()
        };
        Self {
            cache: Arc::new(Mutex::new(cache)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Cache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Declare that invalidating `resource` also invalidates `dependent`.
    pub fn add_dependent(&self, resource: &str, dependent: &str) {
        let mut cache = self.lock();
        let deps = cache.dependents.entry(resource.to_string()).or_default();
        if !deps.iter().any(|d| d == dependent) {
            deps.push(dependent.to_string());
        }
    }

    /// The cached value unless it is missing or stale, otherwise the result
    /// of `fetcher`. A failed fetch leaves the cache untouched.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let epoch = {
            let cache = self.lock();
            if let Some(entry) = cache.entries.get(&key) {
                if !entry.stale {
                    if let Some(value) = entry.value.downcast_ref::<T>() {
                        trace!("Query cache hit for {:?}", key);
                        return Ok(value.clone());
                    }
                }
            }
            cache.epoch(&key.resource)
        };

        debug!("Fetching {} {:?}", key.resource, key.scope);
        let value = fetcher().await?;

        let mut cache = self.lock();
        // An invalidation that raced the request makes its result stale on arrival.
        let stale = cache.epoch(&key.resource) != epoch;
        cache.entries.insert(
            key,
            Entry {
                value: Arc::new(value.clone()),
                stale,
                fetched_at: Instant::now(),
            },
        );
        cache.evict();
        Ok(value)
    }

    /// The cached value, stale or not.
    pub fn get<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
        self.lock()
            .entries
            .get(key)
            .and_then(|entry| entry.value.downcast_ref::<T>().cloned())
    }

    /// `None` when nothing is cached under `key`.
    pub fn is_stale(&self, key: &QueryKey) -> Option<bool> {
        self.lock().entries.get(key).map(|entry| entry.stale)
    }

    pub fn fetched_at(&self, key: &QueryKey) -> Option<Instant> {
        self.lock().entries.get(key).map(|entry| entry.fetched_at)
    }

    /// Mark every list and stats entry of `resource` and its dependents stale.
    pub fn invalidate(&self, resource: &str) {
        let mut cache = self.lock();
        let resources = cache.closure(resource);
        debug!("Invalidating queries of {}", resources.join(", "));
        for name in &resources {
            *cache.epochs.entry(name.clone()).or_insert(0) += 1;
        }
        for (key, entry) in cache.entries.iter_mut() {
            if key.scope != QueryScope::Detail && resources.contains(&key.resource) {
                entry.stale = true;
            }
        }
    }

    pub fn invalidate_key(&self, key: &QueryKey) {
        if let Some(entry) = self.lock().entries.get_mut(key) {
            entry.stale = true;
        }
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn counted(client: &QueryClient, key: QueryKey, calls: &AtomicUsize) -> u32 {
        client
            .fetch(key, || async {
                Ok(calls.fetch_add(1, Ordering::SeqCst) as u32)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn cached_until_invalidated() {
        let client = QueryClient::new();
        let calls = AtomicUsize::new(0);
        let key = QueryKey::stats("products");

        assert_eq!(counted(&client, key.clone(), &calls).await, 0);
        assert_eq!(counted(&client, key.clone(), &calls).await, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        client.invalidate("products");
        assert_eq!(client.is_stale(&key), Some(true));
        assert_eq!(client.get::<u32>(&key), Some(0));
        assert_eq!(counted(&client, key.clone(), &calls).await, 1);
        assert_eq!(client.is_stale(&key), Some(false));
    }

    #[tokio::test]
    async fn invalidation_reaches_dependents_only() {
        let client = QueryClient::new();
        client.add_dependent("orders", "dashboard");
        let calls = AtomicUsize::new(0);
        let dashboard = QueryKey::stats("dashboard");
        let products = QueryKey::list("products", &ListParams::default());
        let order = QueryKey::detail("orders", "o1");

        counted(&client, dashboard.clone(), &calls).await;
        counted(&client, products.clone(), &calls).await;
        counted(&client, order.clone(), &calls).await;

        client.invalidate("orders");
        assert_eq!(client.is_stale(&dashboard), Some(true));
        assert_eq!(client.is_stale(&products), Some(false));
        assert_eq!(client.is_stale(&order), Some(false));
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_value() {
        let client = QueryClient::new();
        let key = QueryKey::stats("users");
        client.fetch(key.clone(), || async { Ok(7u32) }).await.unwrap();
        client.invalidate("users");

        let result = client
            .fetch(key.clone(), || async {
                Err::<u32, _>(crate::error::Error::general("offline"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(client.get::<u32>(&key), Some(7));
        assert_eq!(client.is_stale(&key), Some(true));
    }

    #[tokio::test]
    async fn stale_entries_are_evicted_first() {
        let client = QueryClient::with_capacity(2);
        let orders = QueryKey::stats("orders");
        let users = QueryKey::stats("users");
        let brands = QueryKey::list("brands", &ListParams::default());
        client.fetch(orders.clone(), || async { Ok(1u32) }).await.unwrap();
        client.fetch(users.clone(), || async { Ok(2u32) }).await.unwrap();
        client.invalidate("users");

        client.fetch(brands.clone(), || async { Ok(3u32) }).await.unwrap();
        assert_eq!(client.len(), 2);
        assert_eq!(client.get::<u32>(&users), None);
        assert_eq!(client.get::<u32>(&orders), Some(1));
        assert_eq!(client.get::<u32>(&brands), Some(3));
    }

    #[tokio::test]
    async fn result_of_request_raced_by_invalidation_is_stale() {
        let client = QueryClient::new();
        let key = QueryKey::stats("orders");
        let racing = client.clone();
        client
            .fetch(key.clone(), || async move {
                racing.invalidate("orders");
                Ok(1u32)
            })
            .await
            .unwrap();
        assert_eq!(client.is_stale(&key), Some(true));
    }
}
