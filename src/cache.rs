use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use crate::github::RepositoryReference;

/// A generic in-memory cache with a fixed time-to-live
///
/// Clones share the same storage.
#[derive(Debug, Clone)]
pub struct Cache<T> {
    store: Arc<RwLock<HashMap<String, (T, Instant)>>>,
    ttl: Duration,
}

impl<T: Clone + Send + Sync + 'static> Cache<T> {
    /// Creates a new in-memory cache with the specified TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            store: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Retrieves a value from the cache by its key
    pub async fn get(&self, key: &str) -> Option<T> {
        let store = self.store.read().await;
        store
            .get(key)
            .filter(|(_, time)| time.elapsed() < self.ttl)
            .map(|(value, _)| value.clone())
    }

    /// Stores a value in the cache with the specified key
    ///
    /// Expired entries are dropped on every write, so the map never holds
    /// more than the entries written within one TTL.
    pub async fn set(&self, key: &str, value: T) {
        let mut store = self.store.write().await;
        let ttl = self.ttl;
        let before = store.len();
        store.retain(|_, (_, time)| time.elapsed() < ttl);
        if store.len() < before {
            debug!("Evicted {} expired cache entries", before - store.len());
        }
        store.insert(key.to_string(), (value, Instant::now()));
    }

    /// Removes an entry from the cache by its key
    pub async fn remove(&self, key: &str) -> bool {
        let mut store = self.store.write().await;
        store.remove(key).is_some()
    }

    /// Returns the number of entries in the cache, expired ones included
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    /// Checks if the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

/// Cache key for a generated document
///
/// Combines the canonical URL with the whitespace-normalized instructions so
/// different instructions for the same repository never share an entry.
pub fn document_key(reference: &RepositoryReference, instructions: Option<&str>) -> String {
    let url = reference.canonical_url();
    let instructions = instructions
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    format!("readme:{}\u{1f}{}", url, instructions)
}
