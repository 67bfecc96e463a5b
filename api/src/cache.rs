//! Handles the caching logic for catalog batches.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use tokio::sync::RwLock;

use crate::backend::BackendError;
use crate::backend::StorefrontBackend;
use crate::product::CatalogQuery;
use crate::product::Product;

#[derive(Clone, Debug)]
struct CachedBatch {
    products: Arc<Vec<Product>>,
    last_fetched: Instant,
}

/// A lazy, time-based cache of catalog responses keyed by query.
#[derive(Debug)]
pub(crate) struct CatalogCache {
    ttl: Duration,
    entries: RwLock<HashMap<CatalogQuery, CachedBatch>>,
}

impl CatalogCache {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the batch for `query`, calling the backend only when the entry
    /// is missing or older than the cache lifetime.
    pub(crate) async fn get_or_fetch<B: StorefrontBackend>(
        &self,
        backend: &B,
        query: &CatalogQuery,
    ) -> Result<Arc<Vec<Product>>, BackendError> {
        // Check for a fresh entry first with a read lock.
        let read_lock = self.entries.read().await;
        if let Some(cached) = read_lock.get(query) {
            if cached.last_fetched.elapsed() < self.ttl {
                return Ok(cached.products.clone());
            }
        }
        drop(read_lock);

        let mut write_lock = self.entries.write().await;

        // Another task may have refreshed the entry while we waited.
        if let Some(cached) = write_lock.get(query) {
            if cached.last_fetched.elapsed() < self.ttl {
                return Ok(cached.products.clone());
            }
        }

        let products = Arc::new(backend.fetch_catalog(query).await?);
        write_lock.insert(
            query.clone(),
            CachedBatch {
                products: products.clone(),
                last_fetched: Instant::now(),
            },
        );

        Ok(products)
    }

    pub(crate) async fn invalidate(&self) {
        self.entries.write().await.clear();
    }
}
