//! The catalog listing: fetches candidates, filters and sorts them, and
//! paginates the result.
//!
//! Every listing goes through the same path. A candidate batch is fetched
//! (a keyword search when a keyword is set, otherwise the first
//! `catalog_batch` products), the filter predicates and sort order are
//! applied locally, and the filtered set is paginated locally. Page counts
//! therefore always describe exactly what can be shown.

use std::cmp::Ordering;
use std::sync::Arc;

use dioxus_logger::tracing;
use serde::Deserialize;
use serde::Serialize;

use crate::backend::BackendError;
use crate::backend::StorefrontBackend;
use crate::cache::CatalogCache;
use crate::config::StoreConfig;
use crate::filter;
use crate::filter::FilterState;
use crate::product::CatalogQuery;
use crate::product::Product;
use crate::product::ProductId;
use crate::status::ConnectionChecker;
use crate::status::ConnectionStatus;

/// How many page buttons are shown at most.
pub const PAGE_WINDOW: usize = 5;

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::EnumIs,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Whatever order the backend returned.
    #[default]
    #[strum(serialize = "all")]
    #[serde(rename = "all")]
    Default,
    /// Ascending price.
    Cheap,
    /// Descending price.
    Expensive,
    /// Descending rating.
    Popular,
}

impl SortOrder {
    pub fn label(&self) -> &'static str {
        match self {
            SortOrder::Default => "All Products",
            SortOrder::Cheap => "Cheap",
            SortOrder::Expensive => "Expensive",
            SortOrder::Popular => "Popular",
        }
    }
}

/// Stable sort of `products` by `order`.
pub fn sort_products(products: &mut [Product], order: SortOrder) {
    match order {
        SortOrder::Default => {}
        SortOrder::Cheap => products.sort_by(|a, b| a.price.cmp(&b.price)),
        SortOrder::Expensive => products.sort_by(|a, b| b.price.cmp(&a.price)),
        SortOrder::Popular => products.sort_by(|a, b| {
            b.rating
                .partial_cmp(&a.rating)
                .unwrap_or(Ordering::Equal)
        }),
    }
}

/// Filters then sorts.
pub fn apply_filters(products: &[Product], filters: &FilterState, order: SortOrder) -> Vec<Product> {
    let mut filtered: Vec<Product> = products
        .iter()
        .filter(|p| filters.matches(p))
        .cloned()
        .collect();
    sort_products(&mut filtered, order);
    filtered
}

/// Number of pages needed for `total_items`.
pub fn total_pages(total_items: usize, per_page: usize) -> usize {
    if per_page == 0 {
        return 0;
    }
    total_items.div_ceil(per_page)
}

/// Up to [`PAGE_WINDOW`] page numbers centered on `current`, shifted to stay
/// inside `1..=total_pages`.
///
/// ```
/// use api::listing::page_window;
/// assert_eq!(page_window(1, 10), vec![1, 2, 3, 4, 5]);
/// assert_eq!(page_window(10, 10), vec![6, 7, 8, 9, 10]);
/// assert_eq!(page_window(5, 10), vec![3, 4, 5, 6, 7]);
/// assert!(page_window(1, 0).is_empty());
/// ```
pub fn page_window(current: usize, total_pages: usize) -> Vec<usize> {
    let half = (PAGE_WINDOW / 2) as i64;
    let current = current as i64;
    let total = total_pages as i64;

    let mut start = (current - half).max(1);
    let mut end = (current + half).min(total);
    if current - half < 1 {
        end = (end + (half - (current - 1))).min(total);
    }
    if current + half > total {
        start = (start - ((current + half) - total)).max(1);
    }

    (start..=end).map(|p| p as usize).collect()
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number.
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn buttons(&self) -> Vec<usize> {
        page_window(self.page, self.total_pages)
    }
}

/// Slices page `page` (1-based) out of `items`.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let start = page.saturating_sub(1).saturating_mul(per_page).min(items.len());
    let end = start.saturating_add(per_page).min(items.len());
    Page {
        items: items[start..end].to_vec(),
        page,
        per_page,
        total_items: items.len(),
        total_pages: total_pages(items.len(), per_page),
    }
}

/// Owns the filter state of a catalog view along with its sort order,
/// current page and the last fetched candidates.
pub struct CatalogListing<B> {
    backend: Arc<B>,
    cache: CatalogCache,
    filters: FilterState,
    sort: SortOrder,
    page: usize,
    per_page: usize,
    catalog_batch: usize,
    candidates: Arc<Vec<Product>>,
    filtered: Vec<Product>,
    checker: ConnectionChecker,
}

impl<B: StorefrontBackend> CatalogListing<B> {
    pub fn new(backend: Arc<B>, config: &StoreConfig) -> Self {
        Self {
            backend,
            cache: CatalogCache::new(config.cache_ttl),
            filters: FilterState::default(),
            sort: SortOrder::default(),
            page: 1,
            per_page: config.page_size.max(1),
            catalog_batch: config.catalog_batch.max(1),
            candidates: Arc::new(Vec::new()),
            filtered: Vec::new(),
            checker: ConnectionChecker::new(),
        }
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    /// Edits the filters and jumps back to the first page.
    ///
    /// Call [`CatalogListing::refresh`] afterwards to apply a changed keyword.
    pub fn update_filters(&mut self, edit: impl FnOnce(&mut FilterState)) {
        edit(&mut self.filters);
        self.page = 1;
        self.recompute();
    }

    pub fn reset_filters(&mut self) {
        self.update_filters(FilterState::reset_filters);
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    pub fn set_sort(&mut self, sort: SortOrder) {
        self.sort = sort;
        self.page = 1;
        self.recompute();
    }

    pub fn status(&self) -> &ConnectionStatus {
        self.checker.status()
    }

    /// The remote query the current filters call for.
    pub fn remote_query(&self) -> CatalogQuery {
        match self.filters.active_keyword() {
            Some(keyword) => CatalogQuery::search(keyword),
            None => CatalogQuery::batch(self.catalog_batch),
        }
    }

    /// Fetches the candidate batch for the current filters.
    ///
    /// On failure the previous candidates stay in place.
    pub async fn refresh(&mut self) {
        let query = self.remote_query();
        let result = self.cache.get_or_fetch(self.backend.as_ref(), &query).await;
        if let Some(candidates) = self.checker.check(result) {
            tracing::debug!("catalog batch of {} products for {:?}", candidates.len(), query);
            self.candidates = candidates;
        }
        self.recompute();
    }

    /// Drops cached batches and fetches again.
    pub async fn reload(&mut self) {
        self.cache.invalidate().await;
        self.refresh().await;
    }

    pub fn current_page(&self) -> usize {
        self.page
    }

    pub fn total_items(&self) -> usize {
        self.filtered.len()
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.filtered.len(), self.per_page)
    }

    pub fn page(&self) -> Page<Product> {
        paginate(&self.filtered, self.page, self.per_page)
    }

    pub fn page_buttons(&self) -> Vec<usize> {
        page_window(self.page, self.total_pages())
    }

    /// Moves to `page` if it exists. Returns whether the page changed.
    pub fn go_to_page(&mut self, page: usize) -> bool {
        if page == 0 || page > self.total_pages() {
            return false;
        }
        self.page = page;
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.page + 1)
    }

    pub fn previous_page(&mut self) -> bool {
        self.go_to_page(self.page.saturating_sub(1))
    }

    /// Categories present in the current candidates.
    pub fn categories(&self) -> Vec<String> {
        filter::categories_of(self.candidates.iter())
    }

    pub async fn product(&self, id: ProductId) -> Result<Product, BackendError> {
        self.backend.fetch_product(id).await
    }

    /// Re-applies filters and sort, keeping the current page in range.
    fn recompute(&mut self) {
        self.filtered = apply_filters(&self.candidates, &self.filters, self.sort);
        self.page = self.page.clamp(1, self.total_pages().max(1));
    }
}
