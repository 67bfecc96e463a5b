use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8081/api/v1";

/// Runtime settings for the storefront client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    /// Base URL of the REST API, without a trailing slash.
    pub api_url: String,
    /// Products shown per listing page.
    pub page_size: usize,
    /// How many products to pull from the catalog before filtering locally.
    pub catalog_batch: usize,
    /// How long a fetched catalog batch is reused.
    pub cache_ttl: Duration,
    /// Where [`crate::storage::FileStore`] keeps its files.
    pub data_dir: PathBuf,
}

impl StoreConfig {
    /// Creates a StoreConfig from environment variables, falling back to the
    /// in-code defaults for anything unset or unparseable.
    ///
    /// # Environment Variables
    /// - `STOREFRONT_API_URL`: base URL of the REST API.
    /// - `STOREFRONT_PAGE_SIZE`: products per page, at least 1.
    /// - `STOREFRONT_CATALOG_BATCH`: products fetched per catalog batch, at least 1.
    /// - `STOREFRONT_CACHE_SECS`: catalog cache lifetime in seconds.
    /// - `STOREFRONT_DATA_DIR`: directory for persisted session and cart.
    pub fn from_env() -> Self {
        const PAGE_SIZE: usize = 8;
        const CATALOG_BATCH: usize = 100;
        const CACHE_SECS: u64 = 60;
        const DATA_DIR: &str = ".storefront";

        let api_url = env::var("STOREFRONT_API_URL")
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let page_size = parse_var("STOREFRONT_PAGE_SIZE")
            .filter(|n| *n > 0)
            .unwrap_or(PAGE_SIZE);

        let catalog_batch = parse_var("STOREFRONT_CATALOG_BATCH")
            .filter(|n| *n > 0)
            .unwrap_or(CATALOG_BATCH);

        let cache_ttl = Duration::from_secs(parse_var("STOREFRONT_CACHE_SECS").unwrap_or(CACHE_SECS));

        let data_dir = env::var("STOREFRONT_DATA_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DATA_DIR));

        Self {
            api_url,
            page_size,
            catalog_batch,
            cache_ttl,
            data_dir,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}
