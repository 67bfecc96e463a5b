//! The remote storefront REST API.
//!
//! [`StorefrontBackend`] is the seam every state holder talks through;
//! [`HttpBackend`] is the reqwest implementation used by the application.

use dioxus_logger::tracing;
use reqwest::RequestBuilder;
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::auth::AuthResponse;
use crate::auth::Credentials;
use crate::auth::Registration;
use crate::cart::CartLine;
use crate::cart::CheckoutReceipt;
use crate::config::StoreConfig;
use crate::money::Money;
use crate::product::CatalogQuery;
use crate::product::CatalogResponse;
use crate::product::Product;
use crate::product::ProductId;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{message} (status {status})")]
    Status { status: u16, message: String },
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl BackendError {
    /// Builds a status error, preferring the `message`/`error` field of a JSON body.
    pub fn from_status(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct ErrorBody {
            #[serde(alias = "error")]
            message: String,
        }

        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.message)
            .ok()
            .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
            .or_else(|| {
                reqwest::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "request failed".to_string());

        Self::Status { status, message }
    }
}

/// A trait for any service that can serve the storefront API.
#[allow(async_fn_in_trait)]
pub trait StorefrontBackend {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthResponse, BackendError>;

    async fn register(&self, registration: &Registration) -> Result<AuthResponse, BackendError>;

    async fn fetch_catalog(&self, query: &CatalogQuery) -> Result<Vec<Product>, BackendError>;

    async fn fetch_product(&self, id: ProductId) -> Result<Product, BackendError>;

    async fn get_cart(&self, token: &str) -> Result<Vec<CartLine>, BackendError>;

    async fn add_cart_item(&self, token: &str, line: &CartLine) -> Result<(), BackendError>;

    async fn remove_cart_item(&self, token: &str, id: ProductId) -> Result<(), BackendError>;

    async fn clear_cart(&self, token: &str) -> Result<(), BackendError>;

    async fn checkout(&self, token: &str) -> Result<CheckoutReceipt, BackendError>;
}

/// A cart row as the server returns it. `product_id` wins over the row `id`.
#[derive(Debug, Deserialize)]
struct RemoteCartItem {
    #[serde(default)]
    id: Option<ProductId>,
    #[serde(default)]
    product_id: Option<ProductId>,
    #[serde(default)]
    title: String,
    #[serde(deserialize_with = "crate::money::deserialize_non_negative")]
    price: Money,
    #[serde(default)]
    image: String,
    #[serde(default)]
    quantity: u32,
}

impl RemoteCartItem {
    fn into_line(self) -> Option<CartLine> {
        let product_id = self.product_id.or(self.id)?;
        Some(CartLine {
            product_id,
            title: self.title,
            price: self.price,
            image: self.image,
            quantity: self.quantity.max(1),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct CartResponse {
    #[serde(default)]
    cart: Option<Vec<RemoteCartItem>>,
}

/// Talks to the storefront REST API over HTTP with JSON bodies.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Uses a preconfigured client, e.g. with custom timeouts or proxies.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.api_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder.bearer_auth(token)
    }

    async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, BackendError> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(BackendError::from_status(status.as_u16(), &body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn expect_success(resp: Response) -> Result<String, BackendError> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(BackendError::from_status(status.as_u16(), &body));
        }
        Ok(body)
    }
}

impl StorefrontBackend for HttpBackend {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthResponse, BackendError> {
        let resp = self
            .client
            .post(self.url("login"))
            .json(credentials)
            .send()
            .await?;
        Self::read_json(resp).await
    }

    async fn register(&self, registration: &Registration) -> Result<AuthResponse, BackendError> {
        let resp = self
            .client
            .post(self.url("register"))
            .json(registration)
            .send()
            .await?;
        Self::read_json(resp).await
    }

    async fn fetch_catalog(&self, query: &CatalogQuery) -> Result<Vec<Product>, BackendError> {
        tracing::debug!("fetching catalog: {:?}", query);
        let resp = self
            .client
            .get(self.url("products"))
            .query(&query.to_query_pairs())
            .send()
            .await?;
        let catalog: CatalogResponse = Self::read_json(resp).await?;
        Ok(catalog.into_products())
    }

    async fn fetch_product(&self, id: ProductId) -> Result<Product, BackendError> {
        let resp = self
            .client
            .get(self.url(&format!("products/{id}")))
            .send()
            .await?;
        Self::read_json(resp).await
    }

    async fn get_cart(&self, token: &str) -> Result<Vec<CartLine>, BackendError> {
        let resp = self
            .authorized(self.client.get(self.url("cart")), token)
            .send()
            .await?;
        let cart: CartResponse = Self::read_json(resp).await?;
        Ok(cart
            .cart
            .unwrap_or_default()
            .into_iter()
            .filter_map(RemoteCartItem::into_line)
            .collect())
    }

    async fn add_cart_item(&self, token: &str, line: &CartLine) -> Result<(), BackendError> {
        let resp = self
            .authorized(self.client.post(self.url("cart")), token)
            .json(line)
            .send()
            .await?;
        Self::expect_success(resp).await.map(|_| ())
    }

    async fn remove_cart_item(&self, token: &str, id: ProductId) -> Result<(), BackendError> {
        let resp = self
            .authorized(self.client.delete(self.url(&format!("cart/{id}"))), token)
            .send()
            .await?;
        Self::expect_success(resp).await.map(|_| ())
    }

    async fn clear_cart(&self, token: &str) -> Result<(), BackendError> {
        let resp = self
            .authorized(self.client.delete(self.url("cart")), token)
            .send()
            .await?;
        Self::expect_success(resp).await.map(|_| ())
    }

    async fn checkout(&self, token: &str) -> Result<CheckoutReceipt, BackendError> {
        let resp = self
            .authorized(self.client.post(self.url("checkout")), token)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let body = Self::expect_success(resp).await?;
        // the receipt is informational; an unreadable body still means success
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_prefers_json_message() {
        let err = BackendError::from_status(401, r#"{"error":"invalid email or password"}"#);
        assert_eq!(err.to_string(), "invalid email or password (status 401)");

        let err = BackendError::from_status(500, "database down\n");
        assert_eq!(err.to_string(), "database down (status 500)");

        let err = BackendError::from_status(404, "");
        assert_eq!(err.to_string(), "Not Found (status 404)");
    }

    #[test]
    fn urls_are_joined_without_double_slashes() {
        let backend = HttpBackend::new("http://localhost:8081/api/v1/");
        assert_eq!(backend.base_url(), "http://localhost:8081/api/v1");
        assert_eq!(backend.url("/cart/3"), "http://localhost:8081/api/v1/cart/3");
        assert_eq!(backend.url("products"), "http://localhost:8081/api/v1/products");
    }

    #[test]
    fn remote_cart_rows_use_product_id() {
        let cart: CartResponse = serde_json::from_str(
            r#"{"cart":[
                {"id":11,"product_id":3,"title":"Lamp","price":20,"image":"l.png","quantity":2},
                {"id":4,"title":"Mug","price":5.5,"quantity":0},
                {"title":"Ghost","price":1}
            ]}"#,
        )
        .unwrap();
        let lines: Vec<CartLine> = cart
            .cart
            .unwrap()
            .into_iter()
            .filter_map(RemoteCartItem::into_line)
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product_id, 3);
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(lines[1].product_id, 4);
        assert_eq!(lines[1].quantity, 1);
    }

    #[test]
    fn remote_cart_with_negative_price_fails_to_decode() {
        let result = serde_json::from_str::<CartResponse>(
            r#"{"cart":[{"id":4,"title":"Mug","price":-5,"quantity":1}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn null_cart_is_empty() {
        let cart: CartResponse = serde_json::from_str(r#"{"cart":null}"#).unwrap();
        assert!(cart.cart.is_none());
    }
}
