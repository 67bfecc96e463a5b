//! Catalog types as served by the remote product endpoints.

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;

use crate::cart::CartLine;
use crate::money::Money;

pub type ProductId = u64;

/// A product as listed by the catalog.
///
/// Decoding is lenient: the backend has shipped both `title`/`thumbnail` and
/// `name`/`image_url` shapes, and ids have been sent as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: ProductId,
    #[serde(default, alias = "name")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default, alias = "image_url")]
    pub thumbnail: String,
    #[serde(default)]
    pub images: Vec<String>,
}

impl Product {
    /// The image shown on a product page and stored on cart lines.
    pub fn primary_image(&self) -> &str {
        self.images
            .first()
            .map(String::as_str)
            .unwrap_or(&self.thumbnail)
    }

    /// Builds the cart line that represents this product.
    pub fn to_cart_line(&self) -> CartLine {
        CartLine::new(
            self.id,
            self.title.clone(),
            self.price,
            self.primary_image().to_string(),
        )
    }
}

/// The catalog endpoint answers either `{ "products": [...] }` or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum CatalogResponse {
    Wrapped {
        #[serde(default)]
        products: Option<Vec<Product>>,
    },
    Bare(Vec<Product>),
}

impl CatalogResponse {
    pub(crate) fn into_products(self) -> Vec<Product> {
        match self {
            CatalogResponse::Wrapped { products } => products.unwrap_or_default(),
            CatalogResponse::Bare(products) => products,
        }
    }
}

/// Query parameters understood by the catalog endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CatalogQuery {
    /// Free-text search, sent as `q`.
    pub text: Option<String>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
}

impl CatalogQuery {
    /// A plain page of the unfiltered catalog.
    pub fn batch(limit: usize) -> Self {
        Self {
            text: None,
            limit: Some(limit),
            skip: Some(0),
        }
    }

    /// A keyword search over the whole catalog.
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            limit: None,
            skip: None,
        }
    }

    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(text) = &self.text {
            pairs.push(("q", text.clone()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(skip) = self.skip {
            pairs.push(("skip", skip.to_string()));
        }
        pairs
    }
}

fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ProductId, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(ProductId),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(id) => Ok(id),
        RawId::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid product id `{text}`"))),
    }
}
