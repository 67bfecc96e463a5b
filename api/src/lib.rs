//! Storefront client core: session, cart, catalog filters and listing,
//! backed by the remote storefront REST API.
//!
//! The state holders are plain values. [`storefront::Storefront`] owns one of
//! each for the lifetime of the application and passes the session to the
//! cart whenever it changes.

pub mod auth;
pub mod backend;
mod cache;
pub mod cart;
pub mod config;
pub mod filter;
pub mod listing;
pub mod money;
pub mod product;
pub mod session;
pub mod status;
pub mod storage;
pub mod storefront;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use auth::Credentials;
pub use auth::Registration;
pub use auth::User;
pub use backend::BackendError;
pub use backend::HttpBackend;
pub use backend::StorefrontBackend;
pub use cart::CartError;
pub use cart::CartLine;
pub use cart::CartState;
pub use config::StoreConfig;
pub use filter::FilterState;
pub use listing::CatalogListing;
pub use listing::SortOrder;
pub use money::Money;
pub use product::Product;
pub use session::Session;
pub use session::SessionState;
pub use storefront::Storefront;

pub type ApiError = anyhow::Error;
