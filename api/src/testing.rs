//! An in-memory [`StorefrontBackend`] with scripted answers and a call log.

use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::auth::AuthResponse;
use crate::auth::Credentials;
use crate::auth::Registration;
use crate::backend::BackendError;
use crate::backend::StorefrontBackend;
use crate::cart::CartLine;
use crate::cart::CheckoutReceipt;
use crate::product::CatalogQuery;
use crate::product::Product;
use crate::product::ProductId;

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Authenticate(String),
    Register(String),
    FetchCatalog(CatalogQuery),
    FetchProduct(ProductId),
    GetCart,
    AddCartItem(CartLine),
    RemoveCartItem(ProductId),
    ClearCart,
    Checkout,
}

#[derive(Debug, Default)]
struct MockState {
    catalog: Vec<Product>,
    cart: Vec<CartLine>,
    auth: Option<Result<AuthResponse, (u16, String)>>,
    fail_cart: bool,
    fail_checkout: bool,
    fail_catalog: bool,
    orders: u64,
    calls: Vec<Call>,
}

/// A fake storefront server.
///
/// Catalog queries honour `q`, `limit` and `skip` the way the real server
/// does: `q` matches title or description case-insensitively, then the
/// result is windowed.
#[derive(Debug, Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(self, catalog: Vec<Product>) -> Self {
        self.lock().catalog = catalog;
        self
    }

    pub fn with_cart(self, cart: Vec<CartLine>) -> Self {
        self.lock().cart = cart;
        self
    }

    pub fn with_auth_response(self, response: AuthResponse) -> Self {
        self.lock().auth = Some(Ok(response));
        self
    }

    pub fn with_auth_failure(self, status: u16, message: &str) -> Self {
        self.lock().auth = Some(Err((status, message.to_string())));
        self
    }

    pub fn set_fail_cart(&self, fail: bool) {
        self.lock().fail_cart = fail;
    }

    pub fn set_fail_checkout(&self, fail: bool) {
        self.lock().fail_checkout = fail;
    }

    pub fn set_fail_catalog(&self, fail: bool) {
        self.lock().fail_catalog = fail;
    }

    /// Replaces the catalog served from now on.
    pub fn set_catalog(&self, catalog: Vec<Product>) {
        self.lock().catalog = catalog;
    }

    /// Replaces the server-side cart, as another device would.
    pub fn set_cart(&self, cart: Vec<CartLine>) {
        self.lock().cart = cart;
    }

    pub fn server_cart(&self) -> Vec<CartLine> {
        self.lock().cart.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn unavailable() -> BackendError {
        BackendError::Status {
            status: 503,
            message: "service unavailable".to_string(),
        }
    }
}

impl StorefrontBackend for MockBackend {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthResponse, BackendError> {
        let mut state = self.lock();
        state.calls.push(Call::Authenticate(credentials.email.clone()));
        match state.auth.clone() {
            Some(Ok(response)) => Ok(response),
            Some(Err((status, message))) => Err(BackendError::Status { status, message }),
            None => Ok(AuthResponse {
                token: Some("mock-token".to_string()),
                ..AuthResponse::default()
            }),
        }
    }

    async fn register(&self, registration: &Registration) -> Result<AuthResponse, BackendError> {
        let mut state = self.lock();
        state.calls.push(Call::Register(registration.email.clone()));
        Ok(AuthResponse {
            message: Some("User created successfully".to_string()),
            ..AuthResponse::default()
        })
    }

    async fn fetch_catalog(&self, query: &CatalogQuery) -> Result<Vec<Product>, BackendError> {
        let mut state = self.lock();
        state.calls.push(Call::FetchCatalog(query.clone()));
        if state.fail_catalog {
            return Err(Self::unavailable());
        }
        let needle = query.text.as_deref().map(str::to_lowercase);
        let matches = state.catalog.iter().filter(|p| match &needle {
            Some(needle) => {
                p.title.to_lowercase().contains(needle)
                    || p.description.to_lowercase().contains(needle)
            }
            None => true,
        });
        Ok(matches
            .skip(query.skip.unwrap_or(0))
            .take(query.limit.unwrap_or(100))
            .cloned()
            .collect())
    }

    async fn fetch_product(&self, id: ProductId) -> Result<Product, BackendError> {
        let mut state = self.lock();
        state.calls.push(Call::FetchProduct(id));
        state
            .catalog
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| BackendError::Status {
                status: 404,
                message: "product not found".to_string(),
            })
    }

    async fn get_cart(&self, _token: &str) -> Result<Vec<CartLine>, BackendError> {
        let mut state = self.lock();
        state.calls.push(Call::GetCart);
        if state.fail_cart {
            return Err(Self::unavailable());
        }
        Ok(state.cart.clone())
    }

    async fn add_cart_item(&self, _token: &str, line: &CartLine) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.calls.push(Call::AddCartItem(line.clone()));
        if state.fail_cart {
            return Err(Self::unavailable());
        }
        match state.cart.iter().position(|l| l.product_id == line.product_id) {
            Some(idx) => state.cart[idx].quantity += line.quantity,
            None => state.cart.push(line.clone()),
        }
        Ok(())
    }

    async fn remove_cart_item(&self, _token: &str, id: ProductId) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.calls.push(Call::RemoveCartItem(id));
        if state.fail_cart {
            return Err(Self::unavailable());
        }
        state.cart.retain(|l| l.product_id != id);
        Ok(())
    }

    async fn clear_cart(&self, _token: &str) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.calls.push(Call::ClearCart);
        if state.fail_cart {
            return Err(Self::unavailable());
        }
        state.cart.clear();
        Ok(())
    }

    async fn checkout(&self, _token: &str) -> Result<CheckoutReceipt, BackendError> {
        let mut state = self.lock();
        state.calls.push(Call::Checkout);
        if state.fail_checkout {
            return Err(Self::unavailable());
        }
        state.orders += 1;
        let total = state.cart.iter().map(CartLine::subtotal).sum();
        Ok(CheckoutReceipt {
            order_id: Some(state.orders),
            total_price: Some(total),
        })
    }
}
