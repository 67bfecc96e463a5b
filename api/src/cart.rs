//! The shopping cart and the state holder that keeps it in sync with either
//! local storage (anonymous) or the remote cart (signed in).

use std::sync::Arc;

use dioxus_logger::tracing;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::backend::BackendError;
use crate::backend::StorefrontBackend;
use crate::money::Money;
use crate::product::ProductId;
use crate::session::Session;
use crate::storage;
use crate::storage::keys;
use crate::storage::SharedStore;

#[derive(Error, Debug)]
pub enum CartError {
    #[error("You must be logged in to checkout.")]
    Unauthenticated,
    #[error("checkout failed: {0}")]
    Backend(#[from] BackendError),
}

/// One product entry in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(rename = "id")]
    pub product_id: ProductId,
    pub title: String,
    #[serde(deserialize_with = "crate::money::deserialize_non_negative")]
    pub price: Money,
    #[serde(default)]
    pub image: String,
    #[serde(default = "one")]
    pub quantity: u32,
}

fn one() -> u32 {
    1
}

impl CartLine {
    pub fn new(
        product_id: ProductId,
        title: impl Into<String>,
        price: Money,
        image: impl Into<String>,
    ) -> Self {
        Self {
            product_id,
            title: title.into(),
            price,
            image: image.into(),
            quantity: 1,
        }
    }

    /// Price times quantity. Saturates instead of overflowing.
    pub fn subtotal(&self) -> Money {
        self.price
            .checked_mul(self.quantity)
            .unwrap_or(Money::new_from_minor(i64::MAX))
    }
}

/// An ordered list of lines holding at most one line per product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct Cart(Vec<CartLine>);

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one unit of `line`'s product.
    ///
    /// An existing line gets its quantity bumped by one; a new line always
    /// starts at quantity one, whatever quantity the caller supplied.
    pub fn add(&mut self, line: CartLine) -> &CartLine {
        match self.0.iter().position(|l| l.product_id == line.product_id) {
            Some(idx) => {
                let existing = &mut self.0[idx];
                existing.quantity = existing.quantity.saturating_add(1);
                &self.0[idx]
            }
            None => {
                self.0.push(CartLine {
                    quantity: 1,
                    ..line
                });
                &self.0[self.0.len() - 1]
            }
        }
    }

    /// Removes the line for `product_id`, if any.
    pub fn remove(&mut self, product_id: ProductId) -> Option<CartLine> {
        let idx = self.0.iter().position(|l| l.product_id == product_id)?;
        Some(self.0.remove(idx))
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn get(&self, product_id: ProductId) -> Option<&CartLine> {
        self.0.iter().find(|l| l.product_id == product_id)
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of quantities over all lines.
    pub fn item_count(&self) -> u32 {
        self.0
            .iter()
            .fold(0u32, |count, l| count.saturating_add(l.quantity))
    }

    pub fn total(&self) -> Money {
        self.0.iter().map(CartLine::subtotal).sum()
    }
}

/// Lines loaded from storage or the server are merged per product so the
/// one-line-per-product rule holds whatever the source contained.
impl FromIterator<CartLine> for Cart {
    fn from_iter<I: IntoIterator<Item = CartLine>>(iter: I) -> Self {
        let mut lines: Vec<CartLine> = Vec::new();
        for line in iter {
            match lines.iter_mut().find(|l| l.product_id == line.product_id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(line.quantity.max(1))
                }
                None => lines.push(CartLine {
                    quantity: line.quantity.max(1),
                    ..line
                }),
            }
        }
        Self(lines)
    }
}

impl From<Vec<CartLine>> for Cart {
    fn from(lines: Vec<CartLine>) -> Self {
        lines.into_iter().collect()
    }
}

impl From<Cart> for Vec<CartLine> {
    fn from(cart: Cart) -> Self {
        cart.0
    }
}

/// What the server answered to a successful checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CheckoutReceipt {
    #[serde(default)]
    pub order_id: Option<u64>,
    #[serde(default)]
    pub total_price: Option<Money>,
}

/// Where the cart currently lives.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Backing {
    Local,
    Remote { token: String },
}

impl Backing {
    fn for_session(session: &Session) -> Self {
        match session.token() {
            Some(token) => Backing::Remote {
                token: token.to_string(),
            },
            None => Backing::Local,
        }
    }
}

/// Holds the cart and mirrors every change to its backing store.
///
/// Anonymous carts are written wholesale to local storage after each change.
/// Signed-in carts are mirrored to the server on a best-effort basis: remote
/// failures are logged and dropped, the local copy stays authoritative.
pub struct CartState<B> {
    cart: Cart,
    backing: Backing,
    store: SharedStore,
    backend: Arc<B>,
}

impl<B: StorefrontBackend> CartState<B> {
    /// Creates an anonymous cart holder loaded from local storage.
    ///
    /// Call [`CartState::sync_session`] right after to pick up a signed-in session.
    pub fn new(store: SharedStore, backend: Arc<B>) -> Self {
        let cart = Self::load_local(&store);
        Self {
            cart,
            backing: Backing::Local,
            store,
            backend,
        }
    }

    /// Switches the backing store when the session changed, then reloads.
    ///
    /// The local cart is not merged into the server cart on sign-in.
    pub async fn sync_session(&mut self, session: &Session) {
        let backing = Backing::for_session(session);
        if backing == self.backing {
            return;
        }
        tracing::info!(
            "session changed, reloading cart from {}",
            if session.is_authenticated() { "server" } else { "local storage" }
        );
        self.backing = backing;
        self.reload().await;
    }

    /// Reloads the cart from its current backing store.
    pub async fn reload(&mut self) {
        match &self.backing {
            Backing::Remote { token } => {
                self.cart = match self.backend.get_cart(token).await {
                    Ok(lines) => lines.into_iter().collect(),
                    Err(e) => {
                        tracing::warn!("could not load remote cart: {}", e);
                        Cart::new()
                    }
                };
            }
            Backing::Local => {
                self.cart = Self::load_local(&self.store);
                self.persist_local();
            }
        }
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn lines(&self) -> &[CartLine] {
        self.cart.lines()
    }

    pub fn total(&self) -> Money {
        self.cart.total()
    }

    pub fn item_count(&self) -> u32 {
        self.cart.item_count()
    }

    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }

    /// Whether the cart is currently mirrored to the server.
    pub fn is_remote(&self) -> bool {
        matches!(self.backing, Backing::Remote { .. })
    }

    pub async fn add_to_cart(&mut self, line: CartLine) {
        let added = CartLine {
            quantity: 1,
            ..line
        };
        self.cart.add(added.clone());
        match &self.backing {
            Backing::Local => self.persist_local(),
            Backing::Remote { token } => {
                if let Err(e) = self.backend.add_cart_item(token, &added).await {
                    tracing::warn!("ignoring failed remote cart add: {}", e);
                }
            }
        }
    }

    pub async fn remove_from_cart(&mut self, product_id: ProductId) {
        self.cart.remove(product_id);
        match &self.backing {
            Backing::Local => self.persist_local(),
            Backing::Remote { token } => {
                if let Err(e) = self.backend.remove_cart_item(token, product_id).await {
                    tracing::warn!("ignoring failed remote cart remove: {}", e);
                }
            }
        }
    }

    pub async fn clear_cart(&mut self) {
        self.cart.clear();
        match &self.backing {
            Backing::Local => self.persist_local(),
            Backing::Remote { token } => {
                if let Err(e) = self.backend.clear_cart(token).await {
                    tracing::warn!("ignoring failed remote cart clear: {}", e);
                }
            }
        }
    }

    /// Places the order. The cart is cleared only once the server accepted it.
    pub async fn checkout(&mut self) -> Result<CheckoutReceipt, CartError> {
        let Backing::Remote { token } = &self.backing else {
            return Err(CartError::Unauthenticated);
        };
        let receipt = self.backend.checkout(token).await?;
        tracing::info!("checkout accepted, order {:?}", receipt.order_id);
        self.clear_cart().await;
        Ok(receipt)
    }

    fn load_local(store: &SharedStore) -> Cart {
        storage::load_json::<Cart>(store.as_ref(), keys::CART).unwrap_or_default()
    }

    fn persist_local(&self) {
        storage::save_json(self.store.as_ref(), keys::CART, &self.cart);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::User;
    use crate::storage::KeyValueStore;
    use crate::storage::MemoryStore;
    use crate::testing::Call;
    use crate::testing::MockBackend;

    fn line(id: ProductId, price_cents: i64, quantity: u32) -> CartLine {
        CartLine {
            product_id: id,
            title: format!("product {id}"),
            price: Money::new_from_minor(price_cents),
            image: format!("https://img.example/{id}.png"),
            quantity,
        }
    }

    fn signed_in() -> Session {
        Session::authenticated("tok", User::new("Jo"))
    }

    #[test]
    fn adding_twice_bumps_quantity_regardless_of_supplied_quantity() {
        let mut cart = Cart::new();
        cart.add(line(1, 1000, 7));
        cart.add(line(1, 1000, 9));
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn removing_absent_product_changes_nothing() {
        let mut cart: Cart = vec![line(1, 1000, 1), line(2, 500, 3)].into();
        let before = cart.clone();
        assert_eq!(cart.remove(99), None);
        assert_eq!(cart, before);
    }

    #[test]
    fn total_of_example_cart_displays_25() {
        let cart: Cart = vec![line(1, 1000, 2), line(2, 500, 1)].into();
        assert_eq!(cart.total().to_string(), "25.00");
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn total_of_huge_prices_saturates() {
        let cart: Cart = serde_json::from_str(
            r#"[{"id":1,"title":"a","price":1e17,"quantity":1},
                {"id":2,"title":"b","price":1e17,"quantity":1}]"#,
        )
        .unwrap();
        assert_eq!(cart.lines()[0].price.as_minor_units(), i64::MAX);
        assert_eq!(cart.total(), Money::new_from_minor(i64::MAX));

        let counts: Cart = vec![line(1, 1, u32::MAX), line(2, 1, 5)].into();
        assert_eq!(counts.item_count(), u32::MAX);
    }

    #[test]
    fn negative_prices_are_rejected_on_decode() {
        let err = serde_json::from_str::<CartLine>(r#"{"id":1,"title":"a","price":-1.5}"#)
            .unwrap_err();
        assert!(err.to_string().contains("must not be negative"), "{err}");
        assert!(serde_json::from_str::<CartLine>(r#"{"id":1,"title":"a","price":0}"#).is_ok());
    }

    #[test]
    fn corrupt_stored_cart_with_negative_price_loads_empty() {
        let store = MemoryStore::shared();
        store
            .set(keys::CART, r#"[{"id":1,"title":"a","price":-3,"quantity":1}]"#)
            .unwrap();
        let state = CartState::new(store, Arc::new(MockBackend::new()));
        assert!(state.is_empty());
    }

    #[test]
    fn loading_merges_duplicate_products() {
        let cart: Cart = vec![line(1, 1000, 2), line(2, 500, 0), line(1, 1000, 1)].into();
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.get(1).unwrap().quantity, 3);
        assert_eq!(cart.get(2).unwrap().quantity, 1);
    }

    #[tokio::test]
    async fn anonymous_mutations_are_mirrored_to_storage() {
        let store = MemoryStore::shared();
        let backend = Arc::new(MockBackend::new());
        let mut state = CartState::new(store.clone(), backend.clone());

        state.add_to_cart(line(1, 1000, 1)).await;
        state.add_to_cart(line(2, 500, 1)).await;
        state.remove_from_cart(1).await;

        let stored: Cart = storage::load_json(store.as_ref(), keys::CART).unwrap();
        assert_eq!(stored.lines(), state.lines());
        assert!(backend.calls().is_empty());

        // a fresh holder picks the persisted cart up again
        let reopened = CartState::new(store.clone(), backend);
        assert_eq!(reopened.lines(), state.lines());
    }

    #[tokio::test]
    async fn clear_always_empties() {
        let store = MemoryStore::shared();
        let mut state = CartState::new(store.clone(), Arc::new(MockBackend::new()));
        state.add_to_cart(line(1, 1000, 1)).await;
        state.clear_cart().await;
        assert!(state.is_empty());
        assert_eq!(store.get(keys::CART).as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn unauthenticated_checkout_fails_and_keeps_cart() {
        let backend = Arc::new(MockBackend::new());
        let mut state = CartState::new(MemoryStore::shared(), backend.clone());
        state.add_to_cart(line(1, 1000, 1)).await;

        let err = state.checkout().await.unwrap_err();
        assert!(matches!(err, CartError::Unauthenticated));
        assert_eq!(state.lines().len(), 1);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn checkout_success_clears_and_failure_keeps() {
        let backend = Arc::new(MockBackend::new());
        let mut state = CartState::new(MemoryStore::shared(), backend.clone());
        state.sync_session(&signed_in()).await;
        state.add_to_cart(line(1, 1000, 1)).await;

        backend.set_fail_checkout(true);
        assert!(matches!(
            state.checkout().await,
            Err(CartError::Backend(_))
        ));
        assert_eq!(state.lines().len(), 1);

        backend.set_fail_checkout(false);
        let receipt = state.checkout().await.unwrap();
        assert!(receipt.order_id.is_some());
        assert!(state.is_empty());
        assert_eq!(backend.calls().last(), Some(&Call::ClearCart));
    }

    #[tokio::test]
    async fn sign_in_replaces_local_cart_with_server_cart() {
        let store = MemoryStore::shared();
        let backend = Arc::new(MockBackend::new().with_cart(vec![line(3, 700, 1)]));
        let mut state = CartState::new(store.clone(), backend.clone());
        state.add_to_cart(line(1, 1000, 1)).await;
        state.add_to_cart(line(2, 500, 1)).await;

        state.sync_session(&signed_in()).await;
        assert!(state.is_remote());
        assert_eq!(state.lines(), &[line(3, 700, 1)]);
    }

    #[tokio::test]
    async fn remote_load_failure_yields_empty_cart() {
        let backend = Arc::new(MockBackend::new().with_cart(vec![line(3, 700, 1)]));
        backend.set_fail_cart(true);
        let mut state = CartState::new(MemoryStore::shared(), backend);
        state.add_to_cart(line(1, 1000, 1)).await;
        state.sync_session(&signed_in()).await;
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn remote_mutation_failures_are_swallowed() {
        let backend = Arc::new(MockBackend::new());
        let mut state = CartState::new(MemoryStore::shared(), backend.clone());
        state.sync_session(&signed_in()).await;
        backend.set_fail_cart(true);

        state.add_to_cart(line(1, 1000, 4)).await;
        state.add_to_cart(line(1, 1000, 4)).await;
        state.add_to_cart(line(2, 500, 1)).await;
        state.remove_from_cart(2).await;
        assert_eq!(state.lines(), &[line(1, 1000, 2)]);

        let sent: Vec<u32> = backend
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::AddCartItem(l) => Some(l.quantity),
                _ => None,
            })
            .collect();
        assert_eq!(sent, vec![1, 1, 1]);
    }

    #[tokio::test]
    async fn sign_out_reloads_local_cart() {
        let store = MemoryStore::shared();
        let backend = Arc::new(MockBackend::new().with_cart(vec![line(3, 700, 1)]));
        let mut state = CartState::new(store.clone(), backend);
        state.add_to_cart(line(1, 1000, 1)).await;

        state.sync_session(&signed_in()).await;
        state.add_to_cart(line(4, 100, 1)).await;
        state.sync_session(&Session::anonymous()).await;

        assert!(!state.is_remote());
        assert_eq!(state.lines(), &[line(1, 1000, 1)]);
    }
}
