//! The application value: owns the session, the cart and the catalog listing
//! for the lifetime of the process, and keeps the cart following the session.

use std::sync::Arc;

use crate::auth::Credentials;
use crate::auth::Registration;
use crate::auth::User;
use crate::backend::HttpBackend;
use crate::backend::StorefrontBackend;
use crate::cart::CartState;
use crate::config::StoreConfig;
use crate::listing::CatalogListing;
use crate::session::AuthError;
use crate::session::SessionState;
use crate::storage::FileStore;
use crate::storage::SharedStore;

pub struct Storefront<B> {
    backend: Arc<B>,
    pub session: SessionState,
    pub cart: CartState<B>,
    pub listing: CatalogListing<B>,
}

impl Storefront<HttpBackend> {
    /// Wires the HTTP backend and on-disk storage described by `config`.
    pub async fn open(config: &StoreConfig) -> Self {
        let store: SharedStore = Arc::new(FileStore::new(&config.data_dir));
        let backend = Arc::new(HttpBackend::from_config(config));
        Self::start(store, backend, config).await
    }
}

impl<B: StorefrontBackend> Storefront<B> {
    /// Restores the session first, then loads the cart from whichever store
    /// that session calls for.
    pub async fn start(store: SharedStore, backend: Arc<B>, config: &StoreConfig) -> Self {
        let session = SessionState::restore(store.clone());
        let mut cart = CartState::new(store, backend.clone());
        cart.sync_session(session.session()).await;
        let listing = CatalogListing::new(backend.clone(), config);
        Self {
            backend,
            session,
            cart,
            listing,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn sign_in(&mut self, credentials: &Credentials) -> Result<User, AuthError> {
        let user = self.session.sign_in(self.backend.as_ref(), credentials).await?.clone();
        self.cart.sync_session(self.session.session()).await;
        Ok(user)
    }

    pub async fn register(&mut self, registration: &Registration) -> Result<User, AuthError> {
        let user = self
            .session
            .register(self.backend.as_ref(), registration)
            .await?
            .clone();
        self.cart.sync_session(self.session.session()).await;
        Ok(user)
    }

    pub async fn login(&mut self, token: &str, user: User) {
        self.session.login(token, user);
        self.cart.sync_session(self.session.session()).await;
    }

    pub async fn logout(&mut self) {
        self.session.logout();
        self.cart.sync_session(self.session.session()).await;
    }
}
