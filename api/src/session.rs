//! Authenticated/anonymous identity of the current user.

use dioxus_logger::tracing;
use thiserror::Error;

use crate::auth::Credentials;
use crate::auth::Registration;
use crate::auth::User;
use crate::backend::BackendError;
use crate::backend::StorefrontBackend;
use crate::storage;
use crate::storage::keys;
use crate::storage::KeyValueStore;
use crate::storage::SharedStore;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Backend(#[from] BackendError),
    #[error("authentication failed: the server did not return a session token")]
    MissingToken,
}

/// A snapshot of who is signed in.
///
/// Authentication is derived from the token, so the two cannot disagree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    user: Option<User>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(token: impl Into<String>, user: User) -> Self {
        Self {
            token: Some(token.into()),
            user: Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }
}

/// Owns the [`Session`] and keeps it persisted.
pub struct SessionState {
    store: SharedStore,
    session: Session,
}

impl SessionState {
    /// Restores the session from storage.
    ///
    /// A stored token is trusted as-is; there is no expiry check.
    pub fn restore(store: SharedStore) -> Self {
        let session = match store.get(keys::TOKEN) {
            Some(token) => Session {
                token: Some(token),
                user: storage::load_json(store.as_ref(), keys::USER),
            },
            None => Session::anonymous(),
        };
        tracing::debug!("restored session, authenticated: {}", session.is_authenticated());
        Self { store, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn user(&self) -> Option<&User> {
        self.session.user()
    }

    /// Persists `token` and `user` and marks the session authenticated.
    pub fn login(&mut self, token: impl Into<String>, user: User) {
        let token = token.into();
        storage::set_or_log(self.store.as_ref(), keys::TOKEN, &token);
        storage::save_json(self.store.as_ref(), keys::USER, &user);
        self.session = Session::authenticated(token, user);
    }

    pub fn logout(&mut self) {
        storage::remove_or_log(self.store.as_ref(), keys::TOKEN);
        storage::remove_or_log(self.store.as_ref(), keys::USER);
        self.session = Session::anonymous();
    }

    /// Authenticates against the backend and logs in on success.
    ///
    /// On failure the session is left untouched.
    pub async fn sign_in<B: StorefrontBackend>(
        &mut self,
        backend: &B,
        credentials: &Credentials,
    ) -> Result<&User, AuthError> {
        let response = backend.authenticate(credentials).await?;
        let token = response.token().ok_or(AuthError::MissingToken)?.to_string();
        self.login(token, response.user(&credentials.email));
        tracing::info!("signed in as {}", credentials.email);
        self.session.user().ok_or(AuthError::MissingToken)
    }

    /// Creates an account and logs in.
    ///
    /// The register endpoint may answer without a token, in which case the new
    /// credentials are used to sign in.
    pub async fn register<B: StorefrontBackend>(
        &mut self,
        backend: &B,
        registration: &Registration,
    ) -> Result<&User, AuthError> {
        let response = backend.register(registration).await?;
        match response.token() {
            Some(token) => {
                let mut user = response.user(&registration.email);
                if response.first_name.is_none() && response.username.is_none() {
                    user = User::new(registration.first_name.clone());
                }
                self.login(token.to_string(), user);
                self.session.user().ok_or(AuthError::MissingToken)
            }
            None => {
                tracing::debug!("register returned no token, signing in");
                self.sign_in(backend, &registration.credentials()).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthResponse;
    use crate::storage::MemoryStore;
    use crate::testing::MockBackend;

    #[test]
    fn restores_token_and_user_from_storage() {
        let store = MemoryStore::shared();
        store.set(keys::TOKEN, "tok").unwrap();
        store.set(keys::USER, r#"{"name":"Jo"}"#).unwrap();

        let state = SessionState::restore(store);
        assert!(state.is_authenticated());
        assert_eq!(state.session().token(), Some("tok"));
        assert_eq!(state.user(), Some(&User::new("Jo")));
    }

    #[test]
    fn token_without_readable_user_is_still_authenticated() {
        let store = MemoryStore::shared();
        store.set(keys::TOKEN, "tok").unwrap();
        store.set(keys::USER, "garbage").unwrap();

        let state = SessionState::restore(store);
        assert!(state.is_authenticated());
        assert_eq!(state.user(), None);
    }

    #[test]
    fn user_without_token_is_anonymous() {
        let store = MemoryStore::shared();
        store.set(keys::USER, r#"{"name":"Jo"}"#).unwrap();
        let state = SessionState::restore(store);
        assert!(!state.is_authenticated());
        assert_eq!(state.user(), None);
    }

    #[test]
    fn login_then_logout_round_trips_storage() {
        let store = MemoryStore::shared();
        let mut state = SessionState::restore(store.clone());
        assert!(!state.is_authenticated());

        state.login("tok", User::new("Jo"));
        assert!(state.is_authenticated());
        assert_eq!(store.get(keys::TOKEN).as_deref(), Some("tok"));
        assert_eq!(SessionState::restore(store.clone()).session(), state.session());

        state.logout();
        assert!(!state.is_authenticated());
        assert_eq!(state.user(), None);
        assert_eq!(store.get(keys::TOKEN), None);
        assert_eq!(store.get(keys::USER), None);
    }

    #[tokio::test]
    async fn sign_in_failure_leaves_session_alone() {
        let backend = MockBackend::new().with_auth_failure(401, "invalid email or password");
        let mut state = SessionState::restore(MemoryStore::shared());

        let err = state
            .sign_in(&backend, &Credentials::new("jo@example.com", "nope"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid email or password (status 401)");
        assert!(!state.is_authenticated());
    }

    #[tokio::test]
    async fn sign_in_without_token_is_rejected() {
        let backend = MockBackend::new().with_auth_response(AuthResponse::default());
        let mut state = SessionState::restore(MemoryStore::shared());
        let err = state
            .sign_in(&backend, &Credentials::new("jo@example.com", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
        assert!(!state.is_authenticated());
    }

    #[tokio::test]
    async fn register_without_token_signs_in() {
        let backend = MockBackend::new();
        let mut state = SessionState::restore(MemoryStore::shared());
        let registration = Registration {
            first_name: "Jo".into(),
            last_name: "Doe".into(),
            email: "jo@example.com".into(),
            password: "secret1".into(),
        };
        let user = state.register(&backend, &registration).await.unwrap();
        assert_eq!(user.name, "jo@example.com");
        assert!(state.is_authenticated());
    }
}
