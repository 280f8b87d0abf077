use std::sync::Arc;

use axum::extract::FromRef;

use super::config::AuthSettings;
use crate::idp::IdpConfig;
use crate::notify::Notifier;
use crate::session::SessionStore;
use crate::validate::{Navigator, SessionValidator, TokenExchange};

/// Shared state for the auth route handlers.
pub struct AuthState<X, N> {
    pub(super) validator: Arc<SessionValidator<X, N>>,
    pub(super) store: Arc<SessionStore>,
    pub(super) notifier: Arc<Notifier>,
    pub(super) idp: IdpConfig,
    pub(super) settings: AuthSettings,
}

// Manual Clone: avoid derive adding `X: Clone, N: Clone` bounds.
impl<X, N> Clone for AuthState<X, N> {
    fn clone(&self) -> Self {
        Self {
            validator: self.validator.clone(),
            store: self.store.clone(),
            notifier: self.notifier.clone(),
            idp: self.idp.clone(),
            settings: self.settings.clone(),
        }
    }
}

// Lets CurrentUser extract the session store from the auth router's state.
impl<X: TokenExchange, N: Navigator> FromRef<AuthState<X, N>> for Arc<SessionStore> {
    fn from_ref(state: &AuthState<X, N>) -> Self {
        state.store.clone()
    }
}
