//! Axum-facing authentication layer for the console.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use loyalty_console::auth::{auth_routes, route_guard, ConsoleAuthConfig, GuardConfig};
//! use loyalty_console::{ApiClient, ApiConfig, Notifier, SessionStore};
//!
//! let store = Arc::new(SessionStore::new());
//! let notifier = Arc::new(Notifier::new());
//! let api = Arc::new(ApiClient::new(ApiConfig::from_env()?, store.clone()));
//! let config = ConsoleAuthConfig::from_env()?;
//!
//! let app = axum::Router::new()
//!     .merge(protected_router.layer(axum::middleware::from_fn_with_state(
//!         GuardConfig::default(),
//!         route_guard,
//!     )))
//!     // Auth routes are merged unguarded: login, logout and the IdP
//!     // callback are excluded from guard evaluation at the routing layer.
//!     .merge(auth_routes(config, api, navigator, store, notifier));
//! ```

mod config;
mod cookies;
mod error;
mod extractor;
mod guard;
mod routes;
mod state;

pub use config::ConsoleAuthConfig;
pub use error::AuthError;
pub use extractor::CurrentUser;
pub use guard::{GuardConfig, GuardDecision, decide, is_guard_exempt, route_guard};
pub use routes::auth_routes;
pub use state::AuthState;
