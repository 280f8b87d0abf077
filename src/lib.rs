#![doc = include_str!("../README.md")]

pub mod api;
pub mod auth;
pub mod cache;
pub mod error;
pub mod idp;
pub mod notify;
pub mod session;
pub mod types;
pub mod validate;

// Re-exports for convenient access
pub use api::{
    ApiClient, ApiConfig, AverageTime, ClientInfo, ClientRecord, Pagination, SENDER_IN_USE,
    StoredContext, TenantRecord, ValidateTokenResponse,
};
pub use cache::{QueryCache, QueryKey, QueryState};
pub use error::Error;
pub use idp::{
    AccountDescriptor, AuthorizationRequest, IdpConfig, RedirectError, RedirectResult,
    generate_state,
};
pub use notify::{Notification, Notifier, SENDER_IN_USE_NOTIFICATION, Severity};
pub use session::{Session, SessionStore, ValidationTicket};
pub use types::{ClientId, SenderId, SessionToken, TenantId, UserProfile};
pub use validate::{
    LOGOUT_REDIRECT_DELAY, Navigator, ScheduledLogout, SessionValidator, TokenExchange,
    ValidationOutcome,
};
