//! Session validation: identity token → application session.
//!
//! On success the [`SessionStore`] transitions to logged-in (fenced) and the
//! caller navigates to the landing page. On failure the store is cleared, the
//! user is notified, and the identity provider's logout redirect is scheduled
//! 2.5 seconds later — long enough for the failure notification to stay
//! visible before navigation away. The scheduled redirect is cancellable.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::api::{ApiClient, ValidateTokenResponse};
use crate::error::Error;
use crate::notify::Notifier;
use crate::session::{Session, SessionStore};

/// Delay between a validation failure being observed and the IdP logout
/// redirect firing.
pub const LOGOUT_REDIRECT_DELAY: Duration = Duration::from_millis(2500);

/// Backend token exchange seam.
///
/// Implemented by [`ApiClient`]; tests substitute a stub.
pub trait TokenExchange: Send + Sync + 'static {
    fn validate_token(
        &self,
        identity_token: &str,
    ) -> impl Future<Output = Result<ValidateTokenResponse, Error>> + Send;
}

impl TokenExchange for ApiClient {
    fn validate_token(
        &self,
        identity_token: &str,
    ) -> impl Future<Output = Result<ValidateTokenResponse, Error>> + Send {
        ApiClient::validate_token(self, identity_token)
    }
}

/// Navigation side-effect seam.
///
/// The axum layer navigates through redirect responses; this seam exists for
/// the one navigation that cannot be a response — the delayed logout
/// redirect — and for tests.
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, target: &str);
}

/// Handle to a scheduled logout redirect.
///
/// Dropping the handle leaves the task running (an abandoned page simply
/// never observes it); [`cancel`](ScheduledLogout::cancel) aborts it.
#[derive(Debug)]
pub struct ScheduledLogout {
    handle: tokio::task::JoinHandle<()>,
}

impl ScheduledLogout {
    /// Cancel the pending redirect.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Outcome of one validation attempt.
#[derive(Debug)]
pub enum ValidationOutcome {
    /// Session established; navigate to the landing page.
    LoggedIn(Session),
    /// A newer attempt superseded this one; its response was discarded.
    Superseded,
    /// Validation failed; the store is logged out and the logout redirect
    /// is scheduled.
    Failed {
        reason: String,
        scheduled: ScheduledLogout,
    },
}

/// Exchanges identity tokens for application sessions and drives the
/// login/logout state transitions.
pub struct SessionValidator<X, N> {
    exchange: Arc<X>,
    store: Arc<SessionStore>,
    notifier: Arc<Notifier>,
    navigator: Arc<N>,
    logout_target: String,
}

impl<X: TokenExchange, N: Navigator> SessionValidator<X, N> {
    pub fn new(
        exchange: Arc<X>,
        store: Arc<SessionStore>,
        notifier: Arc<Notifier>,
        navigator: Arc<N>,
        logout_target: impl Into<String>,
    ) -> Self {
        Self {
            exchange,
            store,
            notifier,
            navigator,
            logout_target: logout_target.into(),
        }
    }

    /// Exchange `identity_token` for a session.
    ///
    /// The token may be empty; the backend decides validity. The exchange is
    /// fenced: if another attempt (or a logout) starts while this one is in
    /// flight, the late response is discarded.
    pub async fn validate(&self, identity_token: &str) -> ValidationOutcome {
        let ticket = self.store.begin_validation();

        match self.exchange.validate_token(identity_token).await {
            Ok(ValidateTokenResponse {
                token: Some(token),
                profile,
            }) => {
                let session = Session::new(token, profile);
                if !self.store.login(ticket, session.clone()) {
                    return ValidationOutcome::Superseded;
                }
                tracing::info!(user = ?session.display_name(), "login successful");
                ValidationOutcome::LoggedIn(session)
            }
            Ok(ValidateTokenResponse { token: None, .. }) => {
                self.fail("session could not be established".to_string())
            }
            Err(e) => {
                let reason = e
                    .server_message()
                    .map_or_else(|| e.to_string(), ToString::to_string);
                self.fail(reason)
            }
        }
    }

    /// Run the forced-logout sequence: clear the store, notify, and schedule
    /// the IdP logout redirect after [`LOGOUT_REDIRECT_DELAY`].
    ///
    /// Also the cleanup path for exceptions during redirect handling.
    pub fn fail(&self, reason: String) -> ValidationOutcome {
        tracing::warn!(%reason, "session validation failed");
        self.store.logout();
        self.notifier.error(reason.clone());

        let navigator = self.navigator.clone();
        let target = self.logout_target.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(LOGOUT_REDIRECT_DELAY).await;
            navigator.navigate(&target);
        });

        ValidationOutcome::Failed {
            reason,
            scheduled: ScheduledLogout { handle },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SessionToken, UserProfile};
    use std::sync::Mutex;

    struct RecordingNavigator(Mutex<Vec<String>>);

    impl RecordingNavigator {
        fn new() -> Arc<Self> {
            Arc::new(Self(Mutex::new(Vec::new())))
        }

        fn targets(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, target: &str) {
            self.0.lock().unwrap().push(target.to_string());
        }
    }

    enum StubResponse {
        Token(&'static str),
        NoToken,
        Error(&'static str),
    }

    struct StubExchange {
        response: StubResponse,
        calls: Mutex<Vec<String>>,
    }

    impl StubExchange {
        fn new(response: StubResponse) -> Arc<Self> {
            Arc::new(Self {
                response,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    impl TokenExchange for StubExchange {
        async fn validate_token(
            &self,
            identity_token: &str,
        ) -> Result<ValidateTokenResponse, Error> {
            self.calls.lock().unwrap().push(identity_token.to_string());
            match self.response {
                StubResponse::Token(t) => Ok(ValidateTokenResponse {
                    token: Some(SessionToken(t.into())),
                    profile: UserProfile::default(),
                }),
                StubResponse::NoToken => Ok(ValidateTokenResponse {
                    token: None,
                    profile: UserProfile::default(),
                }),
                StubResponse::Error(msg) => Err(Error::Api {
                    status: 401,
                    code: String::new(),
                    message: msg.into(),
                }),
            }
        }
    }

    fn validator(
        exchange: Arc<StubExchange>,
        navigator: Arc<RecordingNavigator>,
    ) -> (
        SessionValidator<StubExchange, RecordingNavigator>,
        Arc<SessionStore>,
        Arc<Notifier>,
    ) {
        let store = Arc::new(SessionStore::new());
        let notifier = Arc::new(Notifier::new());
        let v = SessionValidator::new(
            exchange,
            store.clone(),
            notifier.clone(),
            navigator,
            "https://idp.example.com/logout",
        );
        (v, store, notifier)
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn successful_validation_logs_in() {
        let exchange = StubExchange::new(StubResponse::Token("sess-1"));
        let (v, store, _) = validator(exchange, RecordingNavigator::new());

        let outcome = v.validate("id-token").await;
        assert!(matches!(outcome, ValidationOutcome::LoggedIn(_)));
        assert!(store.is_logged_in());
        assert_eq!(store.current().unwrap().token().as_str(), "sess-1");
    }

    #[tokio::test]
    async fn missing_session_token_forces_logout() {
        let exchange = StubExchange::new(StubResponse::NoToken);
        let (v, store, notifier) = validator(exchange, RecordingNavigator::new());

        let outcome = v.validate("id-token").await;
        assert!(matches!(outcome, ValidationOutcome::Failed { .. }));
        assert!(!store.is_logged_in());
        assert_eq!(notifier.active().len(), 1);
    }

    #[tokio::test]
    async fn failure_notification_carries_server_message() {
        let exchange = StubExchange::new(StubResponse::Error("token expired"));
        let (v, _, notifier) = validator(exchange, RecordingNavigator::new());

        let outcome = v.validate("id-token").await;
        match outcome {
            ValidationOutcome::Failed { reason, .. } => assert_eq!(reason, "token expired"),
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(notifier.active()[0].message, "token expired");
    }

    #[tokio::test(start_paused = true)]
    async fn logout_redirect_fires_after_exact_delay() {
        let exchange = StubExchange::new(StubResponse::Error("bad token"));
        let navigator = RecordingNavigator::new();
        let (v, _, _) = validator(exchange, navigator.clone());

        let _outcome = v.validate("id-token").await;
        settle().await;

        tokio::time::advance(Duration::from_millis(2499)).await;
        settle().await;
        assert!(navigator.targets().is_empty(), "fired before 2.5s");

        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(navigator.targets(), vec!["https://idp.example.com/logout"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_logout_redirect_never_fires() {
        let exchange = StubExchange::new(StubResponse::Error("bad token"));
        let navigator = RecordingNavigator::new();
        let (v, _, _) = validator(exchange, navigator.clone());

        let outcome = v.validate("id-token").await;
        let ValidationOutcome::Failed { scheduled, .. } = outcome else {
            panic!("expected failure");
        };
        scheduled.cancel();

        tokio::time::advance(Duration::from_secs(5)).await;
        settle().await;
        assert!(navigator.targets().is_empty());
    }

    #[tokio::test]
    async fn empty_identity_token_reaches_backend_unmodified() {
        let exchange = StubExchange::new(StubResponse::Error("invalid"));
        let (v, _, _) = validator(exchange.clone(), RecordingNavigator::new());

        let _ = v.validate("").await;
        assert_eq!(*exchange.calls.lock().unwrap(), vec![String::new()]);
    }
}
