use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::config::ConsoleAuthConfig;
use super::cookies;
use super::state::AuthState;
use crate::idp::{AccountDescriptor, RedirectError, RedirectResult};
use crate::notify::Notifier;
use crate::session::SessionStore;
use crate::validate::{Navigator, SessionValidator, TokenExchange, ValidationOutcome};

/// Create the console authentication router: `/login`, the IdP callback and
/// `/logout`.
///
/// Merge it unguarded — these paths are excluded from route-guard evaluation
/// at the routing layer.
pub fn auth_routes<X, N>(
    config: ConsoleAuthConfig,
    exchange: Arc<X>,
    navigator: Arc<N>,
    store: Arc<SessionStore>,
    notifier: Arc<Notifier>,
) -> Router
where
    X: TokenExchange,
    N: Navigator,
{
    let validator = Arc::new(SessionValidator::new(
        exchange,
        store.clone(),
        notifier.clone(),
        navigator,
        config.idp.logout_redirect_url().to_string(),
    ));

    let settings = config.settings;
    let state = AuthState {
        validator,
        store,
        notifier,
        idp: config.idp,
        settings: settings.clone(),
    };

    Router::new()
        .route(&settings.login_path, get(login::<X, N>))
        .route(&settings.callback_path, get(callback::<X, N>))
        .route(
            &settings.logout_path,
            get(logout::<X, N>).post(logout::<X, N>),
        )
        .with_state(state)
}

// ── Login ──────────────────────────────────────────────────────────

async fn login<X: TokenExchange, N: Navigator>(
    State(state): State<AuthState<X, N>>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    let request = state.idp.authorization_request();
    let jar = jar.add(cookies::state_cookie(
        &request.state,
        state.settings.secure_cookies,
    ));
    (jar, Redirect::to(&request.url))
}

// ── IdP callback ───────────────────────────────────────────────────

#[derive(Deserialize)]
struct CallbackParams {
    id_token: Option<String>,
    state: Option<String>,
    account: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn callback<X: TokenExchange, N: Navigator>(
    State(state): State<AuthState<X, N>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let stored_state = cookies::get_state(&jar);
    let jar = jar.add(cookies::clear_state_cookie());

    // State correlation failure is an exception during redirect handling:
    // notify, then fall through to the failure cleanup.
    match (params.state.as_deref(), stored_state.as_deref()) {
        (Some(received), Some(stored)) if received == stored => {}
        _ => {
            tracing::warn!("login state mismatch");
            let outcome = state.validator.fail("login state mismatch".to_string());
            return failure_response(jar, outcome);
        }
    }

    let result = RedirectResult {
        id_token: params.id_token,
        account: params.account.map(AccountDescriptor::new),
        error: params.error,
        error_description: params.error_description,
    };

    let (identity_token, account) = match result.resolve(&state.settings.known_accounts) {
        Ok(resolved) => resolved,
        Err(RedirectError::NoAccount) => {
            // No account anywhere: notify and return to the login entry
            // point without ever calling the validation endpoint.
            let message = RedirectError::NoAccount.to_string();
            tracing::warn!("redirect completed without an account");
            state.notifier.error(message.clone());
            return (jar, login_error(&state.settings.login_path, &message)).into_response();
        }
        Err(RedirectError::Idp(detail)) => {
            tracing::warn!(error = %detail, "identity provider returned an error");
            let outcome = state.validator.fail(detail);
            return failure_response(jar, outcome);
        }
    };

    match state.validator.validate(&identity_token).await {
        ValidationOutcome::LoggedIn(session) => {
            let jar = jar.add(cookies::session_cookie(
                &state.settings.session_cookie_name,
                session.token().as_str(),
                state.settings.session_ttl_days,
                state.settings.secure_cookies,
            ));
            tracing::info!(username = %account.username, "console login successful");
            (jar, Redirect::to(&state.settings.landing_redirect)).into_response()
        }
        ValidationOutcome::Superseded => {
            (jar, Redirect::to(&state.settings.login_path)).into_response()
        }
        outcome @ ValidationOutcome::Failed { .. } => failure_response(jar, outcome),
    }
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout<X: TokenExchange, N: Navigator>(
    State(state): State<AuthState<X, N>>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    state.store.logout();
    let jar = jar.add(cookies::clear_session_cookie(
        &state.settings.session_cookie_name,
    ));
    tracing::info!("console logout");
    (jar, Redirect::to(&state.settings.login_path))
}

// ── Helpers ────────────────────────────────────────────────────────

fn login_error(login_path: &str, message: &str) -> Redirect {
    let encoded = urlencoding::encode(message);
    Redirect::to(&format!("{login_path}?error={encoded}"))
}

/// Interstitial shown while the failure notification stays visible; the
/// scheduled logout redirect navigates away 2.5 seconds later.
fn failure_response(jar: CookieJar, outcome: ValidationOutcome) -> Response {
    let message = match outcome {
        ValidationOutcome::Failed { reason, .. } => reason,
        _ => "sign-in failed".to_string(),
    };
    (jar, interstitial(&message)).into_response()
}

fn interstitial(message: &str) -> Html<String> {
    let escaped = message
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    Html(format!(
        "<!doctype html><html><head><title>Signing in\u{2026}</title></head>\
         <body><p role=\"alert\">{escaped}</p><p>Signing out\u{2026}</p></body></html>"
    ))
}
