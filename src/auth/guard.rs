//! Request-time route guard.
//!
//! Runs before any protected page: static-asset and API paths pass through
//! untouched, the public unsubscribe page passes through, visitors without a
//! session cookie are bounced to the login entry point, and the bare root
//! path is sent to the default landing page. Presence of the cookie is all
//! that is checked — validity is the backend's job.
//!
//! Login, logout and the IdP callback are excluded from guard evaluation at
//! the routing layer (see [`is_guard_exempt`]), not inside the guard body.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;

/// Paths the guard never sees: the auth flow itself plus the public
/// unsubscribe page.
const EXEMPT_PATHS: &[&str] = &["/login", "/logout", "/petromin-auth", "/unsubscribe"];

const STATIC_PREFIXES: &[&str] = &["/static/", "/assets/"];

/// Guard configuration: the cookie to key on and the two redirect targets.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    pub cookie_name: String,
    pub login_path: String,
    pub landing_path: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            cookie_name: "token".into(),
            login_path: "/login".into(),
            landing_path: "/clients".into(),
        }
    }
}

/// Per-request guard decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Static asset, API or public path: pass through unmodified.
    Bypass,
    /// No session cookie: redirect to the login entry point.
    RedirectLogin,
    /// Authenticated visit to the bare root: redirect to the landing page.
    RedirectLanding,
    /// Authenticated: pass through.
    Allow,
}

/// Decide what to do with a request, from its path and whether the session
/// cookie is present.
#[must_use]
pub fn decide(path: &str, has_session_cookie: bool) -> GuardDecision {
    if path == "/api" || path.starts_with("/api/") {
        return GuardDecision::Bypass;
    }
    if path == "/favicon.ico" || STATIC_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return GuardDecision::Bypass;
    }
    if path == "/unsubscribe" || path.starts_with("/unsubscribe/") {
        return GuardDecision::Bypass;
    }
    if !has_session_cookie {
        return GuardDecision::RedirectLogin;
    }
    if path == "/" {
        return GuardDecision::RedirectLanding;
    }
    GuardDecision::Allow
}

/// Whether a path is excluded from guard evaluation entirely.
///
/// Use when composing routers: mount guarded screens behind
/// [`route_guard`] and everything matching this allow-list outside it.
#[must_use]
pub fn is_guard_exempt(path: &str) -> bool {
    EXEMPT_PATHS
        .iter()
        .any(|p| path == *p || path.starts_with(&format!("{p}/")))
        || path == "/api"
        || path.starts_with("/api/")
        || path == "/favicon.ico"
        || STATIC_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// Axum middleware enforcing the guard decision.
///
/// ```rust,ignore
/// let app = protected_router.layer(axum::middleware::from_fn_with_state(
///     GuardConfig::default(),
///     route_guard,
/// ));
/// ```
pub async fn route_guard(
    State(config): State<GuardConfig>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let has_cookie = jar.get(&config.cookie_name).is_some();
    match decide(request.uri().path(), has_cookie) {
        GuardDecision::Bypass | GuardDecision::Allow => next.run(request).await,
        GuardDecision::RedirectLogin => Redirect::to(&config.login_path).into_response(),
        GuardDecision::RedirectLanding => Redirect::to(&config.landing_path).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode, header};
    use axum::routing::get;
    use tower::ServiceExt;

    #[test]
    fn api_paths_bypass_without_cookie() {
        assert_eq!(decide("/api/anything", false), GuardDecision::Bypass);
        assert_eq!(decide("/api", false), GuardDecision::Bypass);
    }

    #[test]
    fn unsubscribe_is_public() {
        assert_eq!(decide("/unsubscribe", false), GuardDecision::Bypass);
        assert_eq!(decide("/unsubscribe/abc", false), GuardDecision::Bypass);
    }

    #[test]
    fn static_assets_bypass() {
        assert_eq!(decide("/static/app.css", false), GuardDecision::Bypass);
        assert_eq!(decide("/favicon.ico", false), GuardDecision::Bypass);
    }

    #[test]
    fn missing_cookie_redirects_to_login() {
        assert_eq!(decide("/clients", false), GuardDecision::RedirectLogin);
        assert_eq!(decide("/", false), GuardDecision::RedirectLogin);
    }

    #[test]
    fn root_with_cookie_redirects_to_landing() {
        assert_eq!(decide("/", true), GuardDecision::RedirectLanding);
    }

    #[test]
    fn protected_path_with_cookie_passes() {
        assert_eq!(decide("/clients", true), GuardDecision::Allow);
        assert_eq!(decide("/tenants/42", true), GuardDecision::Allow);
    }

    #[test]
    fn auth_flow_paths_are_exempt() {
        assert!(is_guard_exempt("/login"));
        assert!(is_guard_exempt("/logout"));
        assert!(is_guard_exempt("/petromin-auth"));
        assert!(is_guard_exempt("/unsubscribe"));
        assert!(!is_guard_exempt("/clients"));
        assert!(!is_guard_exempt("/"));
    }

    fn guarded_app() -> Router {
        Router::new()
            .route("/", get(|| async { "root" }))
            .route("/clients", get(|| async { "clients" }))
            .route("/unsubscribe", get(|| async { "bye" }))
            .route("/api/{*rest}", get(|| async { "api" }))
            .layer(axum::middleware::from_fn_with_state(
                GuardConfig::default(),
                route_guard,
            ))
    }

    async fn send(path: &str, cookie: Option<&str>) -> (StatusCode, Option<String>) {
        let mut builder = HttpRequest::builder().uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let response = guarded_app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        (response.status(), location)
    }

    #[tokio::test]
    async fn middleware_redirects_unauthenticated_to_login() {
        let (status, location) = send("/clients", None).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location.as_deref(), Some("/login"));
    }

    #[tokio::test]
    async fn middleware_passes_api_without_cookie() {
        let (status, location) = send("/api/anything", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(location.is_none());
    }

    #[tokio::test]
    async fn middleware_redirects_root_to_landing_with_cookie() {
        let (status, location) = send("/", Some("token=sess-1")).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location.as_deref(), Some("/clients"));
    }

    #[tokio::test]
    async fn middleware_passes_unsubscribe_without_cookie() {
        let (status, _) = send("/unsubscribe", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn middleware_passes_protected_path_with_cookie() {
        let (status, _) = send("/clients", Some("token=sess-1")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn wrong_cookie_name_does_not_authenticate() {
        let (status, location) = send("/clients", Some("other=sess-1")).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location.as_deref(), Some("/login"));
    }
}
