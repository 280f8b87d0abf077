use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

pub(super) const STATE_COOKIE_NAME: &str = "__console_state";

/// Create the login `state` correlation cookie.
pub(super) fn state_cookie(state: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE_NAME, state.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(Duration::minutes(10))
        .build()
}

/// Create the removal cookie for the `state` parameter.
pub(super) fn clear_state_cookie() -> Cookie<'static> {
    Cookie::build((STATE_COOKIE_NAME, ""))
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}

/// Create the session cookie the route guard keys on.
///
/// The value is the raw application session token; the guard only ever checks
/// presence, validity stays with the backend.
pub(super) fn session_cookie(
    name: &str,
    token: &str,
    ttl_days: i64,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name.to_string(), token.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(Duration::days(ttl_days))
        .build()
}

/// Create the removal cookie for the session.
pub(super) fn clear_session_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}

/// Get the stored `state` parameter from cookies.
pub(super) fn get_state(jar: &CookieJar) -> Option<String> {
    jar.get(STATE_COOKIE_NAME).map(|c| c.value().to_string())
}
