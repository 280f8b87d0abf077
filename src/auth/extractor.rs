use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;

use super::error::AuthError;
use crate::session::SessionStore;
use crate::types::{SessionToken, UserProfile};

/// The current authenticated user, read from the shared [`SessionStore`].
///
/// Use as an axum extractor in screen handlers. Returns `401 Unauthorized`
/// when no session is active.
///
/// # Example
///
/// ```rust,ignore
/// async fn clients_screen(user: CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}", user.profile.name.as_deref().unwrap_or("staff"))
/// }
///
/// // Optional: accessible to both authenticated and anonymous visitors
/// async fn public(user: Option<CurrentUser>) -> impl IntoResponse {
///     match user {
///         Some(u) => format!("Hello, {}", u.token),
///         None => "Hello, guest".to_string(),
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub token: SessionToken,
    pub profile: UserProfile,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    Arc<SessionStore>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let store = Arc::<SessionStore>::from_ref(state);
        let session = store.current().ok_or(AuthError::Unauthenticated)?;
        Ok(Self {
            token: session.token,
            profile: session.profile,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use tower::ServiceExt;

    async fn whoami(user: CurrentUser) -> String {
        user.token.to_string()
    }

    fn app(store: Arc<SessionStore>) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .with_state(store)
    }

    #[tokio::test]
    async fn missing_session_rejects_with_401() {
        let response = app(Arc::new(SessionStore::new()))
            .oneshot(Request::builder().uri("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn active_session_is_extracted() {
        let store = Arc::new(SessionStore::new());
        let ticket = store.begin_validation();
        store.login(
            ticket,
            Session::new(SessionToken("sess-9".into()), UserProfile::default()),
        );

        let response = app(store)
            .oneshot(Request::builder().uri("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
