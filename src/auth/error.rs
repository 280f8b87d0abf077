use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};

/// Authentication errors for the axum layer.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No valid session found.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Identity provider flow error (missing account, state mismatch, ...).
    #[error("Identity provider error: {0}")]
    Idp(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
            }
            Self::Idp(ref msg) => {
                let encoded = urlencoding::encode(msg);
                Redirect::to(&format!("/login?error={encoded}")).into_response()
            }
            Self::Config(_) => {
                tracing::error!(error = %self, "auth internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}
