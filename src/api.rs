//! Console backend API client.
//!
//! One `reqwest` client carrying the console's header convention on every
//! request: `Content-Type: application/json`, a bearer `authorization`
//! header, a duplicate `user-secret` header, and a `client-id` header sourced
//! from the locally persisted client context. Some screens additionally send
//! a redundant `user-token` header; both schemes are treated as required wire
//! behavior (see DESIGN.md).
//!
//! Errors are caught once here — logged, then rethrown. No retries, no
//! backoff; callers surface failures through their own loading/error state.

use std::path::Path;
use std::sync::Arc;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;
use crate::session::SessionStore;
use crate::types::{ClientId, SenderId, SessionToken, TenantId, UserProfile};

/// Backend error code for deleting a sender that is still referenced.
/// Requires a persistent (non-auto-dismiss) notification.
pub const SENDER_IN_USE: &str = "SENDER_IN_USE";

/// Locally persisted client context: the `token` value and the `client-info`
/// blob, both written by a previous session.
///
/// Either may be absent — code running where the storage is unavailable must
/// not assume presence.
#[derive(Debug, Clone, Default)]
pub struct StoredContext {
    pub token: Option<SessionToken>,
    pub client_info: Option<ClientInfo>,
}

/// The persisted `client-info` JSON blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub id: ClientId,
    #[serde(default)]
    pub name: Option<String>,
}

impl StoredContext {
    /// Read the persisted `token` and `client-info` entries from `dir`.
    ///
    /// Missing or unreadable entries resolve to `None`; returns `None` when
    /// neither exists.
    #[must_use]
    pub fn load(dir: impl AsRef<Path>) -> Option<Self> {
        let dir = dir.as_ref();
        let token = std::fs::read_to_string(dir.join("token"))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(SessionToken);
        let client_info = std::fs::read_to_string(dir.join("client-info"))
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok());

        if token.is_none() && client_info.is_none() {
            return None;
        }
        Some(Self { token, client_info })
    }
}

/// Console API configuration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ApiConfig {
    pub(crate) base_url: Url,
    pub(crate) stored: Option<StoredContext>,
    pub(crate) send_user_token: bool,
}

impl ApiConfig {
    /// Create a configuration for the given backend base URL.
    #[must_use]
    pub fn new(mut base_url: Url) -> Self {
        // Url::join drops the last path segment unless the base ends in '/'.
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }
        Self {
            base_url,
            stored: None,
            send_user_token: false,
        }
    }

    /// Create a configuration from environment variables.
    ///
    /// # Required env vars
    /// - `CONSOLE_API_URL`: backend base URL
    ///
    /// # Optional env vars
    /// - `CONSOLE_STATE_DIR`: directory holding the persisted `token` and
    ///   `client-info` entries
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `CONSOLE_API_URL` is missing or invalid.
    pub fn from_env() -> Result<Self, Error> {
        let base = std::env::var("CONSOLE_API_URL")
            .map_err(|_| Error::Config("CONSOLE_API_URL is required".into()))?;
        let base_url: Url = base
            .parse()
            .map_err(|e| Error::Config(format!("CONSOLE_API_URL: {e}")))?;

        let mut config = Self::new(base_url);
        if let Ok(dir) = std::env::var("CONSOLE_STATE_DIR") {
            config.stored = StoredContext::load(dir);
        }
        Ok(config)
    }

    /// Attach a previously loaded client context.
    #[must_use]
    pub fn with_stored_context(mut self, stored: StoredContext) -> Self {
        self.stored = Some(stored);
        self
    }

    /// Also send the redundant `user-token` header (some screens do).
    #[must_use]
    pub fn with_user_token_header(mut self, enabled: bool) -> Self {
        self.send_user_token = enabled;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Serialize)]
struct ValidateTokenRequest<'a> {
    token: &'a str,
}

/// Response of `POST users/validateToken`: the session token plus whatever
/// profile fields the backend spreads in.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateTokenResponse {
    #[serde(default)]
    pub token: Option<SessionToken>,
    #[serde(flatten)]
    pub profile: UserProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    pub id: ClientId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantRecord {
    pub id: TenantId,
    pub name: String,
    #[serde(default)]
    pub client_id: Option<ClientId>,
}

/// Aggregate returned by the `*-history/get-average-time` endpoints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AverageTime {
    pub average_time: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyOtpRequest<'a> {
    sender_id: &'a SenderId,
    otp: &'a str,
}

/// Page parameters for the paginated list endpoints.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

/// Structured error body returned by the backend.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

// ── Client ─────────────────────────────────────────────────────────

/// HTTP client for the console backend.
///
/// Reads the current bearer token from the shared [`SessionStore`], falling
/// back to the persisted context for requests made before login completes.
pub struct ApiClient {
    config: ApiConfig,
    http: reqwest::Client,
    store: Arc<SessionStore>,
}

impl ApiClient {
    #[must_use]
    pub fn new(config: ApiConfig, store: Arc<SessionStore>) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            store,
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Exchange an identity-provider token for an application session.
    ///
    /// The token may be empty — the backend is the source of truth for
    /// validity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] with the
    /// structured error body on a non-success status.
    pub async fn validate_token(
        &self,
        identity_token: &str,
    ) -> Result<ValidateTokenResponse, Error> {
        let response = self
            .request(Method::POST, "users/validateToken")?
            .json(&ValidateTokenRequest {
                token: identity_token,
            })
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "token validation request failed"))?;

        let response = Self::ensure_success(response, "token validation").await?;
        response.json().await.map_err(Into::into)
    }

    /// `GET /client/get-all`
    pub async fn get_all_clients(
        &self,
        page: Option<Pagination>,
    ) -> Result<Vec<ClientRecord>, Error> {
        let mut request = self.request(Method::GET, "/client/get-all")?;
        if let Some(page) = page {
            request = request.query(&page);
        }
        let response = request
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "client list request failed"))?;

        let response = Self::ensure_success(response, "client list").await?;
        response.json().await.map_err(Into::into)
    }

    /// `GET /tenants`
    pub async fn get_tenants(&self) -> Result<Vec<TenantRecord>, Error> {
        let response = self
            .request(Method::GET, "/tenants")?
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "tenant list request failed"))?;

        let response = Self::ensure_success(response, "tenant list").await?;
        response.json().await.map_err(Into::into)
    }

    /// `GET /sms-history/get-average-time`
    pub async fn sms_average_time(&self) -> Result<AverageTime, Error> {
        self.average_time("/sms-history/get-average-time", "sms history")
            .await
    }

    /// `GET /mails-history/get-average-time`
    pub async fn mail_average_time(&self) -> Result<AverageTime, Error> {
        self.average_time("/mails-history/get-average-time", "mail history")
            .await
    }

    /// `GET /whatsapp-history/get-average-time`
    pub async fn whatsapp_average_time(&self) -> Result<AverageTime, Error> {
        self.average_time("/whatsapp-history/get-average-time", "whatsapp history")
            .await
    }

    /// `POST senders/verify-otp`
    pub async fn verify_sender_otp(&self, sender_id: &SenderId, otp: &str) -> Result<(), Error> {
        let response = self
            .request(Method::POST, "senders/verify-otp")?
            .json(&VerifyOtpRequest { sender_id, otp })
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "otp verification request failed"))?;

        Self::ensure_success(response, "otp verification").await?;
        Ok(())
    }

    /// `DELETE senders/{id}`
    ///
    /// A `SENDER_IN_USE` error body is returned as [`Error::Api`]; surface it
    /// through [`Notifier::report_request_error`](crate::Notifier::report_request_error)
    /// to get the persistent warning.
    pub async fn delete_sender(&self, sender_id: &SenderId) -> Result<(), Error> {
        let response = self
            .request(Method::DELETE, &format!("senders/{sender_id}"))?
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "sender deletion request failed"))?;

        Self::ensure_success(response, "sender deletion").await?;
        Ok(())
    }

    async fn average_time(
        &self,
        path: &str,
        operation: &'static str,
    ) -> Result<AverageTime, Error> {
        let response = self
            .request(Method::GET, path)?
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, operation, "request failed"))?;

        let response = Self::ensure_success(response, operation).await?;
        response.json().await.map_err(Into::into)
    }

    /// Build a request with the console header convention applied.
    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, Error> {
        let url = self
            .config
            .base_url
            .join(path)
            .map_err(|e| Error::Config(format!("invalid endpoint path '{path}': {e}")))?;

        let mut builder = self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json");

        if let Some(token) = self.auth_token() {
            builder = builder
                .header(AUTHORIZATION, format!("Bearer {token}"))
                .header("user-secret", token.as_str());
            if self.config.send_user_token {
                builder = builder.header("user-token", token.as_str());
            }
        }
        if let Some(client_id) = self.client_id() {
            builder = builder.header("client-id", client_id.0);
        }

        Ok(builder)
    }

    fn auth_token(&self) -> Option<SessionToken> {
        self.store.current().map(|s| s.token).or_else(|| {
            self.config
                .stored
                .as_ref()
                .and_then(|ctx| ctx.token.clone())
        })
    }

    fn client_id(&self) -> Option<ClientId> {
        self.config
            .stored
            .as_ref()
            .and_then(|ctx| ctx.client_info.as_ref())
            .map(|info| info.id.clone())
    }

    /// Checks HTTP response status; returns the response on success or the
    /// structured error after logging it.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(parsed) => (parsed.code, parsed.message),
            Err(_) => (String::new(), body),
        };
        tracing::error!(operation, status, code = %code, "console API request failed");
        Err(Error::Api {
            status,
            code,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    fn test_client(store: Arc<SessionStore>) -> ApiClient {
        let config = ApiConfig::new("https://api.example.com/v1".parse().unwrap())
            .with_stored_context(StoredContext {
                token: Some(SessionToken("persisted".into())),
                client_info: Some(ClientInfo {
                    id: ClientId("client-7".into()),
                    name: Some("Acme".into()),
                }),
            });
        ApiClient::new(config, store)
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let config = ApiConfig::new("https://api.example.com/v1".parse().unwrap());
        assert_eq!(config.base_url().path(), "/v1/");
    }

    #[test]
    fn relative_and_rooted_paths_join_as_used() {
        let client = test_client(Arc::new(SessionStore::new()));

        let req = client
            .request(Method::POST, "users/validateToken")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            req.url().as_str(),
            "https://api.example.com/v1/users/validateToken"
        );

        let req = client
            .request(Method::GET, "/client/get-all")
            .unwrap()
            .build()
            .unwrap();
        // Rooted path escapes the version prefix, as the console does.
        assert_eq!(req.url().as_str(), "https://api.example.com/client/get-all");
    }

    #[test]
    fn headers_follow_console_convention() {
        let store = Arc::new(SessionStore::new());
        let ticket = store.begin_validation();
        store.login(
            ticket,
            Session::new(SessionToken("live".into()), UserProfile::default()),
        );

        let client = test_client(store);
        let req = client
            .request(Method::GET, "/tenants")
            .unwrap()
            .build()
            .unwrap();

        let headers = req.headers();
        assert_eq!(headers["authorization"], "Bearer live");
        assert_eq!(headers["user-secret"], "live");
        assert_eq!(headers["client-id"], "client-7");
        assert_eq!(headers["content-type"], "application/json");
        assert!(!headers.contains_key("user-token"));
    }

    #[test]
    fn user_token_header_is_opt_in() {
        let store = Arc::new(SessionStore::new());
        let config = ApiConfig::new("https://api.example.com".parse().unwrap())
            .with_stored_context(StoredContext {
                token: Some(SessionToken("persisted".into())),
                client_info: None,
            })
            .with_user_token_header(true);

        let client = ApiClient::new(config, store);
        let req = client
            .request(Method::GET, "/tenants")
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(req.headers()["user-token"], "persisted");
    }

    #[test]
    fn persisted_token_used_before_login() {
        let client = test_client(Arc::new(SessionStore::new()));
        let req = client
            .request(Method::GET, "/tenants")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(req.headers()["authorization"], "Bearer persisted");
    }

    #[test]
    fn no_auth_headers_without_any_token() {
        let config = ApiConfig::new("https://api.example.com".parse().unwrap());
        let client = ApiClient::new(config, Arc::new(SessionStore::new()));
        let req = client
            .request(Method::GET, "/tenants")
            .unwrap()
            .build()
            .unwrap();

        assert!(!req.headers().contains_key("authorization"));
        assert!(!req.headers().contains_key("user-secret"));
    }

    #[test]
    fn stored_context_load_guards_missing_storage() {
        assert!(StoredContext::load("/definitely/not/a/real/path").is_none());
    }

    #[test]
    fn stored_context_load_reads_entries() {
        let dir = std::env::temp_dir().join(format!("loyalty-console-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("token"), "tok-123\n").unwrap();
        std::fs::write(dir.join("client-info"), r#"{"id":"c1","name":"Acme"}"#).unwrap();

        let ctx = StoredContext::load(&dir).unwrap();
        assert_eq!(ctx.token.unwrap().as_str(), "tok-123");
        assert_eq!(ctx.client_info.unwrap().id.0, "c1");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn error_body_parses_code_and_message() {
        let body: ApiErrorBody =
            serde_json::from_str(r#"{"code":"SENDER_IN_USE","message":"X"}"#).unwrap();
        assert_eq!(body.code, SENDER_IN_USE);
        assert_eq!(body.message, "X");
    }

    #[test]
    fn validate_response_spreads_profile() {
        let response: ValidateTokenResponse = serde_json::from_str(
            r#"{"token":"sess-1","name":"Amira","email":"a@example.com"}"#,
        )
        .unwrap();
        assert_eq!(response.token.unwrap().as_str(), "sess-1");
        assert_eq!(response.profile.name.as_deref(), Some("Amira"));
    }

    #[test]
    fn validate_response_without_token() {
        let response: ValidateTokenResponse = serde_json::from_str(r#"{"name":"Amira"}"#).unwrap();
        assert!(response.token.is_none());
    }
}
