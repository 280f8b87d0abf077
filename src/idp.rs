use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use serde::{Deserialize, Serialize};
use url::Url;

/// Identity provider (IdP) configuration for the redirect-based login flow.
///
/// Required fields are constructor parameters — no runtime "missing field" errors.
///
/// ```rust,ignore
/// use loyalty_console::IdpConfig;
///
/// let idp = IdpConfig::new("console-client-id", "https://console.example.com/petromin-auth".parse()?);
/// // Optional overrides via chaining:
/// let idp = idp.with_authorize_url("https://idp.example.com/authorize".parse()?);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct IdpConfig {
    pub(crate) client_id: String,
    pub(crate) authorize_url: Url,
    pub(crate) logout_url: Url,
    pub(crate) redirect_uri: Url,
    pub(crate) scopes: Vec<String>,
}

impl IdpConfig {
    /// Create a new IdP configuration.
    #[must_use]
    pub fn new(client_id: impl Into<String>, redirect_uri: Url) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri,
            authorize_url: "https://login.microsoftonline.com/common/oauth2/v2.0/authorize"
                .parse()
                .expect("valid default URL"),
            logout_url: "https://login.microsoftonline.com/common/oauth2/v2.0/logout"
                .parse()
                .expect("valid default URL"),
            scopes: vec!["openid".into(), "profile".into()],
        }
    }

    /// Override the IdP authorization endpoint.
    #[must_use]
    pub fn with_authorize_url(mut self, url: Url) -> Self {
        self.authorize_url = url;
        self
    }

    /// Override the IdP logout endpoint.
    #[must_use]
    pub fn with_logout_url(mut self, url: Url) -> Self {
        self.logout_url = url;
        self
    }

    /// Override the requested scopes (default: `["openid", "profile"]`).
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn authorize_url(&self) -> &Url {
        &self.authorize_url
    }

    #[must_use]
    pub fn logout_url(&self) -> &Url {
        &self.logout_url
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// Build the authorization URL the browser is sent to for login.
    ///
    /// The IdP returns control via `redirect_uri` carrying the identity token.
    /// The `state` parameter must round-trip unmodified; store it in a cookie
    /// and compare on callback.
    #[must_use]
    pub fn authorization_request(&self) -> AuthorizationRequest {
        let state = generate_state();
        let scope = self.scopes.join(" ");

        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "id_token")
            .append_pair("response_mode", "query")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", self.redirect_uri.as_str())
            .append_pair("state", &state)
            .append_pair("nonce", &generate_state())
            .append_pair("scope", &scope);

        AuthorizationRequest {
            url: url.into(),
            state,
        }
    }

    /// Build the logout-redirect URL.
    ///
    /// On completion the IdP navigates the browser back to the console's
    /// login entry point (`post_logout_redirect_uri`).
    #[must_use]
    pub fn logout_redirect_url(&self) -> Url {
        let mut login_entry = self.redirect_uri.clone();
        login_entry.set_path("/login");
        login_entry.set_query(None);

        let mut url = self.logout_url.clone();
        url.query_pairs_mut()
            .append_pair("post_logout_redirect_uri", login_entry.as_str());
        url
    }
}

/// Authorization URL plus the `state` parameter to store in a cookie.
#[non_exhaustive]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

/// Generates a cryptographically random `state` parameter.
///
/// Returns a 22-character URL-safe string (16 random bytes → base64url).
#[must_use]
pub fn generate_state() -> String {
    let random_bytes: [u8; 16] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Account descriptor attached to an identity-provider redirect result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDescriptor {
    pub username: String,
    #[serde(default)]
    pub home_account_id: Option<String>,
}

impl AccountDescriptor {
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            home_account_id: None,
        }
    }
}

/// Ephemeral result of a completed identity-provider redirect.
///
/// Produced once per login redirect, consumed immediately, never persisted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedirectResult {
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub account: Option<AccountDescriptor>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Failure modes of redirect-result extraction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RedirectError {
    /// No account on the redirect result, and none among previously known accounts.
    #[error("no signed-in account was returned by the identity provider")]
    NoAccount,
    /// The IdP reported an error, or the redirect state could not be trusted.
    #[error("identity provider error: {0}")]
    Idp(String),
}

impl RedirectResult {
    /// Extract the identity token and its account, checking edge cases in order:
    /// an IdP-reported error wins, then the result's own account, then any
    /// previously known account. The token itself may be absent — an empty
    /// token is passed through because the backend is the source of truth
    /// for validity.
    pub fn resolve(
        self,
        known_accounts: &[AccountDescriptor],
    ) -> Result<(String, AccountDescriptor), RedirectError> {
        if let Some(error) = self.error {
            let detail = self.error_description.unwrap_or(error);
            return Err(RedirectError::Idp(detail));
        }

        let account = self
            .account
            .or_else(|| known_accounts.first().cloned())
            .ok_or(RedirectError::NoAccount)?;

        Ok((self.id_token.unwrap_or_default(), account))
    }
}
