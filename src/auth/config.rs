use url::Url;

use super::error::AuthError;
use crate::idp::{AccountDescriptor, IdpConfig};

/// Shared auth settings used by both config and runtime state.
#[derive(Clone)]
pub(crate) struct AuthSettings {
    pub(crate) session_cookie_name: String,
    pub(crate) session_ttl_days: i64,
    pub(crate) secure_cookies: bool,
    pub(crate) login_path: String,
    pub(crate) logout_path: String,
    pub(crate) callback_path: String,
    pub(crate) landing_redirect: String,
    /// Accounts known from earlier sign-ins, checked when the redirect
    /// result itself carries none.
    pub(crate) known_accounts: Vec<AccountDescriptor>,
}

impl AuthSettings {
    fn defaults() -> Self {
        Self {
            session_cookie_name: "token".into(),
            // External policy: backend session tokens expire after 7 days.
            session_ttl_days: 7,
            secure_cookies: true,
            login_path: "/login".into(),
            logout_path: "/logout".into(),
            callback_path: "/petromin-auth".into(),
            landing_redirect: "/clients".into(),
            known_accounts: Vec::new(),
        }
    }
}

/// Console authentication configuration.
///
/// The required IdP configuration is a constructor parameter; everything else
/// defaults to the console's conventions and can be overridden with `with_*`
/// methods.
pub struct ConsoleAuthConfig {
    pub(super) idp: IdpConfig,
    pub(super) settings: AuthSettings,
}

impl ConsoleAuthConfig {
    /// Create config with the required IdP configuration.
    #[must_use]
    pub fn new(idp: IdpConfig) -> Self {
        Self {
            idp,
            settings: AuthSettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `IDP_CLIENT_ID`: identity provider client ID
    /// - `IDP_REDIRECT_URI`: callback URI (must be a valid URL)
    ///
    /// # Optional env vars
    /// - `IDP_AUTHORIZE_URL`: override the authorize endpoint
    /// - `IDP_LOGOUT_URL`: override the logout endpoint
    /// - `IDP_SCOPES`: comma-separated scopes
    /// - `DEV_AUTH`: set to `"1"` or `"true"` to disable secure cookies
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if required env vars are missing or URLs
    /// are invalid.
    pub fn from_env() -> Result<Self, AuthError> {
        let client_id = std::env::var("IDP_CLIENT_ID")
            .map_err(|_| AuthError::Config("IDP_CLIENT_ID is required".into()))?;
        let redirect_uri_str = std::env::var("IDP_REDIRECT_URI")
            .map_err(|_| AuthError::Config("IDP_REDIRECT_URI is required".into()))?;
        let redirect_uri: Url = redirect_uri_str
            .parse()
            .map_err(|e| AuthError::Config(format!("IDP_REDIRECT_URI: {e}")))?;

        let mut idp = IdpConfig::new(client_id, redirect_uri);

        if let Ok(url_str) = std::env::var("IDP_AUTHORIZE_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| AuthError::Config(format!("IDP_AUTHORIZE_URL: {e}")))?;
            idp = idp.with_authorize_url(url);
        }
        if let Ok(url_str) = std::env::var("IDP_LOGOUT_URL") {
            let url: Url = url_str
                .parse()
                .map_err(|e| AuthError::Config(format!("IDP_LOGOUT_URL: {e}")))?;
            idp = idp.with_logout_url(url);
        }
        if let Ok(scopes) = std::env::var("IDP_SCOPES") {
            idp = idp.with_scopes(scopes.split(',').map(|s| s.trim().to_string()).collect());
        }

        let dev_auth = matches!(std::env::var("DEV_AUTH").as_deref(), Ok("1") | Ok("true"));

        Ok(Self::new(idp).with_secure_cookies(!dev_auth))
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.session_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_session_ttl_days(mut self, days: i64) -> Self {
        self.settings.session_ttl_days = days;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_landing_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.landing_redirect = path.into();
        self
    }

    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.settings.login_path = path.into();
        self
    }

    #[must_use]
    pub fn with_known_account(mut self, account: AccountDescriptor) -> Self {
        self.settings.known_accounts.push(account);
        self
    }
}
