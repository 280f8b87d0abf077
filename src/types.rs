use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Application session token issued by the backend after validating an
/// identity-provider token.
///
/// Opaque to the client: the backend is the sole authority on validity and
/// expiry (fixed 7-day policy enforced server-side).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct SessionToken(pub String);

impl SessionToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Tenant-scoped client identifier (the `client-id` request header).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct ClientId(pub String);

/// Tenant identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct TenantId(pub String);

/// Messaging sender identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct SenderId(pub String);

/// Staff user profile, as returned alongside the session token.
///
/// All fields are optional: the backend spreads whatever profile data it has
/// into the validation response, and consuming screens must tolerate gaps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    /// Profile fields this crate does not model explicitly.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
