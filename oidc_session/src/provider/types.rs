use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::now_epoch;

/// Claims describing the signed-in principal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Any other claims carried by the ID token
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            name: None,
            preferred_username: None,
            email: None,
            extra: Map::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Best human-readable label: name, then username, then subject.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.preferred_username.as_deref())
            .unwrap_or(&self.sub)
    }
}

/// A signed-in user as held by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OidcUser {
    pub id_token: Option<String>,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub scope: Option<String>,
    pub profile: UserProfile,
    /// Absolute expiry of the access token in epoch seconds
    pub expires_at: Option<i64>,
}

impl OidcUser {
    /// Seconds until the access token expires, negative once it has.
    pub fn expires_in(&self) -> Option<i64> {
        self.expires_at.map(|at| at - now_epoch())
    }

    pub fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= now_epoch())
    }
}

/// Token lifetime notifications emitted by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderEvent {
    AccessTokenExpiring,
    AccessTokenExpired,
}
