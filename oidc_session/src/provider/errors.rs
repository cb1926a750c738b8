use thiserror::Error;

use super::discovery::OidcDiscoveryError;
use crate::utils::UtilError;

#[derive(Debug, Error, Clone)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("HTTP status error: {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error("Serde error: {0}")]
    Serde(String),

    #[error("Discovery error: {0}")]
    Discovery(#[from] OidcDiscoveryError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("No matching sign-in request for state")]
    UnknownState,

    #[error("Authorization server error: {error}: {description}")]
    Authorization { error: String, description: String },

    #[error("Missing parameter in callback: {0}")]
    MissingParameter(String),

    #[error("Id token error: {0}")]
    IdToken(String),

    #[error("Nonce mismatch")]
    NonceMismatch,

    /// Silent renewal needs a browser round trip to the given URL.
    #[error("Interaction required: {0}")]
    InteractionRequired(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

impl From<url::ParseError> for ProviderError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}
