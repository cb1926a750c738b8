use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// OIDC Discovery Document as defined by OpenID Connect Discovery 1.0
/// https://openid.net/specs/openid-connect-discovery-1_0.html
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OidcDiscoveryDocument {
    /// The issuer identifier for the OpenID Provider
    pub issuer: String,
    /// URL of the OAuth 2.0 Authorization Endpoint
    pub authorization_endpoint: String,
    /// URL of the OAuth 2.0 Token Endpoint
    pub token_endpoint: String,
    /// URL of the UserInfo Endpoint
    pub userinfo_endpoint: Option<String>,
    /// URL of the JSON Web Key Set
    pub jwks_uri: String,
    /// RP-Initiated Logout endpoint
    pub end_session_endpoint: Option<String>,
    pub scopes_supported: Option<Vec<String>>,
    pub response_types_supported: Option<Vec<String>>,
    pub grant_types_supported: Option<Vec<String>>,
    pub code_challenge_methods_supported: Option<Vec<String>>,
}

/// Errors that can occur during OIDC discovery
#[derive(Error, Debug, Clone)]
pub enum OidcDiscoveryError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),
    #[error("HTTP status error: {0}")]
    HttpStatusError(reqwest::StatusCode),
    #[error("JSON parsing failed: {0}")]
    JsonError(String),
    #[error("Issuer mismatch: discovered={0}, expected={1}")]
    IssuerMismatch(String, String),
    #[error("Endpoint not advertised: {0}")]
    MissingEndpoint(String),
}

impl From<reqwest::Error> for OidcDiscoveryError {
    fn from(err: reqwest::Error) -> Self {
        Self::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for OidcDiscoveryError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

pub(crate) fn discovery_url(authority: &Url) -> String {
    format!(
        "{}/.well-known/openid-configuration",
        authority.as_str().trim_end_matches('/')
    )
}

/// Fetch the discovery document from `{authority}/.well-known/openid-configuration`
/// and check that it describes the same issuer.
pub(crate) async fn fetch_oidc_discovery(
    client: &reqwest::Client,
    authority: &Url,
) -> Result<OidcDiscoveryDocument, OidcDiscoveryError> {
    let url = discovery_url(authority);
    tracing::debug!("Fetching OIDC discovery from: {}", url);

    let response = client.get(&url).send().await?;

    if !response.status().is_success() {
        tracing::error!("OIDC discovery failed with status: {}", response.status());
        return Err(OidcDiscoveryError::HttpStatusError(response.status()));
    }

    let body = response.text().await?;
    let document: OidcDiscoveryDocument = serde_json::from_str(&body)?;
    validate_issuer(&document, authority)?;

    tracing::debug!(
        "Discovered endpoints: authorization={}, token={}, end_session={:?}",
        document.authorization_endpoint,
        document.token_endpoint,
        document.end_session_endpoint
    );

    Ok(document)
}

fn validate_issuer(
    document: &OidcDiscoveryDocument,
    authority: &Url,
) -> Result<(), OidcDiscoveryError> {
    let expected = authority.as_str().trim_end_matches('/');
    if document.issuer.trim_end_matches('/') != expected {
        tracing::error!(
            "Issuer mismatch in discovery document. Expected: {}, Found: {}",
            expected,
            document.issuer
        );
        return Err(OidcDiscoveryError::IssuerMismatch(
            document.issuer.clone(),
            expected.to_string(),
        ));
    }
    Ok(())
}
