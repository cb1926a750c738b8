//! Client settings for the OIDC provider
//!
//! Settings can be built directly or loaded from the environment with
//! [`OidcSettings::from_env`]. Redirect targets default to pages under
//! `OIDC_CLIENT_ROOT`.

use std::env;

use thiserror::Error;
use url::Url;

const DEFAULT_CLIENT_ROOT: &str = "http://localhost:3000/";
const DEFAULT_SCOPE: &str = "openid";
const DEFAULT_RESPONSE_TYPE: &str = "code";
const DEFAULT_EXPIRING_NOTIFICATION_TIME: u64 = 60;

#[derive(Debug, Error, Clone)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(String),

    #[error("Invalid URL in {name}: {reason}")]
    InvalidUrl { name: String, reason: String },

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },

    #[error("Unsupported response type: {0}")]
    UnsupportedResponseType(String),
}

#[derive(Debug, Clone)]
pub struct OidcSettings {
    /// Issuer URL of the identity provider
    pub authority: Url,
    pub client_id: String,
    /// Where the provider sends the browser after interactive sign-in
    pub redirect_uri: Url,
    /// Target of `prompt=none` re-authentication requests
    pub silent_redirect_uri: Url,
    pub post_logout_redirect_uri: Url,
    pub response_type: String,
    pub scope: String,
    /// Renew in the background when the provider signals token expiry
    pub automatic_silent_renew: bool,
    /// Seconds before expiry at which the "expiring" event fires
    pub access_token_expiring_notification_time: u64,
}

impl OidcSettings {
    /// Settings with redirect targets derived from `client_root`:
    /// `signin-callback.html`, `silent-renew.html` and the root itself.
    pub fn new(
        authority: Url,
        client_id: impl Into<String>,
        client_root: &Url,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            authority,
            client_id: client_id.into(),
            redirect_uri: join_url("OIDC_CLIENT_ROOT", client_root, "signin-callback.html")?,
            silent_redirect_uri: join_url("OIDC_CLIENT_ROOT", client_root, "silent-renew.html")?,
            post_logout_redirect_uri: client_root.clone(),
            response_type: DEFAULT_RESPONSE_TYPE.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            automatic_silent_renew: true,
            access_token_expiring_notification_time: DEFAULT_EXPIRING_NOTIFICATION_TIME,
        })
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_automatic_silent_renew(mut self, enabled: bool) -> Self {
        self.automatic_silent_renew = enabled;
        self
    }

    /// Load settings from `OIDC_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let authority = required_url("OIDC_AUTHORITY")?;
        let client_id = env::var("OIDC_CLIENT_ID")
            .map_err(|_| ConfigError::Missing("OIDC_CLIENT_ID".to_string()))?;
        let client_root = match optional_url("OIDC_CLIENT_ROOT")? {
            Some(url) => url,
            None => parse_url("OIDC_CLIENT_ROOT", DEFAULT_CLIENT_ROOT)?,
        };

        let mut settings = Self::new(authority, client_id, &client_root)?;

        if let Some(url) = optional_url("OIDC_REDIRECT_URI")? {
            settings.redirect_uri = url;
        }
        if let Some(url) = optional_url("OIDC_SILENT_REDIRECT_URI")? {
            settings.silent_redirect_uri = url;
        }
        if let Some(url) = optional_url("OIDC_POST_LOGOUT_REDIRECT_URI")? {
            settings.post_logout_redirect_uri = url;
        }
        if let Ok(scope) = env::var("OIDC_SCOPE") {
            settings.scope = scope;
        }

        let response_type =
            env::var("OIDC_RESPONSE_TYPE").unwrap_or_else(|_| DEFAULT_RESPONSE_TYPE.to_string());
        if response_type != "code" {
            return Err(ConfigError::UnsupportedResponseType(response_type));
        }
        settings.response_type = response_type;

        settings.automatic_silent_renew = parse_var("OIDC_AUTOMATIC_SILENT_RENEW", true)?;
        settings.access_token_expiring_notification_time = parse_var(
            "OIDC_ACCESS_TOKEN_EXPIRING_NOTIFICATION_TIME",
            DEFAULT_EXPIRING_NOTIFICATION_TIME,
        )?;

        tracing::debug!(
            "Loaded OIDC settings: authority={}, client_id={}",
            settings.authority,
            settings.client_id
        );
        Ok(settings)
    }
}

fn parse_url(name: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn join_url(name: &str, base: &Url, path: &str) -> Result<Url, ConfigError> {
    base.join(path).map_err(|e| ConfigError::InvalidUrl {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn required_url(name: &str) -> Result<Url, ConfigError> {
    let value = env::var(name).map_err(|_| ConfigError::Missing(name.to_string()))?;
    parse_url(name, &value)
}

fn optional_url(name: &str) -> Result<Option<Url>, ConfigError> {
    env::var(name).ok().map(|v| parse_url(name, &v)).transpose()
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}
