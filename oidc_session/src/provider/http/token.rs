use serde::Deserialize;

use crate::provider::errors::ProviderError;
use crate::provider::types::{OidcUser, UserProfile};
use crate::utils::{base64url_decode, now_epoch};

#[derive(Debug, Deserialize)]
pub(super) struct TokenResponse {
    pub(super) access_token: String,
    #[serde(default = "default_token_type")]
    pub(super) token_type: String,
    pub(super) expires_in: Option<i64>,
    pub(super) refresh_token: Option<String>,
    pub(super) id_token: Option<String>,
    pub(super) scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    fn contains(&self, client_id: &str) -> bool {
        match self {
            Audience::One(aud) => aud == client_id,
            Audience::Many(auds) => auds.iter().any(|aud| aud == client_id),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    iss: String,
    aud: Audience,
    nonce: Option<String>,
    #[serde(flatten)]
    profile: UserProfile,
}

/// What the ID token must match to be accepted.
pub(super) struct IdTokenExpectations<'a> {
    pub(super) issuer: &'a str,
    pub(super) client_id: &'a str,
    pub(super) nonce: Option<&'a str>,
}

/// POST a grant to the token endpoint.
pub(super) async fn request_token(
    client: &reqwest::Client,
    token_endpoint: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse, ProviderError> {
    let response = client.post(token_endpoint).form(form).send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::debug!("Token endpoint returned {}: {}", status, body);
        if let Ok(err) = serde_json::from_str::<TokenErrorResponse>(&body) {
            return Err(ProviderError::Authorization {
                error: err.error,
                description: err.error_description.unwrap_or_default(),
            });
        }
        return Err(ProviderError::HttpStatus(status));
    }

    Ok(serde_json::from_str(&body)?)
}

/// Decode the payload of a JWT without checking its signature.
///
/// The ID token is received directly from the token endpoint over TLS, which
/// OpenID Connect Core 3.1.3.7 accepts in place of signature validation.
fn decode_claims(token: &str) -> Result<IdTokenClaims, ProviderError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(ProviderError::IdToken("Invalid token format".to_string()));
    }
    let payload = base64url_decode(parts[1])?;
    serde_json::from_slice(&payload).map_err(|e| ProviderError::IdToken(e.to_string()))
}

fn verify_claims(
    claims: &IdTokenClaims,
    expect: &IdTokenExpectations<'_>,
) -> Result<(), ProviderError> {
    if claims.iss.trim_end_matches('/') != expect.issuer.trim_end_matches('/') {
        return Err(ProviderError::IdToken(format!(
            "Invalid issuer, expected: {}, actual: {}",
            expect.issuer, claims.iss
        )));
    }
    if !claims.aud.contains(expect.client_id) {
        return Err(ProviderError::IdToken(format!(
            "Audience does not contain {}",
            expect.client_id
        )));
    }
    if let Some(nonce) = expect.nonce {
        if claims.nonce.as_deref() != Some(nonce) {
            tracing::error!("Nonce in ID token: {:?}", claims.nonce);
            return Err(ProviderError::NonceMismatch);
        }
    }
    Ok(())
}

/// Turn a token response into a user.
///
/// Refresh responses may omit the ID token and refresh token; those are then
/// carried over from `previous`.
pub(super) fn user_from_response(
    response: TokenResponse,
    previous: Option<&OidcUser>,
    expect: &IdTokenExpectations<'_>,
) -> Result<OidcUser, ProviderError> {
    let (id_token, profile) = match response.id_token {
        Some(id_token) => {
            let claims = decode_claims(&id_token)?;
            verify_claims(&claims, expect)?;
            (Some(id_token), claims.profile)
        }
        None => match previous {
            Some(prev) => (prev.id_token.clone(), prev.profile.clone()),
            None => {
                return Err(ProviderError::IdToken(
                    "ID token not present in response".to_string(),
                ));
            }
        },
    };

    Ok(OidcUser {
        id_token,
        access_token: response.access_token,
        refresh_token: response
            .refresh_token
            .or_else(|| previous.and_then(|p| p.refresh_token.clone())),
        token_type: response.token_type,
        scope: response.scope,
        profile,
        expires_at: response
            .expires_in
            .map(|secs| now_epoch().saturating_add(secs)),
    })
}
