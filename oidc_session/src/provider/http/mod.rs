//! OIDC Authorization Code + PKCE client talking to a real identity provider

mod timer;
mod token;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, OnceCell, broadcast};
use url::Url;

use crate::config::OidcSettings;
use crate::provider::AuthProvider;
use crate::provider::discovery::{OidcDiscoveryDocument, OidcDiscoveryError, fetch_oidc_discovery};
use crate::provider::errors::ProviderError;
use crate::provider::store::{InMemoryUserStore, UserStore, make_key};
use crate::provider::types::{OidcUser, ProviderEvent};
use crate::utils::{gen_random_string, now_epoch, pkce_challenge};

use timer::ExpiryTimer;
use token::{IdTokenExpectations, request_token, user_from_response};

/// Sign-in requests older than this are forgotten.
const PENDING_SIGNIN_TTL: i64 = 600;
const EVENT_CHANNEL_CAPACITY: usize = 16;

struct PendingSignin {
    nonce: String,
    code_verifier: String,
    redirect_uri: Url,
    created_at: i64,
}

pub struct HttpOidcProvider {
    settings: OidcSettings,
    client: reqwest::Client,
    discovery: OnceCell<OidcDiscoveryDocument>,
    store: Mutex<Box<dyn UserStore>>,
    store_key: String,
    pending: Mutex<HashMap<String, PendingSignin>>,
    events: broadcast::Sender<ProviderEvent>,
    timer: Mutex<Option<ExpiryTimer>>,
}

impl HttpOidcProvider {
    pub fn new(settings: OidcSettings) -> Result<Self, ProviderError> {
        Self::with_store(settings, Box::new(InMemoryUserStore::new()))
    }

    pub fn with_store(
        settings: OidcSettings,
        store: Box<dyn UserStore>,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let store_key = make_key(settings.authority.as_str(), &settings.client_id);

        Ok(Self {
            settings,
            client,
            discovery: OnceCell::new(),
            store: Mutex::new(store),
            store_key,
            pending: Mutex::new(HashMap::new()),
            events,
            timer: Mutex::new(None),
        })
    }

    pub fn settings(&self) -> &OidcSettings {
        &self.settings
    }

    /// Complete a sign-in from the URL the provider redirected back to.
    ///
    /// Handles both interactive callbacks (`redirect_uri`) and `prompt=none`
    /// callbacks (`silent_redirect_uri`).
    pub async fn signin_callback(&self, callback_url: &Url) -> Result<OidcUser, ProviderError> {
        let params: HashMap<String, String> = callback_url.query_pairs().into_owned().collect();

        let state = params
            .get("state")
            .ok_or_else(|| ProviderError::MissingParameter("state".to_string()))?;
        let pending = self
            .pending
            .lock()
            .await
            .remove(state)
            .ok_or(ProviderError::UnknownState)?;

        if now_epoch() - pending.created_at >= PENDING_SIGNIN_TTL {
            tracing::debug!("Sign-in request for state {} has expired", state);
            return Err(ProviderError::UnknownState);
        }

        if let Some(error) = params.get("error") {
            return Err(ProviderError::Authorization {
                error: error.clone(),
                description: params
                    .get("error_description")
                    .cloned()
                    .unwrap_or_default(),
            });
        }

        let code = params
            .get("code")
            .ok_or_else(|| ProviderError::MissingParameter("code".to_string()))?;

        let doc = self.discovery().await?;
        let response = request_token(
            &self.client,
            &doc.token_endpoint,
            &[
                ("grant_type", "authorization_code"),
                ("code", code.as_str()),
                ("redirect_uri", pending.redirect_uri.as_str()),
                ("client_id", self.settings.client_id.as_str()),
                ("code_verifier", pending.code_verifier.as_str()),
            ],
        )
        .await?;

        let user = user_from_response(
            response,
            None,
            &IdTokenExpectations {
                issuer: &doc.issuer,
                client_id: &self.settings.client_id,
                nonce: Some(&pending.nonce),
            },
        )?;

        self.store_user(user.clone()).await?;
        tracing::info!("Signed in user {}", user.profile.sub);
        Ok(user)
    }

    async fn discovery(&self) -> Result<&OidcDiscoveryDocument, ProviderError> {
        let doc = self
            .discovery
            .get_or_try_init(|| fetch_oidc_discovery(&self.client, &self.settings.authority))
            .await?;
        Ok(doc)
    }

    /// Build an authorization URL and remember the request under its `state`.
    async fn begin_signin(
        &self,
        redirect_uri: &Url,
        prompt: Option<&str>,
    ) -> Result<Url, ProviderError> {
        let doc = self.discovery().await?;

        let state = gen_random_string(16)?;
        let nonce = gen_random_string(16)?;
        let code_verifier = gen_random_string(32)?;

        let mut url = Url::parse(&doc.authorization_endpoint)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.settings.client_id)
                .append_pair("redirect_uri", redirect_uri.as_str())
                .append_pair("response_type", &self.settings.response_type)
                .append_pair("scope", &self.settings.scope)
                .append_pair("state", &state)
                .append_pair("nonce", &nonce)
                .append_pair("code_challenge", &pkce_challenge(&code_verifier))
                .append_pair("code_challenge_method", "S256");
            if let Some(prompt) = prompt {
                query.append_pair("prompt", prompt);
            }
        }

        let now = now_epoch();
        let mut pending = self.pending.lock().await;
        pending.retain(|_, p| now - p.created_at < PENDING_SIGNIN_TTL);
        pending.insert(
            state,
            PendingSignin {
                nonce,
                code_verifier,
                redirect_uri: redirect_uri.clone(),
                created_at: now,
            },
        );

        tracing::debug!("Authorization URL: {}", url);
        Ok(url)
    }

    async fn store_user(&self, user: OidcUser) -> Result<(), ProviderError> {
        let expires_at = user.expires_at;
        self.store.lock().await.set(&self.store_key, user).await?;

        *self.timer.lock().await = expires_at.map(|at| {
            ExpiryTimer::arm(
                self.events.clone(),
                at,
                self.settings.access_token_expiring_notification_time,
            )
        });
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for HttpOidcProvider {
    async fn get_user(&self) -> Result<Option<OidcUser>, ProviderError> {
        self.store.lock().await.get(&self.store_key).await
    }

    async fn signin_redirect(&self) -> Result<Url, ProviderError> {
        self.begin_signin(&self.settings.redirect_uri, None).await
    }

    async fn signin_silent(&self) -> Result<OidcUser, ProviderError> {
        let current = self.get_user().await?;
        let Some((user, refresh_token)) =
            current.and_then(|u| u.refresh_token.clone().map(|rt| (u, rt)))
        else {
            let url = self
                .begin_signin(&self.settings.silent_redirect_uri, Some("none"))
                .await?;
            tracing::debug!("No refresh token available, silent renewal needs a redirect");
            return Err(ProviderError::InteractionRequired(url.to_string()));
        };

        let doc = self.discovery().await?;
        let response = request_token(
            &self.client,
            &doc.token_endpoint,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", self.settings.client_id.as_str()),
            ],
        )
        .await?;

        let refreshed = user_from_response(
            response,
            Some(&user),
            &IdTokenExpectations {
                issuer: &doc.issuer,
                client_id: &self.settings.client_id,
                nonce: None,
            },
        )?;

        self.store_user(refreshed.clone()).await?;
        tracing::debug!("Refreshed tokens for user {}", refreshed.profile.sub);
        Ok(refreshed)
    }

    async fn signout_redirect(&self) -> Result<Url, ProviderError> {
        let user = self.get_user().await?;
        self.remove_user().await?;

        let doc = self.discovery().await?;
        let endpoint = doc.end_session_endpoint.as_deref().ok_or_else(|| {
            OidcDiscoveryError::MissingEndpoint("end_session_endpoint".to_string())
        })?;

        let mut url = Url::parse(endpoint)?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(id_token) = user.as_ref().and_then(|u| u.id_token.as_deref()) {
                query.append_pair("id_token_hint", id_token);
            }
            query
                .append_pair(
                    "post_logout_redirect_uri",
                    self.settings.post_logout_redirect_uri.as_str(),
                )
                .append_pair("client_id", &self.settings.client_id);
        }
        Ok(url)
    }

    async fn remove_user(&self) -> Result<(), ProviderError> {
        self.store.lock().await.remove(&self.store_key).await?;
        self.timer.lock().await.take();
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }

    fn automatic_silent_renew(&self) -> bool {
        self.settings.automatic_silent_renew
    }
}
