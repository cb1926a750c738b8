//! Scripted provider for coordinator tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use url::Url;

use crate::provider::{AuthProvider, OidcUser, ProviderError, ProviderEvent, UserProfile};
use crate::utils::now_epoch;

pub(crate) fn test_user(sub: &str, expires_at: Option<i64>) -> OidcUser {
    OidcUser {
        id_token: Some(format!("id-token-{sub}")),
        access_token: format!("access-token-{sub}"),
        refresh_token: Some(format!("refresh-token-{sub}")),
        token_type: "Bearer".to_string(),
        scope: Some("openid".to_string()),
        profile: UserProfile::new(sub).with_name(format!("User {sub}")),
        expires_at,
    }
}

pub(crate) fn valid_user(sub: &str) -> OidcUser {
    test_user(sub, Some(now_epoch() + 3600))
}

pub(crate) fn expired_user(sub: &str) -> OidcUser {
    test_user(sub, Some(now_epoch() - 60))
}

pub(crate) struct MockProvider {
    stored: Mutex<Option<OidcUser>>,
    get_user_fails: AtomicBool,
    /// `None` makes silent renewal fail
    renewed: Mutex<Option<OidcUser>>,
    renew_delay: Duration,
    signout_fails: AtomicBool,
    automatic_silent_renew: AtomicBool,
    events: broadcast::Sender<ProviderEvent>,
    pub(crate) silent_calls: AtomicUsize,
    pub(crate) remove_calls: AtomicUsize,
    pub(crate) signout_calls: AtomicUsize,
}

impl MockProvider {
    pub(crate) fn new(stored: Option<OidcUser>) -> Self {
        let (events, _) = broadcast::channel(8);
        Self {
            stored: Mutex::new(stored),
            get_user_fails: AtomicBool::new(false),
            renewed: Mutex::new(None),
            renew_delay: Duration::from_millis(20),
            signout_fails: AtomicBool::new(false),
            automatic_silent_renew: AtomicBool::new(true),
            events,
            silent_calls: AtomicUsize::new(0),
            remove_calls: AtomicUsize::new(0),
            signout_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn renewing_to(self, user: OidcUser) -> Self {
        *self.renewed.lock().unwrap() = Some(user);
        self
    }

    pub(crate) fn failing_get_user(self) -> Self {
        self.get_user_fails.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn failing_signout(self) -> Self {
        self.signout_fails.store(true, Ordering::SeqCst);
        self
    }

    pub(crate) fn without_automatic_silent_renew(self) -> Self {
        self.automatic_silent_renew.store(false, Ordering::SeqCst);
        self
    }

    pub(crate) fn sign_in(&self, user: OidcUser) {
        *self.stored.lock().unwrap() = Some(user);
    }

    pub(crate) fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) fn stored_user(&self) -> Option<OidcUser> {
        self.stored.lock().unwrap().clone()
    }

    pub(crate) fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthProvider for MockProvider {
    async fn get_user(&self) -> Result<Option<OidcUser>, ProviderError> {
        if self.get_user_fails.load(Ordering::SeqCst) {
            return Err(ProviderError::Storage("store unavailable".to_string()));
        }
        Ok(self.stored_user())
    }

    async fn signin_redirect(&self) -> Result<Url, ProviderError> {
        Ok(Url::parse("https://idp.example.com/auth?client_id=app")?)
    }

    async fn signin_silent(&self) -> Result<OidcUser, ProviderError> {
        self.silent_calls.fetch_add(1, Ordering::SeqCst);
        // Like a refresh grant, renewal needs a stored user to start from.
        let signed_in = self.stored_user().is_some();
        tokio::time::sleep(self.renew_delay).await;

        let renewed = self.renewed.lock().unwrap().clone();
        match renewed {
            Some(user) if signed_in => {
                *self.stored.lock().unwrap() = Some(user.clone());
                Ok(user)
            }
            _ => Err(ProviderError::InteractionRequired(
                "https://idp.example.com/auth?prompt=none".to_string(),
            )),
        }
    }

    async fn signout_redirect(&self) -> Result<Url, ProviderError> {
        self.signout_calls.fetch_add(1, Ordering::SeqCst);
        *self.stored.lock().unwrap() = None;
        if self.signout_fails.load(Ordering::SeqCst) {
            return Err(ProviderError::Http("connection refused".to_string()));
        }
        Ok(Url::parse("https://idp.example.com/logout")?)
    }

    async fn remove_user(&self) -> Result<(), ProviderError> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        *self.stored.lock().unwrap() = None;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }

    fn automatic_silent_renew(&self) -> bool {
        self.automatic_silent_renew.load(Ordering::SeqCst)
    }
}
