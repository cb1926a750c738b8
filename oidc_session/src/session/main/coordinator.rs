use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::{Mutex, watch};
use url::Url;

use crate::provider::AuthProvider;
use crate::session::errors::SessionError;
use crate::session::types::{SessionSnapshot, SessionState, SessionStatus};
use crate::utils::now_epoch;

use super::handle::SessionHandle;
use super::subscription::EventSubscription;

pub(super) struct Inner<P: AuthProvider> {
    provider: Arc<P>,
    state: watch::Sender<SessionSnapshot>,
    started: AtomicBool,
    /// Held for the duration of a provider renewal call
    renewal: Mutex<()>,
    renewals_completed: AtomicU64,
    /// Bumped on logout so that in-flight renewals drop their result
    generation: AtomicU64,
}

impl<P: AuthProvider> Inner<P> {
    /// Replace the session. With `finish_init` the same update also marks the
    /// coordinator initialized.
    fn publish(&self, state: Option<SessionState>, finish_init: bool) {
        self.state.send_modify(|snapshot| {
            snapshot.state = state;
            snapshot.initialized |= finish_init;
        });
    }

    fn mark_initialized(&self, finish_init: bool) {
        if finish_init {
            self.state.send_modify(|snapshot| snapshot.initialized = true);
        }
    }

    async fn load_user(&self, finish_init: bool) {
        match self.provider.get_user().await {
            Ok(Some(user)) if user.expired() => {
                tracing::debug!("Stored session has expired, renewing before exposing it");
                self.renew(finish_init).await;
            }
            Ok(Some(user)) => {
                let state = SessionState::from_user(user);
                if state.is_none() {
                    tracing::warn!("Stored user has no expiry, treating as anonymous");
                }
                self.publish(state, finish_init);
            }
            Ok(None) => {
                tracing::debug!("No stored session found");
                self.publish(None, finish_init);
            }
            Err(e) => {
                tracing::warn!("Failed to load stored user, continuing anonymous: {}", e);
                self.publish(None, finish_init);
            }
        }
    }

    pub(super) async fn renew_token(&self) {
        self.renew(false).await;
    }

    /// Silent renewal. A caller that waited while another renewal completed
    /// returns without a second provider call.
    async fn renew(&self, finish_init: bool) {
        let seen = self.renewals_completed.load(Ordering::Acquire);
        let _guard = self.renewal.lock().await;
        if self.renewals_completed.load(Ordering::Acquire) != seen {
            tracing::debug!("Renewal already completed by a concurrent trigger");
            self.mark_initialized(finish_init);
            return;
        }

        let generation = self.generation.load(Ordering::Acquire);
        let result = self.provider.signin_silent().await;
        let stale = self.generation.load(Ordering::Acquire) != generation;

        match result {
            Ok(_) if stale => {
                // The provider stored the renewed user after logout removed it.
                tracing::debug!("Discarding renewal result after logout");
                self.remove_user().await;
                self.mark_initialized(finish_init);
            }
            Ok(user) => {
                tracing::info!("Renewed session for {}", user.profile.sub);
                self.publish(SessionState::from_user(user), finish_init);
            }
            Err(e) => {
                tracing::warn!("Silent renewal failed, clearing session: {}", e);
                self.remove_user().await;
                if stale {
                    self.mark_initialized(finish_init);
                } else {
                    self.publish(None, finish_init);
                }
            }
        }

        self.renewals_completed.fetch_add(1, Ordering::AcqRel);
    }

    async fn remove_user(&self) {
        if let Err(e) = self.provider.remove_user().await {
            tracing::error!("Failed to remove user from provider: {}", e);
        }
    }
}

/// Owns the authentication provider and the session derived from it.
///
/// Consumers observe the session through [`SessionHandle`]s obtained from
/// [`SessionCoordinator::subscribe`]; only the coordinator changes it.
pub struct SessionCoordinator<P: AuthProvider> {
    inner: Arc<Inner<P>>,
    /// Overrides the provider's `automatic_silent_renew` when set
    automatic_silent_renew: Option<bool>,
    listener: Mutex<Option<EventSubscription>>,
}

impl<P: AuthProvider> SessionCoordinator<P> {
    pub fn new(provider: Arc<P>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                provider,
                state,
                started: AtomicBool::new(false),
                renewal: Mutex::new(()),
                renewals_completed: AtomicU64::new(0),
                generation: AtomicU64::new(0),
            }),
            automatic_silent_renew: None,
            listener: Mutex::new(None),
        }
    }

    /// Whether provider expiry events trigger background renewal. Defaults to
    /// [`AuthProvider::automatic_silent_renew`].
    pub fn with_automatic_silent_renew(mut self, enabled: bool) -> Self {
        self.automatic_silent_renew = Some(enabled);
        self
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.inner.provider
    }

    /// Load the initial session and start listening for expiry events.
    ///
    /// An expired stored session is renewed before anything is published;
    /// if that fails the session starts out anonymous.
    pub async fn initialize(&self) -> Result<(), SessionError> {
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return Err(SessionError::AlreadyInitialized);
        }

        let automatic_silent_renew = self
            .automatic_silent_renew
            .unwrap_or_else(|| self.inner.provider.automatic_silent_renew());
        // Subscribe before loading so no event is lost; the listener starts
        // once the initial session is published.
        let events = automatic_silent_renew.then(|| self.inner.provider.subscribe());

        self.inner.load_user(true).await;

        if let Some(events) = events {
            let subscription = EventSubscription::spawn(Arc::downgrade(&self.inner), events);
            *self.listener.lock().await = Some(subscription);
        }

        tracing::info!("Session initialized: {:?}", self.status());
        Ok(())
    }

    /// Re-read the provider's user, e.g. after a sign-in callback completed.
    pub async fn load_user(&self) -> Result<(), SessionError> {
        self.ensure_initialized()?;
        self.inner.load_user(false).await;
        Ok(())
    }

    /// URL of the interactive sign-in page. Provider errors propagate.
    pub async fn login(&self) -> Result<Url, SessionError> {
        self.ensure_initialized()?;
        let url = self.inner.provider.signin_redirect().await?;
        tracing::debug!("Redirecting to sign-in: {}", url);
        Ok(url)
    }

    /// Clear the session, then ask the provider for its sign-out URL.
    ///
    /// The session is cleared even when the provider call fails.
    pub async fn logout(&self) -> Result<Url, SessionError> {
        self.ensure_initialized()?;
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        self.inner.publish(None, false);
        tracing::info!("Session cleared for logout");

        let url = self.inner.provider.signout_redirect().await?;
        Ok(url)
    }

    pub async fn renew_token(&self) {
        self.inner.renew_token().await;
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated_at(now_epoch())
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.state.borrow().initialized
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.state.borrow().status_at(now_epoch())
    }

    pub fn subscribe(&self) -> SessionHandle {
        SessionHandle::new(self.inner.state.subscribe())
    }

    /// Stop reacting to provider events. Also happens on drop.
    pub async fn shutdown(&self) {
        if self.listener.lock().await.take().is_some() {
            tracing::debug!("Session event listener released");
        }
    }

    fn ensure_initialized(&self) -> Result<(), SessionError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(SessionError::NotInitialized)
        }
    }
}
