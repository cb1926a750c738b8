use std::sync::Weak;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::{JoinHandle, JoinSet};

use crate::provider::{AuthProvider, ProviderEvent};

use super::coordinator::Inner;

/// Listener turning provider expiry events into renewals.
///
/// Holds only a weak reference to the coordinator; dropping the subscription
/// aborts the listener and any renewal it started.
pub(super) struct EventSubscription {
    handle: JoinHandle<()>,
}

impl EventSubscription {
    pub(super) fn spawn<P: AuthProvider>(
        inner: Weak<Inner<P>>,
        mut events: broadcast::Receiver<ProviderEvent>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut renewals = JoinSet::new();
            loop {
                tokio::select! {
                    event = events.recv() => {
                        let event = match event {
                            Ok(event) => event,
                            Err(RecvError::Lagged(skipped)) => {
                                tracing::warn!("Skipped {} provider events", skipped);
                                ProviderEvent::AccessTokenExpired
                            }
                            Err(RecvError::Closed) => break,
                        };
                        let Some(inner) = inner.upgrade() else {
                            break;
                        };
                        tracing::debug!("Provider event {:?}, renewing token", event);
                        // Each trigger runs as its own task so that overlapping
                        // triggers meet at the renewal guard.
                        renewals.spawn(async move { inner.renew_token().await });
                    }
                    Some(_) = renewals.join_next(), if !renewals.is_empty() => {}
                }
            }
            tracing::debug!("Provider event listener stopped");
        });
        Self { handle }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
