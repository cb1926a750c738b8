use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::provider::types::ProviderEvent;
use crate::utils::now_epoch;

/// Raises the expiry events for one access token. Aborted on drop.
pub(super) struct ExpiryTimer {
    handle: JoinHandle<()>,
}

impl ExpiryTimer {
    pub(super) fn arm(
        events: broadcast::Sender<ProviderEvent>,
        expires_at: i64,
        notify_before: u64,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let remaining = expires_at - now_epoch();
            if remaining > 0 {
                let notify_before = i64::try_from(notify_before).unwrap_or(i64::MAX);
                let expiring_in = remaining.saturating_sub(notify_before).max(0);
                tokio::time::sleep(Duration::from_secs(expiring_in as u64)).await;
                tracing::debug!("Access token expiring at {}", expires_at);
                let _ = events.send(ProviderEvent::AccessTokenExpiring);

                let expired_in = (expires_at - now_epoch()).max(0);
                tokio::time::sleep(Duration::from_secs(expired_in as u64)).await;
            }
            tracing::debug!("Access token expired at {}", expires_at);
            let _ = events.send(ProviderEvent::AccessTokenExpired);
        });
        Self { handle }
    }
}

impl Drop for ExpiryTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
