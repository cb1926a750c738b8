use tokio::sync::watch;

use crate::session::types::{SessionSnapshot, SessionState, SessionStatus};
use crate::utils::now_epoch;

/// Read-only view of the session for consumers.
///
/// Cloning is cheap; every clone observes the same coordinator.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    rx: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub(crate) fn new(rx: watch::Receiver<SessionSnapshot>) -> Self {
        Self { rx }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.rx.borrow().clone()
    }

    pub fn state(&self) -> Option<SessionState> {
        self.rx.borrow().state.clone()
    }

    /// Bearer token of the current session, if any.
    pub fn token(&self) -> Option<String> {
        self.rx.borrow().state.as_ref().map(|s| s.token.clone())
    }

    pub fn is_initialized(&self) -> bool {
        self.rx.borrow().initialized
    }

    pub fn is_authenticated(&self) -> bool {
        self.rx.borrow().is_authenticated_at(now_epoch())
    }

    pub fn status(&self) -> SessionStatus {
        self.rx.borrow().status_at(now_epoch())
    }

    /// Wait for the next published change. Returns `false` once the
    /// coordinator is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

#[cfg(test)]
impl SessionHandle {
    /// Handle frozen on a fixed snapshot.
    pub(crate) fn fixed(snapshot: SessionSnapshot) -> Self {
        let (_tx, rx) = watch::channel(snapshot);
        Self { rx }
    }
}
