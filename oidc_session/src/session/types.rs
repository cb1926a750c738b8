use serde::{Deserialize, Serialize};

use crate::provider::{OidcUser, UserProfile};

/// The application's view of the signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Bearer credential for outbound API calls
    pub token: String,
    /// Epoch seconds after which `token` is stale
    pub expires_at: i64,
    pub profile: UserProfile,
}

impl SessionState {
    /// Derive session state from a provider user.
    ///
    /// Returns `None` for a user without an expiry: a session is only exposed
    /// with both profile and expiry present.
    pub(crate) fn from_user(user: OidcUser) -> Option<Self> {
        let expires_at = user.expires_at?;
        Some(Self {
            token: user.access_token,
            expires_at,
            profile: user.profile,
        })
    }

    pub fn is_valid_at(&self, now: i64) -> bool {
        is_session_valid(Some(&self.profile), Some(self.expires_at), now)
    }

    /// Whole seconds left before expiry, negative once expired.
    pub fn seconds_until_expiry(&self, now: i64) -> i64 {
        self.expires_at - now
    }

    pub fn display_name(&self) -> &str {
        self.profile.display_name()
    }
}

/// True iff both profile and expiry are present and `now` is strictly before
/// the expiry.
pub fn is_session_valid(profile: Option<&UserProfile>, expires_at: Option<i64>, now: i64) -> bool {
    match (profile, expires_at) {
        (Some(_), Some(expires_at)) => now < expires_at,
        _ => false,
    }
}

/// Value published to session consumers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    /// Set once the coordinator finished loading the initial session
    pub initialized: bool,
    pub state: Option<SessionState>,
}

impl SessionSnapshot {
    pub fn is_authenticated_at(&self, now: i64) -> bool {
        self.state.as_ref().is_some_and(|s| s.is_valid_at(now))
    }

    pub fn status_at(&self, now: i64) -> SessionStatus {
        if !self.initialized {
            SessionStatus::Uninitialized
        } else if self.is_authenticated_at(now) {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Anonymous
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Uninitialized,
    Anonymous,
    Authenticated,
}
