//! oidc-session - OpenID Connect session coordination for client applications
//!
//! This crate keeps a single authoritative view of "who is signed in" on top of
//! an OIDC provider: it restores a stored user at startup, drives interactive
//! sign-in and sign-out, renews tokens silently when the provider reports that
//! they are expiring, and publishes every change to its subscribers.

mod config;
mod fetch;
mod guard;
mod provider;
mod session;
mod utils;

pub use config::{ConfigError, OidcSettings};

pub use fetch::{AuthorizedClient, FetchError};
pub use guard::{RouteDecision, RouteGuard};

pub use provider::{
    AuthProvider, HttpOidcProvider, InMemoryUserStore, OidcDiscoveryDocument, OidcDiscoveryError,
    OidcUser, ProviderError, ProviderEvent, UserProfile, UserStore,
};

pub use session::{
    SessionCoordinator, SessionError, SessionHandle, SessionSnapshot, SessionState, SessionStatus,
    is_session_valid,
};

pub use utils::UtilError;
