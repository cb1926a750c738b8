mod discovery;
mod errors;
mod http;
mod store;
mod types;

use async_trait::async_trait;
use tokio::sync::broadcast;
use url::Url;

pub use discovery::{OidcDiscoveryDocument, OidcDiscoveryError};
pub use errors::ProviderError;
pub use http::HttpOidcProvider;
pub use store::{InMemoryUserStore, UserStore};
pub use types::{OidcUser, ProviderEvent, UserProfile};

/// Contract of the OIDC client the session coordinator drives.
///
/// The protocol work (redirects, code exchange, renewal) happens entirely
/// behind this trait.
#[async_trait]
pub trait AuthProvider: Send + Sync + 'static {
    /// The currently stored user, if any. Absence is not an error.
    async fn get_user(&self) -> Result<Option<OidcUser>, ProviderError>;

    /// URL of the interactive sign-in page the host must navigate to.
    async fn signin_redirect(&self) -> Result<Url, ProviderError>;

    /// Obtain fresh tokens without user interaction.
    async fn signin_silent(&self) -> Result<OidcUser, ProviderError>;

    /// Forget the user and return the URL of the provider's sign-out page.
    async fn signout_redirect(&self) -> Result<Url, ProviderError>;

    async fn remove_user(&self) -> Result<(), ProviderError>;

    /// Receive `AccessTokenExpiring` / `AccessTokenExpired` notifications.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;

    /// Whether expiry events should trigger silent renewal unless the
    /// coordinator is told otherwise.
    fn automatic_silent_renew(&self) -> bool {
        true
    }
}
