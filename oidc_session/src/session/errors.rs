use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Debug, Error, Clone)]
pub enum SessionError {
    #[error("Session coordinator is not initialized")]
    NotInitialized,

    #[error("Session coordinator is already initialized")]
    AlreadyInitialized,

    /// Error from the authentication provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}
