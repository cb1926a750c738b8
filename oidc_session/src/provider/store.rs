use async_trait::async_trait;
use std::collections::HashMap;

use super::errors::ProviderError;
use super::types::OidcUser;

const USER_PREFIX: &str = "oidc.user";

/// Persistence for the signed-in user, keyed by authority and client.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<OidcUser>, ProviderError>;

    async fn set(&mut self, key: &str, user: OidcUser) -> Result<(), ProviderError>;

    async fn remove(&mut self, key: &str) -> Result<(), ProviderError>;
}

/// Store that lives as long as the process.
#[derive(Default)]
pub struct InMemoryUserStore {
    entry: HashMap<String, OidcUser>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory user store");
        Self::default()
    }
}

pub(crate) fn make_key(authority: &str, client_id: &str) -> String {
    format!("{USER_PREFIX}:{authority}:{client_id}")
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get(&self, key: &str) -> Result<Option<OidcUser>, ProviderError> {
        Ok(self.entry.get(key).cloned())
    }

    async fn set(&mut self, key: &str, user: OidcUser) -> Result<(), ProviderError> {
        self.entry.insert(key.to_string(), user);
        Ok(())
    }

    async fn remove(&mut self, key: &str) -> Result<(), ProviderError> {
        self.entry.remove(key);
        Ok(())
    }
}
