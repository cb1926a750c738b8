//! HTTP client for the application's API that carries the session token

use reqwest::{Method, RequestBuilder};
use thiserror::Error;
use url::Url;

use crate::session::SessionHandle;

#[derive(Debug, Error, Clone)]
pub enum FetchError {
    #[error("Invalid request path {path}: {reason}")]
    InvalidPath { path: String, reason: String },
}

/// Builds requests against `base_url` with `Authorization: Bearer <token>`
/// attached while a session exists.
#[derive(Debug, Clone)]
pub struct AuthorizedClient {
    client: reqwest::Client,
    base_url: Url,
    session: SessionHandle,
}

impl AuthorizedClient {
    pub fn new(base_url: Url, session: SessionHandle) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, session)
    }

    pub fn with_client(client: reqwest::Client, base_url: Url, session: SessionHandle) -> Self {
        Self {
            client,
            base_url,
            session,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `path` is resolved against the base URL like a link would be.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, FetchError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| FetchError::InvalidPath {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        let builder = self.client.request(method, url);
        Ok(match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => {
                tracing::debug!("No session token, sending unauthenticated request");
                builder
            }
        })
    }

    pub fn get(&self, path: &str) -> Result<RequestBuilder, FetchError> {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> Result<RequestBuilder, FetchError> {
        self.request(Method::POST, path)
    }

    pub fn put(&self, path: &str) -> Result<RequestBuilder, FetchError> {
        self.request(Method::PUT, path)
    }

    pub fn delete(&self, path: &str) -> Result<RequestBuilder, FetchError> {
        self.request(Method::DELETE, path)
    }
}
