//! HTTP client with auth header injection and client type header.
//!
//! All requests include `X-Client-Type: mobile` so the gateway routes them
//! the same way as the mobile app.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::Serialize;
use tokio::sync::RwLock;

const CLIENT_TYPE: &str = "mobile";

/// HTTP client wrapper for the user-service behind the gateway.
pub struct ApiClient {
    client: Client,
    base_url: String,
    access_token: RwLock<Option<String>>,
}

impl ApiClient {
    /// Create a new API client with the given base URL.
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: RwLock::new(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Store the access token for authenticated requests.
    pub async fn set_access_token(&self, token: String) {
        *self.access_token.write().await = Some(token);
    }

    /// Clear the access token (used on logout).
    pub async fn clear_access_token(&self) {
        *self.access_token.write().await = None;
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send an authenticated GET request to a relative API path.
    pub async fn authenticated_get(&self, path: &str) -> Result<Response, reqwest::Error> {
        let token = self.access_token.read().await;

        let mut builder = self
            .client
            .get(self.url(path))
            .header("X-Client-Type", CLIENT_TYPE);

        if let Some(ref t) = *token {
            builder = builder.bearer_auth(t);
        }

        log::debug!("GET {}", path);
        builder.send().await
    }

    /// Send an authenticated POST request with a JSON body to a relative API path.
    pub async fn authenticated_post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<Response, reqwest::Error> {
        let token = self.access_token.read().await;

        let mut builder = self
            .client
            .post(self.url(path))
            .header("X-Client-Type", CLIENT_TYPE)
            .json(body);

        if let Some(ref t) = *token {
            builder = builder.bearer_auth(t);
        }

        log::debug!("POST {}", path);
        builder.send().await
    }
}
