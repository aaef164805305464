//! Europa Console HTTP Client
//!
//! A typed async client for the console backend. Every operation goes through
//! the single `/ajax` endpoint, selected with the `op` query parameter:
//! `GET|POST {base}/ajax?op=<Op>&<params>`. Request content, when an
//! operation takes any, travels as a JSON body.
//!
//! The [`PipelineApi`] trait is the seam the promotion session is written
//! against; [`ConsoleClient`] is its HTTP implementation.
//!
//! # Example
//!
//! ```no_run
//! use europa_client::ConsoleClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ConsoleClient::new("http://localhost:8080");
//!
//!     for pipeline in client.list_pipelines().await? {
//!         println!("{} ({} components)", pipeline.name, pipeline.components.len());
//!     }
//!     Ok(())
//! }
//! ```

mod api;
pub mod error;
mod pipelines;
mod repos;
pub mod session;

pub use api::PipelineApi;
pub use error::{ClientError, Result};
pub use session::PromotionSession;

use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Query parameters of an `/ajax` operation
pub(crate) type Params<'a> = Vec<(&'a str, String)>;

/// HTTP client for the console backend
#[derive(Debug, Clone)]
pub struct ConsoleClient {
    /// Base URL of the console (e.g., "http://localhost:8080")
    base_url: String,
    client: Client,
}

impl ConsoleClient {
    /// Create a new console client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the console (e.g., "http://localhost:8080")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new console client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Example
    /// ```
    /// use europa_client::ConsoleClient;
    /// use reqwest::Client;
    /// use std::time::Duration;
    ///
    /// let http_client = Client::builder()
    ///     .timeout(Duration::from_secs(30))
    ///     .build()
    ///     .unwrap();
    ///
    /// let client = ConsoleClient::with_client("http://localhost:8080", http_client);
    /// ```
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the console
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn ajax_url(&self) -> String {
        format!("{}/ajax", self.base_url)
    }

    // =============================================================================
    // Request Helpers
    // =============================================================================

    /// Run a read-only operation
    pub(crate) async fn ajax_get<T: DeserializeOwned>(&self, op: &str, params: Params<'_>) -> Result<T> {
        debug!(op, "GET /ajax");
        let request = self.client.get(self.ajax_url());
        self.send(request, op, &params).await
    }

    /// Run a mutating operation without request content
    pub(crate) async fn ajax_post<T: DeserializeOwned>(&self, op: &str, params: Params<'_>) -> Result<T> {
        debug!(op, "POST /ajax");
        let request = self.client.post(self.ajax_url());
        self.send(request, op, &params).await
    }

    /// Run a mutating operation carrying JSON content
    pub(crate) async fn ajax_post_json<T, B>(&self, op: &str, params: Params<'_>, content: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        debug!(op, "POST /ajax with content");
        let request = self.client.post(self.ajax_url()).json(content);
        self.send(request, op, &params).await
    }

    /// Run a mutating operation whose response carries no data
    pub(crate) async fn ajax_post_empty(&self, op: &str, params: Params<'_>) -> Result<()> {
        debug!(op, "POST /ajax");
        let response = self
            .client
            .post(self.ajax_url())
            .query(&[("op", op)])
            .query(&params)
            .send()
            .await?;

        self.handle_empty_response(response).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        op: &str,
        params: &Params<'_>,
    ) -> Result<T> {
        let response = request.query(&[("op", op)]).query(params).send().await?;
        self.handle_response(response).await
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code and deserialize the JSON body
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::from_body(status.as_u16(), &body));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Check the status code of a response that carries no data
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::from_body(status.as_u16(), &body));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ConsoleClient::new("http://localhost:8080");
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.ajax_url(), "http://localhost:8080/ajax");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = ConsoleClient::new("http://localhost:8080//");
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_client_with_custom_client() {
        let client = ConsoleClient::with_client("https://console.example.com/", Client::new());
        assert_eq!(client.ajax_url(), "https://console.example.com/ajax");
    }
}
