//! HTTP client utilities.

use reqwest::{Client, RequestBuilder};
use std::sync::Arc;
use std::time::Duration;

use crate::sources::SourceError;

/// Publishers routinely refuse non-browser agents for PDF downloads
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0 Safari/537.36";

/// Shared HTTP client with sensible defaults
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a client identifying as this crate
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        Self::with_contact(None, timeout)
    }

    /// Create a client whose user agent carries a contact address.
    ///
    /// Crossref and OpenAlex route requests with a `mailto:` into their
    /// polite pool.
    pub fn with_contact(email: Option<&str>, timeout: Duration) -> Result<Self, SourceError> {
        let user_agent = match email {
            Some(email) => format!(
                "{}/{} (mailto:{})",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                email
            ),
            None => concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        };
        Self::with_user_agent(&user_agent, timeout)
    }

    /// Create a client that looks like a desktop browser (used for PDF fetches)
    pub fn browser(timeout: Duration) -> Result<Self, SourceError> {
        Self::with_user_agent(BROWSER_USER_AGENT, timeout)
    }

    /// Create a new HTTP client with a custom user agent
    pub fn with_user_agent(user_agent: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| SourceError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }
}
