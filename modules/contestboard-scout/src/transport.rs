// HTTP transport behind a trait, so adapters can be driven by canned
// responses in tests.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub type Result<T> = std::result::Result<T, FetchError>;

#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Invalid JSON from {url}: {message}")]
    Decode { url: String, message: String },
}

#[async_trait]
pub trait WebClient: Send + Sync {
    /// GET a page body as text. Non-2xx responses are errors.
    async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String>;

    /// POST a JSON body and decode the JSON response.
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value>;

    /// GET and decode a JSON document.
    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        let text = self.get_text(url, query).await?;
        serde_json::from_str(&text).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

/// reqwest-backed [`WebClient`].
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Network {
                url: String::new(),
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    async fn read(url: &str, resp: reqwest::Response) -> Result<String> {
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        resp.text().await.map_err(|e| network(url, e))
    }
}

fn network(url: &str, err: reqwest::Error) -> FetchError {
    FetchError::Network {
        url: url.to_string(),
        message: err.to_string(),
    }
}

#[async_trait]
impl WebClient for HttpClient {
    async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        debug!(url, "GET");
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| network(url, e))?;
        Self::read(url, resp).await
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        debug!(url, "POST");
        let resp = self
            .client
            .post(url)
            .header("Referer", url)
            .json(body)
            .send()
            .await
            .map_err(|e| network(url, e))?;
        let text = Self::read(url, resp).await?;
        serde_json::from_str(&text).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}
