pub mod error;

pub use error::{BrowserlessError, Result};

use std::time::Duration;

use serde_json::{json, Value};

/// How long and for what Browserless should wait before serializing the DOM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentOptions {
    /// CSS selector that signals client-side rendering has produced content.
    pub wait_for_selector: Option<String>,
    /// Upper bound on the wait. With no selector, the page is given exactly
    /// this long to settle.
    pub wait: Duration,
}

impl Default for ContentOptions {
    fn default() -> Self {
        Self {
            wait_for_selector: None,
            wait: Duration::from_secs(5),
        }
    }
}

pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    fn endpoint(&self) -> String {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }
        endpoint
    }

    /// Fetch fully-rendered HTML for a URL via the Browserless /content endpoint.
    pub async fn content(&self, url: &str, options: &ContentOptions) -> Result<String> {
        let body = request_body(url, options);

        tracing::debug!(url, selector = ?options.wait_for_selector, "browserless: rendering");

        let resp = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.text().await?)
    }
}

fn request_body(url: &str, options: &ContentOptions) -> Value {
    let wait_ms = options.wait.as_millis() as u64;
    match &options.wait_for_selector {
        Some(selector) => json!({
            "url": url,
            "gotoOptions": { "waitUntil": "networkidle2" },
            "waitForSelector": { "selector": selector, "timeout": wait_ms },
        }),
        None => json!({
            "url": url,
            "gotoOptions": { "waitUntil": "networkidle2" },
            "waitForTimeout": wait_ms,
        }),
    }
}
