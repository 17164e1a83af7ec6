// Headless rendering for schedule pages that only exist after client-side
// scripts run.
//
// A renderer hands out sessions. A session owns everything its browser needs
// (semaphore permit, temp profile dir, child process) and gives it all back
// when dropped, so teardown happens even if extraction fails or the
// surrounding task is cancelled.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use browserless_client::{BrowserlessClient, BrowserlessError, ContentOptions};
use scraper::Html;
use tempfile::TempDir;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use contestboard_common::PageBackend;

use crate::html::{lines, selector};

/// Max concurrent Chromium processes. Each instance is heavy (~100MB+ RSS).
const MAX_CONCURRENT_CHROME: usize = 2;
/// Extra time past the render budget before the Chrome process is abandoned.
const CHROME_LAUNCH_GRACE: Duration = Duration::from_secs(20);

pub type Result<T> = std::result::Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to launch renderer: {0}")]
    Launch(String),

    #[error("Renderer timed out after {0:?}")]
    Timeout(Duration),

    #[error("Renderer failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Browserless(#[from] BrowserlessError),
}

/// Bounded wait for dynamic content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderWait {
    /// Selector whose presence means the content has arrived.
    pub selector: Option<String>,
    pub timeout: Duration,
}

impl RenderWait {
    pub fn for_selector(selector: &str, timeout: Duration) -> Self {
        Self {
            selector: Some(selector.to_string()),
            timeout,
        }
    }
}

/// Serialized DOM of a rendered page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub url: String,
    pub html: String,
}

impl RenderedPage {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }

    /// Text lines of every element carrying `class`, one entry per element.
    pub fn texts_by_class(&self, class: &str) -> Vec<Vec<String>> {
        let document = Html::parse_document(&self.html);
        let sel = selector(&format!(".{class}"));
        document.select(&sel).map(|el| lines(&el)).collect()
    }
}

#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Acquire an exclusive rendering session.
    async fn open(&self) -> Result<Box<dyn RenderSession>>;

    fn name(&self) -> &str;
}

#[async_trait]
pub trait RenderSession: Send {
    /// Navigate to `url`, wait at most `wait.timeout`, return the DOM.
    async fn render(&mut self, url: &str, wait: &RenderWait) -> Result<RenderedPage>;

    /// Release the session. Dropping it has the same effect.
    fn close(self: Box<Self>) {}
}

/// Open a session, render one page, release the session.
pub async fn render_once(
    renderer: &dyn PageRenderer,
    url: &str,
    wait: &RenderWait,
) -> Result<RenderedPage> {
    let mut session = renderer.open().await?;
    let result = session.render(url, wait).await;
    session.close();
    result
}

pub fn build_renderer(backend: &PageBackend, timeout: Duration) -> Result<Arc<dyn PageRenderer>> {
    match backend {
        PageBackend::Chrome { bin } => Ok(Arc::new(ChromeRenderer::new(bin))),
        PageBackend::Browserless { base_url, token } => Ok(Arc::new(BrowserlessRenderer::new(
            base_url,
            token.as_deref(),
            timeout,
        )?)),
    }
}

fn check_url(url: &str) -> Result<()> {
    let parsed = url::Url::parse(url).map_err(|_| RenderError::InvalidUrl(url.to_string()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(RenderError::InvalidUrl(url.to_string()));
    }
    Ok(())
}

// --- Chrome ---

/// Local headless Chromium via `--dump-dom`.
pub struct ChromeRenderer {
    bin: String,
    semaphore: Arc<Semaphore>,
}

impl ChromeRenderer {
    pub fn new(bin: &str) -> Self {
        info!(bin, "ChromeRenderer initialized (max_concurrent={MAX_CONCURRENT_CHROME})");
        Self {
            bin: bin.to_string(),
            semaphore: Arc::new(Semaphore::new(MAX_CONCURRENT_CHROME)),
        }
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn open(&self) -> Result<Box<dyn RenderSession>> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| RenderError::Launch("Chrome semaphore closed".into()))?;
        let profile = tempfile::tempdir()
            .map_err(|e| RenderError::Launch(format!("Failed to create temp profile dir: {e}")))?;
        debug!(profile = %profile.path().display(), "chrome: session opened");
        Ok(Box::new(ChromeSession {
            bin: self.bin.clone(),
            profile,
            _permit: permit,
        }))
    }

    fn name(&self) -> &str {
        "chrome"
    }
}

struct ChromeSession {
    bin: String,
    profile: TempDir,
    _permit: OwnedSemaphorePermit,
}

#[async_trait]
impl RenderSession for ChromeSession {
    async fn render(&mut self, url: &str, wait: &RenderWait) -> Result<RenderedPage> {
        check_url(url)?;

        // --dump-dom cannot wait on a selector; the virtual time budget is
        // the bounded settle time instead.
        let budget_ms = wait.timeout.as_millis().to_string();
        let limit = wait.timeout + CHROME_LAUNCH_GRACE;

        let output = tokio::time::timeout(
            limit,
            tokio::process::Command::new(&self.bin)
                .args([
                    "--headless",
                    "--no-sandbox",
                    "--disable-gpu",
                    "--disable-dev-shm-usage",
                    &format!("--user-data-dir={}", self.profile.path().display()),
                    &format!("--virtual-time-budget={budget_ms}"),
                    "--dump-dom",
                    url,
                ])
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| RenderError::Timeout(limit))?
        .map_err(|e| RenderError::Launch(format!("{}: {e}", self.bin)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(url, renderer = "chrome", stderr = %stderr, "Chrome exited with error");
            return Err(RenderError::Failed(format!("Chrome exited with {}", output.status)));
        }
        if output.stdout.is_empty() {
            return Err(RenderError::Failed("Chrome returned an empty DOM".into()));
        }

        let html = String::from_utf8_lossy(&output.stdout).into_owned();
        info!(url, renderer = "chrome", bytes = html.len(), "Rendered");
        Ok(RenderedPage::new(url, html))
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        debug!(profile = %self.profile.path().display(), "chrome: session released");
    }
}

// --- Browserless ---

/// Remote rendering through a Browserless deployment. Every `/content`
/// call runs in its own browser context on the server.
pub struct BrowserlessRenderer {
    client: Arc<BrowserlessClient>,
}

impl BrowserlessRenderer {
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        info!(base_url, "BrowserlessRenderer initialized");
        Ok(Self {
            client: Arc::new(BrowserlessClient::new(base_url, token, timeout)?),
        })
    }
}

#[async_trait]
impl PageRenderer for BrowserlessRenderer {
    async fn open(&self) -> Result<Box<dyn RenderSession>> {
        Ok(Box::new(BrowserlessSession {
            client: self.client.clone(),
        }))
    }

    fn name(&self) -> &str {
        "browserless"
    }
}

struct BrowserlessSession {
    client: Arc<BrowserlessClient>,
}

#[async_trait]
impl RenderSession for BrowserlessSession {
    async fn render(&mut self, url: &str, wait: &RenderWait) -> Result<RenderedPage> {
        check_url(url)?;
        let options = ContentOptions {
            wait_for_selector: wait.selector.clone(),
            wait: wait.timeout,
        };
        let html = self.client.content(url, &options).await?;
        info!(url, renderer = "browserless", bytes = html.len(), "Rendered");
        Ok(RenderedPage::new(url, html))
    }
}
