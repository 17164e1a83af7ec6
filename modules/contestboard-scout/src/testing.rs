// Test mocks for the contest sources.
//
// - MockWebClient (WebClient): URL -> canned body, status or JSON
// - MockRenderer (PageRenderer): fixed page or failure, tracks sessions
// - StaticSource (ContestSource): fixed contests with scripted failures

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde_json::Value;

use contestboard_common::{Contest, Platform};

use crate::render::{self, PageRenderer, RenderSession, RenderWait, RenderedPage};
use crate::sources::{ContestSource, Harvest, SourceError};
use crate::transport::{self, FetchError, WebClient};

// ---------------------------------------------------------------------------
// MockWebClient
// ---------------------------------------------------------------------------

enum Canned {
    Body(String),
    Status(u16),
}

/// HashMap-based web client. URLs are matched exactly, query parameters
/// ignored. Unregistered URLs fail with a network error.
/// Builder pattern: `.on_get()`, `.on_get_status()`, `.on_post()`.
#[derive(Default)]
pub struct MockWebClient {
    gets: HashMap<String, Canned>,
    posts: HashMap<String, Value>,
    hits: Mutex<HashMap<String, usize>>,
}

impl MockWebClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_get(mut self, url: &str, body: &str) -> Self {
        self.gets.insert(url.to_string(), Canned::Body(body.to_string()));
        self
    }

    pub fn on_get_json(self, url: &str, body: Value) -> Self {
        let text = body.to_string();
        self.on_get(url, &text)
    }

    pub fn on_get_status(mut self, url: &str, status: u16) -> Self {
        self.gets.insert(url.to_string(), Canned::Status(status));
        self
    }

    pub fn on_post(mut self, url: &str, response: Value) -> Self {
        self.posts.insert(url.to_string(), response);
        self
    }

    /// How many requests hit `url`.
    pub fn hits(&self, url: &str) -> usize {
        self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    fn record(&self, url: &str) {
        *self.hits.lock().unwrap().entry(url.to_string()).or_default() += 1;
    }

    fn unregistered(url: &str) -> FetchError {
        FetchError::Network {
            url: url.to_string(),
            message: "no mock registered".into(),
        }
    }
}

#[async_trait]
impl WebClient for MockWebClient {
    async fn get_text(&self, url: &str, _query: &[(&str, &str)]) -> transport::Result<String> {
        self.record(url);
        match self.gets.get(url) {
            Some(Canned::Body(body)) => Ok(body.clone()),
            Some(Canned::Status(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status: *status,
            }),
            None => Err(Self::unregistered(url)),
        }
    }

    async fn post_json(&self, url: &str, _body: &Value) -> transport::Result<Value> {
        self.record(url);
        self.posts.get(url).cloned().ok_or_else(|| Self::unregistered(url))
    }
}

// ---------------------------------------------------------------------------
// MockRenderer
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SessionLog {
    opened: AtomicUsize,
    released: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

/// Renderer that returns the same HTML for every URL, or always fails.
/// Counts sessions so tests can check every one was released.
pub struct MockRenderer {
    html: Option<String>,
    log: Arc<SessionLog>,
}

impl MockRenderer {
    pub fn with_page(html: &str) -> Self {
        Self {
            html: Some(html.to_string()),
            log: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            html: None,
            log: Arc::default(),
        }
    }

    pub fn opened(&self) -> usize {
        self.log.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.log.released.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.log.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageRenderer for MockRenderer {
    async fn open(&self) -> render::Result<Box<dyn RenderSession>> {
        self.log.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSession {
            html: self.html.clone(),
            log: self.log.clone(),
        }))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

struct MockSession {
    html: Option<String>,
    log: Arc<SessionLog>,
}

#[async_trait]
impl RenderSession for MockSession {
    async fn render(&mut self, url: &str, _wait: &RenderWait) -> render::Result<RenderedPage> {
        self.log.requested.lock().unwrap().push(url.to_string());
        match &self.html {
            Some(html) => Ok(RenderedPage::new(url, html.clone())),
            None => Err(render::RenderError::Failed("mock renderer told to fail".into())),
        }
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.log.released.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// StaticSource
// ---------------------------------------------------------------------------

enum Script {
    Succeed,
    /// Fail with a 503 for the first `n` calls, then succeed.
    Flaky(usize),
    Broken(String),
    Panic,
}

/// Source that serves a fixed contest list. Finished contests are still
/// filtered against `now`, like the real adapters do.
pub struct StaticSource {
    platform: Platform,
    contests: Vec<Contest>,
    script: Script,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(platform: Platform, contests: Vec<Contest>) -> Self {
        Self {
            platform,
            contests,
            script: Script::Succeed,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn flaky(mut self, failures: usize) -> Self {
        self.script = Script::Flaky(failures);
        self
    }

    pub fn broken(mut self, message: &str) -> Self {
        self.script = Script::Broken(message.to_string());
        self
    }

    pub fn panicking(mut self) -> Self {
        self.script = Script::Panic;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContestSource for StaticSource {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch(&self, now: DateTime<FixedOffset>) -> Result<Harvest, SourceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.script {
            Script::Flaky(failures) if call < *failures => {
                return Err(SourceError::Transport(FetchError::Status {
                    url: format!("https://{}.test/", self.platform.slug()),
                    status: 503,
                }));
            }
            Script::Broken(message) => return Err(SourceError::Structure(message.clone())),
            Script::Panic => panic!("{} source blew up", self.platform),
            Script::Succeed | Script::Flaky(_) => {}
        }

        let mut harvest = Harvest::default();
        for contest in &self.contests {
            harvest.accept(contest.title(), Ok(contest.clone()), &now);
        }
        Ok(harvest)
    }
}
