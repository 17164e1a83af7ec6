use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::error::ConfigError;
use crate::types::Platform;

/// Where JS-rendered pages come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageBackend {
    /// Local headless Chrome via `--dump-dom`.
    Chrome { bin: String },
    /// Remote Browserless `/content` endpoint.
    Browserless {
        base_url: String,
        token: Option<String>,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Enabled platforms, in aggregation order.
    pub platforms: Vec<Platform>,
    pub output_dir: PathBuf,

    // Network
    pub http_timeout: Duration,
    pub user_agent: String,

    // Aggregation
    pub source_timeout: Duration,
    pub source_attempts: u32,

    // Rendering
    pub render_wait: Duration,
    pub page_backend: PageBackend,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            platforms: Platform::ALL.to_vec(),
            output_dir: PathBuf::from("."),
            http_timeout: Duration::from_secs(30),
            user_agent: "contestboard/0.1".to_string(),
            source_timeout: Duration::from_secs(90),
            source_attempts: 1,
            render_wait: Duration::from_secs(5),
            page_backend: PageBackend::Chrome {
                bin: "chromium".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup. Unset keys fall
    /// back to [`Config::default`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let platforms = match get("CONTESTBOARD_PLATFORMS") {
            Some(list) => parse_platforms(&list)?,
            None => defaults.platforms,
        };

        let page_backend = match get("BROWSERLESS_URL") {
            Some(base_url) => PageBackend::Browserless {
                base_url,
                token: get("BROWSERLESS_TOKEN"),
            },
            None => PageBackend::Chrome {
                bin: get("CHROME_BIN").unwrap_or_else(|| "chromium".to_string()),
            },
        };

        let source_attempts = match get("SOURCE_ATTEMPTS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "SOURCE_ATTEMPTS",
                        expected: "a positive integer",
                        value: raw,
                    })
                }
            },
            None => defaults.source_attempts,
        };

        Ok(Self {
            platforms,
            output_dir: get("CONTESTBOARD_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            http_timeout: secs(
                get("HTTP_TIMEOUT_SECS"),
                "HTTP_TIMEOUT_SECS",
                defaults.http_timeout,
            )?,
            user_agent: get("USER_AGENT").unwrap_or(defaults.user_agent),
            source_timeout: secs(
                get("SOURCE_TIMEOUT_SECS"),
                "SOURCE_TIMEOUT_SECS",
                defaults.source_timeout,
            )?,
            source_attempts,
            render_wait: secs(get("RENDER_WAIT_SECS"), "RENDER_WAIT_SECS", defaults.render_wait)?,
            page_backend,
        })
    }

    /// Log the effective configuration without secrets.
    pub fn log_redacted(&self) {
        let backend = match &self.page_backend {
            PageBackend::Chrome { bin } => format!("chrome ({bin})"),
            PageBackend::Browserless { base_url, token } => format!(
                "browserless ({base_url}, token {})",
                if token.is_some() { "set" } else { "unset" }
            ),
        };
        let platforms: Vec<&str> = self.platforms.iter().map(|p| p.slug()).collect();
        info!(
            platforms = %platforms.join(","),
            output_dir = %self.output_dir.display(),
            http_timeout_secs = self.http_timeout.as_secs(),
            source_timeout_secs = self.source_timeout.as_secs(),
            source_attempts = self.source_attempts,
            render_wait_secs = self.render_wait.as_secs(),
            backend = %backend,
            "Configuration loaded"
        );
    }
}

/// Parse a comma-separated platform list. Order is kept, repeats are dropped.
pub fn parse_platforms(list: &str) -> Result<Vec<Platform>, ConfigError> {
    let mut platforms = Vec::new();
    for item in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let platform: Platform = item.parse()?;
        if !platforms.contains(&platform) {
            platforms.push(platform);
        }
    }
    Ok(platforms)
}

fn secs(
    raw: Option<String>,
    key: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::Invalid {
                key,
                expected: "a whole number of seconds",
                value: raw,
            }),
    }
}
