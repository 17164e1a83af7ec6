// Per-platform contest adapters.
//
// Each adapter fetches one platform's listing and maps it into Contest
// records. Record-level problems are collected as DroppedRecord values;
// a SourceError means the platform as a whole produced nothing.

pub mod atcoder;
pub mod codechef;
pub mod codeforces;
pub mod geeksforgeeks;
pub mod google;
pub mod hackerearth;
pub mod leetcode;
pub mod unsupported;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use contestboard_common::{Contest, ContestError, Platform};

use crate::normalize::NormalizeError;
use crate::render::{PageRenderer, RenderError};
use crate::transport::{FetchError, WebClient};

pub use atcoder::AtCoderSource;
pub use codechef::CodeChefSource;
pub use codeforces::CodeforcesSource;
pub use geeksforgeeks::GeeksforGeeksSource;
pub use google::CodingCompetitionsSource;
pub use hackerearth::HackerEarthSource;
pub use leetcode::LeetCodeSource;
pub use unsupported::UnsupportedSource;

#[async_trait]
pub trait ContestSource: Send + Sync {
    fn platform(&self) -> Platform;

    /// Fetch the platform's listing. Contests whose end is not after `now`
    /// are left out.
    async fn fetch(&self, now: DateTime<FixedOffset>) -> Result<Harvest, SourceError>;
}

/// Failures that wipe out a whole platform's contribution.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Transport(#[from] FetchError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Unexpected document structure: {0}")]
    Structure(String),

    #[error("{0} is not supported")]
    Unsupported(Platform),
}

impl SourceError {
    /// Worth another attempt: the network or the browser hiccuped.
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Transport(_) | SourceError::Render(_))
    }
}

/// Why a single listing entry was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DropReason {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("selector matched nothing: {0}")]
    Selector(String),

    #[error("detail page unavailable: {0}")]
    Fetch(String),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Invalid(#[from] ContestError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRecord {
    /// Something that identifies the entry in the source: a code, slug or URL.
    pub reference: String,
    pub reason: DropReason,
}

/// What one platform produced.
#[derive(Debug, Default)]
pub struct Harvest {
    pub contests: Vec<Contest>,
    pub dropped: Vec<DroppedRecord>,
    /// Entries that parsed fine but had already finished.
    pub ended: usize,
}

impl Harvest {
    /// Keep a parsed contest if it is still running or upcoming, otherwise
    /// record why it was left out.
    pub fn accept(
        &mut self,
        reference: impl Into<String>,
        candidate: Result<Contest, DropReason>,
        now: &DateTime<FixedOffset>,
    ) {
        match candidate {
            Ok(contest) if contest.has_ended_by(now) => self.ended += 1,
            Ok(contest) => self.contests.push(contest),
            Err(reason) => {
                let reference = reference.into();
                debug!(reference = %reference, reason = %reason, "Dropped record");
                self.dropped.push(DroppedRecord { reference, reason });
            }
        }
    }
}

// --- JSON field access ---

pub(crate) fn str_field<'a>(value: &'a Value, key: &'static str) -> Result<&'a str, DropReason> {
    value
        .get(key)
        .and_then(Value::as_str)
        .ok_or(DropReason::MissingField(key))
}

/// Integer field given either as a JSON number or a numeric string.
pub(crate) fn int_field(value: &Value, key: &'static str) -> Result<i64, DropReason> {
    match value.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or(DropReason::MissingField(key)),
        Some(Value::String(s)) => s.trim().parse().map_err(|_| DropReason::MissingField(key)),
        _ => Err(DropReason::MissingField(key)),
    }
}

/// Numeric field that may carry a fraction, as a number or a numeric string.
pub(crate) fn float_field(value: &Value, key: &'static str) -> Result<f64, DropReason> {
    match value.get(key) {
        Some(Value::Number(n)) => n.as_f64().ok_or(DropReason::MissingField(key)),
        Some(Value::String(s)) => s.trim().parse().map_err(|_| DropReason::MissingField(key)),
        _ => Err(DropReason::MissingField(key)),
    }
}

/// Array at a JSON pointer, or a structure error naming the pointer.
pub(crate) fn array_at<'a>(value: &'a Value, pointer: &str) -> Result<&'a Vec<Value>, SourceError> {
    value
        .pointer(pointer)
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::Structure(format!("no array at {pointer}")))
}

// --- Registry ---

/// Shared collaborators handed to every adapter.
#[derive(Clone)]
pub struct SourceDeps {
    pub web: Arc<dyn WebClient>,
    pub renderer: Arc<dyn PageRenderer>,
    pub render_wait: Duration,
}

pub fn build_source(platform: Platform, deps: &SourceDeps) -> Arc<dyn ContestSource> {
    if !platform.supported() {
        return Arc::new(UnsupportedSource::new(platform));
    }
    match platform {
        Platform::AtCoder => Arc::new(AtCoderSource::new(deps.web.clone())),
        Platform::CodeChef => Arc::new(CodeChefSource::new(deps.web.clone())),
        Platform::Codeforces => Arc::new(CodeforcesSource::new(deps.web.clone())),
        Platform::CodeJam => Arc::new(CodingCompetitionsSource::code_jam(
            deps.renderer.clone(),
            deps.render_wait,
        )),
        Platform::HashCode => Arc::new(CodingCompetitionsSource::hash_code(
            deps.renderer.clone(),
            deps.render_wait,
        )),
        Platform::KickStart => Arc::new(CodingCompetitionsSource::kick_start(
            deps.renderer.clone(),
            deps.render_wait,
        )),
        Platform::GeeksforGeeks => Arc::new(GeeksforGeeksSource::new(deps.web.clone())),
        Platform::HackerEarth => Arc::new(HackerEarthSource::new(deps.web.clone())),
        Platform::LeetCode => Arc::new(LeetCodeSource::new(deps.web.clone())),
        Platform::HackerRank | Platform::InterviewBit => {
            Arc::new(UnsupportedSource::new(platform))
        }
    }
}

pub fn build_sources(platforms: &[Platform], deps: &SourceDeps) -> Vec<Arc<dyn ContestSource>> {
    platforms.iter().map(|p| build_source(*p, deps)).collect()
}
