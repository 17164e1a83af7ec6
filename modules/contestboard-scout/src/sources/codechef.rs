use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use tracing::info;

use contestboard_common::{canonical_zone, Contest, Platform};

use super::{str_field, ContestSource, DropReason, Harvest, SourceError};
use crate::normalize::{parse_iso8601, span};
use crate::transport::WebClient;

const URL: &str = "https://www.codechef.com/api/list/contests/all";

/// CodeChef's contest list API. Running and future contests come back in
/// separate arrays; both are used.
pub struct CodeChefSource {
    web: Arc<dyn WebClient>,
}

impl CodeChefSource {
    pub fn new(web: Arc<dyn WebClient>) -> Self {
        Self { web }
    }
}

#[async_trait]
impl ContestSource for CodeChefSource {
    fn platform(&self) -> Platform {
        Platform::CodeChef
    }

    async fn fetch(&self, now: DateTime<FixedOffset>) -> Result<Harvest, SourceError> {
        let body = self
            .web
            .get_json(URL, &[("sort_by", "START"), ("sorting_order", "asc")])
            .await?;
        let harvest = parse_listing(&body, &now)?;
        info!(platform = "codechef", contests = harvest.contests.len(), "Parsed contest list");
        Ok(harvest)
    }
}

pub fn parse_listing(body: &Value, now: &DateTime<FixedOffset>) -> Result<Harvest, SourceError> {
    let present = body.get("present_contests").and_then(Value::as_array);
    let future = body.get("future_contests").and_then(Value::as_array);
    if present.is_none() && future.is_none() {
        return Err(SourceError::Structure(
            "neither present_contests nor future_contests in response".into(),
        ));
    }

    let mut harvest = Harvest::default();
    for entry in present.into_iter().chain(future).flatten() {
        let reference = entry
            .get("contest_code")
            .and_then(Value::as_str)
            .unwrap_or("?")
            .to_string();
        harvest.accept(reference, parse_entry(entry), now);
    }
    Ok(harvest)
}

fn parse_entry(entry: &Value) -> Result<Contest, DropReason> {
    let name = str_field(entry, "contest_name")?;
    let code = str_field(entry, "contest_code")?;
    let start = parse_iso8601(str_field(entry, "contest_start_date_iso")?, canonical_zone())?;
    let end = parse_iso8601(str_field(entry, "contest_end_date_iso")?, canonical_zone())?;
    let span = span(start, end)?;

    Ok(Contest::new(
        Platform::CodeChef,
        name,
        format!("https://www.codechef.com/{code}"),
        span.start,
        span.duration,
    )?)
}
