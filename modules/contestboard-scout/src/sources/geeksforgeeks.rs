use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use tracing::info;

use contestboard_common::{canonical_zone, Contest, Platform};

use super::{array_at, str_field, ContestSource, DropReason, Harvest, SourceError};
use crate::normalize::{parse_iso8601, span};
use crate::transport::WebClient;

const URL: &str = "https://practiceapi.geeksforgeeks.org/api/vr/events/";

/// GeeksforGeeks practice events API, upcoming contests only.
///
/// Timestamps come without an offset (`2022-08-28T19:00:00`) and are
/// wall-clock time in India.
pub struct GeeksforGeeksSource {
    web: Arc<dyn WebClient>,
}

impl GeeksforGeeksSource {
    pub fn new(web: Arc<dyn WebClient>) -> Self {
        Self { web }
    }
}

#[async_trait]
impl ContestSource for GeeksforGeeksSource {
    fn platform(&self) -> Platform {
        Platform::GeeksforGeeks
    }

    async fn fetch(&self, now: DateTime<FixedOffset>) -> Result<Harvest, SourceError> {
        let body = self
            .web
            .get_json(URL, &[("type", "contest"), ("sub_type", "upcoming")])
            .await?;
        let harvest = parse_events(&body, &now)?;
        info!(platform = "geeksforgeeks", contests = harvest.contests.len(), "Parsed events");
        Ok(harvest)
    }
}

pub fn parse_events(body: &Value, now: &DateTime<FixedOffset>) -> Result<Harvest, SourceError> {
    let mut harvest = Harvest::default();
    for event in array_at(body, "/results/upcoming")? {
        let reference = event
            .get("slug")
            .and_then(Value::as_str)
            .unwrap_or("?")
            .to_string();
        harvest.accept(reference, parse_event(event), now);
    }
    Ok(harvest)
}

fn parse_event(event: &Value) -> Result<Contest, DropReason> {
    let name = str_field(event, "name")?;
    let slug = str_field(event, "slug")?;
    let start = parse_iso8601(str_field(event, "start_time")?, canonical_zone())?;
    let end = parse_iso8601(str_field(event, "end_time")?, canonical_zone())?;
    let span = span(start, end)?;

    Ok(Contest::new(
        Platform::GeeksforGeeks,
        name,
        format!("https://practice.geeksforgeeks.org/contest/{slug}"),
        span.start,
        span.duration,
    )?)
}
