use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use tracing::info;

use contestboard_common::{Contest, Platform};

use super::{array_at, int_field, str_field, ContestSource, DropReason, Harvest, SourceError};
use crate::normalize::{from_epoch, seconds};
use crate::transport::WebClient;

const URL: &str = "https://codeforces.com/api/contest.list";

pub struct CodeforcesSource {
    web: Arc<dyn WebClient>,
}

impl CodeforcesSource {
    pub fn new(web: Arc<dyn WebClient>) -> Self {
        Self { web }
    }
}

#[async_trait]
impl ContestSource for CodeforcesSource {
    fn platform(&self) -> Platform {
        Platform::Codeforces
    }

    async fn fetch(&self, now: DateTime<FixedOffset>) -> Result<Harvest, SourceError> {
        let body = self.web.get_json(URL, &[]).await?;
        let harvest = parse_contest_list(&body, &now)?;
        info!(
            platform = "codeforces",
            contests = harvest.contests.len(),
            ended = harvest.ended,
            "Parsed contest.list"
        );
        Ok(harvest)
    }
}

/// The API answers `{"status": "OK", "result": [...]}`; anything else is
/// `{"status": "FAILED", "comment": ...}`. The list includes every past
/// contest, so most entries end up counted as ended.
pub fn parse_contest_list(
    body: &Value,
    now: &DateTime<FixedOffset>,
) -> Result<Harvest, SourceError> {
    match body.get("status").and_then(Value::as_str) {
        Some("OK") => {}
        other => {
            let comment = body.get("comment").and_then(Value::as_str).unwrap_or("");
            return Err(SourceError::Structure(format!(
                "status {:?}: {comment}",
                other.unwrap_or("missing")
            )));
        }
    }

    let mut harvest = Harvest::default();
    for entry in array_at(body, "/result")? {
        let reference = entry
            .get("id")
            .map(|id| id.to_string())
            .unwrap_or_else(|| "?".into());
        harvest.accept(reference, parse_entry(entry), now);
    }
    Ok(harvest)
}

fn parse_entry(entry: &Value) -> Result<Contest, DropReason> {
    let id = int_field(entry, "id")?;
    let name = str_field(entry, "name")?;
    let start = from_epoch(int_field(entry, "startTimeSeconds")?)?;
    let duration = seconds(int_field(entry, "durationSeconds")?)?;

    Ok(Contest::new(
        Platform::Codeforces,
        name,
        format!("https://codeforces.com/contests/{id}"),
        start,
        duration,
    )?)
}
