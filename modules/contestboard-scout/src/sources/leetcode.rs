use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde_json::{json, Value};
use tracing::info;

use contestboard_common::{Contest, Platform};

use super::{
    array_at, float_field, int_field, str_field, ContestSource, DropReason, Harvest, SourceError,
};
use crate::normalize::{from_epoch_f64, seconds};
use crate::transport::WebClient;

const URL: &str = "https://leetcode.com/graphql";
const QUERY: &str = "{ allContests { title titleSlug startTime duration } }";

/// LeetCode's public GraphQL endpoint. `allContests` returns the full
/// history; finished ones are filtered out.
pub struct LeetCodeSource {
    web: Arc<dyn WebClient>,
}

impl LeetCodeSource {
    pub fn new(web: Arc<dyn WebClient>) -> Self {
        Self { web }
    }
}

#[async_trait]
impl ContestSource for LeetCodeSource {
    fn platform(&self) -> Platform {
        Platform::LeetCode
    }

    async fn fetch(&self, now: DateTime<FixedOffset>) -> Result<Harvest, SourceError> {
        let body = self.web.post_json(URL, &json!({ "query": QUERY })).await?;
        let harvest = parse_all_contests(&body, &now)?;
        info!(
            platform = "leetcode",
            contests = harvest.contests.len(),
            ended = harvest.ended,
            "Parsed allContests"
        );
        Ok(harvest)
    }
}

pub fn parse_all_contests(
    body: &Value,
    now: &DateTime<FixedOffset>,
) -> Result<Harvest, SourceError> {
    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        if body.pointer("/data/allContests").is_none() {
            let errors = Value::from(errors.clone());
            return Err(SourceError::Structure(format!("GraphQL errors: {errors}")));
        }
    }

    let mut harvest = Harvest::default();
    for entry in array_at(body, "/data/allContests")? {
        let reference = entry
            .get("titleSlug")
            .and_then(Value::as_str)
            .unwrap_or("?")
            .to_string();
        harvest.accept(reference, parse_entry(entry), now);
    }
    Ok(harvest)
}

fn parse_entry(entry: &Value) -> Result<Contest, DropReason> {
    let title = str_field(entry, "title")?;
    let slug = str_field(entry, "titleSlug")?;
    let start = from_epoch_f64(float_field(entry, "startTime")?)?;
    let duration = seconds(int_field(entry, "duration")?)?;

    Ok(Contest::new(
        Platform::LeetCode,
        title,
        format!("https://leetcode.com/contest/{slug}"),
        start,
        duration,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use contestboard_common::canonical_zone;

    fn at(secs: i64) -> DateTime<FixedOffset> {
        Utc.timestamp_opt(secs, 0).unwrap().with_timezone(&canonical_zone())
    }

    fn body() -> Value {
        json!({
            "data": {
                "allContests": [
                    { "title": "Biweekly Contest 86", "titleSlug": "biweekly-contest-86",
                      "startTime": 1662215400, "duration": 5400 },
                    { "title": "Weekly Contest 308", "titleSlug": "weekly-contest-308",
                      "startTime": "1661653800", "duration": 5400 },
                    { "title": "Weekly Contest 1", "titleSlug": "weekly-contest-1",
                      "startTime": 1470499200, "duration": 5400 }
                ]
            }
        })
    }

    #[test]
    fn ongoing_contest_is_kept() {
        // Halfway through Biweekly 86.
        let harvest = parse_all_contests(&body(), &at(1662215400 + 2700)).unwrap();
        assert_eq!(harvest.contests.len(), 1);
        assert_eq!(harvest.ended, 2);

        let biweekly = &harvest.contests[0];
        assert_eq!(biweekly.url(), "https://leetcode.com/contest/biweekly-contest-86");
        assert_eq!(biweekly.start_time().to_rfc3339(), "2022-09-03T20:00:00+05:30");
        assert_eq!(biweekly.duration(), Duration::seconds(5400));
        assert!(biweekly.is_ongoing_at(&at(1662215400 + 2700)));
    }

    #[test]
    fn contest_ending_exactly_now_is_dropped() {
        let harvest = parse_all_contests(&body(), &at(1662215400 + 5400)).unwrap();
        assert!(harvest.contests.is_empty());
        assert_eq!(harvest.ended, 3);
    }

    #[test]
    fn fractional_start_time_is_kept() {
        let body = json!({
            "data": { "allContests": [
                { "title": "Weekly Contest 309", "titleSlug": "weekly-contest-309",
                  "startTime": 1662258600.5, "duration": 5400 }
            ]}
        });
        let harvest = parse_all_contests(&body, &at(1662215400)).unwrap();
        let start = harvest.contests[0].start_time();
        assert_eq!(start, at(1662258600) + Duration::milliseconds(500));
    }

    #[test]
    fn graphql_errors_without_data() {
        let body = json!({ "errors": [{ "message": "rate limited" }] });
        let err = parse_all_contests(&body, &at(0)).unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }
}
