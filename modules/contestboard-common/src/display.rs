// Output-side projections of a Contest.
//
// Formatting happens here, on owned copies, so nothing formatted can reach
// sorting or classification.

use chrono::{DateTime, Duration, TimeZone};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{canonical_zone, Contest};

const START_FORMAT: &str = "%a, %-d %b %Y, %-I:%M %p";

/// Display row for a rendered schedule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContestView {
    pub platform: String,
    pub platform_class: String,
    pub title: String,
    pub url: String,
    pub start: String,
    pub duration: String,
    pub ongoing: bool,
}

impl ContestView {
    pub fn new<Tz: TimeZone>(contest: &Contest, now: &DateTime<Tz>) -> Self {
        Self {
            platform: contest.platform().display_name().to_string(),
            platform_class: contest.platform().slug().to_string(),
            title: contest.title().to_string(),
            url: contest.url().to_string(),
            start: contest
                .start_time()
                .with_timezone(&canonical_zone())
                .format(START_FORMAT)
                .to_string(),
            duration: humanize_duration(contest.duration()),
            ongoing: contest.is_ongoing_at(now),
        }
    }
}

/// "1 day, 2 hours, 5 minutes". Zero-valued units are left out; seconds are
/// truncated.
pub fn humanize_duration(duration: Duration) -> String {
    let days = duration.num_days();
    let hours = duration.num_hours() % 24;
    let minutes = duration.num_minutes() % 60;

    let mut parts = Vec::new();
    for (value, unit) in [(days, "day"), (hours, "hour"), (minutes, "minute")] {
        match value {
            0 => {}
            1 => parts.push(format!("1 {unit}")),
            n => parts.push(format!("{n} {unit}s")),
        }
    }

    if parts.is_empty() {
        "0 minutes".to_string()
    } else {
        parts.join(", ")
    }
}

/// One entry of the JSON schedule snapshot. `id` is a fresh random key for
/// list rendering and carries no identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub id: String,
    pub platform: String,
    pub title: String,
    pub url: String,
    pub start_time: String,
    pub duration: i64,
}

impl From<&Contest> for SnapshotRecord {
    fn from(contest: &Contest) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            platform: contest.platform().display_name().to_string(),
            title: contest.title().to_string(),
            url: contest.url().to_string(),
            start_time: contest.start_time().to_rfc3339(),
            duration: contest.duration().num_seconds(),
        }
    }
}
