use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, Duration, FixedOffset, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ContestError};

/// UTC+05:30. Every stored or compared instant lives in this zone.
pub const CANONICAL_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

pub fn canonical_zone() -> FixedOffset {
    FixedOffset::east_opt(CANONICAL_OFFSET_SECS).expect("canonical offset is within +/-24h")
}

// --- Platform ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Platform {
    AtCoder,
    CodeChef,
    Codeforces,
    CodeJam,
    GeeksforGeeks,
    HackerEarth,
    HashCode,
    KickStart,
    LeetCode,
    HackerRank,
    InterviewBit,
}

impl Platform {
    pub const ALL: [Platform; 11] = [
        Platform::AtCoder,
        Platform::CodeChef,
        Platform::Codeforces,
        Platform::CodeJam,
        Platform::GeeksforGeeks,
        Platform::HackerEarth,
        Platform::HashCode,
        Platform::KickStart,
        Platform::LeetCode,
        Platform::HackerRank,
        Platform::InterviewBit,
    ];

    /// Human-facing name, as shown in the platform column.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::AtCoder => "AtCoder",
            Platform::CodeChef => "CodeChef",
            Platform::Codeforces => "Codeforces",
            Platform::CodeJam => "Code Jam",
            Platform::GeeksforGeeks => "GeeksforGeeks",
            Platform::HackerEarth => "HackerEarth",
            Platform::HashCode => "Hash Code",
            Platform::KickStart => "Kick Start",
            Platform::LeetCode => "LeetCode",
            Platform::HackerRank => "HackerRank",
            Platform::InterviewBit => "InterviewBit",
        }
    }

    /// Lowercase, hyphenated key. Doubles as the CSS class of a contest row.
    pub fn slug(&self) -> &'static str {
        match self {
            Platform::AtCoder => "atcoder",
            Platform::CodeChef => "codechef",
            Platform::Codeforces => "codeforces",
            Platform::CodeJam => "code-jam",
            Platform::GeeksforGeeks => "geeksforgeeks",
            Platform::HackerEarth => "hackerearth",
            Platform::HashCode => "hash-code",
            Platform::KickStart => "kick-start",
            Platform::LeetCode => "leetcode",
            Platform::HackerRank => "hackerrank",
            Platform::InterviewBit => "interviewbit",
        }
    }

    /// Whether a working adapter exists. HackerRank and InterviewBit are
    /// listed but have no scraper yet.
    pub fn supported(&self) -> bool {
        !matches!(self, Platform::HackerRank | Platform::InterviewBit)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Platform {
    type Err = ConfigError;

    /// Accepts the slug or the display name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Platform::ALL
            .iter()
            .copied()
            .find(|p| p.slug() == wanted || p.display_name().to_lowercase() == wanted)
            .ok_or_else(|| ConfigError::UnknownPlatform(s.trim().to_string()))
    }
}

// --- Contest ---

/// One normalized contest. Immutable once built: fields are private and the
/// end time is derived from start + duration.
///
/// Equality and hashing are structural over platform, title, start and
/// duration. The URL does not take part.
#[derive(Debug, Clone)]
pub struct Contest {
    platform: Platform,
    title: String,
    url: String,
    start_time: DateTime<FixedOffset>,
    duration: Duration,
}

impl Contest {
    pub fn new<Tz: TimeZone>(
        platform: Platform,
        title: impl Into<String>,
        url: impl Into<String>,
        start_time: DateTime<Tz>,
        duration: Duration,
    ) -> Result<Self, ContestError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(ContestError::EmptyTitle);
        }
        if duration < Duration::zero() {
            return Err(ContestError::NegativeDuration {
                seconds: duration.num_seconds(),
            });
        }
        let start_time = start_time.with_timezone(&canonical_zone());
        if start_time.checked_add_signed(duration).is_none() {
            return Err(ContestError::EndOutOfRange {
                seconds: duration.num_seconds(),
            });
        }
        Ok(Self {
            platform,
            title,
            url: url.into(),
            start_time,
            duration,
        })
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn start_time(&self) -> DateTime<FixedOffset> {
        self.start_time
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Always representable: `new` rejects durations that would overflow.
    pub fn end_time(&self) -> DateTime<FixedOffset> {
        self.start_time + self.duration
    }

    pub fn has_ended_by<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        self.end_time() <= now.with_timezone(&canonical_zone())
    }

    pub fn status_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> ContestStatus {
        let now = now.with_timezone(&canonical_zone());
        if self.end_time() <= now {
            ContestStatus::Ended
        } else if self.start_time <= now {
            ContestStatus::Ongoing
        } else {
            ContestStatus::Upcoming
        }
    }

    pub fn is_ongoing_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        self.status_at(now) == ContestStatus::Ongoing
    }
}

impl PartialEq for Contest {
    fn eq(&self, other: &Self) -> bool {
        self.platform == other.platform
            && self.title == other.title
            && self.start_time == other.start_time
            && self.duration == other.duration
    }
}

impl Eq for Contest {}

impl Hash for Contest {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.platform.hash(state);
        self.title.hash(state);
        self.start_time.hash(state);
        self.duration.hash(state);
    }
}

impl fmt::Display for Contest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Contest({}, {}, {}, {}s)",
            self.platform,
            self.title,
            self.start_time.to_rfc3339(),
            self.duration.num_seconds()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContestStatus {
    Upcoming,
    Ongoing,
    Ended,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashSet;

    fn contest(start: DateTime<Utc>, minutes: i64) -> Contest {
        Contest::new(
            Platform::Codeforces,
            "Codeforces Round 900",
            "https://codeforces.com/contests/1900",
            start,
            Duration::minutes(minutes),
        )
        .unwrap()
    }

    #[test]
    fn start_time_is_moved_into_canonical_zone() {
        let start = Utc.with_ymd_and_hms(2022, 8, 27, 12, 0, 0).unwrap();
        let c = contest(start, 100);
        assert_eq!(c.start_time().offset(), &canonical_zone());
        assert_eq!(c.start_time().to_rfc3339(), "2022-08-27T17:30:00+05:30");
        assert_eq!(c.start_time(), start);
    }

    #[test]
    fn end_time_is_derived() {
        let start = Utc.with_ymd_and_hms(2022, 9, 3, 14, 30, 0).unwrap();
        let c = contest(start, 90);
        assert_eq!(c.end_time() - c.start_time(), Duration::minutes(90));
    }

    #[test]
    fn rejects_empty_title_and_negative_duration() {
        let start = Utc::now();
        let empty = Contest::new(Platform::AtCoder, "   ", "", start, Duration::zero());
        assert_eq!(empty.unwrap_err(), ContestError::EmptyTitle);

        let negative = Contest::new(Platform::AtCoder, "ABC 300", "", start, Duration::seconds(-1));
        assert_eq!(
            negative.unwrap_err(),
            ContestError::NegativeDuration { seconds: -1 }
        );
    }

    #[test]
    fn rejects_duration_past_the_calendar() {
        let start = Utc.with_ymd_and_hms(2022, 9, 3, 14, 30, 0).unwrap();
        let huge = Duration::seconds(1_000_000_000_000_000);
        let err = Contest::new(Platform::Codeforces, "Round 9999", "", start, huge).unwrap_err();
        assert_eq!(
            err,
            ContestError::EndOutOfRange {
                seconds: 1_000_000_000_000_000
            }
        );
    }

    #[test]
    fn equality_ignores_url() {
        let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let a = contest(start, 60);
        let b = Contest::new(
            Platform::Codeforces,
            "Codeforces Round 900",
            "https://mirror.example/1900",
            start,
            Duration::minutes(60),
        )
        .unwrap();
        assert_eq!(a, b);

        let set: HashSet<Contest> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn status_boundaries() {
        let now = Utc::now();
        let ongoing = contest(now - Duration::minutes(10), 60);
        let upcoming = contest(now + Duration::minutes(10), 60);
        let ended = contest(now - Duration::minutes(60), 60);
        let starting_now = contest(now, 60);

        assert_eq!(ongoing.status_at(&now), ContestStatus::Ongoing);
        assert_eq!(upcoming.status_at(&now), ContestStatus::Upcoming);
        assert_eq!(ended.status_at(&now), ContestStatus::Ended);
        assert!(starting_now.is_ongoing_at(&now));
    }

    #[test]
    fn platform_parses_slug_and_display_name() {
        assert_eq!("code-jam".parse::<Platform>().unwrap(), Platform::CodeJam);
        assert_eq!("Kick Start".parse::<Platform>().unwrap(), Platform::KickStart);
        assert_eq!(" LEETCODE ".parse::<Platform>().unwrap(), Platform::LeetCode);
        assert_eq!(
            "topcoder".parse::<Platform>().unwrap_err(),
            ConfigError::UnknownPlatform("topcoder".into())
        );
    }

    #[test]
    fn unsupported_platforms() {
        let unsupported: Vec<_> = Platform::ALL.iter().filter(|p| !p.supported()).collect();
        assert_eq!(unsupported, vec![&Platform::HackerRank, &Platform::InterviewBit]);
    }
}
