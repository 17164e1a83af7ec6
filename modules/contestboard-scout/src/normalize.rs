//! Time normalization: every raw timestamp shape the platforms hand out,
//! turned into an instant in the canonical zone.
//!
//! Shapes handled:
//! - UNIX epoch seconds (Codeforces, LeetCode)
//! - ISO-8601 with or without an offset (CodeChef, GeeksforGeeks)
//! - `YYYY-MM-DD HH:MM:SS+HHMM` (AtCoder)
//! - dated strings in a known format and source zone (Google, HackerEarth)
//! - year-less `Mon DD, HH:MM` fragments (HackerEarth fallback), which need
//!   [`resolve_years`] before they become instants.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Utc,
};
use thiserror::Error;

use contestboard_common::canonical_zone;

pub type Result<T> = std::result::Result<T, NormalizeError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("Cannot parse {input:?} as {expected}")]
    Unparseable {
        input: String,
        expected: &'static str,
    },

    #[error("Timestamp out of range: {0}")]
    OutOfRange(i64),

    #[error("Negative length: {0}s")]
    NegativeSeconds(i64),

    #[error("{year:04}-{month:02}-{day:02} is not a calendar date")]
    InvalidDate { year: i32, month: u32, day: u32 },

    #[error("End {end} is before start {start}")]
    NegativeDuration { start: String, end: String },
}

/// A normalized start instant plus a non-negative length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: DateTime<FixedOffset>,
    pub duration: Duration,
}

impl Span {
    pub fn end(&self) -> DateTime<FixedOffset> {
        self.start + self.duration
    }
}

pub fn utc() -> FixedOffset {
    Utc.fix()
}

pub fn to_canonical<Tz: TimeZone>(dt: &DateTime<Tz>) -> DateTime<FixedOffset> {
    dt.with_timezone(&canonical_zone())
}

pub fn from_epoch(secs: i64) -> Result<DateTime<FixedOffset>> {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| to_canonical(&dt))
        .ok_or(NormalizeError::OutOfRange(secs))
}

pub fn from_epoch_f64(secs: f64) -> Result<DateTime<FixedOffset>> {
    if !secs.is_finite() {
        return Err(NormalizeError::Unparseable {
            input: secs.to_string(),
            expected: "epoch seconds",
        });
    }
    // Floor keeps the nanosecond part non-negative for instants before 1970.
    let whole = secs.floor();
    let mut nanos = ((secs - whole) * 1e9).round();
    let mut whole = whole as i64;
    if nanos >= 1e9 {
        whole = whole.saturating_add(1);
        nanos = 0.0;
    }
    DateTime::from_timestamp(whole, nanos as u32)
        .map(|dt| to_canonical(&dt))
        .ok_or(NormalizeError::OutOfRange(whole))
}

/// A length given in whole seconds.
pub fn seconds(secs: i64) -> Result<Duration> {
    if secs < 0 {
        return Err(NormalizeError::NegativeSeconds(secs));
    }
    Duration::try_seconds(secs).ok_or(NormalizeError::OutOfRange(secs))
}

/// ISO-8601. Strings without an offset are read as wall-clock time in `assumed`.
pub fn parse_iso8601(raw: &str, assumed: FixedOffset) -> Result<DateTime<FixedOffset>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(to_canonical(&dt));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return localize(naive, assumed, trimmed);
        }
    }
    Err(NormalizeError::Unparseable {
        input: raw.to_string(),
        expected: "ISO-8601 datetime",
    })
}

/// `2022-08-27 21:00:00+0900`.
pub fn parse_offset_timestamp(raw: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M:%S%z")
        .map(|dt| to_canonical(&dt))
        .map_err(|_| NormalizeError::Unparseable {
            input: raw.to_string(),
            expected: "YYYY-MM-DD HH:MM:SS+HHMM",
        })
}

/// A full date-and-time in `format`, read as wall-clock time in `zone`.
pub fn parse_dated(raw: &str, format: &str, zone: FixedOffset) -> Result<DateTime<FixedOffset>> {
    let trimmed = raw.trim();
    let naive = NaiveDateTime::parse_from_str(trimmed, format).map_err(|_| {
        NormalizeError::Unparseable {
            input: raw.to_string(),
            expected: "dated timestamp",
        }
    })?;
    localize(naive, zone, trimmed)
}

/// `HH:MM` clock-style length. Hours are not capped at 24.
pub fn parse_clock_duration(raw: &str) -> Result<Duration> {
    let unparseable = || NormalizeError::Unparseable {
        input: raw.to_string(),
        expected: "HH:MM duration",
    };
    let (hours, minutes) = raw.trim().split_once(':').ok_or_else(unparseable)?;
    let hours: i64 = hours.trim().parse().map_err(|_| unparseable())?;
    let minutes: i64 = minutes.trim().parse().map_err(|_| unparseable())?;
    if hours < 0 || !(0..60).contains(&minutes) {
        return Err(unparseable());
    }
    let total = hours
        .checked_mul(60)
        .and_then(|m| m.checked_add(minutes))
        .ok_or_else(unparseable)?;
    Duration::try_minutes(total).ok_or(NormalizeError::OutOfRange(total))
}

/// Duration between two instants. A negative result means the inputs were
/// misread and is reported, never clamped.
pub fn span(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Result<Span> {
    let duration = end - start;
    if duration < Duration::zero() {
        return Err(NormalizeError::NegativeDuration {
            start: start.to_rfc3339(),
            end: end.to_rfc3339(),
        });
    }
    Ok(Span {
        start: to_canonical(&start),
        duration,
    })
}

fn localize(naive: NaiveDateTime, zone: FixedOffset, input: &str) -> Result<DateTime<FixedOffset>> {
    zone.from_local_datetime(&naive)
        .single()
        .map(|dt| to_canonical(&dt))
        .ok_or_else(|| NormalizeError::Unparseable {
            input: input.to_string(),
            expected: "unambiguous local time",
        })
}

// --- Year-less fragments ---

/// Month, day and time of day with the year missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearlessStamp {
    pub month: u32,
    pub day: u32,
    pub time: NaiveTime,
}

impl YearlessStamp {
    /// Parse `raw` with a strftime `format` that carries no `%Y`.
    ///
    /// The fragment is parsed against the leap year 2000 so that Feb 29
    /// survives until a real year is chosen.
    pub fn parse(raw: &str, format: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let padded = format!("2000 {trimmed}");
        let naive = NaiveDateTime::parse_from_str(&padded, &format!("%Y {format}"))
            .map_err(|_| NormalizeError::Unparseable {
                input: raw.to_string(),
                expected: "year-less timestamp",
            })?;
        Ok(Self {
            month: naive.month(),
            day: naive.day(),
            time: naive.time(),
        })
    }

    pub fn with_year(&self, year: i32) -> Result<NaiveDateTime> {
        NaiveDate::from_ymd_opt(year, self.month, self.day)
            .map(|date| date.and_time(self.time))
            .ok_or(NormalizeError::InvalidDate {
                year,
                month: self.month,
                day: self.day,
            })
    }
}

/// Pick calendar years for a year-less start/end pair, relative to the
/// reference month and year.
///
/// | start month < now | end month < now | years |
/// |---|---|---|
/// | yes | yes | `(y+1, y+1)` if start month <= end month, else `(y, y+1)` |
/// | yes | no  | `(y, y)` |
/// | no  | yes | `(y, y+1)` |
/// | no  | no  | `(y, y)` |
///
/// The second row is asymmetric: a start month that already passed stays in
/// the reference year instead of being pushed forward.
pub fn resolve_years(
    start_month: u32,
    end_month: u32,
    now_month: u32,
    now_year: i32,
) -> (i32, i32) {
    let start_past = start_month < now_month;
    let end_past = end_month < now_month;
    match (start_past, end_past) {
        (true, true) if start_month <= end_month => (now_year + 1, now_year + 1),
        (true, true) => (now_year, now_year + 1),
        (true, false) => (now_year, now_year),
        (false, true) => (now_year, now_year + 1),
        (false, false) => (now_year, now_year),
    }
}

/// Resolve a year-less pair into a span. `now` is read in `zone`, the same
/// zone the fragments are written in.
pub fn resolve_yearless<Tz: TimeZone>(
    start: &YearlessStamp,
    end: &YearlessStamp,
    now: &DateTime<Tz>,
    zone: FixedOffset,
) -> Result<Span> {
    let reference = now.with_timezone(&zone);
    let (start_year, end_year) =
        resolve_years(start.month, end.month, reference.month(), reference.year());

    let start_naive = start.with_year(start_year)?;
    let end_naive = end.with_year(end_year)?;
    let start_at = localize(start_naive, zone, &start_naive.to_string())?;
    let end_at = localize(end_naive, zone, &end_naive.to_string())?;
    span(start_at, end_at)
}
