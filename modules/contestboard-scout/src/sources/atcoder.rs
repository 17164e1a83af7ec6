use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use scraper::{ElementRef, Html};
use tracing::info;

use contestboard_common::{Contest, Platform};

use super::{ContestSource, DropReason, Harvest, SourceError};
use crate::html::{selector, text};
use crate::normalize::{parse_clock_duration, parse_offset_timestamp};
use crate::transport::WebClient;

const URL: &str = "https://atcoder.jp/contests";
const BASE: &str = "https://atcoder.jp";

/// Scrapes the "Upcoming Contests" table on atcoder.jp.
///
/// Each row looks like:
/// ```text
/// <tr>
///   <td><a ...><time class="fixtime fixtime-full">2022-08-27 21:00:00+0900</time></a></td>
///   <td><span>Ⓐ</span> <a href="/contests/abc266">AtCoder Beginner Contest 266</a></td>
///   <td class="text-center">01:40</td>
///   <td class="text-center"> - 1999</td>
/// </tr>
/// ```
pub struct AtCoderSource {
    web: Arc<dyn WebClient>,
}

impl AtCoderSource {
    pub fn new(web: Arc<dyn WebClient>) -> Self {
        Self { web }
    }
}

#[async_trait]
impl ContestSource for AtCoderSource {
    fn platform(&self) -> Platform {
        Platform::AtCoder
    }

    async fn fetch(&self, now: DateTime<FixedOffset>) -> Result<Harvest, SourceError> {
        let html = self.web.get_text(URL, &[]).await?;
        let harvest = parse_upcoming(&html, &now)?;
        info!(platform = "atcoder", contests = harvest.contests.len(), "Parsed upcoming table");
        Ok(harvest)
    }
}

pub fn parse_upcoming(html: &str, now: &DateTime<FixedOffset>) -> Result<Harvest, SourceError> {
    let document = Html::parse_document(html);
    let table_sel = selector("#contest-table-upcoming");
    let row_sel = selector("tbody tr");

    let table = document
        .select(&table_sel)
        .next()
        .ok_or_else(|| SourceError::Structure("#contest-table-upcoming not found".into()))?;

    let mut harvest = Harvest::default();
    for (index, row) in table.select(&row_sel).enumerate() {
        let (reference, candidate) = parse_row(&row);
        harvest.accept(reference.unwrap_or_else(|| format!("row {index}")), candidate, now);
    }
    Ok(harvest)
}

fn parse_row(row: &ElementRef<'_>) -> (Option<String>, Result<Contest, DropReason>) {
    let cell_sel = selector("td");
    let link_sel = selector("a[href^=\"/contests/\"]");

    let cells: Vec<ElementRef<'_>> = row.select(&cell_sel).collect();
    let link = cells.get(1).and_then(|cell| cell.select(&link_sel).next());
    let href = link.and_then(|a| a.value().attr("href")).map(String::from);

    (href, row_contest(&cells, link))
}

fn row_contest(
    cells: &[ElementRef<'_>],
    link: Option<ElementRef<'_>>,
) -> Result<Contest, DropReason> {
    let time_sel = selector("time");

    let start_raw = cells
        .first()
        .and_then(|cell| cell.select(&time_sel).next())
        .map(|t| text(&t))
        .ok_or_else(|| DropReason::Selector("td time".into()))?;
    let link = link.ok_or_else(|| DropReason::Selector("td a[href^=/contests/]".into()))?;
    let href = link.value().attr("href").unwrap_or_default();
    let duration_raw = cells
        .get(2)
        .map(text)
        .ok_or(DropReason::MissingField("duration"))?;

    let start = parse_offset_timestamp(&start_raw)?;
    let duration = parse_clock_duration(&duration_raw)?;
    Ok(Contest::new(
        Platform::AtCoder,
        text(&link),
        format!("{BASE}{href}"),
        start,
        duration,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use contestboard_common::canonical_zone;

    const PAGE: &str = r##"
<html><body>
<div id="contest-table-upcoming">
  <table class="table">
    <thead><tr><th>Start Time</th><th>Contest Name</th><th>Duration</th><th>Rated Range</th></tr></thead>
    <tbody>
      <tr>
        <td class="text-center"><a href="http://www.timeanddate.com/worldclock/fixedtime.html?iso=20220827T2100&amp;p1=248" target="blank"><time class="fixtime fixtime-full">2022-08-27 21:00:00+0900</time></a></td>
        <td>
          <span aria-hidden="true" data-placement="top" data-toggle="tooltip" title="Algorithm">Ⓐ</span>
          <span class="user-blue">◉</span>
          <a href="/contests/abc266">AtCoder Beginner Contest 266</a>
        </td>
        <td class="text-center">01:40</td>
        <td class="text-center"> - 1999</td>
      </tr>
      <tr>
        <td class="text-center"><a href="#"><time class="fixtime fixtime-full">2022-09-03 21:00:00+0900</time></a></td>
        <td><span>Ⓗ</span><a href="/contests/ahc013">AtCoder Heuristic Contest 013</a></td>
        <td class="text-center">240:00</td>
        <td class="text-center">-</td>
      </tr>
      <tr>
        <td class="text-center"><a href="#"><time class="fixtime fixtime-full">next saturday</time></a></td>
        <td><a href="/contests/arc147">AtCoder Regular Contest 147</a></td>
        <td class="text-center">02:00</td>
        <td class="text-center">-</td>
      </tr>
    </tbody>
  </table>
</div>
</body></html>"##;

    fn before_all() -> DateTime<FixedOffset> {
        Utc.with_ymd_and_hms(2022, 8, 20, 0, 0, 0)
            .unwrap()
            .with_timezone(&canonical_zone())
    }

    #[test]
    fn parses_rows_and_skips_malformed_one() {
        let harvest = parse_upcoming(PAGE, &before_all()).unwrap();
        assert_eq!(harvest.contests.len(), 2);

        let abc = &harvest.contests[0];
        assert_eq!(abc.title(), "AtCoder Beginner Contest 266");
        assert_eq!(abc.url(), "https://atcoder.jp/contests/abc266");
        assert_eq!(abc.start_time().to_rfc3339(), "2022-08-27T17:30:00+05:30");
        assert_eq!(abc.duration(), Duration::hours(1) + Duration::minutes(40));

        assert_eq!(harvest.contests[1].duration(), Duration::hours(240));

        assert_eq!(harvest.dropped.len(), 1);
        assert_eq!(harvest.dropped[0].reference, "/contests/arc147");
        assert!(matches!(harvest.dropped[0].reason, DropReason::Normalize(_)));
    }

    #[test]
    fn finished_contests_are_filtered() {
        let after_abc = Utc.with_ymd_and_hms(2022, 8, 28, 0, 0, 0)
            .unwrap()
            .with_timezone(&canonical_zone());
        let harvest = parse_upcoming(PAGE, &after_abc).unwrap();
        assert_eq!(harvest.ended, 1);
        assert_eq!(harvest.contests.len(), 1);
        assert_eq!(harvest.contests[0].title(), "AtCoder Heuristic Contest 013");
    }

    #[test]
    fn missing_table_is_a_structure_error() {
        let err = parse_upcoming("<html><body><p>maintenance</p></body></html>", &before_all())
            .unwrap_err();
        assert!(matches!(err, SourceError::Structure(_)));
    }
}
