use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use futures::stream::{self, StreamExt};
use scraper::{ElementRef, Html};
use tracing::{debug, info};

use contestboard_common::{Contest, Platform};

use super::{ContestSource, DropReason, Harvest, SourceError};
use crate::html::{first_line, lines, selector};
use crate::normalize::{parse_dated, resolve_yearless, span, utc, YearlessStamp};
use crate::transport::WebClient;

const LISTING_URL: &str = "https://www.hackerearth.com/challenges";
const BASE: &str = "https://www.hackerearth.com";
/// Detail pages fetched at once.
const DETAIL_CONCURRENCY: usize = 4;

/// `Sep 03, 2022, 08:00 PM`, UTC.
const DATED_FORMAT: &str = "%b %d, %Y, %I:%M %p";
/// `Sep 03, 08:00 PM`, UTC, year left out.
const YEARLESS_FORMAT: &str = "%b %d, %I:%M %p";

/// HackerEarth challenges. The listing page only links to challenges; title
/// and times come from each challenge's own page, which exists in two
/// layouts.
pub struct HackerEarthSource {
    web: Arc<dyn WebClient>,
}

impl HackerEarthSource {
    pub fn new(web: Arc<dyn WebClient>) -> Self {
        Self { web }
    }
}

#[async_trait]
impl ContestSource for HackerEarthSource {
    fn platform(&self) -> Platform {
        Platform::HackerEarth
    }

    async fn fetch(&self, now: DateTime<FixedOffset>) -> Result<Harvest, SourceError> {
        let listing = self.web.get_text(LISTING_URL, &[]).await?;
        let links = challenge_links(&listing)?;
        debug!(platform = "hackerearth", links = links.len(), "Collected challenge links");

        let pages: Vec<(String, Result<String, DropReason>)> = stream::iter(links)
            .map(|link| async move {
                let page = self
                    .web
                    .get_text(&link, &[])
                    .await
                    .map_err(|e| DropReason::Fetch(e.to_string()));
                (link, page)
            })
            .buffered(DETAIL_CONCURRENCY)
            .collect()
            .await;

        let mut harvest = Harvest::default();
        for (link, page) in pages {
            let candidate = page.and_then(|html| parse_challenge(&html, &link, &now));
            harvest.accept(link, candidate, &now);
        }
        info!(
            platform = "hackerearth",
            contests = harvest.contests.len(),
            dropped = harvest.dropped.len(),
            "Parsed challenges"
        );
        Ok(harvest)
    }
}

/// Absolute URLs of the challenge cards under the ongoing and upcoming
/// sections, in page order.
pub fn challenge_links(html: &str) -> Result<Vec<String>, SourceError> {
    let document = Html::parse_document(html);
    let card_sel = selector(".challenge-card-link");

    let mut found_section = false;
    let mut links = Vec::new();
    for section in [".ongoing", ".upcoming"] {
        let Some(container) = document.select(&selector(section)).next() else {
            continue;
        };
        found_section = true;
        links.extend(
            container
                .select(&card_sel)
                .filter_map(|card| card.value().attr("href"))
                .map(absolute),
        );
    }

    if !found_section {
        return Err(SourceError::Structure(
            "neither .ongoing nor .upcoming section on challenges page".into(),
        ));
    }
    Ok(links)
}

fn absolute(href: &str) -> String {
    if href.starts_with("https") {
        href.to_string()
    } else {
        format!("{BASE}{href}")
    }
}

/// Try the dated layout, then the year-less one. The first that yields a
/// contest wins; if neither does, the fallback's reason is reported.
pub fn parse_challenge(
    html: &str,
    url: &str,
    now: &DateTime<FixedOffset>,
) -> Result<Contest, DropReason> {
    let document = Html::parse_document(html);
    dated_layout(&document, url).or_else(|first| {
        debug!(url, reason = %first, "Dated layout did not match, trying year-less layout");
        yearless_layout(&document, url, now)
    })
}

/// ```text
/// <div class="event-title"><span class="title">HackerEarth Hiring Challenge</span></div>
/// <div class="start-time-block"><span class="regular">Sep 03, 2022, 08:00 PM</span></div>
/// <div class="end-time-block"><span class="regular">Sep 04, 2022, 08:00 PM</span></div>
/// ```
fn dated_layout(document: &Html, url: &str) -> Result<Contest, DropReason> {
    let title = first_line(document, ".event-title .title")
        .ok_or_else(|| DropReason::Selector(".event-title .title".into()))?;
    let start = first_line(document, ".start-time-block .regular")
        .ok_or_else(|| DropReason::Selector(".start-time-block .regular".into()))?;
    let end = first_line(document, ".end-time-block .regular")
        .ok_or_else(|| DropReason::Selector(".end-time-block .regular".into()))?;

    let span = span(
        parse_dated(&start, DATED_FORMAT, utc())?,
        parse_dated(&end, DATED_FORMAT, utc())?,
    )?;
    Ok(Contest::new(Platform::HackerEarth, title, url, span.start, span.duration)?)
}

/// ```text
/// <div class="event-title">Data Science Challenge</div>
/// <div class="timing-text">Sep 03, 08:00 PM</div>
/// <div class="timing-text">Jan 04, 08:00 PM</div>
/// ```
fn yearless_layout(
    document: &Html,
    url: &str,
    now: &DateTime<FixedOffset>,
) -> Result<Contest, DropReason> {
    let title = first_line(document, ".event-title")
        .ok_or_else(|| DropReason::Selector(".event-title".into()))?;
    let timing_sel = selector(".timing-text");
    let timings: Vec<ElementRef<'_>> = document.select(&timing_sel).collect();
    let [start, end, ..] = timings.as_slice() else {
        return Err(DropReason::Selector(format!(
            ".timing-text matched {} elements, expected 2",
            timings.len()
        )));
    };

    let start = YearlessStamp::parse(&lines(start).join(" "), YEARLESS_FORMAT)?;
    let end = YearlessStamp::parse(&lines(end).join(" "), YEARLESS_FORMAT)?;
    let span = resolve_yearless(&start, &end, now, utc())?;
    Ok(Contest::new(Platform::HackerEarth, title, url, span.start, span.duration)?)
}
