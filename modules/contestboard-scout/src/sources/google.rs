use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use tracing::info;

use contestboard_common::{Contest, Platform};

use super::{ContestSource, DropReason, Harvest, SourceError};
use crate::normalize::{parse_dated, span, utc};
use crate::render::{render_once, PageRenderer, RenderWait, RenderedPage};

const UPCOMING_ROW_CLASS: &str = "schedule-row__upcoming";
/// `Apr 08 2023, 01:00`, UTC.
const ROW_TIME_FORMAT: &str = "%b %d %Y, %H:%M";

/// Schedule pages on codingcompetitions.withgoogle.com (Code Jam, Hash
/// Code, Kick Start). The rows are built client-side, so the page goes
/// through a [`PageRenderer`] first.
///
/// Each upcoming row renders as text lines: title, start, end, then
/// anything else. Rows link nowhere on their own, so every contest points
/// at the schedule page.
pub struct CodingCompetitionsSource {
    platform: Platform,
    url: &'static str,
    renderer: Arc<dyn PageRenderer>,
    wait: Duration,
}

impl CodingCompetitionsSource {
    pub fn code_jam(renderer: Arc<dyn PageRenderer>, wait: Duration) -> Self {
        Self::new(
            Platform::CodeJam,
            "https://codingcompetitions.withgoogle.com/codejam/schedule",
            renderer,
            wait,
        )
    }

    pub fn hash_code(renderer: Arc<dyn PageRenderer>, wait: Duration) -> Self {
        Self::new(
            Platform::HashCode,
            "https://codingcompetitions.withgoogle.com/hashcode/schedule",
            renderer,
            wait,
        )
    }

    pub fn kick_start(renderer: Arc<dyn PageRenderer>, wait: Duration) -> Self {
        Self::new(
            Platform::KickStart,
            "https://codingcompetitions.withgoogle.com/kickstart/schedule",
            renderer,
            wait,
        )
    }

    fn new(
        platform: Platform,
        url: &'static str,
        renderer: Arc<dyn PageRenderer>,
        wait: Duration,
    ) -> Self {
        Self {
            platform,
            url,
            renderer,
            wait,
        }
    }
}

#[async_trait]
impl ContestSource for CodingCompetitionsSource {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch(&self, now: DateTime<FixedOffset>) -> Result<Harvest, SourceError> {
        let wait = RenderWait::for_selector(&format!(".{UPCOMING_ROW_CLASS}"), self.wait);
        let page = render_once(self.renderer.as_ref(), self.url, &wait).await?;
        let harvest = parse_schedule(self.platform, &page, &now);
        info!(
            platform = self.platform.slug(),
            renderer = self.renderer.name(),
            contests = harvest.contests.len(),
            dropped = harvest.dropped.len(),
            "Parsed schedule"
        );
        Ok(harvest)
    }
}

/// An empty schedule is normal between seasons, so no rows is not an error.
pub fn parse_schedule(
    platform: Platform,
    page: &RenderedPage,
    now: &DateTime<FixedOffset>,
) -> Harvest {
    let mut harvest = Harvest::default();
    for (index, row) in page.texts_by_class(UPCOMING_ROW_CLASS).into_iter().enumerate() {
        let reference = row
            .first()
            .cloned()
            .unwrap_or_else(|| format!("row {index}"));
        harvest.accept(reference, parse_row(platform, &page.url, &row), now);
    }
    harvest
}

fn parse_row(platform: Platform, url: &str, row: &[String]) -> Result<Contest, DropReason> {
    let [title, start, end, ..] = row else {
        return Err(DropReason::Selector(format!(
            "{UPCOMING_ROW_CLASS} has {} text lines, expected at least 3",
            row.len()
        )));
    };
    let start = parse_dated(start, ROW_TIME_FORMAT, utc())?;
    let end = parse_dated(end, ROW_TIME_FORMAT, utc())?;
    let span = span(start, end)?;
    Ok(Contest::new(platform, title.as_str(), url, span.start, span.duration)?)
}
