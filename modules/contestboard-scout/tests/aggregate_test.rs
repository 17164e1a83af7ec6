//! Aggregation across several sources, driven by mocks.
//!
//! Real adapters are wired to `MockWebClient` / `MockRenderer` where the
//! test is about platform behaviour; `StaticSource` covers the scheduling
//! side (timeouts, retries, panics).

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde_json::json;

use contestboard_common::{canonical_zone, Contest, Platform};
use contestboard_scout::aggregate::{Aggregator, AggregatorSettings, SourceOutcome};
use contestboard_scout::sources::{build_sources, ContestSource, SourceDeps};
use contestboard_scout::testing::{MockRenderer, MockWebClient, StaticSource};

const CODEFORCES_API: &str = "https://codeforces.com/api/contest.list";
const LEETCODE_API: &str = "https://leetcode.com/graphql";
const CODECHEF_API: &str = "https://www.codechef.com/api/list/contests/all";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// 2022-09-03 19:50 IST, ten minutes before Codeforces Round #818.
fn now() -> DateTime<FixedOffset> {
    Utc.timestamp_opt(1662215400 - 600, 0)
        .unwrap()
        .with_timezone(&canonical_zone())
}

fn contest(platform: Platform, title: &str, start: DateTime<FixedOffset>, minutes: i64) -> Contest {
    Contest::new(
        platform,
        title,
        format!("https://{}.test/{title}", platform.slug()),
        start,
        chrono::Duration::minutes(minutes),
    )
    .unwrap()
}

fn fast_settings() -> AggregatorSettings {
    AggregatorSettings {
        source_timeout: Duration::from_secs(5),
        attempts: 1,
        retry_base: Duration::from_millis(5),
    }
}

fn all(platforms: &[Platform]) -> BTreeSet<Platform> {
    platforms.iter().copied().collect()
}

fn leetcode_body() -> serde_json::Value {
    json!({
        "data": {
            "allContests": [
                { "title": "Weekly Contest 309", "titleSlug": "weekly-contest-309",
                  "startTime": 1662258600, "duration": 5400 },
                { "title": "Biweekly Contest 86", "titleSlug": "biweekly-contest-86",
                  "startTime": 1662215400 - 1800, "duration": 5400 }
            ]
        }
    })
}

fn codechef_body() -> serde_json::Value {
    json!({
        "present_contests": [],
        "future_contests": [{
            "contest_code": "START55",
            "contest_name": "Starters 55",
            "contest_start_date_iso": "2022-09-07T20:00:00+05:30",
            "contest_end_date_iso": "2022-09-07T23:00:00+05:30"
        }]
    })
}

fn deps(web: MockWebClient) -> SourceDeps {
    SourceDeps {
        web: Arc::new(web),
        renderer: Arc::new(MockRenderer::with_page("<html><body></body></html>")),
        render_wait: Duration::from_millis(10),
    }
}

// ---------------------------------------------------------------------------
// Real adapters over mocks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn codeforces_outage_leaves_other_platforms_intact() {
    let web = MockWebClient::new()
        .on_get_status(CODEFORCES_API, 503)
        .on_post(LEETCODE_API, leetcode_body())
        .on_get_json(CODECHEF_API, codechef_body());
    let platforms = [Platform::Codeforces, Platform::LeetCode, Platform::CodeChef];
    let aggregator = Aggregator::new(build_sources(&platforms, &deps(web)), fast_settings());

    let result = aggregator.aggregate_at(&all(&platforms), now()).await;

    let titles: Vec<_> = result.contests.iter().map(|c| c.title()).collect();
    assert_eq!(titles, vec!["Biweekly Contest 86", "Weekly Contest 309", "Starters 55"]);

    assert_eq!(result.reports.len(), 3);
    assert_eq!(result.reports[0].platform, Platform::Codeforces);
    assert!(matches!(result.reports[0].outcome, SourceOutcome::Unavailable(_)));
    assert_eq!(
        result.reports[1].outcome,
        SourceOutcome::Harvested { contests: 2, dropped: 0, ended: 0 }
    );
}

#[tokio::test]
async fn output_is_sorted_and_ongoing_is_classified() {
    let codeforces = json!({
        "status": "OK",
        "result": [
            { "id": 1721, "name": "Codeforces Round #818 (Div. 2)",
              "startTimeSeconds": 1662215400, "durationSeconds": 5400 },
            { "id": 1720, "name": "Codeforces Round #816 (Div. 2)",
              "startTimeSeconds": 1660829700, "durationSeconds": 7200 }
        ]
    });
    let web = MockWebClient::new()
        .on_get_json(CODEFORCES_API, codeforces)
        .on_post(LEETCODE_API, leetcode_body());
    let platforms = [Platform::LeetCode, Platform::Codeforces];
    let aggregator = Aggregator::new(build_sources(&platforms, &deps(web)), fast_settings());

    let result = aggregator.aggregate_at(&all(&platforms), now()).await;

    let starts: Vec<_> = result.contests.iter().map(|c| c.start_time()).collect();
    let mut sorted = starts.clone();
    sorted.sort();
    assert_eq!(starts, sorted);
    assert!(result.contests.iter().all(|c| c.end_time() > now()));

    let ongoing: Vec<_> = result.ongoing().iter().map(|c| c.title()).collect();
    assert_eq!(ongoing, vec!["Biweekly Contest 86"]);
    let upcoming: Vec<_> = result.upcoming().iter().map(|c| c.title()).collect();
    assert_eq!(upcoming, vec!["Codeforces Round #818 (Div. 2)", "Weekly Contest 309"]);

    let views = result.views();
    assert!(views[0].ongoing);
    assert_eq!(views[1].start, "Sat, 3 Sep 2022, 8:00 PM");
    assert_eq!(views[1].duration, "1 hour, 30 minutes");
}

#[tokio::test]
async fn unsupported_platforms_report_without_error() {
    let platforms = [Platform::HackerRank, Platform::InterviewBit];
    let aggregator = Aggregator::new(
        build_sources(&platforms, &deps(MockWebClient::new())),
        fast_settings(),
    );

    let result = aggregator.aggregate_at(&all(&platforms), now()).await;
    assert!(result.contests.is_empty());
    assert!(result
        .reports
        .iter()
        .all(|r| r.outcome == SourceOutcome::Unsupported));
}

#[tokio::test]
async fn google_render_failure_releases_the_session() {
    let renderer = Arc::new(MockRenderer::failing());
    let deps = SourceDeps {
        web: Arc::new(MockWebClient::new()),
        renderer: renderer.clone(),
        render_wait: Duration::from_millis(10),
    };
    let platforms = [Platform::CodeJam, Platform::HashCode, Platform::KickStart];
    let aggregator = Aggregator::new(build_sources(&platforms, &deps), fast_settings());

    let result = aggregator.aggregate_at(&all(&platforms), now()).await;
    assert!(result.contests.is_empty());
    assert_eq!(renderer.opened(), 3);
    assert_eq!(renderer.released(), 3);
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn slow_source_times_out_alone() {
    let start = now() + chrono::Duration::hours(2);
    let abc = contest(Platform::AtCoder, "ABC 266", start, 100);
    let slow: Arc<dyn ContestSource> = Arc::new(
        StaticSource::new(Platform::AtCoder, vec![abc]).with_delay(Duration::from_secs(30)),
    );
    let fast: Arc<dyn ContestSource> = Arc::new(StaticSource::new(
        Platform::LeetCode,
        vec![contest(Platform::LeetCode, "Weekly 309", start, 90)],
    ));
    let aggregator = Aggregator::new(
        vec![slow, fast],
        AggregatorSettings {
            source_timeout: Duration::from_millis(100),
            ..fast_settings()
        },
    );

    let result = aggregator
        .aggregate_at(&all(&[Platform::AtCoder, Platform::LeetCode]), now())
        .await;
    assert_eq!(result.reports[0].outcome, SourceOutcome::TimedOut);
    assert_eq!(result.contests.len(), 1);
    assert_eq!(result.contests[0].title(), "Weekly 309");
}

#[tokio::test]
async fn panicking_source_is_isolated() {
    let start = now() + chrono::Duration::hours(2);
    let sources: Vec<Arc<dyn ContestSource>> = vec![
        Arc::new(StaticSource::new(Platform::HackerEarth, vec![]).panicking()),
        Arc::new(StaticSource::new(
            Platform::CodeChef,
            vec![contest(Platform::CodeChef, "Starters 55", start, 180)],
        )),
    ];
    let aggregator = Aggregator::new(sources, fast_settings());

    let result = aggregator
        .aggregate_at(&all(&[Platform::HackerEarth, Platform::CodeChef]), now())
        .await;
    assert!(matches!(result.reports[0].outcome, SourceOutcome::Unavailable(_)));
    assert_eq!(result.contests.len(), 1);
}

#[tokio::test]
async fn transient_failures_are_retried_up_to_the_limit() {
    let start = now() + chrono::Duration::hours(2);
    let round = contest(Platform::Codeforces, "Round 818", start, 90);
    let flaky = Arc::new(StaticSource::new(Platform::Codeforces, vec![round]).flaky(2));
    let aggregator = Aggregator::new(
        vec![flaky.clone() as Arc<dyn ContestSource>],
        AggregatorSettings {
            attempts: 3,
            ..fast_settings()
        },
    );

    let result = aggregator.aggregate_at(&all(&[Platform::Codeforces]), now()).await;
    assert_eq!(flaky.calls(), 3);
    assert_eq!(result.reports[0].attempts, 3);
    assert_eq!(result.contests.len(), 1);
}

#[tokio::test]
async fn structural_failures_are_not_retried() {
    let broken = Arc::new(StaticSource::new(Platform::AtCoder, vec![]).broken("no upcoming table"));
    let aggregator = Aggregator::new(
        vec![broken.clone() as Arc<dyn ContestSource>],
        AggregatorSettings {
            attempts: 3,
            ..fast_settings()
        },
    );

    let result = aggregator.aggregate_at(&all(&[Platform::AtCoder]), now()).await;
    assert_eq!(broken.calls(), 1);
    assert!(matches!(
        &result.reports[0].outcome,
        SourceOutcome::Unavailable(reason) if reason.contains("no upcoming table")
    ));
}

#[tokio::test]
async fn disabled_platforms_are_not_run() {
    let start = now() + chrono::Duration::hours(2);
    let leetcode = Arc::new(StaticSource::new(
        Platform::LeetCode,
        vec![contest(Platform::LeetCode, "Weekly 309", start, 90)],
    ));
    let atcoder = Arc::new(StaticSource::new(
        Platform::AtCoder,
        vec![contest(Platform::AtCoder, "ABC 266", start, 100)],
    ));
    let aggregator = Aggregator::new(
        vec![
            leetcode.clone() as Arc<dyn ContestSource>,
            atcoder.clone() as Arc<dyn ContestSource>,
        ],
        fast_settings(),
    );

    let result = aggregator.aggregate_at(&all(&[Platform::AtCoder]), now()).await;
    assert_eq!(leetcode.calls(), 0);
    assert_eq!(atcoder.calls(), 1);
    assert_eq!(result.reports.len(), 1);
    assert_eq!(result.contests[0].title(), "ABC 266");
}

#[tokio::test]
async fn finished_contests_never_reach_the_output() {
    let sources: Vec<Arc<dyn ContestSource>> = vec![Arc::new(StaticSource::new(
        Platform::GeeksforGeeks,
        vec![
            contest(Platform::GeeksforGeeks, "Yesterday", now() - chrono::Duration::days(1), 90),
            contest(Platform::GeeksforGeeks, "Ends now", now() - chrono::Duration::minutes(90), 90),
            contest(Platform::GeeksforGeeks, "Tomorrow", now() + chrono::Duration::days(1), 90),
        ],
    ))];
    let aggregator = Aggregator::new(sources, fast_settings());

    let result = aggregator.aggregate_at(&all(&[Platform::GeeksforGeeks]), now()).await;
    let titles: Vec<_> = result.contests.iter().map(|c| c.title()).collect();
    assert_eq!(titles, vec!["Tomorrow"]);
    assert_eq!(
        result.reports[0].outcome,
        SourceOutcome::Harvested { contests: 1, dropped: 0, ended: 2 }
    );
}
