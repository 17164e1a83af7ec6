use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, info_span, warn, Instrument};
use tracing_subscriber::EnvFilter;

use contestboard_common::{parse_platforms, Config, Platform};
use contestboard_scout::aggregate::{Aggregator, AggregatorSettings, SourceOutcome};
use contestboard_scout::render::build_renderer;
use contestboard_scout::snapshot::write_snapshots;
use contestboard_scout::sources::{build_sources, SourceDeps};
use contestboard_scout::transport::HttpClient;

#[derive(Parser)]
#[command(about = "Collect ongoing and upcoming programming contests")]
struct Cli {
    /// Comma-separated platform slugs, e.g. "codeforces,leetcode"
    #[arg(long)]
    platforms: Option<String>,

    /// Directory for the JSON schedule snapshots
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Print the schedule without writing snapshots
    #[arg(long)]
    no_snapshot: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("contestboard=info"));
    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(list) = &cli.platforms {
        config.platforms = parse_platforms(list)?;
    }
    if let Some(dir) = cli.out_dir {
        config.output_dir = dir;
    }
    config.log_redacted();

    let run_id = uuid::Uuid::new_v4();
    run(config, cli.no_snapshot)
        .instrument(info_span!("contestboard", %run_id))
        .await
}

async fn run(config: Config, no_snapshot: bool) -> Result<()> {
    let deps = SourceDeps {
        web: Arc::new(HttpClient::new(config.http_timeout, &config.user_agent)?),
        renderer: build_renderer(&config.page_backend, config.http_timeout)?,
        render_wait: config.render_wait,
    };
    let sources = build_sources(&config.platforms, &deps);
    let aggregator = Aggregator::new(
        sources,
        AggregatorSettings {
            source_timeout: config.source_timeout,
            attempts: config.source_attempts,
            ..AggregatorSettings::default()
        },
    );

    let enabled: BTreeSet<Platform> = config.platforms.iter().copied().collect();
    let aggregation = aggregator.aggregate(&enabled).await;

    for report in &aggregation.reports {
        match &report.outcome {
            SourceOutcome::Harvested { contests, dropped, ended } => info!(
                platform = %report.platform,
                contests,
                dropped,
                ended,
                attempts = report.attempts,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Source report"
            ),
            SourceOutcome::Unsupported => {
                info!(platform = %report.platform, "No adapter for platform")
            }
            SourceOutcome::Unavailable(reason) => {
                warn!(platform = %report.platform, reason = %reason, "Source contributed nothing")
            }
            SourceOutcome::TimedOut => warn!(platform = %report.platform, "Source timed out"),
        }
    }

    let ongoing = aggregation.ongoing().len();
    for view in aggregation.views() {
        let marker = if view.ongoing { "*" } else { " " };
        println!(
            "{marker} {:<14} {:<28} {:<14} {}  {}",
            view.platform, view.start, view.duration, view.title, view.url
        );
    }
    info!(
        contests = aggregation.contests.len(),
        ongoing,
        upcoming = aggregation.upcoming().len(),
        "Schedule ready"
    );

    if no_snapshot {
        info!("Snapshot writing disabled");
        return Ok(());
    }
    let paths = write_snapshots(&config.output_dir, &aggregation.contests)?;
    info!(
        minified = %paths.minified.display(),
        pretty = %paths.pretty.display(),
        "Snapshots written"
    );
    Ok(())
}
