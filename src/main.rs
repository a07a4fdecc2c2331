use std::path::Path;

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use interest_tracker::client::HttpFetcher;
use interest_tracker::config::{Cli, ConfigFile, TrackerConfig};
use interest_tracker::domain::now_civil;
use interest_tracker::runner::run_all;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let log_guard = init_logging(cli.log_file.as_deref())?;

    let file = match &cli.config {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load().unwrap_or_default(),
    };
    let config = TrackerConfig::resolve(&cli, file)?;
    let fetcher = HttpFetcher::new(config.retry.clone())?;

    // One timestamp for the whole invocation, taken before any fetch.
    let timestamp = now_civil(config.store.offset);
    tracing::info!(
        "Run at {} for {} event(s), last_updated {}",
        timestamp,
        config.events.len(),
        config.store.policy.as_str()
    );

    let reports = run_all(&fetcher, &config, &timestamp).await;
    for report in &reports {
        println!("{}", report.summary_line());
    }

    let failed = reports.iter().filter(|r| r.is_failure()).count();
    if failed > 0 && config.strict {
        eprintln!("{} of {} event(s) failed", failed, reports.len());
        drop(log_guard);
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(log_file) = log_file else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
        return Ok(None);
    };

    let file_name = log_file
        .file_name()
        .ok_or_else(|| eyre!("log file path has no file name: {}", log_file.display()))?;
    let dir = match log_file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_env_filter(filter)
        .init();
    Ok(Some(guard))
}
