use anyhow::{anyhow, Result};
use clap::Parser;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::{fmt, EnvFilter};
use websim_core::persist::{load_id_file, save_ids, save_snapshot_with_meta, SnapshotPaths};
use websim_core::{BuildConfig, Tokenization, VectorBuilder};
use websim_crawler::{normalize_id, FetcherConfig, HttpFetcher, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Fetch a list of pages and write their word-frequency snapshot")]
struct Cli {
    /// File with one url per line
    #[arg(long)]
    urls: String,
    /// Snapshot directory (vectors.bin, urls.txt, meta.json)
    #[arg(long, default_value = "./data")]
    output: String,
    /// Maximum fetches in flight
    #[arg(long, default_value_t = 16)]
    concurrency: usize,
    /// Request timeout seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    user_agent: String,
    /// non_word or whitespace
    #[arg(long, default_value = "non_word")]
    tokenization: Tokenization,
}

#[derive(Serialize)]
struct CrawlSummary<'a> {
    output: &'a str,
    requested: usize,
    built: usize,
    failed: &'a [String],
    finished_at: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();

    let mut ids = Vec::new();
    for raw in load_id_file(std::path::Path::new(&args.urls))? {
        match normalize_id(&raw) {
            Some(id) if !ids.contains(&id) => ids.push(id),
            Some(_) => {}
            None => tracing::warn!(line = %raw, "skipping unusable url"),
        }
    }
    if ids.is_empty() {
        return Err(anyhow!("no valid urls in {}", args.urls));
    }
    tracing::info!(
        urls = ids.len(),
        concurrency = args.concurrency,
        tokenization = ?args.tokenization,
        output = %args.output,
        "crawler starting"
    );

    let fetcher = Arc::new(HttpFetcher::new(FetcherConfig {
        timeout: Duration::from_secs(args.timeout_secs),
        user_agent: args.user_agent.clone(),
        tokenization: args.tokenization,
        ..FetcherConfig::default()
    })?);
    let builder = VectorBuilder::new(BuildConfig { max_concurrency: args.concurrency });
    let report = builder.build_report(fetcher, &ids).await;

    let paths = SnapshotPaths::new(&args.output);
    save_snapshot_with_meta(&paths, &report.vectors)?;
    save_ids(&paths, &ids)?;

    let summary = CrawlSummary {
        output: &args.output,
        requested: ids.len(),
        built: report.vectors.len(),
        failed: &report.failed,
        finished_at: time::OffsetDateTime::now_utc().format(&Rfc3339)?,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
