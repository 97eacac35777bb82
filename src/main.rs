//! # PR TIMES Sales Feed
//!
//! Turns a batch of PR TIMES press releases into a sales-outreach feed: each
//! release is enriched with its issuing company's profile and classified as
//! suitable or unsuitable for outreach, under a shared budget of remote
//! classification calls.
//!
//! ## Usage
//!
//! ```sh
//! prtimes_sales_feed -i raw.csv -o final.csv
//! ```
//!
//! ## Architecture
//!
//! 1. **Loading**: Read candidates from a CSV export, or index a listing page
//!    and read each release page's category block and contacts
//! 2. **Enrichment**: Fetch company profiles (deduplicated by profile URL)
//! 3. **Classification**: Keyword filter, then a rate-limited remote judgement
//! 4. **Output**: Write the CSV feed and, optionally, a JSON report
//!
//! Steps 2 and 3 run per record with bounded concurrency; output order always
//! matches input order.

use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod classifier;
mod cli;
mod config;
mod enricher;
mod inputs;
mod models;
mod outputs;
mod pipeline;
mod rate_limiter;
mod scrapers;
mod translate;
mod utils;

#[cfg(test)]
mod test_support;

use api::ChatClient;
use cli::Cli;
use config::{PipelineConfig, load_config};
use models::RunSummary;
use pipeline::Pipeline;
use scrapers::prtimes::{self, PrTimesClient};
use utils::{ensure_writable_dir, parent_dir};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("prtimes_sales_feed starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.input, ?args.listing_url, %args.output, "Parsed CLI arguments");

    // ---- Configuration ----
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if args.no_translate {
        config.translate = false;
    }
    config.has_credential = args.api_key().is_some();
    if !config.has_credential {
        warn!("No API key configured; records passing the keyword filter stay unclassified");
    }

    // Early check: ensure output dir is writable
    let output_path = std::path::Path::new(&args.output);
    if let Err(e) = ensure_writable_dir(parent_dir(output_path)).await {
        error!(
            path = %args.output,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let http = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;

    // ---- Load candidates ----
    let candidates = match (&args.input, &args.listing_url) {
        (Some(path), _) => inputs::read_candidates(path).await?,
        (None, Some(url)) => {
            let indexed = prtimes::index_articles(&http, url, !args.all_dates).await?;
            prtimes::attach_article_details(&http, indexed, config.concurrency).await
        }
        (None, None) => return Err("either --input or --listing-url is required".into()),
    };
    info!(count = candidates.len(), "Total records to process");

    // ---- Build pipeline ----
    let chat = ChatClient::new(
        http.clone(),
        &args.api_base,
        args.api_key().unwrap_or_default().to_string(),
        args.model.clone(),
    );
    let pipeline = Pipeline::new(&config, PrTimesClient::new(http), chat)?;

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received; cancelling run");
                cancel.cancel();
            }
        })
    };

    let result = pipeline.run(candidates, &cancel).await;
    ctrl_c.abort();
    let records = match result {
        Ok(records) => records,
        Err(e) => {
            error!(error = %e, "Pipeline did not complete; no output written");
            return Err(e.into());
        }
    };

    // ---- Output ----
    outputs::csv::write_csv_file(&args.output, &records).await?;

    if let Some(json_path) = &args.json_output {
        if let Err(e) = outputs::json::write_json_file(json_path, &records).await {
            error!(path = %json_path, error = %e, "Failed to write JSON report");
        }
    }

    let summary = RunSummary::from_records(&records);
    let elapsed = start_time.elapsed();
    info!(
        total = summary.total,
        suitable = summary.suitable,
        unsuitable = summary.unsuitable,
        unclassified = summary.unclassified,
        missing_profiles = summary.missing_profiles,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
