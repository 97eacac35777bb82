//! Command-line interface definitions for the PR TIMES sales feed.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Credentials and model selection can also come from environment variables.

use clap::Parser;

use crate::api::{DEFAULT_API_BASE, DEFAULT_MODEL};

/// Command-line arguments for the PR TIMES sales feed.
///
/// Candidates come either from a raw CSV export (`--input`) or straight from
/// a PR TIMES listing page (`--listing-url`). Without an API key every record
/// that passes the keyword filter is left unclassified.
///
/// # Examples
///
/// ```sh
/// # Classify a raw export
/// prtimes_sales_feed -i raw.csv -o final.csv
///
/// # Scrape today's beauty releases and also write JSON
/// prtimes_sales_feed --listing-url https://prtimes.jp/beauty/ -o final.csv -j final.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Raw CSV of press releases to process
    #[arg(short, long, required_unless_present = "listing_url", conflicts_with = "listing_url")]
    pub input: Option<String>,

    /// PR TIMES listing page to scrape instead of reading a CSV
    #[arg(long)]
    pub listing_url: Option<String>,

    /// Keep every release on the listing page, not only today's
    #[arg(long, requires = "listing_url")]
    pub all_dates: bool,

    /// Path of the CSV to write
    #[arg(short, long)]
    pub output: String,

    /// Optional path of a JSON report to write alongside the CSV
    #[arg(short, long)]
    pub json_output: Option<String>,

    /// Optional path to config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// OpenAI-compatible API key; classification is skipped without one
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Chat model used for classification and translation
    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Base URL of the chat completions API
    #[arg(long, default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Override the configured number of records processed at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Skip translating titles, company names and release metadata
    #[arg(long)]
    pub no_translate: bool,
}

impl Cli {
    /// The API key, if one was given and is not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.openai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}
