//! CLI entry point for the Sejong apartment classifier.
//!
//! Provides subcommands for collecting listings from Naver Land, classifying
//! complexes into villages and price/size bands, and exporting the rule
//! tables for the report front-end.

mod infra;
mod services;

use crate::infra::naver::NaverLandClient;
use crate::services::collector::collect_region;
use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use sejong_apt::classify::{ClassificationRuleSet, RuleSchema, process, process_sharded};
use sejong_apt::fetch::RetryPolicy;
use sejong_apt::listing::build_listing_rows;
use sejong_apt::output::{
    SchemaFormat, append_record, log_summary, write_listing_csv, write_records, write_rows,
    write_schema, write_summary,
};
use sejong_apt::parser::read_records;
use sejong_apt::stats::CollectionStats;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Sejong special self-governing city.
const SEJONG_CORTAR_NO: &str = "3611000000";

#[derive(Parser)]
#[command(name = "sejong_apt")]
#[command(about = "Collect and classify Sejong apartment listings", long_about = None)]
struct Cli {
    /// Rule table (TOML). Defaults to SEJONG_RULES_PATH, then the built-in tables
    #[arg(long, global = true, value_name = "FILE")]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect complexes and articles for a region from Naver Land
    Collect {
        /// Region code (cortarNo)
        #[arg(long, default_value = SEJONG_CORTAR_NO)]
        region: String,

        /// Directory to write CSV files to
        #[arg(short, long, default_value = "sejong_real_estate_data")]
        output_dir: PathBuf,

        /// Pause after each request, in milliseconds
        #[arg(long, default_value_t = 500)]
        delay_ms: u64,

        /// Attempts per request before giving up
        #[arg(long, default_value_t = 3)]
        max_retries: u32,
    },
    /// Classify complexes and write labeled records plus a summary
    Classify {
        /// Input file (.csv or .json, optionally .gz)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Labeled output (.csv or .json, optionally .gz)
        #[arg(short, long, default_value = "data/sejong_classified.json")]
        output: PathBuf,

        /// Summary JSON
        #[arg(short, long, default_value = "data/sejong_summary.json")]
        summary: PathBuf,

        /// Split the batch across this many threads
        #[arg(long, default_value_t = 1)]
        shards: usize,
    },
    /// Export the rule tables for the report front-end
    ExportSchema {
        /// Output file
        #[arg(short, long, default_value = "apartment_comparison/constants.js")]
        output: PathBuf,

        #[arg(short, long, value_enum, default_value_t = SchemaFormat::Js)]
        format: SchemaFormat,
    },
    /// Validate a rule table and print its shape
    CheckRules,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/sejong_apt.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("sejong_apt.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let rules_path = cli
        .rules
        .or_else(|| std::env::var_os("SEJONG_RULES_PATH").map(PathBuf::from));

    match cli.command {
        Commands::Collect {
            region,
            output_dir,
            delay_ms,
            max_retries,
        } => {
            let rules = load_rules(rules_path.as_deref())?;
            let policy = RetryPolicy {
                max_attempts: max_retries,
                request_delay: Duration::from_millis(delay_ms),
                ..RetryPolicy::default()
            };
            collect(&region, &output_dir, policy, &rules).await?;
        }
        Commands::Classify {
            input,
            output,
            summary,
            shards,
        } => {
            let rules = load_rules(rules_path.as_deref())?;
            classify(&input, &output, &summary, shards, &rules)?;
        }
        Commands::ExportSchema { output, format } => {
            let rules = load_rules(rules_path.as_deref())?;
            let schema = RuleSchema::from_rules(&rules);
            write_schema(&output, &schema, format)?;
            info!(path = %output.display(), ?format, "Rule schema exported");
        }
        Commands::CheckRules => {
            let rules = load_rules(rules_path.as_deref())?;
            info!(
                villages = rules.villages().len(),
                overrides = rules.overrides().len(),
                patterns = rules.patterns().len(),
                price_bands = rules.price_bands().len(),
                size_bands = rules.size_bands().len(),
                size_divisor = rules.size_divisor(),
                fallback = rules.fallback_label(),
                unknown = rules.unknown_label(),
                "Rule table OK"
            );
        }
    }

    Ok(())
}

/// Loads and validates the rule table. An invalid table stops the program.
fn load_rules(path: Option<&Path>) -> Result<ClassificationRuleSet> {
    match path {
        Some(path) => info!(path = %path.display(), "Loading rule table"),
        None => info!("Using built-in rule table"),
    }
    ClassificationRuleSet::load(path).context("invalid rule table")
}

/// Reads listings, classifies them and writes labeled records and summary.
#[tracing::instrument(skip_all, fields(input = %input.display(), output = %output.display()))]
fn classify(
    input: &Path,
    output: &Path,
    summary_path: &Path,
    shards: usize,
    rules: &ClassificationRuleSet,
) -> Result<()> {
    let records = read_records(input)?;
    info!(records = records.len(), "Listings loaded");

    let result = if shards > 1 {
        process_sharded(rules, records, shards)
    } else {
        process(rules, records)
    };

    log_summary(&result.summary);

    write_records(output, &result.records, rules.fields())?;
    write_summary(summary_path, &result.summary)?;

    info!(
        total = result.total_count(),
        output = %output.display(),
        summary = %summary_path.display(),
        "Classification written"
    );
    Ok(())
}

/// Collects a region and writes complexes, articles and the per-complex
/// classifier input under `output_dir`.
#[tracing::instrument(skip_all, fields(region = %region, output_dir = %output_dir.display()))]
async fn collect(
    region: &str,
    output_dir: &Path,
    policy: RetryPolicy,
    rules: &ClassificationRuleSet,
) -> Result<()> {
    let client = NaverLandClient::new(policy)?;
    let collection = collect_region(&client, region).await?;

    if collection.complexes.is_empty() {
        warn!("No complexes collected, nothing to write");
        return Ok(());
    }

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let complexes_file = output_dir.join(format!("sejong_complexes_{timestamp}.csv"));
    let articles_file = output_dir.join(format!("sejong_articles_{timestamp}.csv"));
    let listings_file = output_dir.join(format!("sejong_listings_{timestamp}.csv"));

    write_rows(&complexes_file, &collection.complexes)?;
    write_rows(&articles_file, &collection.articles)?;

    // classifier input; run `classify` on it to add the labels
    let rows = build_listing_rows(&collection.complexes, &collection.articles, rules.fields());
    write_listing_csv(&listings_file, &rows)?;

    let stats = CollectionStats::from_collection(&collection.complexes, &collection.articles)
        .with_region(region)
        .with_failures(collection.failed);

    info!(
        complexes = stats.complexes,
        articles = stats.articles,
        failed = stats.failed_complexes,
        sale_articles = stats.sale_articles,
        sale_price_mean = ?stats.sale_price_mean,
        sale_price_min = ?stats.sale_price_min,
        sale_price_max = ?stats.sale_price_max,
        "Collection finished"
    );
    for (trade_type, count) in &stats.by_trade_type {
        info!(trade_type = %trade_type, count, "Articles by trade type");
    }
    for (complex, count) in CollectionStats::top_complexes(&collection.articles, 10) {
        info!(complex = %complex, count, "Most listed complex");
    }

    let history_file = output_dir.join("collection_history.csv");
    append_record(&history_file.to_string_lossy(), &stats)?;

    info!(
        complexes = %complexes_file.display(),
        articles = %articles_file.display(),
        listings = %listings_file.display(),
        history = %history_file.display(),
        "Files written"
    );
    Ok(())
}
