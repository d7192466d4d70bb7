//! swing-scanner: run the swing-trading analysis over local price files.
//!
//! Reads daily bars from `<data-dir>/<TICKER>.json`, optionally joins a
//! fundamentals map, and prints one JSON outcome per symbol to stdout.
//!
//! Usage:
//!   cargo run -p swing-scanner -- --symbols AAPL MSFT --timeframe short
//!   cargo run -p swing-scanner -- --symbols AAPL --data-dir ./bars --fundamentals fundamentals.json
//!   cargo run -p swing-scanner -- --symbols AAPL --seed 42 --pretty
//!   cargo run -p swing-scanner -- --symbols AAPL --news headlines.json --chart

use analysis_core::SwingTimeframe;
use analysis_orchestrator::{
    CachedPriceProvider, JsonFilePriceProvider, StaticFundamentalsProvider, SwingConfig,
    SwingOrchestrator, TtlCache,
};
use sentiment_analysis::{HeadlineNewsProvider, StaticHeadlineSource};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    symbols: Vec<String>,
    timeframe: Option<String>,
    data_dir: Option<PathBuf>,
    fundamentals: Option<PathBuf>,
    news: Option<PathBuf>,
    seed: Option<u64>,
    chart: bool,
    pretty: bool,
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .filter(|v| !v.starts_with("--"))
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let symbols = match args.iter().position(|a| a == "--symbols") {
        Some(idx) => args[idx + 1..]
            .iter()
            .take_while(|a| !a.starts_with("--"))
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect(),
        None => Vec::new(),
    };

    let seed = flag_value(args, "--seed")
        .map(|v| v.parse::<u64>().with_context(|| format!("Invalid --seed value: {}", v)))
        .transpose()?;

    Ok(CliArgs {
        symbols,
        timeframe: flag_value(args, "--timeframe").cloned(),
        data_dir: flag_value(args, "--data-dir").map(PathBuf::from),
        fundamentals: flag_value(args, "--fundamentals").map(PathBuf::from),
        news: flag_value(args, "--news").map(PathBuf::from),
        seed,
        chart: args.iter().any(|a| a == "--chart"),
        pretty: args.iter().any(|a| a == "--pretty"),
    })
}

fn parse_timeframe(raw: Option<&str>) -> SwingTimeframe {
    match raw {
        None => SwingTimeframe::Short,
        Some(value) => value.parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown timeframe '{}', falling back to short", value);
            SwingTimeframe::Short
        }),
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  swing-scanner --symbols AAPL MSFT ...    Symbols to analyze");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --timeframe short|medium|long   Holding period (default: short)");
    eprintln!("  --data-dir DIR                  Directory of <TICKER>.json bar files (default: $SWING_DATA_DIR or ./data)");
    eprintln!("  --fundamentals FILE             JSON map of ticker -> pe_ratio/earnings_growth/debt_to_equity");
    eprintln!("  --news FILE                     JSON map of ticker -> [{{title, description}}] headlines");
    eprintln!("  --seed N                        Fix the prediction seed");
    eprintln!("  --chart                         Include the per-bar indicator history");
    eprintln!("  --pretty                        Pretty-print the JSON output");
}

fn init_tracing() {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    // stdout carries the JSON results, so logs go to stderr
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let cli = parse_args(&args)?;
    if cli.symbols.is_empty() {
        print_usage();
        std::process::exit(1);
    }

    let mut config = SwingConfig::from_env().context("Failed to load swing configuration")?;
    if let Some(dir) = cli.data_dir.clone() {
        config.data_dir = dir;
    }
    if cli.seed.is_some() {
        config.prediction_seed = cli.seed;
    }
    if cli.chart {
        config.include_chart = true;
    }

    let timeframe = parse_timeframe(cli.timeframe.as_deref());

    tracing::info!(
        "swing-scanner: {} symbols, timeframe={}, data_dir={}, concurrency={}",
        cli.symbols.len(),
        timeframe,
        config.data_dir.display(),
        config.max_concurrency
    );

    let cache = Arc::new(TtlCache::new(config.cache_ttl_secs));
    let prices = CachedPriceProvider::new(JsonFilePriceProvider::new(config.data_dir.clone()), cache);
    let mut orchestrator = SwingOrchestrator::from_config(Arc::new(prices), &config);

    if let Some(path) = &cli.fundamentals {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read fundamentals file {}", path.display()))?;
        let provider = StaticFundamentalsProvider::from_json_str(&raw)
            .with_context(|| format!("Failed to parse fundamentals file {}", path.display()))?;
        tracing::info!("Loaded fundamentals for {} tickers", provider.len());
        orchestrator = orchestrator.with_fundamentals(Arc::new(provider));
    }

    if let Some(path) = &cli.news {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read news file {}", path.display()))?;
        let source = StaticHeadlineSource::from_json_str(&raw)
            .with_context(|| format!("Failed to parse news file {}", path.display()))?;
        tracing::info!("Loaded headlines for {} tickers", source.len());
        orchestrator = orchestrator.with_news(Arc::new(HeadlineNewsProvider::new(source)));
    }

    let outcomes = orchestrator.analyze_batch(&cli.symbols, timeframe).await;

    let output = if cli.pretty {
        serde_json::to_string_pretty(&outcomes)?
    } else {
        serde_json::to_string(&outcomes)?
    };
    println!("{}", output);

    let ok = outcomes.iter().filter(|o| o.is_ok()).count();
    tracing::info!(
        "swing-scanner complete: {} analyzed, {} failed",
        ok,
        outcomes.len() - ok
    );

    Ok(())
}
