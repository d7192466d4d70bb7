use crate::*;
use analysis_core::{PlanSide, PriceBar, Signal};
use async_trait::async_trait;
use chrono::NaiveDate;
use sentiment_analysis::{HeadlineNewsProvider, StaticHeadlineSource};
use std::collections::HashMap;

/// Bars compounding `daily_pct` per day, each with a +/-1% intraday range.
fn trend_series(n: usize, start: f64, daily_pct: f64) -> PriceSeries {
    let first = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut bars = Vec::with_capacity(n);
    let mut close = start;
    for i in 0..n {
        let open = close;
        close = if i == 0 { start } else { close * (1.0 + daily_pct) };
        bars.push(PriceBar {
            date: first + chrono::Duration::days(i as i64),
            open,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 250_000.0,
        });
    }
    PriceSeries::new(bars).unwrap()
}

fn expect_analysis(outcome: &TickerOutcome) -> &AnalysisResult {
    match outcome.analysis() {
        Some(result) => result,
        None => panic!("expected analysis, got {:?}", outcome),
    }
}

fn expect_error(outcome: &TickerOutcome) -> &str {
    match outcome {
        TickerOutcome::Failed { error, .. } => error,
        other => panic!("expected failure, got {:?}", other),
    }
}

#[test]
fn test_rising_series_is_buy() {
    let analyzer = SwingAnalyzer::new().with_seed(Some(11));
    let series = trend_series(100, 100.0, 0.005);

    let result = analyzer
        .analyze("ACME", SwingTimeframe::Short, &series, None, None)
        .unwrap();

    assert!(result.technical_score > 60.0, "ta {}", result.technical_score);
    assert_eq!(result.composite.combined_signal, Signal::Buy);
    assert_eq!(result.composite.fa_score, 50.0);
    assert_eq!(result.composite.news_score, 50.0);
    assert_eq!(result.prediction.len(), 5);
    assert_eq!(result.as_of, series.last().unwrap().date);
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);

    let plan = &result.trading_plan;
    assert_eq!(plan.side, PlanSide::Long);
    assert!(plan.stop_loss < plan.entry && plan.entry < plan.take_profit);
    assert_eq!(plan.entry, result.current_price);
}

#[test]
fn test_prediction_length_follows_timeframe() {
    let analyzer = SwingAnalyzer::new().with_seed(Some(3));
    let series = trend_series(260, 40.0, 0.002);

    for (tf, n) in [
        (SwingTimeframe::Short, 5),
        (SwingTimeframe::Medium, 14),
        (SwingTimeframe::Long, 30),
    ] {
        let result = analyzer.analyze("ACME", tf, &series, None, None).unwrap();
        assert_eq!(result.prediction.len(), n);
        assert!(result.prediction.dates[0] > result.as_of);
    }
}

#[test]
fn test_fixed_seed_is_reproducible() {
    let analyzer = SwingAnalyzer::new().with_seed(Some(2024));
    let series = trend_series(120, 75.0, 0.003);

    let a = analyzer.analyze("ACME", SwingTimeframe::Medium, &series, None, Some(62.0)).unwrap();
    let b = analyzer.analyze("ACME", SwingTimeframe::Medium, &series, None, Some(62.0)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_drawn_seed_is_reported() {
    let series = trend_series(120, 75.0, 0.003);
    let first = SwingAnalyzer::new()
        .analyze("ACME", SwingTimeframe::Short, &series, None, None)
        .unwrap();

    let replay = SwingAnalyzer::new()
        .with_seed(Some(first.prediction.seed))
        .analyze("ACME", SwingTimeframe::Short, &series, None, None)
        .unwrap();
    assert_eq!(first.prediction, replay.prediction);
}

#[test]
fn test_fundamentals_and_news_feed_composite() {
    let analyzer = SwingAnalyzer::new().with_seed(Some(5));
    let series = trend_series(100, 100.0, 0.005);
    let strong = FundamentalSnapshot {
        pe_ratio: Some(12.0),
        earnings_growth: Some(0.3),
        debt_to_equity: Some(0.2),
    };

    let base = analyzer.analyze("ACME", SwingTimeframe::Short, &series, None, None).unwrap();
    let boosted = analyzer
        .analyze("ACME", SwingTimeframe::Short, &series, Some(&strong), Some(90.0))
        .unwrap();

    assert_eq!(boosted.composite.fa_score, 80.0);
    // 0.15 * 30 + 0.05 * 40
    let delta = boosted.composite.combined_score - base.composite.combined_score;
    assert!((delta - 6.5).abs() < 1e-9);
}

#[test]
fn test_short_history_degrades_with_warnings() {
    let analyzer = SwingAnalyzer::new().with_seed(Some(1));
    let series = trend_series(10, 20.0, 0.01);

    let result = analyzer.analyze("TINY", SwingTimeframe::Short, &series, None, None).unwrap();
    // five indicator fallbacks plus the ATR-less trading plan
    assert_eq!(result.warnings.len(), 6, "{:?}", result.warnings);
    assert!((result.trading_plan.atr - result.current_price * 0.02).abs() < 1e-9);
    assert!((0.0..=100.0).contains(&result.composite.combined_score));
}

#[test]
fn test_chart_history_is_opt_in() {
    let series = trend_series(100, 100.0, 0.005);

    let plain = SwingAnalyzer::new()
        .with_seed(Some(8))
        .analyze("ACME", SwingTimeframe::Short, &series, None, None)
        .unwrap();
    assert!(plain.chart.is_empty());
    let json = serde_json::to_value(&plain).unwrap();
    assert!(json.get("chart").is_none());

    let charted = SwingAnalyzer::new()
        .with_seed(Some(8))
        .with_chart(true)
        .analyze("ACME", SwingTimeframe::Short, &series, None, None)
        .unwrap();
    assert_eq!(charted.chart.len(), series.len());
    let last = charted.chart.last().unwrap();
    assert_eq!(last.date, charted.as_of);
    assert_eq!(last.close, charted.current_price);
    assert_eq!(last.atr, Some(charted.trading_plan.atr));
    assert!(last.rsi.is_some() && last.macd_signal.is_some() && last.ema_fast.is_some());
}

#[test]
fn test_plan_carries_recent_support_and_resistance() {
    let series = trend_series(100, 100.0, 0.005);
    let result = SwingAnalyzer::new()
        .with_seed(Some(2))
        .analyze("ACME", SwingTimeframe::Short, &series, None, None)
        .unwrap();

    let recent = &series.bars()[series.len() - SUPPORT_RESISTANCE_WINDOW..];
    let plan = &result.trading_plan;
    assert_eq!(plan.support, Some(recent[0].low));
    assert_eq!(plan.resistance, Some(recent[SUPPORT_RESISTANCE_WINDOW - 1].high));
    assert!(plan.support < Some(plan.entry) && Some(plan.entry) < plan.resistance);

    let short = trend_series(6, 100.0, 0.005);
    let result = SwingAnalyzer::new()
        .analyze("TINY", SwingTimeframe::Short, &short, None, None)
        .unwrap();
    assert!(result.trading_plan.support.is_none());
}

#[test]
fn test_empty_series_fails() {
    let analyzer = SwingAnalyzer::new();
    let empty = PriceSeries::default();

    assert_eq!(
        analyzer.analyze("NONE", SwingTimeframe::Short, &empty, None, None),
        Err(AnalysisError::EmptySeries("NONE".to_string()))
    );

    let outcome = analyzer.analyze_outcome("NONE", SwingTimeframe::Short, &empty, None, None);
    assert_eq!(outcome.ticker(), "NONE");
    assert!(expect_error(&outcome).contains("No price data"));
}

#[test]
fn test_sync_batch_preserves_order() {
    let analyzer = SwingAnalyzer::new().with_seed(Some(9));
    let tickers = ["AAA", "EMPTY", "CCC", "BROKEN", "EEE"];

    let outcomes = analyzer.analyze_batch(&tickers, SwingTimeframe::Short, |ticker, _| match ticker {
        "EMPTY" => Ok(PriceSeries::default()),
        "BROKEN" => Err(AnalysisError::Provider("feed down".to_string())),
        _ => Ok(trend_series(80, 50.0, 0.004)),
    });

    let order: Vec<&str> = outcomes.iter().map(|o| o.ticker()).collect();
    assert_eq!(order, tickers.to_vec());
    assert!(outcomes[0].is_ok());
    assert!(expect_error(&outcomes[1]).contains("EMPTY"));
    assert!(outcomes[2].is_ok());
    assert!(expect_error(&outcomes[3]).contains("feed down"));
    assert!(outcomes[4].is_ok());
}

#[test]
fn test_failed_outcome_serializes_flat() {
    let outcome = TickerOutcome::failed("XYZ", &AnalysisError::EmptySeries("XYZ".to_string()));
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["ticker"], "XYZ");
    assert_eq!(json["error"], "No price data available for XYZ");
}

#[test]
fn test_result_serializes_for_callers() {
    let analyzer = SwingAnalyzer::new().with_seed(Some(4));
    let outcome = analyzer.analyze_outcome(
        "ACME",
        SwingTimeframe::Short,
        &trend_series(100, 100.0, 0.005),
        None,
        None,
    );
    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["ticker"], "ACME");
    assert_eq!(json["timeframe"], "short");
    assert_eq!(json["composite"]["combined_signal"], "Buy");
    assert_eq!(json["prediction"]["synthetic"], true);
}

// ---------------------------------------------------------------------------
// Async orchestrator
// ---------------------------------------------------------------------------

struct MapPriceProvider {
    series: HashMap<String, PriceSeries>,
}

#[async_trait]
impl PriceHistoryProvider for MapPriceProvider {
    async fn fetch_history(&self, ticker: &str, _timeframe: SwingTimeframe) -> Result<PriceSeries, AnalysisError> {
        match ticker {
            "SLOW" => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(trend_series(80, 10.0, 0.01))
            }
            "PANIC" => panic!("provider blew up"),
            _ => self
                .series
                .get(ticker)
                .cloned()
                .ok_or_else(|| AnalysisError::Provider(format!("unknown ticker {}", ticker))),
        }
    }
}

struct FailingFundamentals;

#[async_trait]
impl FundamentalsProvider for FailingFundamentals {
    async fn fetch_fundamentals(&self, ticker: &str) -> Result<FundamentalSnapshot, AnalysisError> {
        Err(AnalysisError::MissingFundamentals(ticker.to_string()))
    }
}

struct FixedNews(f64);

#[async_trait]
impl NewsSentimentProvider for FixedNews {
    async fn news_score(&self, _ticker: &str) -> Result<f64, AnalysisError> {
        Ok(self.0)
    }
}

fn orchestrator() -> SwingOrchestrator {
    let mut series = HashMap::new();
    for (ticker, pct) in [("UP", 0.005), ("DOWN", -0.004), ("FLATISH", 0.0005)] {
        series.insert(ticker.to_string(), trend_series(120, 60.0, pct));
    }
    series.insert("EMPTY".to_string(), PriceSeries::default());

    SwingOrchestrator::new(
        Arc::new(MapPriceProvider { series }),
        SwingAnalyzer::new().with_seed(Some(17)),
    )
    .with_fetch_timeout(Duration::from_millis(200))
    .with_max_concurrency(2)
}

fn tickers(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_async_batch_preserves_order() {
    let input = tickers(&["UP", "EMPTY", "DOWN", "MISSING", "FLATISH"]);
    let outcomes = orchestrator().analyze_batch(&input, SwingTimeframe::Short).await;

    let order: Vec<&str> = outcomes.iter().map(|o| o.ticker()).collect();
    assert_eq!(order, vec!["UP", "EMPTY", "DOWN", "MISSING", "FLATISH"]);
    assert!(outcomes[0].is_ok());
    assert!(expect_error(&outcomes[1]).contains("No price data"));
    assert!(outcomes[2].is_ok());
    assert!(expect_error(&outcomes[3]).contains("unknown ticker"));
    assert!(outcomes[4].is_ok());
}

#[tokio::test]
async fn test_slow_provider_times_out_alone() {
    let input = tickers(&["UP", "SLOW", "DOWN"]);
    let outcomes = orchestrator().analyze_batch(&input, SwingTimeframe::Short).await;

    assert!(outcomes[0].is_ok());
    assert!(expect_error(&outcomes[1]).contains("Timed out"));
    assert!(outcomes[2].is_ok());
}

#[tokio::test]
async fn test_panicking_task_fails_its_ticker() {
    let input = tickers(&["UP", "PANIC", "DOWN"]);
    let outcomes = orchestrator().analyze_batch(&input, SwingTimeframe::Short).await;

    assert!(outcomes[0].is_ok());
    assert_eq!(outcomes[1].ticker(), "PANIC");
    assert!(expect_error(&outcomes[1]).contains("panicked"));
    assert!(outcomes[2].is_ok());
}

#[tokio::test]
async fn test_degraded_collaborators_become_warnings() {
    let orchestrator = orchestrator()
        .with_fundamentals(Arc::new(FailingFundamentals))
        .with_news(Arc::new(FixedNews(100.0)));

    let outcome = orchestrator.analyze_ticker("UP", SwingTimeframe::Short).await;
    let result = expect_analysis(&outcome);

    assert_eq!(result.composite.fa_score, 50.0);
    assert_eq!(result.composite.news_score, 100.0);
    assert!(result.warnings.iter().any(|w| w.starts_with("Fundamentals unavailable")));
}

#[tokio::test]
async fn test_async_matches_sync_pipeline() {
    let series = trend_series(120, 60.0, 0.005);
    let sync = SwingAnalyzer::new()
        .with_seed(Some(17))
        .analyze("UP", SwingTimeframe::Medium, &series, None, None)
        .unwrap();

    let outcome = orchestrator().analyze_ticker("UP", SwingTimeframe::Medium).await;
    assert_eq!(expect_analysis(&outcome), &sync);
}

#[tokio::test]
async fn test_cached_provider_in_orchestrator() {
    let dir = tempfile::tempdir().unwrap();
    let bars: Vec<PriceBar> = trend_series(90, 30.0, 0.004).into();
    std::fs::write(dir.path().join("FILE.json"), serde_json::to_string(&bars).unwrap()).unwrap();

    let cache = Arc::new(TtlCache::new(300));
    let provider = CachedPriceProvider::new(JsonFilePriceProvider::new(dir.path()), cache.clone());
    let orchestrator = SwingOrchestrator::from_config(Arc::new(provider), &SwingConfig::default());

    let outcomes = orchestrator
        .analyze_batch(&tickers(&["FILE", "FILE"]), SwingTimeframe::Short)
        .await;
    assert!(outcomes.iter().all(|o| o.is_ok()));
    assert_eq!(expect_analysis(&outcomes[0]).current_price, bars[89].close);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_headline_news_feeds_composite() {
    let news = StaticHeadlineSource::from_json_str(
        r#"{"UP": [{"title": "Shares surge after record profit, analysts upgrade"}]}"#,
    )
    .unwrap();
    let orchestrator = orchestrator().with_news(Arc::new(HeadlineNewsProvider::new(news)));

    let outcomes = orchestrator
        .analyze_batch(&tickers(&["UP", "DOWN"]), SwingTimeframe::Short)
        .await;
    assert!(expect_analysis(&outcomes[0]).composite.news_score > 75.0);
    // no headlines for DOWN scores neutral
    assert_eq!(expect_analysis(&outcomes[1]).composite.news_score, 50.0);
    assert!(expect_analysis(&outcomes[1]).warnings.iter().all(|w| !w.starts_with("News")));
}
