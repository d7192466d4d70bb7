use analysis_core::{
    AnalysisError, AnalysisResult, FundamentalSnapshot, FundamentalsProvider, NewsSentimentProvider,
    PriceHistoryProvider, PriceSeries, SwingTimeframe, TickerOutcome,
};
use fundamental_analysis::FundamentalAnalysisEngine;
use rayon::prelude::*;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use technical_analysis::TechnicalAnalysisEngine;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub mod cache;
pub mod composite;
pub mod config;
pub mod prediction;
pub mod providers;
pub mod trading_plan;

#[cfg(test)]
mod tests;

pub use cache::TtlCache;
pub use composite::CompositeScorer;
pub use config::{SignalThresholds, SwingConfig};
pub use prediction::{generate_prediction, next_business_days};
pub use providers::{CachedPriceProvider, JsonFilePriceProvider, StaticFundamentalsProvider};
pub use trading_plan::{build_trading_plan, pivot_points, SUPPORT_RESISTANCE_WINDOW};

/// Pure swing-trading pipeline over already-fetched data
#[derive(Default)]
pub struct SwingAnalyzer {
    technical_analyzer: TechnicalAnalysisEngine,
    fundamental_analyzer: FundamentalAnalysisEngine,
    composite: CompositeScorer,
    /// Fixed prediction seed; a fresh one is drawn per ticker when unset
    prediction_seed: Option<u64>,
    include_chart: bool,
}

impl SwingAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SwingConfig) -> Self {
        Self {
            composite: CompositeScorer::new(config.thresholds),
            prediction_seed: config.prediction_seed,
            include_chart: config.include_chart,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.prediction_seed = seed;
        self
    }

    /// Attach the per-bar indicator history to each result
    pub fn with_chart(mut self, include_chart: bool) -> Self {
        self.include_chart = include_chart;
        self
    }

    pub fn with_technical_engine(mut self, engine: TechnicalAnalysisEngine) -> Self {
        self.technical_analyzer = engine;
        self
    }

    pub fn thresholds(&self) -> &SignalThresholds {
        self.composite.thresholds()
    }

    /// Run the full pipeline for one ticker.
    ///
    /// Indicator failures never abort the run; they become neutral readings
    /// and are listed in `warnings`. Only an empty series or an unusable
    /// latest close is an error.
    pub fn analyze(
        &self,
        ticker: &str,
        timeframe: SwingTimeframe,
        series: &PriceSeries,
        fundamentals: Option<&FundamentalSnapshot>,
        news_score: Option<f64>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let latest = series
            .last()
            .ok_or_else(|| AnalysisError::EmptySeries(ticker.to_string()))?;
        let current_price = latest.close;
        if !current_price.is_finite() || current_price <= 0.0 {
            return Err(AnalysisError::InvalidData(format!(
                "latest close for {} is {}",
                ticker, current_price
            )));
        }

        tracing::info!(
            "Starting swing analysis for {} (timeframe: {}, bars: {})",
            ticker,
            timeframe,
            series.len()
        );

        let technical = self.technical_analyzer.analyze(series);
        let mut warnings = technical.fallbacks.clone();

        let fundamentals = self.fundamental_analyzer.analyze(fundamentals);
        let composite = self
            .composite
            .score(technical.ta_score, fundamentals.fa_score, news_score);

        let (trading_plan, plan_warning) = build_trading_plan(
            composite.combined_signal,
            current_price,
            technical.atr_value,
            series.bars(),
        )?;
        warnings.extend(plan_warning);

        let seed = self.prediction_seed.unwrap_or_else(rand::random);
        let prediction = generate_prediction(
            current_price,
            composite.combined_score,
            timeframe,
            latest.date,
            seed,
        )?;

        let chart = if self.include_chart {
            self.technical_analyzer.chart(series)
        } else {
            Vec::new()
        };

        tracing::info!(
            "Finished {}: ta={:.1} fa={:.1} news={:.1} combined={:.1} -> {}",
            ticker,
            composite.ta_score,
            composite.fa_score,
            composite.news_score,
            composite.combined_score,
            composite.combined_signal
        );

        Ok(AnalysisResult {
            ticker: ticker.to_string(),
            timeframe,
            as_of: latest.date,
            current_price,
            technical_score: technical.ta_score,
            indicators: technical.indicators,
            fundamentals,
            composite,
            trading_plan,
            prediction,
            chart,
            warnings,
        })
    }

    /// Like [`analyze`](Self::analyze) but folds errors into `{ticker, error}`
    pub fn analyze_outcome(
        &self,
        ticker: &str,
        timeframe: SwingTimeframe,
        series: &PriceSeries,
        fundamentals: Option<&FundamentalSnapshot>,
        news_score: Option<f64>,
    ) -> TickerOutcome {
        match self.analyze(ticker, timeframe, series, fundamentals, news_score) {
            Ok(result) => TickerOutcome::Analysis(Box::new(result)),
            Err(e) => {
                tracing::warn!("Failed to analyze {}: {}", ticker, e);
                TickerOutcome::failed(ticker, &e)
            }
        }
    }

    /// Analyze many tickers on the rayon pool. Output order matches `tickers`.
    pub fn analyze_batch<S, F>(
        &self,
        tickers: &[S],
        timeframe: SwingTimeframe,
        series_provider: F,
    ) -> Vec<TickerOutcome>
    where
        S: AsRef<str> + Sync,
        F: Fn(&str, SwingTimeframe) -> Result<PriceSeries, AnalysisError> + Sync,
    {
        tickers
            .par_iter()
            .map(|ticker| {
                let ticker = ticker.as_ref();
                match series_provider(ticker, timeframe) {
                    Ok(series) => self.analyze_outcome(ticker, timeframe, &series, None, None),
                    Err(e) => {
                        tracing::warn!("No price history for {}: {}", ticker, e);
                        TickerOutcome::failed(ticker, &e)
                    }
                }
            })
            .collect()
    }
}

/// Fetches inputs from the injected collaborators and runs [`SwingAnalyzer`]
#[derive(Clone)]
pub struct SwingOrchestrator {
    prices: Arc<dyn PriceHistoryProvider>,
    fundamentals: Option<Arc<dyn FundamentalsProvider>>,
    news: Option<Arc<dyn NewsSentimentProvider>>,
    analyzer: Arc<SwingAnalyzer>,
    fetch_timeout: Duration,
    max_concurrency: usize,
}

impl SwingOrchestrator {
    pub fn new(prices: Arc<dyn PriceHistoryProvider>, analyzer: SwingAnalyzer) -> Self {
        let defaults = SwingConfig::default();
        Self {
            prices,
            fundamentals: None,
            news: None,
            analyzer: Arc::new(analyzer),
            fetch_timeout: Duration::from_secs(defaults.fetch_timeout_secs),
            max_concurrency: defaults.max_concurrency,
        }
    }

    pub fn from_config(prices: Arc<dyn PriceHistoryProvider>, config: &SwingConfig) -> Self {
        Self::new(prices, SwingAnalyzer::from_config(config))
            .with_fetch_timeout(Duration::from_secs(config.fetch_timeout_secs))
            .with_max_concurrency(config.max_concurrency)
    }

    pub fn with_fundamentals(mut self, provider: Arc<dyn FundamentalsProvider>) -> Self {
        self.fundamentals = Some(provider);
        self
    }

    pub fn with_news(mut self, provider: Arc<dyn NewsSentimentProvider>) -> Self {
        self.news = Some(provider);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn analyzer(&self) -> &SwingAnalyzer {
        &self.analyzer
    }

    async fn bounded<T, Fut>(&self, what: String, fut: Fut) -> Result<T, AnalysisError>
    where
        Fut: Future<Output = Result<T, AnalysisError>>,
    {
        match tokio::time::timeout(self.fetch_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AnalysisError::Timeout(self.fetch_timeout.as_secs(), what)),
        }
    }

    async fn fetch_fundamentals(&self, ticker: &str) -> Option<Result<FundamentalSnapshot, AnalysisError>> {
        let provider = self.fundamentals.as_ref()?;
        Some(
            self.bounded(format!("fundamentals for {}", ticker), provider.fetch_fundamentals(ticker))
                .await,
        )
    }

    async fn fetch_news(&self, ticker: &str) -> Option<Result<f64, AnalysisError>> {
        let provider = self.news.as_ref()?;
        Some(
            self.bounded(format!("news for {}", ticker), provider.news_score(ticker))
                .await,
        )
    }

    /// Fetch prices, fundamentals and news concurrently and analyze one ticker.
    ///
    /// A failed or timed-out price fetch fails the ticker. Fundamentals and
    /// news failures only degrade those inputs to neutral.
    pub async fn analyze_ticker(&self, ticker: &str, timeframe: SwingTimeframe) -> TickerOutcome {
        let (prices, fundamentals, news) = tokio::join!(
            self.bounded(
                format!("price history for {}", ticker),
                self.prices.fetch_history(ticker, timeframe)
            ),
            self.fetch_fundamentals(ticker),
            self.fetch_news(ticker),
        );

        let series = match prices {
            Ok(series) => series,
            Err(e) => {
                tracing::warn!("Price fetch failed for {}: {}", ticker, e);
                return TickerOutcome::failed(ticker, &e);
            }
        };

        let mut degraded = Vec::new();

        let fundamentals = match fundamentals {
            Some(Ok(snapshot)) => Some(snapshot),
            Some(Err(e)) => {
                tracing::warn!("Fundamentals unavailable for {}: {}", ticker, e);
                degraded.push(format!("Fundamentals unavailable, scored neutral: {}", e));
                None
            }
            None => None,
        };

        let news_score = match news {
            Some(Ok(score)) => Some(score),
            Some(Err(e)) => {
                tracing::warn!("News score unavailable for {}: {}", ticker, e);
                degraded.push(format!("News unavailable, scored neutral: {}", e));
                None
            }
            None => None,
        };

        match self
            .analyzer
            .analyze(ticker, timeframe, &series, fundamentals.as_ref(), news_score)
        {
            Ok(mut result) => {
                result.warnings.extend(degraded);
                TickerOutcome::Analysis(Box::new(result))
            }
            Err(e) => {
                tracing::warn!("Failed to analyze {}: {}", ticker, e);
                TickerOutcome::failed(ticker, &e)
            }
        }
    }

    /// Analyze all tickers with at most `max_concurrency` in flight.
    /// Output order matches `tickers`; a panicking task fails only its ticker.
    pub async fn analyze_batch(&self, tickers: &[String], timeframe: SwingTimeframe) -> Vec<TickerOutcome> {
        tracing::info!(
            "Starting batch of {} tickers (timeframe: {}, concurrency: {})",
            tickers.len(),
            timeframe,
            self.max_concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for (index, ticker) in tickers.iter().enumerate() {
            let orchestrator = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let ticker = ticker.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = orchestrator.analyze_ticker(&ticker, timeframe).await;
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<TickerOutcome>> = vec![None; tickers.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => tracing::error!("Analysis task error: {}", e),
            }
        }

        let outcomes: Vec<TickerOutcome> = slots
            .into_iter()
            .zip(tickers)
            .map(|(slot, ticker)| {
                slot.unwrap_or_else(|| TickerOutcome::Failed {
                    ticker: ticker.clone(),
                    error: "analysis task panicked".to_string(),
                })
            })
            .collect();

        let ok = outcomes.iter().filter(|o| o.is_ok()).count();
        tracing::info!("Batch complete: {}/{} tickers analyzed", ok, outcomes.len());
        outcomes
    }
}
