use async_trait::async_trait;
use crate::{AnalysisError, FundamentalSnapshot, PriceSeries, SwingTimeframe};

/// Source of OHLCV history for a ticker
#[async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    async fn fetch_history(&self, ticker: &str, timeframe: SwingTimeframe) -> Result<PriceSeries, AnalysisError>;
}

/// Source of valuation/balance-sheet ratios
#[async_trait]
pub trait FundamentalsProvider: Send + Sync {
    async fn fetch_fundamentals(&self, ticker: &str) -> Result<FundamentalSnapshot, AnalysisError>;
}

/// Source of a news-sentiment score in [0, 100] (50 = neutral)
#[async_trait]
pub trait NewsSentimentProvider: Send + Sync {
    async fn news_score(&self, ticker: &str) -> Result<f64, AnalysisError>;
}
