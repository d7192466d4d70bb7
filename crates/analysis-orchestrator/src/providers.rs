use analysis_core::{
    AnalysisError, FundamentalSnapshot, FundamentalsProvider, PriceBar, PriceHistoryProvider,
    PriceSeries, SwingTimeframe,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::TtlCache;

fn normalize_ticker(ticker: &str) -> Result<String, AnalysisError> {
    let ticker = ticker.trim().to_uppercase();
    let valid = !ticker.is_empty()
        && ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '^')
        && !ticker.contains("..");
    if valid {
        Ok(ticker)
    } else {
        Err(AnalysisError::InvalidData(format!("invalid ticker '{}'", ticker)))
    }
}

/// Reads daily bars from `<dir>/<TICKER>.json` (a JSON array of bars)
pub struct JsonFilePriceProvider {
    dir: PathBuf,
}

impl JsonFilePriceProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl PriceHistoryProvider for JsonFilePriceProvider {
    async fn fetch_history(&self, ticker: &str, timeframe: SwingTimeframe) -> Result<PriceSeries, AnalysisError> {
        let ticker = normalize_ticker(ticker)?;
        let path = self.dir.join(format!("{}.json", ticker));

        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| AnalysisError::Provider(format!("failed to read {}: {}", path.display(), e)))?;

        let bars: Vec<PriceBar> = serde_json::from_str(&raw)
            .map_err(|e| AnalysisError::InvalidData(format!("{}: {}", path.display(), e)))?;

        let series = PriceSeries::new(bars)?.tail(timeframe.history_days());
        tracing::debug!("Loaded {} bars for {} from {}", series.len(), ticker, path.display());
        Ok(series)
    }
}

/// Wraps a price provider with a shared TTL cache keyed by `TICKER:timeframe`
pub struct CachedPriceProvider<P> {
    inner: P,
    cache: Arc<TtlCache<PriceSeries>>,
}

impl<P: PriceHistoryProvider> CachedPriceProvider<P> {
    pub fn new(inner: P, cache: Arc<TtlCache<PriceSeries>>) -> Self {
        Self { inner, cache }
    }

    fn cache_key(ticker: &str, timeframe: SwingTimeframe) -> String {
        format!("{}:{}", ticker.trim().to_uppercase(), timeframe)
    }
}

#[async_trait]
impl<P: PriceHistoryProvider> PriceHistoryProvider for CachedPriceProvider<P> {
    async fn fetch_history(&self, ticker: &str, timeframe: SwingTimeframe) -> Result<PriceSeries, AnalysisError> {
        let key = Self::cache_key(ticker, timeframe);
        if let Some(series) = self.cache.get(&key) {
            tracing::debug!("Cache hit for {}", key);
            return Ok(series);
        }

        let series = self.inner.fetch_history(ticker, timeframe).await?;
        self.cache.insert(key, series.clone());
        Ok(series)
    }
}

/// In-memory fundamentals keyed by upper-case ticker
#[derive(Debug, Clone, Default)]
pub struct StaticFundamentalsProvider {
    snapshots: HashMap<String, FundamentalSnapshot>,
}

impl StaticFundamentalsProvider {
    pub fn new(snapshots: HashMap<String, FundamentalSnapshot>) -> Self {
        let snapshots = snapshots
            .into_iter()
            .map(|(ticker, snap)| (ticker.trim().to_uppercase(), snap))
            .collect();
        Self { snapshots }
    }

    /// Parse a JSON object of `{"TICKER": {"pe_ratio": .., ...}}`
    pub fn from_json_str(raw: &str) -> Result<Self, AnalysisError> {
        let snapshots: HashMap<String, FundamentalSnapshot> = serde_json::from_str(raw)
            .map_err(|e| AnalysisError::InvalidData(format!("fundamentals file: {}", e)))?;
        Ok(Self::new(snapshots))
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[async_trait]
impl FundamentalsProvider for StaticFundamentalsProvider {
    async fn fetch_fundamentals(&self, ticker: &str) -> Result<FundamentalSnapshot, AnalysisError> {
        self.snapshots
            .get(&ticker.trim().to_uppercase())
            .cloned()
            .ok_or_else(|| AnalysisError::MissingFundamentals(ticker.to_string()))
    }
}
