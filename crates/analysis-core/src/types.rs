use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::AnalysisError;

/// OHLCV bar data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

/// Daily bars sorted ascending by date, one bar per date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<PriceBar>", into = "Vec<PriceBar>")]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Sorts the bars by date and rejects duplicate dates or non-finite prices.
    pub fn new(mut bars: Vec<PriceBar>) -> Result<Self, AnalysisError> {
        if let Some(bad) = bars.iter().find(|b| {
            !(b.open.is_finite() && b.high.is_finite() && b.low.is_finite() && b.close.is_finite())
        }) {
            return Err(AnalysisError::InvalidData(format!(
                "non-finite price on {}",
                bad.date
            )));
        }

        bars.sort_by_key(|b| b.date);
        if let Some(dup) = bars.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(AnalysisError::InvalidData(format!(
                "duplicate bar for {}",
                dup[0].date
            )));
        }

        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    /// Keep only the most recent `n` bars.
    pub fn tail(&self, n: usize) -> PriceSeries {
        let start = self.bars.len().saturating_sub(n);
        PriceSeries { bars: self.bars[start..].to_vec() }
    }
}

impl TryFrom<Vec<PriceBar>> for PriceSeries {
    type Error = AnalysisError;

    fn try_from(bars: Vec<PriceBar>) -> Result<Self, Self::Error> {
        PriceSeries::new(bars)
    }
}

impl From<PriceSeries> for Vec<PriceBar> {
    fn from(series: PriceSeries) -> Self {
        series.bars
    }
}

/// Directional call emitted by an indicator or by the composite scorer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    Buy,
    Sell,
    Neutral,
}

impl Signal {
    pub fn to_label(&self) -> &'static str {
        match self {
            Signal::Buy => "Buy",
            Signal::Sell => "Sell",
            Signal::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorKind {
    Rsi,
    Macd,
    Atr,
    Ema,
    Bollinger,
    Fibonacci,
    MarketStructure,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 7] = [
        IndicatorKind::Rsi,
        IndicatorKind::Macd,
        IndicatorKind::Atr,
        IndicatorKind::Ema,
        IndicatorKind::Bollinger,
        IndicatorKind::Fibonacci,
        IndicatorKind::MarketStructure,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            IndicatorKind::Rsi => "RSI",
            IndicatorKind::Macd => "MACD",
            IndicatorKind::Atr => "ATR",
            IndicatorKind::Ema => "EMA",
            IndicatorKind::Bollinger => "Bollinger Bands",
            IndicatorKind::Fibonacci => "Fibonacci",
            IndicatorKind::MarketStructure => "Market Structure",
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One Fibonacci retracement level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FibLevel {
    pub ratio: f64,
    pub price: f64,
}

/// Raw indicator readings at the latest bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IndicatorValue {
    Rsi { value: f64 },
    Macd { macd: f64, signal_line: f64, histogram: f64 },
    Atr { value: f64, percent_of_price: f64 },
    Ema {
        /// Fast line of the 9/20/50 alignment, when enabled
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fast: Option<f64>,
        short: f64,
        long: f64,
        price: f64,
    },
    Bollinger { upper: f64, middle: f64, lower: f64, width: f64 },
    Fibonacci { high: f64, low: f64, levels: Vec<FibLevel>, nearest_ratio: f64 },
    MarketStructure { uptrend: bool, downtrend: bool },
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorResult {
    pub name: IndicatorKind,
    pub value: IndicatorValue,
    pub signal: Signal,
    /// 0 to 100
    pub score: f64,
    /// Why the neutral default was used instead of a computed reading
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

impl IndicatorResult {
    pub fn new(name: IndicatorKind, value: IndicatorValue, signal: Signal, score: f64) -> Self {
        Self { name, value, signal, score, fallback: None }
    }

    /// Neutral/50 placeholder used whenever an indicator cannot be computed.
    pub fn neutral_fallback(name: IndicatorKind, reason: impl Into<String>) -> Self {
        Self {
            name,
            value: IndicatorValue::Unavailable,
            signal: Signal::Neutral,
            score: 50.0,
            fallback: Some(reason.into()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

/// The seven indicator readings of one analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub rsi: IndicatorResult,
    pub macd: IndicatorResult,
    pub atr: IndicatorResult,
    pub ema: IndicatorResult,
    pub bollinger: IndicatorResult,
    pub fibonacci: IndicatorResult,
    pub market_structure: IndicatorResult,
}

impl IndicatorSet {
    pub fn get(&self, kind: IndicatorKind) -> &IndicatorResult {
        match kind {
            IndicatorKind::Rsi => &self.rsi,
            IndicatorKind::Macd => &self.macd,
            IndicatorKind::Atr => &self.atr,
            IndicatorKind::Ema => &self.ema,
            IndicatorKind::Bollinger => &self.bollinger,
            IndicatorKind::Fibonacci => &self.fibonacci,
            IndicatorKind::MarketStructure => &self.market_structure,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndicatorResult> {
        IndicatorKind::ALL.into_iter().map(move |k| self.get(k))
    }
}

/// Company ratios supplied by the fundamentals collaborator. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalSnapshot {
    pub pe_ratio: Option<f64>,
    /// Year-over-year earnings growth as a fraction (0.12 = 12%)
    pub earnings_growth: Option<f64>,
    pub debt_to_equity: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldStatus {
    Good,
    Bad,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldAssessment {
    pub value: Option<f64>,
    pub status: FieldStatus,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalAssessment {
    pub pe_ratio: FieldAssessment,
    pub earnings_growth: FieldAssessment,
    pub debt_to_equity: FieldAssessment,
    pub fa_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub ta_score: f64,
    pub fa_score: f64,
    pub news_score: f64,
    pub combined_score: f64,
    pub combined_signal: Signal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanSide {
    Long,
    Short,
}

/// Classic floor-trader pivot levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotPoints {
    pub pivot: f64,
    pub support1: f64,
    pub support2: f64,
    pub support3: f64,
    pub resistance1: f64,
    pub resistance2: f64,
    pub resistance3: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingPlan {
    pub side: PlanSide,
    pub entry: f64,
    /// Volatility unit the stop/target distances are measured in
    pub atr: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub risk_reward: f64,
    pub pivots: PivotPoints,
    /// Signed % distance of each pivot level from the entry price
    pub pivot_distance_pct: PivotPoints,
    /// Lowest low of the recent window, if there are enough bars
    pub support: Option<f64>,
    /// Highest high of the recent window, if there are enough bars
    pub resistance: Option<f64>,
}

/// One bar of the chart history with the indicator lines at that bar.
/// Lines are `None` until their look-back is filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub atr: Option<f64>,
    pub ema_fast: Option<f64>,
    pub ema_short: Option<f64>,
    pub ema_long: Option<f64>,
}

/// Synthetic random-walk projection. Not a forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSeries {
    pub dates: Vec<NaiveDate>,
    pub prices: Vec<f64>,
    pub seed: u64,
    pub synthetic: bool,
    pub note: String,
}

impl PredictionSeries {
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Holding-period bucket of a swing trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwingTimeframe {
    Short,
    Medium,
    Long,
}

impl SwingTimeframe {
    /// Number of business days projected forward
    pub fn horizon_days(&self) -> usize {
        match self {
            SwingTimeframe::Short => 5,
            SwingTimeframe::Medium => 14,
            SwingTimeframe::Long => 30,
        }
    }

    /// Largest per-step move the projection may take
    pub fn max_change_pct(&self) -> f64 {
        match self {
            SwingTimeframe::Short => 0.05,
            SwingTimeframe::Medium => 0.10,
            SwingTimeframe::Long => 0.15,
        }
    }

    /// Trading days of history a provider should keep, i.e. the number of
    /// most recent daily bars (not calendar days)
    pub fn history_days(&self) -> usize {
        match self {
            SwingTimeframe::Short => 60,
            SwingTimeframe::Medium => 120,
            SwingTimeframe::Long => 250,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SwingTimeframe::Short => "short",
            SwingTimeframe::Medium => "medium",
            SwingTimeframe::Long => "long",
        }
    }
}

impl fmt::Display for SwingTimeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SwingTimeframe {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "short" | "short-term" => Ok(SwingTimeframe::Short),
            "medium" | "medium-term" => Ok(SwingTimeframe::Medium),
            "long" | "long-term" => Ok(SwingTimeframe::Long),
            other => Err(AnalysisError::InvalidData(format!("unknown timeframe '{}'", other))),
        }
    }
}

/// Full swing-trading analysis of one ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub ticker: String,
    pub timeframe: SwingTimeframe,
    /// Date of the latest bar the analysis saw
    pub as_of: NaiveDate,
    pub current_price: f64,
    pub indicators: IndicatorSet,
    pub technical_score: f64,
    pub fundamentals: FundamentalAssessment,
    pub composite: CompositeScore,
    pub trading_plan: TradingPlan,
    pub prediction: PredictionSeries,
    /// Per-bar indicator history, only filled when requested
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chart: Vec<ChartPoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Per-ticker batch entry: a full analysis or `{ticker, error}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TickerOutcome {
    Analysis(Box<AnalysisResult>),
    Failed { ticker: String, error: String },
}

impl TickerOutcome {
    pub fn failed(ticker: impl Into<String>, error: &AnalysisError) -> Self {
        TickerOutcome::Failed { ticker: ticker.into(), error: error.to_string() }
    }

    pub fn ticker(&self) -> &str {
        match self {
            TickerOutcome::Analysis(result) => &result.ticker,
            TickerOutcome::Failed { ticker, .. } => ticker,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, TickerOutcome::Analysis(_))
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        match self {
            TickerOutcome::Analysis(result) => Some(result),
            TickerOutcome::Failed { .. } => None,
        }
    }
}
