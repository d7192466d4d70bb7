use analysis_core::{ChartPoint, IndicatorKind, IndicatorSet, PriceSeries};
use serde::{Deserialize, Serialize};

use crate::chart::chart_series;
use crate::signals::*;

/// Share of each indicator in the overall technical score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorWeights {
    pub rsi: f64,
    pub macd: f64,
    pub atr: f64,
    pub ema: f64,
    pub fibonacci: f64,
    pub bollinger: f64,
    pub market_structure: f64,
}

impl Default for IndicatorWeights {
    fn default() -> Self {
        Self {
            rsi: 0.15,
            macd: 0.20,
            atr: 0.05,
            ema: 0.25,
            fibonacci: 0.10,
            bollinger: 0.10,
            market_structure: 0.15,
        }
    }
}

impl IndicatorWeights {
    pub fn weight(&self, kind: IndicatorKind) -> f64 {
        match kind {
            IndicatorKind::Rsi => self.rsi,
            IndicatorKind::Macd => self.macd,
            IndicatorKind::Atr => self.atr,
            IndicatorKind::Ema => self.ema,
            IndicatorKind::Fibonacci => self.fibonacci,
            IndicatorKind::Bollinger => self.bollinger,
            IndicatorKind::MarketStructure => self.market_structure,
        }
    }

    pub fn total(&self) -> f64 {
        IndicatorKind::ALL.iter().map(|k| self.weight(*k)).sum()
    }

    /// Weighted sum of the indicator scores, 0 to 100
    pub fn combine(&self, indicators: &IndicatorSet) -> f64 {
        let score: f64 = indicators
            .iter()
            .map(|result| self.weight(result.name) * result.score)
            .sum();
        score.clamp(0.0, 100.0)
    }
}

/// Output of the technical stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSummary {
    pub indicators: IndicatorSet,
    pub ta_score: f64,
    /// Latest ATR, reused as the volatility unit of the trading plan
    pub atr_value: Option<f64>,
    /// One line per indicator that fell back to neutral
    pub fallbacks: Vec<String>,
}

#[derive(Default)]
pub struct TechnicalAnalysisEngine {
    params: IndicatorParams,
    weights: IndicatorWeights,
}

impl TechnicalAnalysisEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: IndicatorParams, weights: IndicatorWeights) -> Self {
        Self { params, weights }
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    pub fn weights(&self) -> &IndicatorWeights {
        &self.weights
    }

    /// Run all seven indicators. Never fails: short or degenerate input only
    /// turns individual indicators neutral.
    pub fn analyze(&self, series: &PriceSeries) -> TechnicalSummary {
        let indicators = IndicatorSet {
            rsi: rsi_signal(series, &self.params),
            macd: macd_signal(series, &self.params),
            atr: atr_signal(series, &self.params),
            ema: ema_signal(series, &self.params),
            bollinger: bollinger_signal(series, &self.params),
            fibonacci: fibonacci_signal(series),
            market_structure: market_structure_signal(series, &self.params),
        };

        let ta_score = self.weights.combine(&indicators);

        let fallbacks = indicators
            .iter()
            .filter_map(|r| r.fallback.as_ref().map(|why| format!("{}: {}", r.name, why)))
            .collect();

        TechnicalSummary {
            atr_value: latest_atr(series, self.params.atr_period),
            indicators,
            ta_score,
            fallbacks,
        }
    }

    /// Per-bar indicator history computed with this engine's parameters
    pub fn chart(&self, series: &PriceSeries) -> Vec<ChartPoint> {
        chart_series(series, &self.params)
    }
}
