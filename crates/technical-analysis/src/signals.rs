//! Per-indicator signal calculators.
//!
//! Every calculator turns a [`PriceSeries`] into one [`IndicatorResult`]. When the
//! series is too short or the math is undefined the calculator logs the reason and
//! returns the Neutral/50 placeholder so the rest of the pipeline keeps running.

use analysis_core::{
    AnalysisError, IndicatorKind, IndicatorResult, IndicatorValue, PriceSeries, Signal,
};
use serde::{Deserialize, Serialize};

use crate::indicators::*;

/// Look-back parameters for every indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub atr_period: usize,
    /// Fast EMA of the 9/20/50 alignment; `None` uses the 20/50 cross alone
    pub ema_fast: Option<usize>,
    pub ema_short: usize,
    pub ema_long: usize,
    pub bb_period: usize,
    pub bb_std_dev: f64,
    /// Rolling window for the swing highs/lows
    pub structure_window: usize,
    /// How many consecutive window-to-window moves must agree
    pub structure_lookback: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            atr_period: 14,
            ema_fast: Some(9),
            ema_short: 20,
            ema_long: 50,
            bb_period: 20,
            bb_std_dev: 2.0,
            structure_window: 3,
            structure_lookback: 5,
        }
    }
}

// ATR as % of price outside this band is not worth swing trading
const ATR_QUIET_PCT: f64 = 1.5;
const ATR_WILD_PCT: f64 = 4.0;

fn evaluate<F>(kind: IndicatorKind, compute: F) -> IndicatorResult
where
    F: FnOnce() -> Result<IndicatorResult, AnalysisError>,
{
    match compute() {
        Ok(result) => {
            tracing::debug!("{}: {:?} (score {})", kind, result.signal, result.score);
            result
        }
        Err(e) => {
            tracing::warn!("{} unavailable, using neutral fallback: {}", kind, e);
            IndicatorResult::neutral_fallback(kind, e.to_string())
        }
    }
}

fn require_bars(series: &PriceSeries, needed: usize, kind: IndicatorKind) -> Result<(), AnalysisError> {
    if series.len() < needed {
        return Err(AnalysisError::InsufficientData(format!(
            "{} needs {} bars, got {}",
            kind,
            needed,
            series.len()
        )));
    }
    Ok(())
}

fn finite(value: f64, what: &str) -> Result<f64, AnalysisError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AnalysisError::CalculationError(format!("{} is not finite", what)))
    }
}

fn last_close(series: &PriceSeries) -> Result<f64, AnalysisError> {
    series
        .last()
        .map(|b| b.close)
        .ok_or_else(|| AnalysisError::InsufficientData("empty series".to_string()))
}

pub fn rsi_signal(series: &PriceSeries, params: &IndicatorParams) -> IndicatorResult {
    evaluate(IndicatorKind::Rsi, || {
        let kind = IndicatorKind::Rsi;
        require_bars(series, params.rsi_period + 1, kind)?;

        let value = rsi(&series.closes(), params.rsi_period)
            .last()
            .copied()
            .flatten()
            .ok_or_else(|| {
                AnalysisError::CalculationError("RSI undefined: no gains or losses in window".to_string())
            })?;
        let value = finite(value, "RSI")?;

        let (signal, score) = if value <= 30.0 {
            (Signal::Buy, 100.0)
        } else if value >= 70.0 {
            (Signal::Sell, 0.0)
        } else {
            (Signal::Neutral, 50.0)
        };

        Ok(IndicatorResult::new(kind, IndicatorValue::Rsi { value }, signal, score))
    })
}

pub fn macd_signal(series: &PriceSeries, params: &IndicatorParams) -> IndicatorResult {
    evaluate(IndicatorKind::Macd, || {
        let kind = IndicatorKind::Macd;
        require_bars(series, (params.macd_slow + params.macd_signal).saturating_sub(1), kind)?;

        let result = macd(&series.closes(), params.macd_fast, params.macd_slow, params.macd_signal);
        let (macd_value, signal_line, histogram) = match (
            result.macd_line.last(),
            result.signal_line.last(),
            result.histogram.last(),
        ) {
            (Some(&m), Some(&s), Some(&h)) => (m, s, h),
            _ => {
                return Err(AnalysisError::CalculationError(
                    "MACD parameters produced no output".to_string(),
                ))
            }
        };
        finite(histogram, "MACD histogram")?;

        let (signal, score) = if macd_value > signal_line && histogram > 0.0 {
            (Signal::Buy, 100.0)
        } else if macd_value < signal_line && histogram < 0.0 {
            (Signal::Sell, 0.0)
        } else {
            (Signal::Neutral, 50.0)
        };

        Ok(IndicatorResult::new(
            kind,
            IndicatorValue::Macd { macd: macd_value, signal_line, histogram },
            signal,
            score,
        ))
    })
}

/// Latest ATR value, if the series is long enough
pub fn latest_atr(series: &PriceSeries, period: usize) -> Option<f64> {
    atr(series.bars(), period).last().copied().filter(|v| v.is_finite())
}

pub fn atr_signal(series: &PriceSeries, params: &IndicatorParams) -> IndicatorResult {
    evaluate(IndicatorKind::Atr, || {
        let kind = IndicatorKind::Atr;
        require_bars(series, params.atr_period + 1, kind)?;

        let value = latest_atr(series, params.atr_period)
            .ok_or_else(|| AnalysisError::CalculationError("ATR not computable".to_string()))?;
        let price = last_close(series)?;
        if price <= 0.0 {
            return Err(AnalysisError::CalculationError(format!(
                "cannot express ATR relative to price {}",
                price
            )));
        }
        let percent_of_price = value / price * 100.0;

        // Both extremes are flagged the same way: not tradeable right now
        let (signal, score) = if percent_of_price < ATR_QUIET_PCT || percent_of_price > ATR_WILD_PCT {
            (Signal::Sell, 30.0)
        } else {
            (Signal::Buy, 80.0)
        };

        Ok(IndicatorResult::new(kind, IndicatorValue::Atr { value, percent_of_price }, signal, score))
    })
}

pub fn ema_signal(series: &PriceSeries, params: &IndicatorParams) -> IndicatorResult {
    evaluate(IndicatorKind::Ema, || {
        let kind = IndicatorKind::Ema;
        let longest = params.ema_short.max(params.ema_long).max(params.ema_fast.unwrap_or(0));
        require_bars(series, longest, kind)?;

        let closes = series.closes();
        let short = ema(&closes, params.ema_short).last().copied();
        let long = ema(&closes, params.ema_long).last().copied();
        let (short, long) = match (short, long) {
            (Some(s), Some(l)) => (finite(s, "short EMA")?, finite(l, "long EMA")?),
            _ => return Err(AnalysisError::CalculationError("EMA periods must be non-zero".to_string())),
        };
        let fast = match params.ema_fast {
            Some(period) => match ema(&closes, period).last().copied() {
                Some(f) => Some(finite(f, "fast EMA")?),
                None => return Err(AnalysisError::CalculationError("EMA periods must be non-zero".to_string())),
            },
            None => None,
        };
        let price = last_close(series)?;

        // With a fast line the three EMAs must also be stacked in order
        let (stacked_up, stacked_down) = match fast {
            Some(f) => (f > short, f < short),
            None => (true, true),
        };

        let (signal, score) = if stacked_up && short > long && price > short {
            (Signal::Buy, 100.0)
        } else if stacked_down && short < long && price < short {
            (Signal::Sell, 0.0)
        } else {
            (Signal::Neutral, 50.0)
        };

        Ok(IndicatorResult::new(kind, IndicatorValue::Ema { fast, short, long, price }, signal, score))
    })
}

pub fn bollinger_signal(series: &PriceSeries, params: &IndicatorParams) -> IndicatorResult {
    evaluate(IndicatorKind::Bollinger, || {
        let kind = IndicatorKind::Bollinger;
        require_bars(series, params.bb_period, kind)?;

        let bands = bollinger_bands(&series.closes(), params.bb_period, params.bb_std_dev);
        let (upper, middle, lower) = match (bands.upper.last(), bands.middle.last(), bands.lower.last()) {
            (Some(&u), Some(&m), Some(&l)) => (u, m, l),
            _ => return Err(AnalysisError::CalculationError("Bollinger period must be non-zero".to_string())),
        };
        finite(upper - lower, "Bollinger band width")?;
        let price = last_close(series)?;
        let width = if middle != 0.0 { (upper - lower) / middle } else { 0.0 };

        // Collapsed bands (no variance in the window) carry no information
        let collapsed = (upper - lower) <= f64::EPSILON * middle.abs().max(1.0) * 16.0;
        let (signal, score) = if collapsed {
            (Signal::Neutral, 50.0)
        } else if price <= lower {
            (Signal::Buy, 90.0)
        } else if price >= upper {
            (Signal::Sell, 10.0)
        } else {
            (Signal::Neutral, 50.0)
        };

        Ok(IndicatorResult::new(
            kind,
            IndicatorValue::Bollinger { upper, middle, lower, width },
            signal,
            score,
        ))
    })
}

pub fn fibonacci_signal(series: &PriceSeries) -> IndicatorResult {
    evaluate(IndicatorKind::Fibonacci, || {
        let kind = IndicatorKind::Fibonacci;
        require_bars(series, 2, kind)?;

        let high = series.highs().into_iter().fold(f64::NEG_INFINITY, f64::max);
        let low = series.lows().into_iter().fold(f64::INFINITY, f64::min);
        if high - low <= 0.0 {
            return Err(AnalysisError::CalculationError(format!(
                "no price range to retrace (high {}, low {})",
                high, low
            )));
        }

        let levels = fibonacci_levels(high, low);
        let price = last_close(series)?;
        let support = low + 0.236 * (high - low);
        let resistance = low + 0.786 * (high - low);
        let nearest_ratio = levels
            .iter()
            .min_by(|a, b| {
                (a.price - price)
                    .abs()
                    .partial_cmp(&(b.price - price).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|l| l.ratio)
            .unwrap_or(0.5);

        let (signal, score) = if price <= support {
            (Signal::Buy, 90.0)
        } else if price >= resistance {
            (Signal::Sell, 10.0)
        } else {
            (Signal::Neutral, 50.0)
        };

        Ok(IndicatorResult::new(
            kind,
            IndicatorValue::Fibonacci { high, low, levels, nearest_ratio },
            signal,
            score,
        ))
    })
}

pub fn market_structure_signal(series: &PriceSeries, params: &IndicatorParams) -> IndicatorResult {
    evaluate(IndicatorKind::MarketStructure, || {
        let kind = IndicatorKind::MarketStructure;
        let window = params.structure_window.max(1);
        let lookback = params.structure_lookback.max(1);
        // window-1 bars to fill the first window, one more for the first change
        require_bars(series, window + lookback, kind)?;

        let high_moves = diff(&rolling_max(&series.highs(), window));
        let low_moves = diff(&rolling_min(&series.lows(), window));
        let recent_highs = &high_moves[high_moves.len().saturating_sub(lookback)..];
        let recent_lows = &low_moves[low_moves.len().saturating_sub(lookback)..];

        let uptrend = recent_highs.iter().all(|&d| d > 0.0) && recent_lows.iter().all(|&d| d > 0.0);
        let downtrend = recent_highs.iter().all(|&d| d < 0.0) && recent_lows.iter().all(|&d| d < 0.0);

        let (signal, score) = if uptrend {
            (Signal::Buy, 100.0)
        } else if downtrend {
            (Signal::Sell, 0.0)
        } else {
            (Signal::Neutral, 50.0)
        };

        Ok(IndicatorResult::new(
            kind,
            IndicatorValue::MarketStructure { uptrend, downtrend },
            signal,
            score,
        ))
    })
}
