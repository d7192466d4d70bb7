use analysis_core::{AnalysisError, PivotPoints, PlanSide, PriceBar, Signal, TradingPlan};
use technical_analysis::support_resistance;

pub const STOP_ATR_MULTIPLE: f64 = 2.0;
pub const TARGET_ATR_MULTIPLE: f64 = 3.0;

/// Volatility unit used when ATR cannot be computed: 2% of entry
pub const FALLBACK_VOLATILITY_PCT: f64 = 0.02;

/// Bars scanned for the recent support (lowest low) and resistance (highest high)
pub const SUPPORT_RESISTANCE_WINDOW: usize = 10;

/// Classic pivots from one bar's high, low and close
pub fn pivot_points(bar: &PriceBar) -> PivotPoints {
    let (high, low, close) = (bar.high, bar.low, bar.close);
    let pivot = (high + low + close) / 3.0;
    let range = high - low;

    PivotPoints {
        pivot,
        support1: 2.0 * pivot - high,
        support2: pivot - range,
        support3: low - 2.0 * (high - pivot),
        resistance1: 2.0 * pivot - low,
        resistance2: pivot + range,
        resistance3: high + 2.0 * (pivot - low),
    }
}

fn distance_pct(level: f64, entry: f64) -> f64 {
    (level - entry) / entry * 100.0
}

/// Build the plan for `signal` at `entry`. Pivots come from the last of
/// `bars`. Returns a warning alongside the plan when the ATR was missing and
/// the 2% fallback was used.
pub fn build_trading_plan(
    signal: Signal,
    entry: f64,
    atr: Option<f64>,
    bars: &[PriceBar],
) -> Result<(TradingPlan, Option<String>), AnalysisError> {
    let latest = bars
        .last()
        .ok_or_else(|| AnalysisError::InsufficientData("trading plan needs at least one bar".to_string()))?;

    let (unit, warning) = match atr.filter(|a| a.is_finite() && *a > 0.0) {
        Some(a) => (a, None),
        None => {
            let unit = entry * FALLBACK_VOLATILITY_PCT;
            tracing::warn!("ATR unavailable, using {:.2} (2% of entry) for stop/target", unit);
            (
                unit,
                Some(format!("ATR unavailable; stop and target sized from 2% of entry ({:.2})", unit)),
            )
        }
    };

    let side = match signal {
        Signal::Sell => PlanSide::Short,
        Signal::Buy | Signal::Neutral => PlanSide::Long,
    };

    let (stop_loss, take_profit) = match side {
        PlanSide::Long => (entry - STOP_ATR_MULTIPLE * unit, entry + TARGET_ATR_MULTIPLE * unit),
        PlanSide::Short => (entry + STOP_ATR_MULTIPLE * unit, entry - TARGET_ATR_MULTIPLE * unit),
    };

    let pivots = pivot_points(latest);
    let pivot_distance_pct = PivotPoints {
        pivot: distance_pct(pivots.pivot, entry),
        support1: distance_pct(pivots.support1, entry),
        support2: distance_pct(pivots.support2, entry),
        support3: distance_pct(pivots.support3, entry),
        resistance1: distance_pct(pivots.resistance1, entry),
        resistance2: distance_pct(pivots.resistance2, entry),
        resistance3: distance_pct(pivots.resistance3, entry),
    };

    let (support, resistance) = match support_resistance(bars, SUPPORT_RESISTANCE_WINDOW) {
        Some((s, r)) => (Some(s), Some(r)),
        None => (None, None),
    };

    let plan = TradingPlan {
        side,
        entry,
        atr: unit,
        stop_loss,
        take_profit,
        risk_reward: TARGET_ATR_MULTIPLE / STOP_ATR_MULTIPLE,
        pivots,
        pivot_distance_pct,
        support,
        resistance,
    };

    Ok((plan, warning))
}
