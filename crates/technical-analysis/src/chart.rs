use analysis_core::{ChartPoint, PriceSeries};

use crate::indicators::{atr, ema, macd, rsi};
use crate::signals::IndicatorParams;

/// Per-bar history of the price and indicator lines, one point per bar.
///
/// RSI and ATR start once their period is filled; the EMA and MACD lines are
/// seeded from the first close and cover every bar.
pub fn chart_series(series: &PriceSeries, params: &IndicatorParams) -> Vec<ChartPoint> {
    let closes = series.closes();
    let rsi_values = rsi(&closes, params.rsi_period);
    let atr_values = atr(series.bars(), params.atr_period);
    let macd_values = macd(&closes, params.macd_fast, params.macd_slow, params.macd_signal);
    let ema_fast = params.ema_fast.map(|p| ema(&closes, p)).unwrap_or_default();
    let ema_short = ema(&closes, params.ema_short);
    let ema_long = ema(&closes, params.ema_long);

    // Trailing indicators are shorter than the series; align them to the last bar
    let lagged = |values: &[f64], i: usize, period: usize| -> Option<f64> {
        i.checked_sub(period).and_then(|j| values.get(j)).copied().filter(|v| v.is_finite())
    };
    let at = |values: &[f64], i: usize| values.get(i).copied().filter(|v| v.is_finite());

    series
        .bars()
        .iter()
        .enumerate()
        .map(|(i, bar)| ChartPoint {
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            rsi: i
                .checked_sub(params.rsi_period)
                .and_then(|j| rsi_values.get(j).copied().flatten()),
            macd: at(&macd_values.macd_line, i),
            macd_signal: at(&macd_values.signal_line, i),
            atr: lagged(&atr_values, i, params.atr_period),
            ema_fast: at(&ema_fast, i),
            ema_short: at(&ema_short, i),
            ema_long: at(&ema_long, i),
        })
        .collect()
}
