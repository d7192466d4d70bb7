use analysis_core::{AnalysisError, PredictionSeries, SwingTimeframe};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Daily noise added on top of the trend drift
pub const NOISE_AMPLITUDE: f64 = 0.005;
pub const MIN_PRICE: f64 = 0.01;

const SYNTHETIC_NOTE: &str =
    "Synthetic trend projection from the combined score with random noise; not a forecast";

/// The next `count` Monday-to-Friday dates strictly after `after`
pub fn next_business_days(after: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(count);
    let mut day = after;
    while dates.len() < count {
        day += Duration::days(1);
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(day);
        }
    }
    dates
}

/// Random-walk path drifting toward the direction implied by `score`.
///
/// Each daily step is the trend drift for that day plus uniform noise,
/// clamped so no single day moves more than the timeframe's
/// `max_change_pct`. Prices are left unrounded so the bound also holds for
/// sub-dollar tickers. The same `seed` always yields the same series.
pub fn generate_prediction(
    current_price: f64,
    score: f64,
    timeframe: SwingTimeframe,
    last_date: NaiveDate,
    seed: u64,
) -> Result<PredictionSeries, AnalysisError> {
    if !current_price.is_finite() || current_price <= 0.0 {
        return Err(AnalysisError::InvalidData(format!(
            "cannot project from price {}",
            current_price
        )));
    }

    let score = if score.is_finite() { score.clamp(0.0, 100.0) } else { 50.0 };
    let deviation = score - 50.0;
    let direction = if deviation > 0.0 {
        1.0
    } else if deviation < 0.0 {
        -1.0
    } else {
        0.0
    };
    let strength = deviation.abs() / 50.0;

    let horizon = timeframe.horizon_days();
    let max_change = timeframe.max_change_pct();
    let mut rng = StdRng::seed_from_u64(seed);

    let mut prices = Vec::with_capacity(horizon);
    let mut price = current_price;
    for i in 1..=horizon {
        let day_pct = max_change * strength * i as f64 / horizon as f64;
        let noise = rng.gen_range(-NOISE_AMPLITUDE..NOISE_AMPLITUDE);
        let step = (day_pct * direction + noise).clamp(-max_change, max_change);
        price = (price * (1.0 + step)).max(MIN_PRICE);
        prices.push(price);
    }

    Ok(PredictionSeries {
        dates: next_business_days(last_date, horizon),
        prices,
        seed,
        synthetic: true,
        note: SYNTHETIC_NOTE.to_string(),
    })
}
