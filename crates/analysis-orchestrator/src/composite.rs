use analysis_core::{CompositeScore, Signal};
use sentiment_analysis::normalize_news_score;

use crate::config::SignalThresholds;

pub const TECHNICAL_WEIGHT: f64 = 0.80;
pub const FUNDAMENTAL_WEIGHT: f64 = 0.15;
pub const NEWS_WEIGHT: f64 = 0.05;

/// Blends the three stage scores into the final decision
#[derive(Debug, Clone, Default)]
pub struct CompositeScorer {
    thresholds: SignalThresholds,
}

impl CompositeScorer {
    pub fn new(thresholds: SignalThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &SignalThresholds {
        &self.thresholds
    }

    pub fn signal_for(&self, combined: f64) -> Signal {
        if combined >= self.thresholds.buy {
            Signal::Buy
        } else if combined <= self.thresholds.sell {
            Signal::Sell
        } else {
            Signal::Neutral
        }
    }

    pub fn score(&self, ta_score: f64, fa_score: f64, news_score: Option<f64>) -> CompositeScore {
        let ta_score = clamp_score(ta_score);
        let fa_score = clamp_score(fa_score);
        let news_score = normalize_news_score(news_score);

        let combined_score = (TECHNICAL_WEIGHT * ta_score
            + FUNDAMENTAL_WEIGHT * fa_score
            + NEWS_WEIGHT * news_score)
            .clamp(0.0, 100.0);

        CompositeScore {
            ta_score,
            fa_score,
            news_score,
            combined_score,
            combined_signal: self.signal_for(combined_score),
        }
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 100.0)
    } else {
        50.0
    }
}
