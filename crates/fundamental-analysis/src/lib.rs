use analysis_core::{FieldAssessment, FieldStatus, FundamentalAssessment, FundamentalSnapshot};

const GOOD_SCORE: f64 = 80.0;
const BAD_SCORE: f64 = 20.0;
const NEUTRAL_SCORE: f64 = 50.0;

// Share of each ratio in fa_score
const PE_WEIGHT: f64 = 0.3;
const GROWTH_WEIGHT: f64 = 0.4;
const DEBT_WEIGHT: f64 = 0.3;

pub struct FundamentalAnalysisEngine;

impl FundamentalAnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    fn assess(value: Option<f64>, status: FieldStatus) -> FieldAssessment {
        let score = match status {
            FieldStatus::Good => GOOD_SCORE,
            FieldStatus::Bad => BAD_SCORE,
            FieldStatus::None => NEUTRAL_SCORE,
        };
        FieldAssessment { value, status, score }
    }

    /// P/E under 15 looks cheap, over 30 expensive. A non-positive P/E means
    /// the company has no earnings to price, so it says nothing either way.
    fn assess_pe_ratio(&self, pe: Option<f64>) -> FieldAssessment {
        let pe = pe.filter(|v| v.is_finite());
        let status = match pe {
            Some(v) if v <= 0.0 => FieldStatus::None,
            Some(v) if v < 15.0 => FieldStatus::Good,
            Some(v) if v > 30.0 => FieldStatus::Bad,
            _ => FieldStatus::None,
        };
        Self::assess(pe, status)
    }

    /// Growth is a fraction: above 10% is good, flat or shrinking is bad.
    fn assess_earnings_growth(&self, growth: Option<f64>) -> FieldAssessment {
        let growth = growth.filter(|v| v.is_finite());
        let status = match growth {
            Some(v) if v > 0.10 => FieldStatus::Good,
            Some(v) if v <= 0.0 => FieldStatus::Bad,
            _ => FieldStatus::None,
        };
        Self::assess(growth, status)
    }

    /// Debt/equity under 0.5 is conservative, over 1.5 heavily levered.
    /// A ratio of zero or below (no reported debt, or negative equity) is
    /// treated as missing.
    fn assess_debt_to_equity(&self, de: Option<f64>) -> FieldAssessment {
        let de = de.filter(|v| v.is_finite());
        let status = match de {
            Some(v) if v <= 0.0 => FieldStatus::None,
            Some(v) if v < 0.5 => FieldStatus::Good,
            Some(v) if v > 1.5 => FieldStatus::Bad,
            _ => FieldStatus::None,
        };
        Self::assess(de, status)
    }

    /// Score a snapshot. Missing fields (or a missing snapshot) count as neutral.
    pub fn analyze(&self, snapshot: Option<&FundamentalSnapshot>) -> FundamentalAssessment {
        let empty = FundamentalSnapshot::default();
        let snapshot = snapshot.unwrap_or(&empty);

        let pe_ratio = self.assess_pe_ratio(snapshot.pe_ratio);
        let earnings_growth = self.assess_earnings_growth(snapshot.earnings_growth);
        let debt_to_equity = self.assess_debt_to_equity(snapshot.debt_to_equity);

        let fa_score = PE_WEIGHT * pe_ratio.score
            + GROWTH_WEIGHT * earnings_growth.score
            + DEBT_WEIGHT * debt_to_equity.score;

        let missing = [&pe_ratio, &earnings_growth, &debt_to_equity]
            .iter()
            .filter(|f| f.value.is_none())
            .count();
        if missing > 0 {
            tracing::debug!("{} of 3 fundamental fields missing, scored as neutral", missing);
        }

        FundamentalAssessment {
            pe_ratio,
            earnings_growth,
            debt_to_equity,
            fa_score,
        }
    }
}

impl Default for FundamentalAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pe: Option<f64>, growth: Option<f64>, de: Option<f64>) -> FundamentalSnapshot {
        FundamentalSnapshot {
            pe_ratio: pe,
            earnings_growth: growth,
            debt_to_equity: de,
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        assert!((PE_WEIGHT + GROWTH_WEIGHT + DEBT_WEIGHT - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_all_good() {
        let engine = FundamentalAnalysisEngine::new();
        let result = engine.analyze(Some(&snapshot(Some(12.0), Some(0.25), Some(0.3))));

        assert_eq!(result.pe_ratio.status, FieldStatus::Good);
        assert_eq!(result.earnings_growth.status, FieldStatus::Good);
        assert_eq!(result.debt_to_equity.status, FieldStatus::Good);
        assert!((result.fa_score - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_bad() {
        let engine = FundamentalAnalysisEngine::new();
        let result = engine.analyze(Some(&snapshot(Some(45.0), Some(-0.05), Some(2.4))));

        assert_eq!(result.pe_ratio.status, FieldStatus::Bad);
        assert_eq!(result.earnings_growth.status, FieldStatus::Bad);
        assert_eq!(result.debt_to_equity.status, FieldStatus::Bad);
        assert!((result.fa_score - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_debt_to_equity_is_neutral() {
        let engine = FundamentalAnalysisEngine::new();
        // 0.3*80 + 0.4*80 + 0.3*50
        let result = engine.analyze(Some(&snapshot(Some(12.0), Some(0.25), Some(0.0))));

        assert_eq!(result.debt_to_equity.status, FieldStatus::None);
        assert!((result.fa_score - 71.0).abs() < 1e-9);
    }

    #[test]
    fn test_middle_band_is_neutral() {
        let engine = FundamentalAnalysisEngine::new();
        let result = engine.analyze(Some(&snapshot(Some(22.0), Some(0.05), Some(1.0))));

        assert_eq!(result.pe_ratio.status, FieldStatus::None);
        assert_eq!(result.earnings_growth.status, FieldStatus::None);
        assert_eq!(result.debt_to_equity.status, FieldStatus::None);
        assert!((result.fa_score - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_snapshot_is_neutral() {
        let engine = FundamentalAnalysisEngine::new();
        let result = engine.analyze(None);

        assert!((result.fa_score - 50.0).abs() < 1e-9);
        assert!(result.pe_ratio.value.is_none());
    }

    #[test]
    fn test_partial_snapshot_mixes_weights() {
        let engine = FundamentalAnalysisEngine::new();
        // only growth known and good: 0.3*50 + 0.4*80 + 0.3*50
        let result = engine.analyze(Some(&snapshot(None, Some(0.2), None)));

        assert!((result.fa_score - 62.0).abs() < 1e-9);
        assert_eq!(result.debt_to_equity.status, FieldStatus::None);
    }

    #[test]
    fn test_boundaries() {
        let engine = FundamentalAnalysisEngine::new();

        assert_eq!(engine.assess_pe_ratio(Some(15.0)).status, FieldStatus::None);
        assert_eq!(engine.assess_pe_ratio(Some(30.0)).status, FieldStatus::None);
        assert_eq!(engine.assess_pe_ratio(Some(-8.0)).status, FieldStatus::None);
        assert_eq!(engine.assess_earnings_growth(Some(0.10)).status, FieldStatus::None);
        assert_eq!(engine.assess_earnings_growth(Some(0.0)).status, FieldStatus::Bad);
        assert_eq!(engine.assess_debt_to_equity(Some(0.0)).status, FieldStatus::None);
        assert_eq!(engine.assess_debt_to_equity(Some(-0.7)).status, FieldStatus::None);
        assert_eq!(engine.assess_debt_to_equity(Some(0.01)).status, FieldStatus::Good);
        assert_eq!(engine.assess_debt_to_equity(Some(1.5)).status, FieldStatus::None);
        assert_eq!(engine.assess_debt_to_equity(Some(f64::NAN)).value, None);
    }
}
