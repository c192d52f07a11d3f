//! Score Aggregator: combines sub-scores into the fit score and the weighted
//! overall score.
//!
//! fit     = 0.6 × similarity×100 + 0.4 × (0.3 × skill + 0.5 × experience + 0.2 × education)
//! overall = w.skills × skill + w.experience × experience + w.education × education + w.fit × fit
//!
//! Job weights are validated when they are configured. At scoring time they are
//! re-normalized so a bad row in storage can never push overall outside 0–100.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::AppError;

const FIT_SIMILARITY: f64 = 0.6;
const FIT_RULES: f64 = 0.4;
const RULES_SKILL: f64 = 0.3;
const RULES_EXPERIENCE: f64 = 0.5;
const RULES_EDUCATION: f64 = 0.2;

/// Weights must sum to 1 within this tolerance.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

/// Per-job weights for the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub skills: f64,
    pub experience: f64,
    pub education: f64,
    pub fit: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            skills: 0.35,
            experience: 0.30,
            education: 0.20,
            fit: 0.15,
        }
    }
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.skills + self.experience + self.education + self.fit
    }

    fn components(&self) -> [f64; 4] {
        [self.skills, self.experience, self.education, self.fit]
    }

    /// Rejects negative or non-finite weights and sums away from 1.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.components().iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(AppError::Validation(
                "Score weights must be finite and non-negative".to_string(),
            ));
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(AppError::Validation(format!(
                "Score weights must sum to 1.0. Current sum: {sum:.2}"
            )));
        }
        Ok(())
    }

    /// Weights that are safe to score with. Valid weights pass through unchanged;
    /// anything else is clamped to ≥ 0 and scaled to sum to 1, falling back to
    /// the defaults when nothing usable is left.
    pub fn normalized(&self) -> ScoringWeights {
        if self.validate().is_ok() {
            return *self;
        }

        let clamp = |w: f64| if w.is_finite() && w > 0.0 { w } else { 0.0 };
        let cleaned = ScoringWeights {
            skills: clamp(self.skills),
            experience: clamp(self.experience),
            education: clamp(self.education),
            fit: clamp(self.fit),
        };
        let sum = cleaned.sum();
        if sum <= 0.0 {
            warn!(weights = ?self, "Scoring weights unusable, falling back to defaults");
            return ScoringWeights::default();
        }

        warn!(weights = ?self, sum, "Scoring weights do not sum to 1, re-normalizing");
        ScoringWeights {
            skills: cleaned.skills / sum,
            experience: cleaned.experience / sum,
            education: cleaned.education / sum,
            fit: cleaned.fit / sum,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateScore {
    pub fit: f64,
    pub overall: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreAggregator;

impl ScoreAggregator {
    pub fn new() -> Self {
        Self
    }

    /// `similarity` is in [0, 1]; the other inputs are in [0, 100].
    pub fn fit_score(&self, skill: f64, experience: f64, education: f64, similarity: f64) -> f64 {
        let similarity = if similarity.is_finite() {
            similarity.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let rules = RULES_SKILL * skill + RULES_EXPERIENCE * experience + RULES_EDUCATION * education;
        similarity * 100.0 * FIT_SIMILARITY + rules * FIT_RULES
    }

    pub fn aggregate(
        &self,
        skill: f64,
        experience: f64,
        education: f64,
        similarity: f64,
        weights: &ScoringWeights,
    ) -> AggregateScore {
        let fit = self.fit_score(skill, experience, education, similarity);
        let w = weights.normalized();
        let overall = w.skills * skill + w.experience * experience + w.education * education + w.fit * fit;
        AggregateScore { fit, overall }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = ScoringWeights::default();
        assert!((w.sum() - 1.0).abs() < 1e-9);
        assert!(w.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_sum() {
        let w = ScoringWeights {
            skills: 0.5,
            experience: 0.5,
            education: 0.5,
            fit: 0.0,
        };
        let err = w.validate().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("1.50"), "{err}");
    }

    #[test]
    fn test_validate_accepts_within_tolerance() {
        let w = ScoringWeights {
            skills: 0.35,
            experience: 0.30,
            education: 0.20,
            fit: 0.155,
        };
        assert!(w.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_negative() {
        let w = ScoringWeights {
            skills: 1.2,
            experience: -0.2,
            education: 0.0,
            fit: 0.0,
        };
        assert!(w.validate().is_err());
    }

    #[test]
    fn test_normalized_rescales_and_falls_back() {
        let w = ScoringWeights {
            skills: 2.0,
            experience: 2.0,
            education: 0.0,
            fit: 0.0,
        }
        .normalized();
        assert!((w.skills - 0.5).abs() < 1e-9);
        assert!((w.sum() - 1.0).abs() < 1e-9);

        let zero = ScoringWeights {
            skills: 0.0,
            experience: 0.0,
            education: f64::NAN,
            fit: -1.0,
        };
        assert_eq!(zero.normalized(), ScoringWeights::default());
    }

    #[test]
    fn test_fit_score_formula() {
        let agg = ScoreAggregator::new();
        let fit = agg.fit_score(80.0, 60.0, 100.0, 0.5);
        let expected = 50.0 * 0.6 + (0.3 * 80.0 + 0.5 * 60.0 + 0.2 * 100.0) * 0.4;
        assert!((fit - expected).abs() < 1e-9);
    }

    #[test]
    fn test_similarity_zero_when_unindexed() {
        let agg = ScoreAggregator::new();
        let fit = agg.fit_score(100.0, 100.0, 100.0, 0.0);
        assert!((fit - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_overall_with_default_weights() {
        let agg = ScoreAggregator::new();
        let s = agg.aggregate(80.0, 60.0, 100.0, 0.5, &ScoringWeights::default());
        let expected = 0.35 * 80.0 + 0.30 * 60.0 + 0.20 * 100.0 + 0.15 * s.fit;
        assert!((s.overall - expected).abs() < 1e-9);
    }

    #[test]
    fn test_overall_bounded_for_extreme_inputs() {
        let agg = ScoreAggregator::new();
        let bad = ScoringWeights {
            skills: 5.0,
            experience: 5.0,
            education: 5.0,
            fit: 5.0,
        };
        for (s, e, d, sim) in [(0.0, 0.0, 0.0, 0.0), (100.0, 100.0, 100.0, 1.0), (100.0, 0.0, 50.0, 7.0)] {
            let out = agg.aggregate(s, e, d, sim, &bad);
            assert!((0.0..=100.0 + 1e-9).contains(&out.overall), "{}", out.overall);
            assert!((0.0..=100.0 + 1e-9).contains(&out.fit), "{}", out.fit);
        }
    }
}
