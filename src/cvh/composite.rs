//! Composite CVH score
//!
//! Combines the eight sub-factor results into a single 0-1 score. The
//! composite is only reported when at least five factors resolved; a sparser
//! average would misrepresent confidence, so it stays absent instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cvh::resolvers::ScoreResult;

/// Minimum number of resolved factors required before a composite is reported
pub const MINIMUM_FACTOR_COVERAGE: usize = 5;

/// Snapshot of all eight factor results at one evaluation instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvhSummary {
    pub evaluated_at: DateTime<Utc>,
    pub diet: ScoreResult,
    pub physical_exercise: ScoreResult,
    pub nicotine_exposure: ScoreResult,
    pub sleep: ScoreResult,
    pub body_mass_index: ScoreResult,
    pub blood_lipids: ScoreResult,
    pub blood_glucose: ScoreResult,
    pub blood_pressure: ScoreResult,
}

impl CvhSummary {
    pub fn results(&self) -> [&ScoreResult; 8] {
        [
            &self.diet,
            &self.physical_exercise,
            &self.nicotine_exposure,
            &self.sleep,
            &self.body_mass_index,
            &self.blood_lipids,
            &self.blood_glucose,
            &self.blood_pressure,
        ]
    }

    /// Number of factors that resolved to a score
    pub fn coverage(&self) -> usize {
        self.results().iter().filter(|r| r.has_score()).count()
    }

    /// Composite score: mean of present sub-scores, each clamped to 0-1.
    /// Absent factors are excluded from both numerator and denominator.
    pub fn cvh_score(&self) -> Option<f64> {
        let present: Vec<f64> = self
            .results()
            .iter()
            .filter_map(|r| r.score)
            .map(|s| s.clamp(0.0, 1.0))
            .collect();

        if present.len() < MINIMUM_FACTOR_COVERAGE {
            return None;
        }
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cvh::resolvers::CvhFactor;
    use crate::score::ScoreInput;
    use crate::types::TimeRange;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn scored(factor: CvhFactor, score: f64) -> ScoreResult {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        ScoreResult {
            factor,
            value: Some(ScoreInput::Float(score)),
            score: Some(score),
            time_range: Some(TimeRange::instant(at)),
        }
    }

    fn summary(scores: [Option<f64>; 8]) -> CvhSummary {
        let factors = [
            CvhFactor::Diet,
            CvhFactor::PhysicalExercise,
            CvhFactor::NicotineExposure,
            CvhFactor::Sleep,
            CvhFactor::BodyMassIndex,
            CvhFactor::BloodLipids,
            CvhFactor::BloodGlucose,
            CvhFactor::BloodPressure,
        ];
        let result = |i: usize| match scores[i] {
            Some(s) => scored(factors[i], s),
            None => ScoreResult::absent(factors[i]),
        };
        CvhSummary {
            evaluated_at: Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap(),
            diet: result(0),
            physical_exercise: result(1),
            nicotine_exposure: result(2),
            sleep: result(3),
            body_mass_index: result(4),
            blood_lipids: result(5),
            blood_glucose: result(6),
            blood_pressure: result(7),
        }
    }

    #[test]
    fn test_four_of_eight_is_too_sparse() {
        let summary = summary([
            Some(1.0),
            Some(0.8),
            Some(0.6),
            Some(0.4),
            None,
            None,
            None,
            None,
        ]);
        assert_eq!(summary.coverage(), 4);
        assert_eq!(summary.cvh_score(), None);
    }

    #[test]
    fn test_five_of_eight_reports_mean_of_present() {
        let summary = summary([
            Some(0.5),
            Some(0.5),
            Some(0.5),
            Some(0.5),
            Some(0.5),
            None,
            None,
            None,
        ]);
        assert_eq!(summary.coverage(), 5);
        // Absent factors are not counted as zero
        assert_eq!(summary.cvh_score(), Some(0.5));
    }

    #[test]
    fn test_full_coverage_mean() {
        let summary = summary([
            Some(1.0),
            Some(0.9),
            Some(1.0),
            Some(0.7),
            Some(0.3),
            Some(0.6),
            Some(0.5),
            Some(0.25),
        ]);
        let expected = (1.0 + 0.9 + 1.0 + 0.7 + 0.3 + 0.6 + 0.5 + 0.25) / 8.0;
        assert!((summary.cvh_score().unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_sub_scores_are_clamped() {
        let summary = summary([
            Some(1.4),
            Some(-0.2),
            Some(0.5),
            Some(0.5),
            Some(0.5),
            None,
            None,
            None,
        ]);
        // 1.0 + 0.0 + 0.5 + 0.5 + 0.5 over 5
        assert_eq!(summary.cvh_score(), Some(0.5));
    }
}
