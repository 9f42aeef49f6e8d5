//! Pipeline orchestration
//!
//! This module provides the public API for CVH evaluation. It pulls evidence
//! from a provider, runs every factor resolver, and assembles the summary.

use chrono::{DateTime, Duration, Utc};

use crate::cvh::composite::CvhSummary;
use crate::cvh::resolvers;
use crate::error::EngineError;
use crate::provider::{SampleProvider, StatisticsProvider};
use crate::schema::{RawSampleAdapter, RawSampleRecord};
use crate::sleep::SleepSessionBuilder;
use crate::types::{SampleType, TimeRange};
use crate::aggregate::{AggregationKind, BucketInterval};

/// How far back evidence samples are considered, in days
pub const EVIDENCE_LOOKBACK_DAYS: i64 = 365;

/// How far back sleep-stage samples are fetched, in days
pub const SLEEP_LOOKBACK_DAYS: i64 = 14;

/// How far back exercise minutes are summed, in days
pub const EXERCISE_LOOKBACK_DAYS: i64 = 7;

/// Stateful evaluator with a memoized sleep-session splitter.
///
/// Use this when evaluating repeatedly against the same backing store; the
/// sleep split is reused between evaluations over identical stage samples.
pub struct CvhProcessor {
    sleep_sessions: SleepSessionBuilder,
}

impl Default for CvhProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl CvhProcessor {
    pub fn new() -> Self {
        Self {
            sleep_sessions: SleepSessionBuilder::new(),
        }
    }

    /// Evaluate all eight factors against `provider` as of `evaluated_at`.
    ///
    /// Missing or unusable evidence never fails the evaluation; the affected
    /// factor comes back absent and the composite reflects the reduced
    /// coverage.
    pub fn evaluate<P>(&mut self, provider: &P, evaluated_at: DateTime<Utc>) -> CvhSummary
    where
        P: SampleProvider + StatisticsProvider,
    {
        let evidence = TimeRange::new(
            evaluated_at - Duration::days(EVIDENCE_LOOKBACK_DAYS),
            evaluated_at,
        );

        let diet = resolvers::resolve_diet(&provider.quantity_samples(&SampleType::DietScore, &evidence));

        let exercise_anchor = evaluated_at - Duration::days(EXERCISE_LOOKBACK_DAYS);
        let weekly_minutes = provider.statistic(
            &SampleType::ExerciseMinutes,
            AggregationKind::Sum,
            BucketInterval::Week,
            exercise_anchor,
            &TimeRange::new(exercise_anchor, evaluated_at),
        );
        let physical_exercise = resolvers::resolve_physical_exercise(weekly_minutes.as_ref());

        let nicotine_exposure = resolvers::resolve_nicotine_exposure(
            &provider.quantity_samples(&SampleType::NicotineExposure, &evidence),
        );

        let stages = provider.sleep_stage_samples(&TimeRange::new(
            evaluated_at - Duration::days(SLEEP_LOOKBACK_DAYS),
            evaluated_at,
        ));
        let sleep = resolvers::resolve_sleep(&self.sleep_sessions.sessions(&stages));

        let mut body_evidence = provider.quantity_samples(&SampleType::BodyMassIndex, &evidence);
        body_evidence.extend(provider.quantity_samples(&SampleType::BodyMass, &evidence));
        body_evidence.extend(provider.quantity_samples(&SampleType::Height, &evidence));
        let body_mass_index = resolvers::resolve_body_mass_index(&body_evidence, evaluated_at);

        let blood_lipids = resolvers::resolve_blood_lipids(
            &provider.quantity_samples(&SampleType::BloodLipids, &evidence),
        );

        let blood_glucose = resolvers::resolve_blood_glucose(
            &provider.quantity_samples(&SampleType::BloodGlucose, &evidence),
        );

        let blood_pressure =
            resolvers::resolve_blood_pressure(&provider.blood_pressure_samples(&evidence));

        CvhSummary {
            evaluated_at,
            diet,
            physical_exercise,
            nicotine_exposure,
            sleep,
            body_mass_index,
            blood_lipids,
            blood_glucose,
            blood_pressure,
        }
    }
}

/// One-shot evaluation of a record batch.
///
/// Parses nothing itself; callers hand over already-deserialized records
/// (see [`RawSampleAdapter`] for NDJSON and array parsing).
pub fn score_records(
    records: &[RawSampleRecord],
    evaluated_at: DateTime<Utc>,
) -> Result<CvhSummary, EngineError> {
    let store = RawSampleAdapter::to_store(records)?;
    Ok(CvhProcessor::new().evaluate(&store, evaluated_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cvh::composite::MINIMUM_FACTOR_COVERAGE;
    use crate::provider::InMemorySampleStore;
    use crate::score::ScoreInput;
    use crate::types::{QuantitySample, SleepStage, SleepStageSample, Unit};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn eval_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn days_before(days: i64) -> DateTime<Utc> {
        eval_time() - Duration::days(days)
    }

    fn populated_store() -> InMemorySampleStore {
        let mut store = InMemorySampleStore::new();
        store.insert(QuantitySample::at_instant(
            SampleType::DietScore,
            Unit::Score,
            13.0,
            days_before(30),
        ));
        store.insert(QuantitySample::at_instant(
            SampleType::NicotineExposure,
            Unit::Score,
            0.0,
            days_before(30),
        ));
        store.insert(QuantitySample::at_instant(
            SampleType::BodyMass,
            Unit::Kilograms,
            70.0,
            days_before(10),
        ));
        store.insert(QuantitySample::at_instant(
            SampleType::Height,
            Unit::Meters,
            1.75,
            days_before(300),
        ));
        store.insert(QuantitySample::at_instant(
            SampleType::BloodLipids,
            Unit::MilligramsPerDeciliter,
            120.0,
            days_before(60),
        ));
        store
    }

    #[test]
    fn test_evaluate_partial_coverage_withholds_composite() {
        let store = populated_store();
        let summary = CvhProcessor::new().evaluate(&store, eval_time());

        assert_eq!(summary.diet.score, Some(0.8));
        assert_eq!(summary.nicotine_exposure.score, Some(1.0));
        assert_eq!(summary.blood_lipids.score, Some(1.0));
        // BMI 70 / 1.75^2 = 22.9, under 25
        assert_eq!(summary.body_mass_index.score, Some(1.0));
        assert_eq!(summary.blood_glucose.score, None);
        assert_eq!(summary.physical_exercise.score, None);
        assert_eq!(summary.sleep.score, None);
        assert_eq!(summary.blood_pressure.score, None);

        assert_eq!(summary.coverage(), 4);
        assert!(summary.coverage() < MINIMUM_FACTOR_COVERAGE);
        assert_eq!(summary.cvh_score(), None);
    }

    #[test]
    fn test_evaluate_exercise_sums_week_of_minutes() {
        let mut store = populated_store();
        for day in 1..=5 {
            store.insert(QuantitySample::at_instant(
                SampleType::ExerciseMinutes,
                Unit::Minutes,
                30.0,
                days_before(day),
            ));
        }

        let summary = CvhProcessor::new().evaluate(&store, eval_time());

        // 150 weekly minutes lands in the top band
        assert_eq!(summary.physical_exercise.score, Some(1.0));
        assert_eq!(
            summary.physical_exercise.value,
            Some(ScoreInput::Float(150.0))
        );
    }

    #[test]
    fn test_evaluate_stale_exercise_is_excluded() {
        let mut store = populated_store();
        store.insert(QuantitySample::at_instant(
            SampleType::ExerciseMinutes,
            Unit::Minutes,
            200.0,
            days_before(10),
        ));

        let summary = CvhProcessor::new().evaluate(&store, eval_time());
        assert_eq!(summary.physical_exercise.score, None);
    }

    #[test]
    fn test_evaluate_sleep_from_stage_samples() {
        let mut store = populated_store();
        let bedtime = days_before(1);
        store.insert_sleep_stage(SleepStageSample::new(
            SleepStage::AsleepCore,
            bedtime,
            bedtime + Duration::hours(5),
        ));
        store.insert_sleep_stage(SleepStageSample::new(
            SleepStage::AsleepRem,
            bedtime + Duration::hours(5),
            bedtime + Duration::hours(8),
        ));

        let summary = CvhProcessor::new().evaluate(&store, eval_time());

        // 8 hours asleep, top band
        assert_eq!(summary.sleep.score, Some(1.0));
        assert_eq!(summary.coverage(), 5);
        assert!(summary.cvh_score().is_some());
    }

    #[test]
    fn test_evidence_outside_lookback_is_ignored() {
        let mut store = InMemorySampleStore::new();
        store.insert(QuantitySample::at_instant(
            SampleType::DietScore,
            Unit::Score,
            16.0,
            days_before(EVIDENCE_LOOKBACK_DAYS + 1),
        ));

        let summary = CvhProcessor::new().evaluate(&store, eval_time());
        assert_eq!(summary.diet.score, None);
    }

    #[test]
    fn test_score_records_end_to_end() {
        let at = days_before(5);
        let records = vec![
            RawSampleRecord::quantity(SampleType::DietScore, 16.0, Unit::Score, at, at),
            RawSampleRecord::quantity(SampleType::NicotineExposure, 4.0, Unit::Score, at, at),
            RawSampleRecord::quantity(SampleType::BloodLipids, 250.0, Unit::MilligramsPerDeciliter, at, at),
            RawSampleRecord::quantity(SampleType::BodyMassIndex, 24.0, Unit::Count, at, at),
            RawSampleRecord::blood_pressure(118.0, 76.0, at, at),
        ];

        let summary = score_records(&records, eval_time()).unwrap();

        assert_eq!(summary.diet.score, Some(1.0));
        assert_eq!(summary.nicotine_exposure.score, Some(0.0));
        assert_eq!(summary.blood_lipids.score, Some(0.0));
        assert_eq!(summary.body_mass_index.score, Some(1.0));
        assert_eq!(summary.blood_pressure.score, Some(0.75));
        assert_eq!(summary.coverage(), 5);
        assert_eq!(summary.cvh_score(), Some((1.0 + 0.0 + 0.0 + 1.0 + 0.75) / 5.0));
    }

    #[test]
    fn test_score_records_rejects_invalid_batch() {
        let at = days_before(5);
        let mut record =
            RawSampleRecord::quantity(SampleType::DietScore, 16.0, Unit::Score, at, at);
        record.schema_version = "wrong".to_string();

        assert!(score_records(&[record], eval_time()).is_err());
    }
}
