//! Per-factor score resolvers
//!
//! One resolver per CVH sub-factor. Each picks the most clinically relevant
//! evidence from the samples it is handed, maps it through the factor's rule
//! table, and reports the time range the evidence covers. Missing or stale
//! evidence yields an absent score, never an error.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::cvh::definitions;
use crate::score::ScoreInput;
use crate::types::{
    BloodPressureSample, NicotineCategory, QuantitySample, SampleType, SleepSession, TimeRange,
    Unit,
};

/// Staleness window for weight-derived BMI, in calendar months
const BMI_WEIGHT_STALENESS_MONTHS: u32 = 6;

/// The eight CVH sub-factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CvhFactor {
    Diet,
    PhysicalExercise,
    NicotineExposure,
    Sleep,
    BodyMassIndex,
    BloodLipids,
    BloodGlucose,
    BloodPressure,
}

impl CvhFactor {
    pub fn as_str(&self) -> &'static str {
        match self {
            CvhFactor::Diet => "diet",
            CvhFactor::PhysicalExercise => "physical_exercise",
            CvhFactor::NicotineExposure => "nicotine_exposure",
            CvhFactor::Sleep => "sleep",
            CvhFactor::BodyMassIndex => "body_mass_index",
            CvhFactor::BloodLipids => "blood_lipids",
            CvhFactor::BloodGlucose => "blood_glucose",
            CvhFactor::BloodPressure => "blood_pressure",
        }
    }
}

/// Outcome of resolving one sub-factor: the raw input used (if any), the
/// normalized score (if any), and the time range of the evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub factor: CvhFactor,
    pub value: Option<ScoreInput>,
    pub score: Option<f64>,
    pub time_range: Option<TimeRange>,
}

impl ScoreResult {
    pub fn absent(factor: CvhFactor) -> Self {
        Self {
            factor,
            value: None,
            score: None,
            time_range: None,
        }
    }

    fn scored(factor: CvhFactor, value: ScoreInput, score: f64, time_range: TimeRange) -> Self {
        Self {
            factor,
            value: Some(value),
            score: Some(score),
            time_range: Some(time_range),
        }
    }

    pub fn has_score(&self) -> bool {
        self.score.is_some()
    }
}

/// Latest-ending sample of the given type
fn most_recent<'a>(
    samples: &'a [QuantitySample],
    sample_type: &SampleType,
) -> Option<&'a QuantitySample> {
    samples
        .iter()
        .filter(|s| &s.sample_type == sample_type)
        .max_by_key(|s| s.end)
}

/// Diet: most recent questionnaire score on the 0-16 scale
pub fn resolve_diet(samples: &[QuantitySample]) -> ScoreResult {
    match most_recent(samples, &SampleType::DietScore) {
        Some(sample) => {
            let input = ScoreInput::Float(sample.value);
            let score = definitions::diet().apply(&input);
            ScoreResult::scored(CvhFactor::Diet, input, score, sample.time_range())
        }
        None => ScoreResult::absent(CvhFactor::Diet),
    }
}

/// Physical exercise: weekly-summed exercise minutes statistic
pub fn resolve_physical_exercise(weekly_minutes: Option<&QuantitySample>) -> ScoreResult {
    let Some(sample) = weekly_minutes else {
        return ScoreResult::absent(CvhFactor::PhysicalExercise);
    };
    let Some(minutes) = sample.value_in(&Unit::Minutes) else {
        return ScoreResult::absent(CvhFactor::PhysicalExercise);
    };
    let input = ScoreInput::Float(minutes);
    let score = definitions::physical_exercise().apply(&input);
    ScoreResult::scored(
        CvhFactor::PhysicalExercise,
        input,
        score,
        sample.time_range(),
    )
}

/// Nicotine exposure: most recent self-reported category.
///
/// The data-entry form stores the category as its 0-4 index; an index
/// outside that range is unusable evidence and yields an absent score.
pub fn resolve_nicotine_exposure(samples: &[QuantitySample]) -> ScoreResult {
    let Some(sample) = most_recent(samples, &SampleType::NicotineExposure) else {
        return ScoreResult::absent(CvhFactor::NicotineExposure);
    };
    if sample.value.fract() != 0.0 {
        return ScoreResult::absent(CvhFactor::NicotineExposure);
    }
    match NicotineCategory::from_index(sample.value as i64) {
        Some(category) => {
            let input = ScoreInput::category(category.as_str());
            let score = definitions::nicotine_exposure().apply(&input);
            ScoreResult::scored(
                CvhFactor::NicotineExposure,
                input,
                score,
                sample.time_range(),
            )
        }
        None => ScoreResult::absent(CvhFactor::NicotineExposure),
    }
}

/// Sleep: total time asleep of the most recent pre-split session, in hours
pub fn resolve_sleep(sessions: &[SleepSession]) -> ScoreResult {
    match sessions.iter().max_by_key(|s| s.end) {
        Some(session) => {
            let input = ScoreInput::Float(session.total_asleep_hours());
            let score = definitions::sleep().apply(&input);
            ScoreResult::scored(CvhFactor::Sleep, input, score, session.time_range())
        }
        None => ScoreResult::absent(CvhFactor::Sleep),
    }
}

/// Body mass index, reconciling three evidence sources.
///
/// A direct BMI sample is used unless weight and height are both present and
/// the weight sample ends strictly after the BMI sample, in which case the
/// fresher weight wins and BMI is recomputed. Without a direct sample, both
/// weight and height are required, and a weight older than six calendar
/// months at evaluation time is treated the same as missing evidence.
pub fn resolve_body_mass_index(
    samples: &[QuantitySample],
    evaluated_at: DateTime<Utc>,
) -> ScoreResult {
    let bmi = most_recent(samples, &SampleType::BodyMassIndex);
    let weight = most_recent(samples, &SampleType::BodyMass);
    let height = most_recent(samples, &SampleType::Height);

    match bmi {
        Some(direct) => {
            if let (Some(w), Some(h)) = (weight, height) {
                if w.end > direct.end {
                    if let Some(derived) = derive_bmi(w, h) {
                        return score_bmi(&derived);
                    }
                }
            }
            score_bmi(direct)
        }
        None => match (weight, height) {
            (Some(w), Some(h)) => {
                if weight_is_stale(w, evaluated_at) {
                    return ScoreResult::absent(CvhFactor::BodyMassIndex);
                }
                match derive_bmi(w, h) {
                    Some(derived) => score_bmi(&derived),
                    None => ScoreResult::absent(CvhFactor::BodyMassIndex),
                }
            }
            _ => ScoreResult::absent(CvhFactor::BodyMassIndex),
        },
    }
}

fn score_bmi(sample: &QuantitySample) -> ScoreResult {
    let input = ScoreInput::Float(sample.value);
    let score = definitions::body_mass_index().apply(&input);
    ScoreResult::scored(CvhFactor::BodyMassIndex, input, score, sample.time_range())
}

/// Synthesize a BMI point sample (kg/m²) dated at the later of the two
/// source end dates
fn derive_bmi(weight: &QuantitySample, height: &QuantitySample) -> Option<QuantitySample> {
    let kg = weight.value_in(&Unit::Kilograms)?;
    let meters = height.value_in(&Unit::Meters)?;
    if meters <= 0.0 {
        return None;
    }
    let value = kg / (meters * meters);
    let at = weight.end.max(height.end);
    Some(QuantitySample::at_instant(
        SampleType::BodyMassIndex,
        Unit::Count,
        value,
        at,
    ))
}

fn weight_is_stale(weight: &QuantitySample, evaluated_at: DateTime<Utc>) -> bool {
    match weight
        .end
        .checked_add_months(Months::new(BMI_WEIGHT_STALENESS_MONTHS))
    {
        Some(expiry) => expiry < evaluated_at,
        None => true,
    }
}

/// Blood lipids: most recent custom sample, mg/dL
pub fn resolve_blood_lipids(samples: &[QuantitySample]) -> ScoreResult {
    match most_recent(samples, &SampleType::BloodLipids) {
        Some(sample) => {
            let input = ScoreInput::Float(sample.value);
            let score = definitions::blood_lipids().apply(&input);
            ScoreResult::scored(CvhFactor::BloodLipids, input, score, sample.time_range())
        }
        None => ScoreResult::absent(CvhFactor::BloodLipids),
    }
}

/// Blood glucose: placeholder scoring.
///
/// The glucose banding has not been specified by the study protocol yet, so
/// any available reading scores a constant 0.5. Known gap; do not extend
/// without protocol sign-off.
pub fn resolve_blood_glucose(samples: &[QuantitySample]) -> ScoreResult {
    match most_recent(samples, &SampleType::BloodGlucose) {
        Some(sample) => ScoreResult::scored(
            CvhFactor::BloodGlucose,
            ScoreInput::Float(sample.value),
            0.5,
            sample.time_range(),
        ),
        None => ScoreResult::absent(CvhFactor::BloodGlucose),
    }
}

/// Blood pressure: most recent correlated reading, both sub-values required
pub fn resolve_blood_pressure(samples: &[BloodPressureSample]) -> ScoreResult {
    let Some(sample) = samples.iter().max_by_key(|s| s.end) else {
        return ScoreResult::absent(CvhFactor::BloodPressure);
    };
    match blood_pressure_score(sample.systolic, sample.diastolic) {
        Some(score) => ScoreResult::scored(
            CvhFactor::BloodPressure,
            ScoreInput::category(format!("{:.0}/{:.0}", sample.systolic, sample.diastolic)),
            score,
            sample.time_range(),
        ),
        None => ScoreResult::absent(CvhFactor::BloodPressure),
    }
}

/// Ordered band match over the systolic/diastolic pair.
///
/// The table has a known uncovered region: systolic below 100 combined with
/// diastolic 80-99 matches no band and yields no score. Pending
/// clarification from the study protocol owners; do not patch silently.
fn blood_pressure_score(systolic: f64, diastolic: f64) -> Option<f64> {
    if systolic < 100.0 && diastolic < 80.0 {
        Some(1.0)
    } else if systolic < 130.0 && diastolic < 80.0 {
        Some(0.75)
    } else if ((130.0..140.0).contains(&systolic) && diastolic < 90.0)
        || ((100.0..140.0).contains(&systolic) && (80.0..90.0).contains(&diastolic))
    {
        Some(0.5)
    } else if ((140.0..160.0).contains(&systolic) && diastolic < 100.0)
        || ((100.0..160.0).contains(&systolic) && (90.0..100.0).contains(&diastolic))
    {
        Some(0.25)
    } else if systolic >= 160.0 || diastolic >= 100.0 {
        Some(0.0)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap()
    }

    fn sample(sample_type: SampleType, unit: Unit, value: f64, at: DateTime<Utc>) -> QuantitySample {
        QuantitySample::at_instant(sample_type, unit, value, at)
    }

    #[test]
    fn test_diet_uses_most_recent_sample() {
        let samples = vec![
            sample(SampleType::DietScore, Unit::Score, 5.0, day(1)),
            sample(SampleType::DietScore, Unit::Score, 13.0, day(10)),
            sample(SampleType::DietScore, Unit::Score, 2.0, day(4)),
        ];
        let result = resolve_diet(&samples);
        assert_eq!(result.score, Some(0.8));
        assert_eq!(result.time_range, Some(TimeRange::instant(day(10))));
    }

    #[test]
    fn test_diet_absent_without_samples() {
        let result = resolve_diet(&[]);
        assert_eq!(result.score, None);
        assert_eq!(result.time_range, None);
    }

    #[test]
    fn test_exercise_weekly_minutes() {
        let week = QuantitySample::new(
            SampleType::ExerciseMinutes,
            Unit::Minutes,
            135.0,
            day(1),
            day(8),
        );
        let result = resolve_physical_exercise(Some(&week));
        assert_eq!(result.score, Some(0.9));

        assert_eq!(resolve_physical_exercise(None).score, None);
    }

    #[test]
    fn test_nicotine_category_mapping() {
        let samples = vec![sample(SampleType::NicotineExposure, Unit::Score, 0.0, day(3))];
        assert_eq!(resolve_nicotine_exposure(&samples).score, Some(1.0));

        let samples = vec![sample(SampleType::NicotineExposure, Unit::Score, 4.0, day(3))];
        assert_eq!(resolve_nicotine_exposure(&samples).score, Some(0.0));

        // Out-of-range index is unusable evidence, not a default score
        let samples = vec![sample(SampleType::NicotineExposure, Unit::Score, 9.0, day(3))];
        assert_eq!(resolve_nicotine_exposure(&samples).score, None);
    }

    #[test]
    fn test_sleep_scores_latest_session() {
        let sessions = vec![
            SleepSession {
                start: day(1),
                end: day(1) + Duration::hours(8),
                total_asleep_minutes: 300.0,
            },
            SleepSession {
                start: day(2),
                end: day(2) + Duration::hours(9),
                total_asleep_minutes: 480.0,
            },
        ];
        let result = resolve_sleep(&sessions);
        // 480 minutes = 8 hours
        assert_eq!(result.score, Some(1.0));
        assert_eq!(result.time_range.unwrap().start, day(2));
    }

    #[test]
    fn test_bmi_direct_sample_wins_over_older_weight() {
        // BMI dated day 12, weight dated day 10: use the direct sample
        let samples = vec![
            sample(SampleType::BodyMassIndex, Unit::Count, 27.0, day(12)),
            sample(SampleType::BodyMass, Unit::Kilograms, 60.0, day(10)),
            sample(SampleType::Height, Unit::Meters, 1.75, day(1)),
        ];
        let result = resolve_body_mass_index(&samples, day(20));
        assert_eq!(result.score, Some(0.7));
        assert_eq!(result.value, Some(ScoreInput::Float(27.0)));
    }

    #[test]
    fn test_bmi_newer_weight_overrides_direct_sample() {
        // BMI dated day 10, weight dated day 12, height dated day 1:
        // the fresher weight wins and BMI is recomputed
        let samples = vec![
            sample(SampleType::BodyMassIndex, Unit::Count, 27.0, day(10)),
            sample(SampleType::BodyMass, Unit::Kilograms, 60.0, day(12)),
            sample(SampleType::Height, Unit::Meters, 1.75, day(1)),
        ];
        let result = resolve_body_mass_index(&samples, day(20));
        // 60 / 1.75² = 19.59 → band below 25
        assert_eq!(result.score, Some(1.0));
        // Derived sample sits at the later of the two source end dates
        assert_eq!(result.time_range, Some(TimeRange::instant(day(12))));
    }

    #[test]
    fn test_bmi_derived_from_weight_and_height() {
        let samples = vec![
            sample(SampleType::BodyMass, Unit::Kilograms, 95.0, day(5)),
            sample(SampleType::Height, Unit::Centimeters, 175.0, day(1)),
        ];
        let result = resolve_body_mass_index(&samples, day(20));
        // 95 / 1.75² = 31.02 → 30-35 band
        assert_eq!(result.score, Some(0.3));
    }

    #[test]
    fn test_bmi_absent_with_partial_inputs() {
        let weight_only = vec![sample(SampleType::BodyMass, Unit::Kilograms, 70.0, day(5))];
        assert_eq!(resolve_body_mass_index(&weight_only, day(20)).score, None);

        let height_only = vec![sample(SampleType::Height, Unit::Meters, 1.8, day(5))];
        assert_eq!(resolve_body_mass_index(&height_only, day(20)).score, None);

        assert_eq!(resolve_body_mass_index(&[], day(20)).score, None);
    }

    #[test]
    fn test_bmi_weight_staleness_boundary() {
        let weighed_at = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let samples = vec![
            sample(SampleType::BodyMass, Unit::Kilograms, 70.0, weighed_at),
            sample(SampleType::Height, Unit::Meters, 1.75, weighed_at),
        ];

        // One day inside the six-month window: still usable
        let inside = Utc.with_ymd_and_hms(2024, 7, 14, 12, 0, 0).unwrap();
        assert!(resolve_body_mass_index(&samples, inside).score.is_some());

        // Exactly six months later: still usable
        let boundary = Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap();
        assert!(resolve_body_mass_index(&samples, boundary).score.is_some());

        // One day past the window: treated as missing evidence
        let outside = Utc.with_ymd_and_hms(2024, 7, 16, 12, 0, 0).unwrap();
        assert_eq!(resolve_body_mass_index(&samples, outside).score, None);
    }

    #[test]
    fn test_bmi_very_stale_weight_is_rejected() {
        let weighed_at = day(1) - Duration::days(400);
        let samples = vec![
            sample(SampleType::BodyMass, Unit::Kilograms, 70.0, weighed_at),
            sample(SampleType::Height, Unit::Meters, 1.75, day(1)),
        ];
        assert_eq!(resolve_body_mass_index(&samples, day(1)).score, None);
    }

    #[test]
    fn test_bmi_pound_and_centimeter_inputs() {
        let samples = vec![
            sample(SampleType::BodyMass, Unit::Pounds, 154.324, day(5)),
            sample(SampleType::Height, Unit::Centimeters, 175.0, day(1)),
        ];
        let result = resolve_body_mass_index(&samples, day(20));
        // 70 kg / 1.75² = 22.86 → below 25
        assert_eq!(result.score, Some(1.0));
    }

    #[test]
    fn test_glucose_placeholder_scoring() {
        let samples = vec![sample(
            SampleType::BloodGlucose,
            Unit::MilligramsPerDeciliter,
            160.0,
            day(2),
        )];
        // Constant until the protocol defines glucose bands
        assert_eq!(resolve_blood_glucose(&samples).score, Some(0.5));
        assert_eq!(resolve_blood_glucose(&[]).score, None);
    }

    #[test]
    fn test_blood_pressure_bands() {
        let reading = |sys, dia| {
            vec![BloodPressureSample::new(sys, dia, day(3), day(3))]
        };
        assert_eq!(resolve_blood_pressure(&reading(95.0, 70.0)).score, Some(1.0));
        assert_eq!(resolve_blood_pressure(&reading(120.0, 75.0)).score, Some(0.75));
        assert_eq!(resolve_blood_pressure(&reading(135.0, 85.0)).score, Some(0.5));
        assert_eq!(resolve_blood_pressure(&reading(150.0, 95.0)).score, Some(0.25));
        assert_eq!(resolve_blood_pressure(&reading(165.0, 70.0)).score, Some(0.0));
        assert_eq!(resolve_blood_pressure(&reading(120.0, 105.0)).score, Some(0.0));
    }

    #[test]
    fn test_blood_pressure_boundary_vectors() {
        let reading = |sys, dia| {
            vec![BloodPressureSample::new(sys, dia, day(3), day(3))]
        };
        // Systolic branch of the 0.5 band
        assert_eq!(resolve_blood_pressure(&reading(130.0, 79.0)).score, Some(0.5));
        // Uncovered region of the band table: no score
        assert_eq!(resolve_blood_pressure(&reading(99.0, 81.0)).score, None);
    }

    #[test]
    fn test_blood_pressure_absent_without_reading() {
        let result = resolve_blood_pressure(&[]);
        assert_eq!(result.score, None);
        assert_eq!(result.time_range, None);
    }
}
