//! Core types for the CVH engine
//!
//! This module defines the sample model shared by the scoring and aggregation
//! layers: typed physiological samples with a unit and a half-open time range,
//! correlated blood-pressure readings, and the sleep-stage/session types
//! produced at the boundary.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sample type tag, covering both platform-provided quantity types and
/// custom research-collected types
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleType {
    // Platform quantity types
    BodyMassIndex,
    BodyMass,
    Height,
    ExerciseMinutes,
    StepCount,
    HeartRate,
    BloodGlucose,

    // Custom research types (user-entered, stored locally)
    DietScore,
    NicotineExposure,
    BloodLipids,

    /// For extensibility
    #[serde(untagged)]
    Custom(String),
}

impl SampleType {
    pub fn as_str(&self) -> &str {
        match self {
            SampleType::BodyMassIndex => "body_mass_index",
            SampleType::BodyMass => "body_mass",
            SampleType::Height => "height",
            SampleType::ExerciseMinutes => "exercise_minutes",
            SampleType::StepCount => "step_count",
            SampleType::HeartRate => "heart_rate",
            SampleType::BloodGlucose => "blood_glucose",
            SampleType::DietScore => "diet_score",
            SampleType::NicotineExposure => "nicotine_exposure",
            SampleType::BloodLipids => "blood_lipids",
            SampleType::Custom(name) => name.as_str(),
        }
    }

    /// Whether this type is collected through the research data-entry forms
    /// rather than the platform health store
    pub fn is_research_type(&self) -> bool {
        matches!(
            self,
            SampleType::DietScore | SampleType::NicotineExposure | SampleType::BloodLipids
        )
    }
}

/// Measurement unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Count,
    Kilograms,
    Pounds,
    Meters,
    Centimeters,
    Minutes,
    Hours,
    MillimetersOfMercury,
    MilligramsPerDeciliter,
    /// Dimensionless normalized or questionnaire score
    Score,

    /// For extensibility
    #[serde(untagged)]
    Custom(String),
}

impl Unit {
    pub fn as_str(&self) -> &str {
        match self {
            Unit::Count => "count",
            Unit::Kilograms => "kilograms",
            Unit::Pounds => "pounds",
            Unit::Meters => "meters",
            Unit::Centimeters => "centimeters",
            Unit::Minutes => "minutes",
            Unit::Hours => "hours",
            Unit::MillimetersOfMercury => "millimeters_of_mercury",
            Unit::MilligramsPerDeciliter => "milligrams_per_deciliter",
            Unit::Score => "score",
            Unit::Custom(name) => name.as_str(),
        }
    }

    /// Conversion factor from `self` to `target`, when both are units of the
    /// same dimension. Identity for equal units.
    fn conversion_factor(&self, target: &Unit) -> Option<f64> {
        if self == target {
            return Some(1.0);
        }
        match (self, target) {
            (Unit::Pounds, Unit::Kilograms) => Some(0.453_592_37),
            (Unit::Kilograms, Unit::Pounds) => Some(1.0 / 0.453_592_37),
            (Unit::Centimeters, Unit::Meters) => Some(0.01),
            (Unit::Meters, Unit::Centimeters) => Some(100.0),
            (Unit::Minutes, Unit::Hours) => Some(1.0 / 60.0),
            (Unit::Hours, Unit::Minutes) => Some(60.0),
            _ => None,
        }
    }
}

/// Half-open time range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// # Panics
    /// Panics if `end` precedes `start`. A reversed range is a bug in the
    /// producing collaborator, not a recoverable condition.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(end >= start, "time range end precedes start");
        Self { start, end }
    }

    /// Zero-duration range at a single instant
    pub fn instant(at: DateTime<Utc>) -> Self {
        Self { start: at, end: at }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn is_instant(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }

    /// Whether two ranges share any span. Point samples are matched with
    /// [`TimeRange::contains`] on the enclosing range instead.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Intersection of two ranges, clipped to both
    pub fn clipped_to(&self, bounds: &TimeRange) -> TimeRange {
        TimeRange {
            start: self.start.max(bounds.start),
            end: self.end.min(bounds.end),
        }
    }
}

/// One measured quantity: a value, a unit, and the time range it covers.
///
/// Immutable once constructed; pipelines clone rather than mutate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantitySample {
    /// Stable identifier
    pub id: Uuid,
    /// What was measured
    pub sample_type: SampleType,
    /// Unit of `value`
    pub unit: Unit,
    /// Numeric value
    pub value: f64,
    /// Measurement start (UTC)
    pub start: DateTime<Utc>,
    /// Measurement end (UTC), `end >= start`
    pub end: DateTime<Utc>,
}

impl QuantitySample {
    /// # Panics
    /// Panics if `end` precedes `start` (see [`TimeRange::new`]).
    pub fn new(
        sample_type: SampleType,
        unit: Unit,
        value: f64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        assert!(end >= start, "sample end date precedes start date");
        Self {
            id: Uuid::new_v4(),
            sample_type,
            unit,
            value,
            start,
            end,
        }
    }

    /// Point-in-time sample with a zero-duration range
    pub fn at_instant(sample_type: SampleType, unit: Unit, value: f64, at: DateTime<Utc>) -> Self {
        Self::new(sample_type, unit, value, at, at)
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn time_range(&self) -> TimeRange {
        TimeRange {
            start: self.start,
            end: self.end,
        }
    }

    pub fn is_instant(&self) -> bool {
        self.start == self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Value converted into `target`, or `None` when the units are not of the
    /// same dimension
    pub fn value_in(&self, target: &Unit) -> Option<f64> {
        self.unit
            .conversion_factor(target)
            .map(|factor| self.value * factor)
    }
}

/// Correlated blood-pressure reading carrying both sub-values over one range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodPressureSample {
    pub id: Uuid,
    /// Systolic pressure (mmHg)
    pub systolic: f64,
    /// Diastolic pressure (mmHg)
    pub diastolic: f64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BloodPressureSample {
    /// # Panics
    /// Panics if `end` precedes `start`.
    pub fn new(systolic: f64, diastolic: f64, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(end >= start, "sample end date precedes start date");
        Self {
            id: Uuid::new_v4(),
            systolic,
            diastolic,
            start,
            end,
        }
    }

    pub fn time_range(&self) -> TimeRange {
        TimeRange {
            start: self.start,
            end: self.end,
        }
    }
}

/// Self-reported nicotine exposure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NicotineCategory {
    NeverSmoked,
    QuitMoreThanFiveYearsAgo,
    QuitOneToFiveYearsAgo,
    QuitWithinLastYear,
    ActivelySmoking,
}

impl NicotineCategory {
    /// Decode the 0-4 index used by the data-entry form, best state first
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(NicotineCategory::NeverSmoked),
            1 => Some(NicotineCategory::QuitMoreThanFiveYearsAgo),
            2 => Some(NicotineCategory::QuitOneToFiveYearsAgo),
            3 => Some(NicotineCategory::QuitWithinLastYear),
            4 => Some(NicotineCategory::ActivelySmoking),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NicotineCategory::NeverSmoked => "never_smoked",
            NicotineCategory::QuitMoreThanFiveYearsAgo => "quit_more_than_five_years_ago",
            NicotineCategory::QuitOneToFiveYearsAgo => "quit_one_to_five_years_ago",
            NicotineCategory::QuitWithinLastYear => "quit_within_last_year",
            NicotineCategory::ActivelySmoking => "actively_smoking",
        }
    }
}

/// Sleep stage classification (platform-agnostic)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepStage {
    InBed,
    Awake,
    AsleepCore,
    AsleepDeep,
    AsleepRem,
    AsleepUnspecified,
}

impl SleepStage {
    /// Whether time in this stage counts toward total time asleep
    pub fn is_asleep(&self) -> bool {
        matches!(
            self,
            SleepStage::AsleepCore
                | SleepStage::AsleepDeep
                | SleepStage::AsleepRem
                | SleepStage::AsleepUnspecified
        )
    }
}

/// Raw sleep-stage category sample as emitted by the health store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepStageSample {
    pub id: Uuid,
    pub stage: SleepStage,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SleepStageSample {
    /// # Panics
    /// Panics if `end` precedes `start`.
    pub fn new(stage: SleepStage, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(end >= start, "sample end date precedes start date");
        Self {
            id: Uuid::new_v4(),
            stage,
            start,
            end,
        }
    }

    pub fn time_range(&self) -> TimeRange {
        TimeRange {
            start: self.start,
            end: self.end,
        }
    }
}

/// A contiguous run of sleep-stage samples treated as one sleep event.
///
/// Sessions are split upstream of the scoring core (see the `sleep` module);
/// resolvers consume them as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepSession {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Total time spent in asleep stages within the session
    pub total_asleep_minutes: f64,
}

impl SleepSession {
    pub fn time_range(&self) -> TimeRange {
        TimeRange {
            start: self.start,
            end: self.end,
        }
    }

    pub fn total_asleep_hours(&self) -> f64 {
        self.total_asleep_minutes / 60.0
    }
}
