//! Boundary interfaces for sample data
//!
//! The scoring core pulls immutable snapshots through these traits and stays
//! agnostic to where samples live. Two concrete providers exist in the app
//! (the platform health store and the local research-sample store); this
//! crate ships an in-memory store that serves both roles for tests, the CLI,
//! and host integrations.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::aggregate::{aggregated, AggregationKind, AggregationStrategy, BucketInterval, SeriesReduction};
use crate::sleep::SleepSessionBuilder;
use crate::types::{
    BloodPressureSample, QuantitySample, SampleType, SleepSession, SleepStageSample, TimeRange,
};

/// Source of raw samples for a time range
pub trait SampleProvider {
    /// Samples of the given type whose range falls into `range`
    fn quantity_samples(&self, sample_type: &SampleType, range: &TimeRange) -> Vec<QuantitySample>;

    /// Correlated blood-pressure readings within `range`
    fn blood_pressure_samples(&self, range: &TimeRange) -> Vec<BloodPressureSample> {
        let _ = range;
        Vec::new()
    }

    /// Raw sleep-stage category samples within `range`
    fn sleep_stage_samples(&self, range: &TimeRange) -> Vec<SleepStageSample> {
        let _ = range;
        Vec::new()
    }
}

/// Source of pre-aggregated statistical summaries, used instead of fetching
/// and locally reducing large raw series
pub trait StatisticsProvider {
    fn statistic(
        &self,
        sample_type: &SampleType,
        kind: AggregationKind,
        interval: BucketInterval,
        anchor: DateTime<Utc>,
        range: &TimeRange,
    ) -> Option<QuantitySample>;
}

/// Source of already-split, non-overlapping sleep sessions
pub trait SleepSessionProvider {
    fn sleep_sessions(&self, range: &TimeRange) -> Vec<SleepSession>;
}

fn in_range(range: &TimeRange, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    if start == end {
        range.contains(start)
    } else {
        range.overlaps(&TimeRange { start, end })
    }
}

/// In-memory sample store.
///
/// Backs the research custom-sample store (user CRUD via `insert`/`remove`)
/// and doubles as a test/CLI stand-in for the platform health store.
#[derive(Debug, Default, Clone)]
pub struct InMemorySampleStore {
    quantities: Vec<QuantitySample>,
    blood_pressure: Vec<BloodPressureSample>,
    sleep_stages: Vec<SleepStageSample>,
}

impl InMemorySampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sample: QuantitySample) {
        self.quantities.push(sample);
    }

    pub fn insert_blood_pressure(&mut self, sample: BloodPressureSample) {
        self.blood_pressure.push(sample);
    }

    pub fn insert_sleep_stage(&mut self, sample: SleepStageSample) {
        self.sleep_stages.push(sample);
    }

    /// Delete a sample by identifier. Returns whether anything was removed.
    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.len();
        self.quantities.retain(|s| s.id != id);
        self.blood_pressure.retain(|s| s.id != id);
        self.sleep_stages.retain(|s| s.id != id);
        self.len() != before
    }

    pub fn len(&self) -> usize {
        self.quantities.len() + self.blood_pressure.len() + self.sleep_stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SampleProvider for InMemorySampleStore {
    fn quantity_samples(&self, sample_type: &SampleType, range: &TimeRange) -> Vec<QuantitySample> {
        self.quantities
            .iter()
            .filter(|s| &s.sample_type == sample_type && in_range(range, s.start, s.end))
            .cloned()
            .collect()
    }

    fn blood_pressure_samples(&self, range: &TimeRange) -> Vec<BloodPressureSample> {
        self.blood_pressure
            .iter()
            .filter(|s| in_range(range, s.start, s.end))
            .cloned()
            .collect()
    }

    fn sleep_stage_samples(&self, range: &TimeRange) -> Vec<SleepStageSample> {
        self.sleep_stages
            .iter()
            .filter(|s| in_range(range, s.start, s.end))
            .cloned()
            .collect()
    }
}

impl StatisticsProvider for InMemorySampleStore {
    /// Serves statistics by reducing raw samples through the aggregation
    /// engine; a platform-backed provider would answer from precomputed
    /// statistics instead.
    fn statistic(
        &self,
        sample_type: &SampleType,
        kind: AggregationKind,
        interval: BucketInterval,
        anchor: DateTime<Utc>,
        range: &TimeRange,
    ) -> Option<QuantitySample> {
        let samples = self.quantity_samples(sample_type, range);
        let reduction = SeriesReduction::Pipeline {
            steps: vec![AggregationStrategy::new(kind, interval)],
            final_kind: Some(kind),
        };
        aggregated(&samples, &reduction, anchor, range).into_iter().next()
    }
}

impl SleepSessionProvider for InMemorySampleStore {
    fn sleep_sessions(&self, range: &TimeRange) -> Vec<SleepSession> {
        SleepSessionBuilder::split(&self.sleep_stage_samples(range))
    }
}
