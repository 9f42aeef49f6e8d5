//! mhc.raw_sample.v1 schema definition
//!
//! A platform-agnostic schema for health samples that supports:
//! - Quantity samples (weight, minutes of exercise, lipid panels, scores)
//! - Correlated blood-pressure readings (systolic and diastolic together)
//! - Sleep-stage category samples

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{SampleType, SleepStage, Unit};

/// Current schema version
pub const SCHEMA_VERSION: &str = "mhc.raw_sample.v1";

/// Type of record contained in the sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Single numeric measurement with a unit
    Quantity,
    /// Correlated systolic/diastolic reading
    BloodPressure,
    /// Sleep-stage category over a time span
    SleepStage,
}

/// Numeric measurement payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantityPayload {
    /// What was measured
    #[serde(rename = "type")]
    pub sample_type: SampleType,
    /// Numeric value
    pub value: f64,
    /// Measurement unit
    pub unit: Unit,
}

/// Correlated blood-pressure payload, both values in mmHg
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloodPressurePayload {
    pub systolic: f64,
    pub diastolic: f64,
}

/// Sleep-stage category payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepStagePayload {
    pub stage: SleepStage,
}

/// Record payload - one of the three record kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Quantity { quantity: QuantityPayload },
    BloodPressure { blood_pressure: BloodPressurePayload },
    SleepStage { sleep_stage: SleepStagePayload },
}

/// The main mhc.raw_sample.v1 schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSampleRecord {
    /// Schema version identifier
    pub schema_version: String,
    /// Stable record identifier; generated when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<Uuid>,
    /// Measurement start (UTC)
    pub start: DateTime<Utc>,
    /// Measurement end (UTC)
    pub end: DateTime<Utc>,
    /// Type of record
    pub record_kind: RecordKind,
    /// Record payload (depends on record_kind)
    pub payload: Payload,
}

impl RawSampleRecord {
    /// Create a new quantity record
    pub fn quantity(
        sample_type: SampleType,
        value: f64,
        unit: Unit,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        RawSampleRecord {
            schema_version: SCHEMA_VERSION.to_string(),
            record_id: Some(Uuid::new_v4()),
            start,
            end,
            record_kind: RecordKind::Quantity,
            payload: Payload::Quantity {
                quantity: QuantityPayload {
                    sample_type,
                    value,
                    unit,
                },
            },
        }
    }

    /// Create a new blood-pressure record
    pub fn blood_pressure(
        systolic: f64,
        diastolic: f64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        RawSampleRecord {
            schema_version: SCHEMA_VERSION.to_string(),
            record_id: Some(Uuid::new_v4()),
            start,
            end,
            record_kind: RecordKind::BloodPressure,
            payload: Payload::BloodPressure {
                blood_pressure: BloodPressurePayload {
                    systolic,
                    diastolic,
                },
            },
        }
    }

    /// Create a new sleep-stage record
    pub fn sleep_stage(stage: SleepStage, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        RawSampleRecord {
            schema_version: SCHEMA_VERSION.to_string(),
            record_id: Some(Uuid::new_v4()),
            start,
            end,
            record_kind: RecordKind::SleepStage,
            payload: Payload::SleepStage {
                sleep_stage: SleepStagePayload { stage },
            },
        }
    }

    /// Validate the record.
    ///
    /// A reversed time range is recoverable here; past this boundary the
    /// core types treat it as a programmer error.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ValidationError::InvalidSchemaVersion {
                expected: SCHEMA_VERSION.to_string(),
                actual: self.schema_version.clone(),
            });
        }

        if self.end < self.start {
            return Err(ValidationError::ReversedTimeRange {
                start: self.start,
                end: self.end,
            });
        }

        match (&self.record_kind, &self.payload) {
            (RecordKind::Quantity, Payload::Quantity { .. }) => Ok(()),
            (RecordKind::BloodPressure, Payload::BloodPressure { .. }) => Ok(()),
            (RecordKind::SleepStage, Payload::SleepStage { .. }) => Ok(()),
            _ => Err(ValidationError::PayloadKindMismatch {
                record_kind: format!("{:?}", self.record_kind),
                payload_kind: self.payload_kind_name(),
            }),
        }
    }

    fn payload_kind_name(&self) -> String {
        match &self.payload {
            Payload::Quantity { .. } => "quantity".to_string(),
            Payload::BloodPressure { .. } => "blood_pressure".to_string(),
            Payload::SleepStage { .. } => "sleep_stage".to_string(),
        }
    }
}

/// Validation errors for raw sample records
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("Reversed time range: end {end} precedes start {start}")]
    ReversedTimeRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Payload kind mismatch: record_kind is {record_kind} but payload is {payload_kind}")]
    PayloadKindMismatch {
        record_kind: String,
        payload_kind: String,
    },
}
