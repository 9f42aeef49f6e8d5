//! Adapter for converting mhc.raw_sample.v1 records into a sample store
//!
//! Handles batch parsing (NDJSON or a JSON array) and conversion of validated
//! records into an [`InMemorySampleStore`] the scoring pipeline can query.

use crate::error::EngineError;
use crate::provider::InMemorySampleStore;
use crate::schema::raw_sample::*;
use crate::types::{BloodPressureSample, QuantitySample, SleepStageSample};
use uuid::Uuid;

/// Adapter for converting raw sample records into samples
pub struct RawSampleAdapter;

impl RawSampleAdapter {
    /// Parse a JSON string containing an array of records
    pub fn parse_array(json: &str) -> Result<Vec<RawSampleRecord>, EngineError> {
        let records: Vec<RawSampleRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) containing records
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<RawSampleRecord>, EngineError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawSampleRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(EngineError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Validate a batch of records, reporting each failure with its position
    pub fn validate_records(records: &[RawSampleRecord]) -> Vec<ValidationReport> {
        records
            .iter()
            .enumerate()
            .map(|(idx, record)| ValidationReport {
                index: idx,
                record_id: record.record_id,
                error: record.validate().err(),
            })
            .filter(|r| r.error.is_some())
            .collect()
    }

    /// Convert validated records into an in-memory sample store.
    ///
    /// Fails on the first invalid record; batches that should tolerate bad
    /// records go through [`Self::validate_records`] first.
    pub fn to_store(records: &[RawSampleRecord]) -> Result<InMemorySampleStore, EngineError> {
        let mut store = InMemorySampleStore::new();

        for (idx, record) in records.iter().enumerate() {
            if let Err(e) = record.validate() {
                return Err(EngineError::ParseError(format!(
                    "Invalid record at index {}: {}",
                    idx, e
                )));
            }

            let id = record.record_id.unwrap_or_else(Uuid::new_v4);
            match &record.payload {
                Payload::Quantity { quantity } => {
                    store.insert(
                        QuantitySample::new(
                            quantity.sample_type.clone(),
                            quantity.unit.clone(),
                            quantity.value,
                            record.start,
                            record.end,
                        )
                        .with_id(id),
                    );
                }
                Payload::BloodPressure { blood_pressure } => {
                    let mut sample = BloodPressureSample::new(
                        blood_pressure.systolic,
                        blood_pressure.diastolic,
                        record.start,
                        record.end,
                    );
                    sample.id = id;
                    store.insert_blood_pressure(sample);
                }
                Payload::SleepStage { sleep_stage } => {
                    let mut sample =
                        SleepStageSample::new(sleep_stage.stage, record.start, record.end);
                    sample.id = id;
                    store.insert_sleep_stage(sample);
                }
            }
        }

        Ok(store)
    }
}

/// Validation failure for one record in a batch
#[derive(Debug)]
pub struct ValidationReport {
    pub index: usize,
    pub record_id: Option<Uuid>,
    pub error: Option<ValidationError>,
}
