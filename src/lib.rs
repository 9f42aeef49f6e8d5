//! CVH Engine - Cardiovascular health scoring over portable health samples
//!
//! The engine turns raw health samples into a cardiovascular health summary
//! through a deterministic pipeline: record adaptation → evidence selection →
//! per-factor banded scoring → composite aggregation.
//!
//! ## Modules
//!
//! - **Scoring Core**: Ordered band tables and the eight factor resolvers
//! - **Aggregation**: Calendar-bucketed reduction of raw sample series
//! - **Schema**: The mhc.raw_sample.v1 input record format

pub mod aggregate;
pub mod cvh;
pub mod error;
pub mod pipeline;
pub mod provider;
pub mod schema;
pub mod score;
pub mod sleep;
pub mod types;

pub use cvh::{CvhFactor, CvhSummary, ScoreResult, MINIMUM_FACTOR_COVERAGE};
pub use error::EngineError;
pub use pipeline::{score_records, CvhProcessor};

// Schema exports
pub use schema::{RawSampleAdapter, RawSampleRecord, SCHEMA_VERSION};

/// Engine version embedded in CLI output envelopes
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for output envelopes
pub const PRODUCER_NAME: &str = "cvh-engine";
