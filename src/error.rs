//! Error types for the CVH engine

use thiserror::Error;

/// Errors that can occur at the engine boundary.
///
/// The scoring core itself never errors; missing or unusable evidence is an
/// absent score. These variants cover the trust boundary where external
/// records are parsed and converted.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to parse sample records: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
