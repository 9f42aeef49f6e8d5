//! Unified mhc.raw_sample.v1 schema
//!
//! This module defines the portable input schema for health samples. Hosts
//! serialize their platform samples into these records; the adapter turns a
//! validated batch into an in-memory store the scoring pipeline can query.

mod raw_sample;
mod adapter;

pub use raw_sample::*;
pub use adapter::*;
