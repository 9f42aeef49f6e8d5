//! Cardiovascular Health (CVH) scoring
//!
//! The CVH score is the average of eight normalized sub-factor scores: diet,
//! physical exercise, nicotine exposure, sleep, body mass index, blood
//! lipids, blood glucose, and blood pressure. Each factor has a resolver
//! that picks the most clinically relevant evidence from the available
//! samples and maps it through its rule table; the composite requires at
//! least five of the eight factors before reporting a value.

pub mod composite;
pub mod definitions;
pub mod resolvers;

pub use composite::{CvhSummary, MINIMUM_FACTOR_COVERAGE};
pub use resolvers::{CvhFactor, ScoreResult};
