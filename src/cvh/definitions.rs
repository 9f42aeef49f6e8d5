//! Rule tables for the CVH sub-factors
//!
//! One constructor per factor, each returning an immutable [`ScoreDefinition`]
//! meant to be built once and reused across scoring calls. Band boundaries
//! follow the study's clinical protocol; changing them changes reported
//! scores, so they are mirrored verbatim in the resolver tests.

use crate::score::{Band, Predicate, RangeRule, ScoreDefinition};
use crate::types::NicotineCategory;

/// Diet questionnaire score, integer 0-16 scale
pub fn diet() -> ScoreDefinition {
    ScoreDefinition::new(
        vec![
            Band::new(Predicate::Int(RangeRule::Closed(15, 16)), 1.0),
            Band::new(Predicate::Int(RangeRule::Closed(12, 14)), 0.8),
            Band::new(Predicate::Int(RangeRule::Closed(8, 11)), 0.5),
            Band::new(Predicate::Int(RangeRule::Closed(4, 7)), 0.25),
        ],
        0.0,
    )
}

/// Total exercise minutes summed over one week
pub fn physical_exercise() -> ScoreDefinition {
    ScoreDefinition::new(
        vec![
            Band::new(Predicate::Float(RangeRule::AtLeast(150.0)), 1.0),
            Band::new(Predicate::Float(RangeRule::HalfOpen(120.0, 150.0)), 0.9),
            Band::new(Predicate::Float(RangeRule::HalfOpen(90.0, 120.0)), 0.8),
            Band::new(Predicate::Float(RangeRule::HalfOpen(60.0, 90.0)), 0.6),
            Band::new(Predicate::Float(RangeRule::HalfOpen(30.0, 60.0)), 0.4),
            Band::new(Predicate::Float(RangeRule::HalfOpen(1.0, 30.0)), 0.2),
        ],
        0.0,
    )
}

/// Self-reported nicotine exposure category
pub fn nicotine_exposure() -> ScoreDefinition {
    let band = |category: NicotineCategory, score: f64| {
        Band::new(Predicate::Category(category.as_str().to_string()), score)
    };
    ScoreDefinition::new(
        vec![
            band(NicotineCategory::NeverSmoked, 1.0),
            band(NicotineCategory::QuitMoreThanFiveYearsAgo, 0.75),
            band(NicotineCategory::QuitOneToFiveYearsAgo, 0.5),
            band(NicotineCategory::QuitWithinLastYear, 0.25),
            band(NicotineCategory::ActivelySmoking, 0.0),
        ],
        0.0,
    )
}

/// Total time asleep per session, in hours.
///
/// Bands overlap at the edges; declaration order resolves the ties
/// (9 h scores 1.0, 10 h scores 0.9, 6-7 h scores 0.7 before the wider
/// 5-7 h band applies to the remainder).
pub fn sleep() -> ScoreDefinition {
    ScoreDefinition::new(
        vec![
            Band::new(Predicate::Float(RangeRule::Closed(7.0, 9.0)), 1.0),
            Band::new(Predicate::Float(RangeRule::Closed(9.0, 10.0)), 0.9),
            Band::new(Predicate::Float(RangeRule::Closed(6.0, 7.0)), 0.7),
            Band::new(Predicate::Float(RangeRule::HalfOpen(5.0, 7.0)), 0.4),
            Band::new(Predicate::Float(RangeRule::AtLeast(10.0)), 0.4),
            Band::new(Predicate::Float(RangeRule::Closed(4.0, 5.0)), 0.2),
        ],
        0.0,
    )
}

/// Body mass index, kg/m²
pub fn body_mass_index() -> ScoreDefinition {
    ScoreDefinition::new(
        vec![
            Band::new(Predicate::Float(RangeRule::LessThan(25.0)), 1.0),
            Band::new(Predicate::Float(RangeRule::HalfOpen(25.0, 30.0)), 0.7),
            Band::new(Predicate::Float(RangeRule::HalfOpen(30.0, 35.0)), 0.3),
            Band::new(Predicate::Float(RangeRule::HalfOpen(35.0, 40.0)), 0.15),
            Band::new(Predicate::Float(RangeRule::AtLeast(40.0)), 0.0),
        ],
        0.0,
    )
}

/// Non-HDL blood lipids, mg/dL
pub fn blood_lipids() -> ScoreDefinition {
    ScoreDefinition::new(
        vec![
            Band::new(Predicate::Float(RangeRule::LessThan(130.0)), 1.0),
            Band::new(Predicate::Float(RangeRule::HalfOpen(130.0, 160.0)), 0.6),
            Band::new(Predicate::Float(RangeRule::HalfOpen(160.0, 190.0)), 0.4),
            Band::new(Predicate::Float(RangeRule::HalfOpen(190.0, 220.0)), 0.2),
            Band::new(Predicate::Float(RangeRule::AtLeast(220.0)), 0.0),
        ],
        0.0,
    )
}
