//! Score definition engine
//!
//! A score definition is an ordered rule table mapping a raw input value onto
//! the normalized 0-1 "goodness" scale: each band pairs a predicate with a
//! score, rules are tried in declaration order, first match wins, and a
//! default score applies when nothing matches. Absence of a match is a normal
//! outcome, never an error.

use serde::{Deserialize, Serialize};

/// Input value presented to a score definition.
///
/// Numeric inputs are tagged rather than dynamically typed; coercion between
/// the integer and floating-point variants is explicit per pairing (see
/// [`Predicate::matches`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreInput {
    Int(i64),
    Float(f64),
    Category(String),
}

impl ScoreInput {
    pub fn category(value: impl Into<String>) -> Self {
        ScoreInput::Category(value.into())
    }
}

impl From<i64> for ScoreInput {
    fn from(v: i64) -> Self {
        ScoreInput::Int(v)
    }
}

impl From<f64> for ScoreInput {
    fn from(v: f64) -> Self {
        ScoreInput::Float(v)
    }
}

/// Range membership rule over one numeric domain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeRule<T> {
    /// Closed range `[a, b]`
    Closed(T, T),
    /// Half-open range `[a, b)`
    HalfOpen(T, T),
    /// Open-ended `>= a`
    AtLeast(T),
    /// Open-ended `< b`
    LessThan(T),
    /// Open-ended `<= b`
    AtMost(T),
}

impl<T: PartialOrd + Copy> RangeRule<T> {
    pub fn contains(&self, value: T) -> bool {
        match *self {
            RangeRule::Closed(a, b) => a <= value && value <= b,
            RangeRule::HalfOpen(a, b) => a <= value && value < b,
            RangeRule::AtLeast(a) => value >= a,
            RangeRule::LessThan(b) => value < b,
            RangeRule::AtMost(b) => value <= b,
        }
    }
}

impl<T: std::fmt::Display> RangeRule<T> {
    /// Human-readable rendering for gauge labels and CLI output
    pub fn describe(&self) -> String {
        match self {
            RangeRule::Closed(a, b) => format!("{a} to {b}"),
            RangeRule::HalfOpen(a, b) => format!("{a} to below {b}"),
            RangeRule::AtLeast(a) => format!("{a} or more"),
            RangeRule::LessThan(b) => format!("below {b}"),
            RangeRule::AtMost(b) => format!("{b} or less"),
        }
    }
}

/// Predicate tested against a [`ScoreInput`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Int(RangeRule<i64>),
    Float(RangeRule<f64>),
    Category(String),
}

impl Predicate {
    /// Test the predicate against an input.
    ///
    /// Coercion policy:
    /// - integer input against a float rule: converted exactly, always tested;
    /// - float input against an integer rule: tested only when the value has
    ///   an exact integer representation, otherwise the rule falls through;
    /// - category/numeric mismatches fall through.
    pub fn matches(&self, input: &ScoreInput) -> bool {
        match (self, input) {
            (Predicate::Int(rule), ScoreInput::Int(i)) => rule.contains(*i),
            (Predicate::Int(rule), ScoreInput::Float(f)) => match lossless_int(*f) {
                Some(i) => rule.contains(i),
                None => false,
            },
            (Predicate::Float(rule), ScoreInput::Float(f)) => rule.contains(*f),
            (Predicate::Float(rule), ScoreInput::Int(i)) => rule.contains(*i as f64),
            (Predicate::Category(expected), ScoreInput::Category(actual)) => expected == actual,
            _ => false,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Predicate::Int(rule) => rule.describe(),
            Predicate::Float(rule) => rule.describe(),
            Predicate::Category(value) => value.clone(),
        }
    }
}

/// Exact integer representation of a float, when one exists
fn lossless_int(value: f64) -> Option<i64> {
    const I64_MAX_F: f64 = 9_223_372_036_854_775_807.0;
    const I64_MIN_F: f64 = -9_223_372_036_854_775_808.0;
    if value.fract() == 0.0 && value >= I64_MIN_F && value <= I64_MAX_F {
        Some(value as i64)
    } else {
        None
    }
}

/// One rule of a score definition: a predicate, the score it yields, and a
/// textual description for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub predicate: Predicate,
    pub score: f64,
    pub label: String,
}

impl Band {
    pub fn new(predicate: Predicate, score: f64) -> Self {
        let label = predicate.describe();
        Self {
            predicate,
            score,
            label,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Ordered rule table with a default fallback score.
///
/// Immutable once constructed; shared across scoring calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDefinition {
    pub bands: Vec<Band>,
    pub default_score: f64,
}

impl ScoreDefinition {
    pub fn new(bands: Vec<Band>, default_score: f64) -> Self {
        Self {
            bands,
            default_score,
        }
    }

    /// Apply the definition: first matching band wins, otherwise the default
    pub fn apply(&self, input: &ScoreInput) -> f64 {
        self.bands
            .iter()
            .find(|band| band.predicate.matches(input))
            .map(|band| band.score)
            .unwrap_or(self.default_score)
    }
}
