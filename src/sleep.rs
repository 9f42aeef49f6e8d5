//! Sleep-session derivation
//!
//! Splits raw sleep-stage category samples into non-overlapping sessions: a
//! gap longer than an hour between consecutive stage samples starts a new
//! session. Splitting is memoized per input set, since the backing store
//! re-presents the identical sample collection on most refreshes.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::types::{SleepSession, SleepStageSample};

/// Gap between stage samples that separates two sessions, in minutes
pub const SESSION_GAP_MINUTES: i64 = 60;

/// Stateful session splitter with per-input memoization
#[derive(Debug, Default)]
pub struct SleepSessionBuilder {
    cache: HashMap<u64, Vec<SleepSession>>,
}

impl SleepSessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessions for the given stage samples, served from cache when the
    /// identical sample set was already split
    pub fn sessions(&mut self, stages: &[SleepStageSample]) -> Vec<SleepSession> {
        let key = cache_key(stages);
        if let Some(hit) = self.cache.get(&key) {
            return hit.clone();
        }
        let sessions = Self::split(stages);
        self.cache.insert(key, sessions.clone());
        sessions
    }

    /// Split stage samples into sessions without caching
    pub fn split(stages: &[SleepStageSample]) -> Vec<SleepSession> {
        if stages.is_empty() {
            return Vec::new();
        }

        let mut sorted: Vec<&SleepStageSample> = stages.iter().collect();
        sorted.sort_by_key(|s| s.start);

        let mut sessions = Vec::new();
        let mut current: Vec<&SleepStageSample> = vec![sorted[0]];
        let mut current_end = sorted[0].end;

        for stage in &sorted[1..] {
            let gap = (stage.start - current_end).num_minutes();
            if gap > SESSION_GAP_MINUTES {
                sessions.push(build_session(&current));
                current.clear();
            }
            current_end = current_end.max(stage.end);
            current.push(stage);
        }
        sessions.push(build_session(&current));
        sessions
    }
}

fn build_session(stages: &[&SleepStageSample]) -> SleepSession {
    let start = stages.iter().map(|s| s.start).min().expect("non-empty run");
    let end = stages.iter().map(|s| s.end).max().expect("non-empty run");
    let asleep_minutes: f64 = stages
        .iter()
        .filter(|s| s.stage.is_asleep())
        .map(|s| (s.end - s.start).num_milliseconds() as f64 / 60_000.0)
        .sum();

    SleepSession {
        start,
        end,
        total_asleep_minutes: asleep_minutes,
    }
}

fn cache_key(stages: &[SleepStageSample]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for stage in stages {
        stage.id.hash(&mut hasher);
    }
    hasher.finish()
}
