//! Caller-owned memoization for [`analyze`].
//!
//! The analytics functions stay pure; a caller that re-runs them on every
//! data change can hold an [`AnalysisCache`] so identical inputs are not
//! recomputed. The cache keeps a single entry: newer input replaces it.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tracing::debug;

use crate::error::Result;
use crate::models::{GoalRecord, Observation};
use crate::progress::{analyze, AnalysisRequest, ProgressAnalysis};

/// Hash of every input that can change the analysis.
pub fn request_key(request: &AnalysisRequest) -> u64 {
    let mut hasher = DefaultHasher::new();
    request.measure_type.hash(&mut hasher);
    request.range.hash(&mut hasher);

    let chart = &request.chart;
    chart.width.to_bits().hash(&mut hasher);
    chart.height.to_bits().hash(&mut hasher);
    chart.x_tick_count.hash(&mut hasher);
    chart.y_tick_count.hash(&mut hasher);

    request.observations.len().hash(&mut hasher);
    for obs in &request.observations {
        hash_observation(obs, &mut hasher);
    }
    request.goals.len().hash(&mut hasher);
    for goal in &request.goals {
        hash_goal(goal, &mut hasher);
    }
    hasher.finish()
}

fn hash_observation<H: Hasher>(obs: &Observation, hasher: &mut H) {
    obs.student_id.hash(hasher);
    obs.group_id.hash(hasher);
    obs.date.hash(hasher);
    obs.score.to_bits().hash(hasher);
    obs.measure_type.hash(hasher);
}

fn hash_goal<H: Hasher>(goal: &GoalRecord, hasher: &mut H) {
    goal.student_id.hash(hasher);
    goal.group_id.hash(hasher);
    goal.measure_type.hash(hasher);
    goal.benchmark_score.map(f64::to_bits).hash(hasher);
    goal.benchmark_date.hash(hasher);
    goal.goal_score.to_bits().hash(hasher);
    goal.goal_target_date.hash(hasher);
}

#[derive(Debug, Default)]
pub struct AnalysisCache {
    entry: Option<(u64, ProgressAnalysis)>,
    computations: usize,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(&mut self, request: &AnalysisRequest) -> Result<&ProgressAnalysis> {
        let key = request_key(request);
        let hit = matches!(&self.entry, Some((cached, _)) if *cached == key);

        if hit {
            debug!(key, "analysis cache hit");
        } else {
            let analysis = analyze(request)?;
            self.computations += 1;
            self.entry = Some((key, analysis));
        }

        match &self.entry {
            Some((_, analysis)) => Ok(analysis),
            None => unreachable!("entry is filled on every miss"),
        }
    }

    /// Number of times the analysis was actually computed.
    pub fn computations(&self) -> usize {
        self.computations
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}
