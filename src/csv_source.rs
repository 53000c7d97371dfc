use std::path::Path;

use anyhow::Context;
use tracing::info;

use crate::models::{GoalRecord, Observation};

pub fn load_observations(path: &Path) -> anyhow::Result<Vec<Observation>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut observations = Vec::new();

    for (line, result) in reader.deserialize::<Observation>().enumerate() {
        let row = result.with_context(|| format!("bad observation row {}", line + 2))?;
        observations.push(row);
    }

    info!(count = observations.len(), path = %path.display(), "loaded observations");
    Ok(observations)
}

/// Empty benchmark or target-date cells load as missing values.
pub fn load_goals(path: &Path) -> anyhow::Result<Vec<GoalRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut goals = Vec::new();

    for (line, result) in reader.deserialize::<GoalRecord>().enumerate() {
        let row = result.with_context(|| format!("bad goal row {}", line + 2))?;
        goals.push(row);
    }

    info!(count = goals.len(), path = %path.display(), "loaded goals");
    Ok(goals)
}
