use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::chart::{self, ChartGeometry};
use crate::config::ChartOptions;
use crate::decision;
use crate::error::{validate_goals, AnalyticsError, Result};
use crate::models::{
    DateRange, DecisionAlert, GoalRecord, Observation, Projection, TrendDirection, TrendLine,
};
use crate::projection;
use crate::series;
use crate::trend;

/// Everything a single analytics run needs, as supplied by the record store
/// and the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub observations: Vec<Observation>,
    pub goals: Vec<GoalRecord>,
    pub measure_type: String,
    pub range: DateRange,
    pub chart: ChartOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentProgress {
    pub student_id: Uuid,
    pub group_id: Uuid,
    pub point_count: usize,
    pub latest: Option<Observation>,
    pub trend: Option<TrendLine>,
    pub direction: Option<TrendDirection>,
    pub goal: Option<GoalRecord>,
    pub projection: Option<Projection>,
    pub goal_alert: Option<DecisionAlert>,
    pub aimline_alert: Option<DecisionAlert>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressAnalysis {
    pub measure_type: String,
    pub students: Vec<StudentProgress>,
    pub group_trends: BTreeMap<Uuid, Option<TrendLine>>,
    pub geometry: ChartGeometry,
    /// Goal records rejected as malformed; they take no part in the results.
    pub issues: Vec<AnalyticsError>,
}

pub fn analyze(request: &AnalysisRequest) -> Result<ProgressAnalysis> {
    let measure = request.measure_type.as_str();
    let by_student = series::aggregate(&request.observations, measure, &request.range)?;
    let by_group = series::aggregate_by_group(&request.observations, measure, &request.range)?;

    let (goals, issues) = validate_goals(&request.goals);
    for issue in &issues {
        warn!(%issue, "skipping goal record");
    }
    let relevant = series::relevant_goals(&goals, measure);
    let goal_for: BTreeMap<Uuid, &GoalRecord> = relevant
        .iter()
        .map(|goal| (goal.student_id, *goal))
        .collect();

    let mut students = Vec::with_capacity(by_student.len());
    for (student_id, student_series) in &by_student {
        let trend = trend::fit(student_series);
        let latest = student_series.latest();
        let goal = goal_for.get(student_id).copied();

        let projection = goal
            .map(|goal| projection::project(trend.as_ref(), latest, goal))
            .transpose()?;
        let goal_alert = goal.and_then(|goal| decision::evaluate(student_series, goal.goal_score));
        let aimline_alert =
            goal.and_then(|goal| decision::evaluate_against_aimline(student_series, goal));

        students.push(StudentProgress {
            student_id: *student_id,
            group_id: latest.map(|obs| obs.group_id).unwrap_or_default(),
            point_count: student_series.len(),
            latest: latest.cloned(),
            direction: trend.as_ref().map(TrendLine::direction),
            trend,
            goal: goal.cloned(),
            projection,
            goal_alert,
            aimline_alert,
        });
    }

    let group_trends = by_group
        .iter()
        .map(|(group_id, group_series)| (*group_id, trend::fit(group_series)))
        .collect();

    let axis = series::shared_date_axis(&by_student, &relevant);
    let geometry = chart::build(&by_student, &axis, &relevant, &request.chart)?;

    info!(
        measure_type = measure,
        students = students.len(),
        groups = by_group.len(),
        issues = issues.len(),
        "analysis complete"
    );
    Ok(ProgressAnalysis {
        measure_type: request.measure_type.clone(),
        students,
        group_trends,
        geometry,
        issues,
    })
}
