//! Error types for the progress-monitoring analytics.
//!
//! Missing data (too few points, absent benchmark or target dates) is never
//! an error here; it shows up as `None` in the computed results. Only
//! malformed input is reported through [`AnalyticsError`].

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::GoalRecord;

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum AnalyticsError {
    /// Goal target date falls before the benchmark date
    #[error(
        "goal for student {student_id} ({measure_type}) ends on {goal_target_date} before its benchmark date {benchmark_date}"
    )]
    InvalidRecord {
        student_id: Uuid,
        measure_type: String,
        benchmark_date: NaiveDate,
        goal_target_date: NaiveDate,
    },

    /// NaN or infinite score on an observation or goal
    #[error("non-finite score {score} for student {student_id} on {context}")]
    NonFiniteScore {
        student_id: Uuid,
        score: f64,
        context: String,
    },

    /// Chart dimensions must be positive and finite
    #[error("invalid chart options: {0}")]
    InvalidChartOptions(String),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

pub fn validate_goal(goal: &GoalRecord) -> Result<()> {
    if let (Some(benchmark_date), Some(goal_target_date)) =
        (goal.benchmark_date, goal.goal_target_date)
    {
        if goal_target_date < benchmark_date {
            return Err(AnalyticsError::InvalidRecord {
                student_id: goal.student_id,
                measure_type: goal.measure_type.clone(),
                benchmark_date,
                goal_target_date,
            });
        }
    }

    let scores = std::iter::once(("goal score", goal.goal_score))
        .chain(goal.benchmark_score.map(|score| ("benchmark score", score)));
    for (context, score) in scores {
        if !score.is_finite() {
            return Err(AnalyticsError::NonFiniteScore {
                student_id: goal.student_id,
                score,
                context: context.to_string(),
            });
        }
    }

    Ok(())
}

/// Splits goals into the usable ones and a diagnostic per rejected record.
pub fn validate_goals(goals: &[GoalRecord]) -> (Vec<GoalRecord>, Vec<AnalyticsError>) {
    let mut valid = Vec::new();
    let mut issues = Vec::new();

    for goal in goals {
        match validate_goal(goal) {
            Ok(()) => valid.push(goal.clone()),
            Err(err) => issues.push(err),
        }
    }

    (valid, issues)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal(benchmark: Option<NaiveDate>, target: Option<NaiveDate>) -> GoalRecord {
        GoalRecord {
            student_id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            measure_type: "orf".to_string(),
            benchmark_score: Some(30.0),
            benchmark_date: benchmark,
            goal_score: 50.0,
            goal_target_date: target,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn reversed_dates_are_reported() {
        let record = goal(Some(date(2026, 3, 1)), Some(date(2026, 1, 1)));
        let err = validate_goal(&record).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidRecord { .. }));
    }

    #[test]
    fn same_day_and_missing_dates_are_valid() {
        assert!(validate_goal(&goal(Some(date(2026, 1, 1)), Some(date(2026, 1, 1)))).is_ok());
        assert!(validate_goal(&goal(None, Some(date(2026, 1, 1)))).is_ok());
        assert!(validate_goal(&goal(Some(date(2026, 1, 1)), None)).is_ok());
    }

    #[test]
    fn non_finite_goal_score_is_rejected() {
        let mut record = goal(None, None);
        record.goal_score = f64::NAN;
        assert!(matches!(
            validate_goal(&record),
            Err(AnalyticsError::NonFiniteScore { .. })
        ));
    }

    #[test]
    fn validate_goals_partitions_records() {
        let good = goal(Some(date(2026, 1, 1)), Some(date(2026, 3, 1)));
        let bad = goal(Some(date(2026, 3, 1)), Some(date(2026, 1, 1)));
        let (valid, issues) = validate_goals(&[good.clone(), bad]);
        assert_eq!(valid, vec![good]);
        assert_eq!(issues.len(), 1);
    }
}
