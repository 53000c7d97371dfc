use chrono::NaiveDate;
use tracing::debug;

use crate::error::{validate_goal, Result};
use crate::models::{GoalRecord, Observation, Projection, TrendLine};

fn weeks_between(from: NaiveDate, to: NaiveDate) -> f64 {
    (to - from).num_days() as f64 / 7.0
}

/// Weeks until the trend reaches the goal, rounded up.
///
/// Only defined for a rising trend with the student still below goal.
pub fn weeks_to_goal(weekly_slope: f64, current_score: f64, goal_score: f64) -> Option<i64> {
    if weekly_slope > 0.0 && current_score < goal_score {
        Some(((goal_score - current_score) / weekly_slope).ceil() as i64)
    } else {
        None
    }
}

pub fn actual_roi(goal: &GoalRecord, latest: &Observation) -> Option<f64> {
    let (benchmark_date, benchmark_score) = goal.benchmark_point()?;
    let elapsed = weeks_between(benchmark_date, latest.date);
    if elapsed <= 0.0 {
        return None;
    }
    Some((latest.score - benchmark_score) / elapsed)
}

pub fn expected_roi(goal: &GoalRecord) -> Option<f64> {
    let (benchmark_date, benchmark_score) = goal.benchmark_point()?;
    let total = weeks_between(benchmark_date, goal.goal_target_date?);
    if total <= 0.0 {
        return None;
    }
    Some((goal.goal_score - benchmark_score) / total)
}

/// Projects goal attainment from a trend and the latest observation.
///
/// Each field is computed independently; a missing input only blanks the
/// fields that depend on it. A goal whose target precedes its benchmark is
/// rejected rather than producing a negative duration.
pub fn project(
    trend: Option<&TrendLine>,
    latest: Option<&Observation>,
    goal: &GoalRecord,
) -> Result<Projection> {
    validate_goal(goal)?;

    let weeks_to_goal = match (trend, latest) {
        (Some(trend), Some(latest)) => {
            weeks_to_goal(trend.weekly_slope(), latest.score, goal.goal_score)
        }
        _ => None,
    };
    let actual_roi = latest.and_then(|latest| actual_roi(goal, latest));
    let expected_roi = expected_roi(goal);
    let on_track = match (actual_roi, expected_roi) {
        (Some(actual), Some(expected)) => Some(actual >= expected),
        _ => None,
    };

    debug!(
        student = %goal.student_id,
        ?weeks_to_goal,
        ?actual_roi,
        ?expected_roi,
        "projected goal"
    );
    Ok(Projection {
        weeks_to_goal,
        actual_roi,
        expected_roi,
        on_track,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyticsError;
    use chrono::Duration;
    use uuid::Uuid;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap() + Duration::days(offset)
    }

    fn goal() -> GoalRecord {
        GoalRecord {
            student_id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            measure_type: "orf".to_string(),
            benchmark_score: Some(30.0),
            benchmark_date: Some(day(0)),
            goal_score: 50.0,
            goal_target_date: Some(day(70)),
        }
    }

    fn latest(offset: i64, score: f64) -> Observation {
        Observation {
            student_id: Uuid::nil(),
            group_id: Uuid::nil(),
            date: day(offset),
            score,
            measure_type: "orf".to_string(),
        }
    }

    fn trend(weekly: f64) -> TrendLine {
        TrendLine {
            slope: weekly / 7.0,
            intercept: 30.0,
            point_count: 5,
            origin: day(0),
        }
    }

    #[test]
    fn roi_arithmetic() {
        let projection = project(None, Some(&latest(35, 44.0)), &goal()).unwrap();
        assert!((projection.expected_roi.unwrap() - 2.0).abs() < 1e-9);
        assert!((projection.actual_roi.unwrap() - 2.8).abs() < 1e-9);
        assert_eq!(projection.on_track, Some(true));
        assert_eq!(projection.weeks_to_goal, None);
    }

    #[test]
    fn weeks_to_goal_needs_rising_trend() {
        assert_eq!(weeks_to_goal(2.0, 40.0, 50.0), Some(5));
        assert_eq!(weeks_to_goal(3.0, 40.0, 50.0), Some(4));
        assert_eq!(weeks_to_goal(0.0, 40.0, 50.0), None);
        assert_eq!(weeks_to_goal(-1.0, 40.0, 50.0), None);
        assert_eq!(weeks_to_goal(2.0, 50.0, 50.0), None);
    }

    #[test]
    fn projection_uses_trend_and_latest_score() {
        let projection = project(Some(&trend(2.0)), Some(&latest(35, 40.0)), &goal()).unwrap();
        assert_eq!(projection.weeks_to_goal, Some(5));
    }

    #[test]
    fn latest_on_benchmark_date_has_no_actual_roi() {
        let projection = project(None, Some(&latest(0, 44.0)), &goal()).unwrap();
        assert_eq!(projection.actual_roi, None);
        assert_eq!(projection.on_track, None);
        assert!(projection.expected_roi.is_some());
    }

    #[test]
    fn missing_dates_blank_only_dependent_fields() {
        let mut record = goal();
        record.goal_target_date = None;
        let projection = project(Some(&trend(2.0)), Some(&latest(35, 44.0)), &record).unwrap();
        assert_eq!(projection.expected_roi, None);
        assert_eq!(projection.on_track, None);
        assert!(projection.actual_roi.is_some());
        assert_eq!(projection.weeks_to_goal, Some(3));
    }

    #[test]
    fn no_observations_projects_nothing_but_expected_roi() {
        let projection = project(None, None, &goal()).unwrap();
        assert_eq!(projection.weeks_to_goal, None);
        assert_eq!(projection.actual_roi, None);
        assert_eq!(projection.on_track, None);
    }

    #[test]
    fn reversed_goal_is_rejected() {
        let mut record = goal();
        record.goal_target_date = Some(day(-7));
        let err = project(None, Some(&latest(35, 44.0)), &record).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidRecord { .. }));
    }

    #[test]
    fn rounded_keeps_two_decimals() {
        let projection = Projection {
            weeks_to_goal: Some(3),
            actual_roi: Some(2.866666),
            expected_roi: Some(1.994),
            on_track: Some(true),
        };
        let rounded = projection.rounded();
        assert_eq!(rounded.actual_roi, Some(2.87));
        assert_eq!(rounded.expected_roi, Some(1.99));
    }
}
