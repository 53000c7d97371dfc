//! Curriculum-based-measurement decision rules.
//!
//! Four consecutive points on one side of the goal line suggest raising the
//! goal (above) or intensifying the intervention (below). Alerts are advisory
//! and never touch the series or the goal.

use std::cmp::Ordering;

use tracing::debug;

use crate::models::{AlertKind, DecisionAlert, GoalRecord, Observation, Series};

pub const DECISION_RUN_LENGTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Above,
    Below,
    On,
}

fn side(score: f64, line: f64) -> Side {
    match score.partial_cmp(&line) {
        Some(Ordering::Greater) => Side::Above,
        Some(Ordering::Less) => Side::Below,
        _ => Side::On,
    }
}

/// Evaluates the trailing run of the series against a flat goal line.
///
/// Returns `None` with fewer than four observations. Otherwise a run of four
/// or more strictly above/below yields `AboveGoal`/`BelowGoal`; anything else
/// in the latest four points yields `Variable` with no run claimed.
pub fn evaluate(series: &Series, goal_line: f64) -> Option<DecisionAlert> {
    evaluate_with(series, |_| Some(goal_line))
}

/// Same rule against the aimline value at each observation date.
///
/// Returns `None` when the goal lacks a benchmark point or target date.
pub fn evaluate_against_aimline(series: &Series, goal: &GoalRecord) -> Option<DecisionAlert> {
    goal.benchmark_point()?;
    goal.goal_target_date?;
    evaluate_with(series, |obs| goal.aimline_value_at(obs.date))
}

fn evaluate_with<F>(series: &Series, line_at: F) -> Option<DecisionAlert>
where
    F: Fn(&Observation) -> Option<f64>,
{
    let observations = &series.observations;
    if observations.len() < DECISION_RUN_LENGTH {
        return None;
    }

    let sides = observations
        .iter()
        .map(|obs| line_at(obs).map(|line| side(obs.score, line)))
        .collect::<Option<Vec<Side>>>()?;

    let last_side = *sides.last()?;
    let run_length = if last_side == Side::On {
        0
    } else {
        sides.iter().rev().take_while(|s| **s == last_side).count()
    };

    let alert = if run_length >= DECISION_RUN_LENGTH {
        let triggered = observations.len() - run_length + DECISION_RUN_LENGTH - 1;
        DecisionAlert {
            kind: if last_side == Side::Above {
                AlertKind::AboveGoal
            } else {
                AlertKind::BelowGoal
            },
            run_length,
            triggered_at_date: observations[triggered].date,
        }
    } else {
        DecisionAlert {
            kind: AlertKind::Variable,
            run_length: 0,
            triggered_at_date: observations[observations.len() - 1].date,
        }
    };

    debug!(series = %series.id, kind = ?alert.kind, run_length, "evaluated decision rule");
    Some(alert)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use uuid::Uuid;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 2).unwrap() + Duration::days(offset)
    }

    fn weekly(scores: &[f64]) -> Series {
        let student = Uuid::new_v4();
        Series {
            id: student,
            measure_type: "orf".to_string(),
            observations: scores
                .iter()
                .enumerate()
                .map(|(i, score)| Observation {
                    student_id: student,
                    group_id: Uuid::nil(),
                    date: day(7 * i as i64),
                    score: *score,
                    measure_type: "orf".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn four_above_goal() {
        let alert = evaluate(&weekly(&[10.0, 10.0, 10.0, 10.0]), 8.0).unwrap();
        assert_eq!(alert.kind, AlertKind::AboveGoal);
        assert_eq!(alert.run_length, 4);
        assert_eq!(alert.triggered_at_date, day(21));
    }

    #[test]
    fn alternating_points_are_variable() {
        let alert = evaluate(&weekly(&[10.0, 6.0, 10.0, 6.0]), 8.0).unwrap();
        assert_eq!(alert.kind, AlertKind::Variable);
        assert_eq!(alert.run_length, 0);
    }

    #[test]
    fn three_points_is_not_enough() {
        assert!(evaluate(&weekly(&[5.0, 5.0, 5.0]), 8.0).is_none());
    }

    #[test]
    fn crossing_resets_the_run() {
        let series = weekly(&[5.0, 5.0, 5.0, 9.0, 5.0, 5.0, 5.0]);
        let alert = evaluate(&series, 8.0).unwrap();
        assert_eq!(alert.kind, AlertKind::Variable);

        let series = weekly(&[9.0, 5.0, 5.0, 5.0, 5.0, 5.0]);
        let alert = evaluate(&series, 8.0).unwrap();
        assert_eq!(alert.kind, AlertKind::BelowGoal);
        assert_eq!(alert.run_length, 5);
        assert_eq!(alert.triggered_at_date, day(28));
    }

    #[test]
    fn point_on_the_line_breaks_the_run() {
        let alert = evaluate(&weekly(&[10.0, 10.0, 10.0, 10.0, 8.0]), 8.0).unwrap();
        assert_eq!(alert.kind, AlertKind::Variable);
    }

    #[test]
    fn does_not_mutate_series() {
        let series = weekly(&[10.0, 6.0, 10.0, 6.0, 10.0]);
        let before = series.clone();
        let first = evaluate(&series, 8.0);
        let second = evaluate(&series, 8.0);
        assert_eq!(first, second);
        assert_eq!(series, before);
    }

    #[test]
    fn aimline_rule_tracks_rising_target() {
        // aimline climbs 2 points a week from 30; scores hover at 34
        let goal = GoalRecord {
            student_id: Uuid::nil(),
            group_id: Uuid::nil(),
            measure_type: "orf".to_string(),
            benchmark_score: Some(30.0),
            benchmark_date: Some(day(0)),
            goal_score: 50.0,
            goal_target_date: Some(day(70)),
        };
        let series = weekly(&[31.0, 33.0, 34.0, 34.0, 34.0, 34.0, 34.0]);

        let flat = evaluate(&series, goal.goal_score).unwrap();
        assert_eq!(flat.kind, AlertKind::BelowGoal);

        let aim = evaluate_against_aimline(&series, &goal).unwrap();
        assert_eq!(aim.kind, AlertKind::BelowGoal);
        assert_eq!(aim.run_length, 4);
        assert_eq!(aim.triggered_at_date, day(42));
    }

    #[test]
    fn aimline_rule_needs_both_endpoints() {
        let goal = GoalRecord {
            student_id: Uuid::nil(),
            group_id: Uuid::nil(),
            measure_type: "orf".to_string(),
            benchmark_score: Some(30.0),
            benchmark_date: Some(day(0)),
            goal_score: 50.0,
            goal_target_date: None,
        };
        assert!(evaluate_against_aimline(&weekly(&[1.0, 1.0, 1.0, 1.0]), &goal).is_none());
    }
}
