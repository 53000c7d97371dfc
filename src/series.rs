use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AnalyticsError, Result};
use crate::models::{DateRange, GoalRecord, Observation, Series};

/// Groups observations of one measure into a date-sorted series per student.
///
/// Same-date observations keep their input order; nothing is de-duplicated.
pub fn aggregate(
    observations: &[Observation],
    measure_type: &str,
    range: &DateRange,
) -> Result<BTreeMap<Uuid, Series>> {
    group_by(observations, measure_type, range, |obs| obs.student_id)
}

/// Combines every student of a group into one series per group.
pub fn aggregate_by_group(
    observations: &[Observation],
    measure_type: &str,
    range: &DateRange,
) -> Result<BTreeMap<Uuid, Series>> {
    group_by(observations, measure_type, range, |obs| obs.group_id)
}

fn group_by<F>(
    observations: &[Observation],
    measure_type: &str,
    range: &DateRange,
    key: F,
) -> Result<BTreeMap<Uuid, Series>>
where
    F: Fn(&Observation) -> Uuid,
{
    let mut series: BTreeMap<Uuid, Series> = BTreeMap::new();

    for obs in observations {
        if obs.measure_type != measure_type || !range.contains(obs.date) {
            continue;
        }
        if !obs.score.is_finite() {
            return Err(AnalyticsError::NonFiniteScore {
                student_id: obs.student_id,
                score: obs.score,
                context: obs.date.to_string(),
            });
        }

        let id = key(obs);
        series
            .entry(id)
            .or_insert_with(|| Series {
                id,
                measure_type: measure_type.to_string(),
                observations: Vec::new(),
            })
            .observations
            .push(obs.clone());
    }

    for entry in series.values_mut() {
        // stable sort keeps same-day entries in input order
        entry.observations.sort_by_key(|obs| obs.date);
    }

    debug!(
        measure_type,
        series = series.len(),
        input = observations.len(),
        "aggregated observations"
    );
    Ok(series)
}

pub fn relevant_goals<'a>(goals: &'a [GoalRecord], measure_type: &str) -> Vec<&'a GoalRecord> {
    goals
        .iter()
        .filter(|goal| goal.measure_type == measure_type)
        .collect()
}

/// Sorted union of every observation date and every benchmark/target date,
/// so goal markers can sit on dates without an observation.
pub fn shared_date_axis(
    series: &BTreeMap<Uuid, Series>,
    goals: &[&GoalRecord],
) -> Vec<NaiveDate> {
    let mut dates: BTreeSet<NaiveDate> = series
        .values()
        .flat_map(|s| s.observations.iter().map(|obs| obs.date))
        .collect();

    for goal in goals {
        dates.extend(goal.benchmark_date);
        dates.extend(goal.goal_target_date);
    }

    dates.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn obs(student_id: Uuid, group_id: Uuid, day: u32, score: f64, measure: &str) -> Observation {
        Observation {
            student_id,
            group_id,
            date: date(day),
            score,
            measure_type: measure.to_string(),
        }
    }

    #[test]
    fn empty_input_yields_empty_map() {
        let series = aggregate(&[], "orf", &DateRange::default()).unwrap();
        assert!(series.is_empty());
        assert!(shared_date_axis(&series, &[]).is_empty());
    }

    #[test]
    fn sorts_by_date_and_keeps_ties_in_input_order() {
        let student = Uuid::new_v4();
        let group = Uuid::new_v4();
        let input = vec![
            obs(student, group, 9, 40.0, "orf"),
            obs(student, group, 2, 31.0, "orf"),
            obs(student, group, 9, 42.0, "orf"),
            obs(student, group, 5, 35.0, "orf"),
        ];

        let series = aggregate(&input, "orf", &DateRange::default()).unwrap();
        let scores: Vec<f64> = series[&student].observations.iter().map(|o| o.score).collect();
        assert_eq!(scores, vec![31.0, 35.0, 40.0, 42.0]);
        assert_eq!(series[&student].latest().map(|o| o.score), Some(42.0));
    }

    #[test]
    fn filters_measure_and_range() {
        let student = Uuid::new_v4();
        let group = Uuid::new_v4();
        let input = vec![
            obs(student, group, 1, 10.0, "orf"),
            obs(student, group, 8, 12.0, "orf"),
            obs(student, group, 8, 99.0, "maze"),
            obs(student, group, 20, 15.0, "orf"),
        ];
        let range = DateRange {
            from: Some(date(2)),
            to: Some(date(20)),
        };

        let series = aggregate(&input, "orf", &range).unwrap();
        assert_eq!(series[&student].len(), 2);
        assert!(series[&student].observations.iter().all(|o| o.measure_type == "orf"));
    }

    #[test]
    fn groups_combine_students() {
        let group = Uuid::new_v4();
        let input = vec![
            obs(Uuid::new_v4(), group, 3, 10.0, "orf"),
            obs(Uuid::new_v4(), group, 1, 12.0, "orf"),
        ];

        let students = aggregate(&input, "orf", &DateRange::default()).unwrap();
        let groups = aggregate_by_group(&input, "orf", &DateRange::default()).unwrap();
        assert_eq!(students.len(), 2);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[&group].observations[0].score, 12.0);
    }

    #[test]
    fn rejects_non_finite_scores() {
        let input = vec![obs(Uuid::new_v4(), Uuid::new_v4(), 1, f64::NAN, "orf")];
        let err = aggregate(&input, "orf", &DateRange::default()).unwrap_err();
        assert!(matches!(err, AnalyticsError::NonFiniteScore { .. }));
    }

    #[test]
    fn axis_includes_goal_dates() {
        let student = Uuid::new_v4();
        let group = Uuid::new_v4();
        let input = vec![obs(student, group, 10, 30.0, "orf")];
        let goals = vec![
            GoalRecord {
                student_id: student,
                group_id: group,
                measure_type: "orf".to_string(),
                benchmark_score: Some(28.0),
                benchmark_date: Some(date(1)),
                goal_score: 50.0,
                goal_target_date: Some(date(30)),
            },
            GoalRecord {
                student_id: student,
                group_id: group,
                measure_type: "maze".to_string(),
                benchmark_score: None,
                benchmark_date: Some(date(15)),
                goal_score: 20.0,
                goal_target_date: None,
            },
        ];

        let series = aggregate(&input, "orf", &DateRange::default()).unwrap();
        let relevant = relevant_goals(&goals, "orf");
        assert_eq!(relevant.len(), 1);
        let axis = shared_date_axis(&series, &relevant);
        assert_eq!(axis, vec![date(1), date(10), date(30)]);
    }
}
