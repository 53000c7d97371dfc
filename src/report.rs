use std::fmt::Write;

use crate::models::{round2, AlertKind, DateRange, DecisionAlert, TrendDirection, TrendLine};
use crate::progress::{ProgressAnalysis, StudentProgress};

fn or_unknown<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}

fn describe_trend(trend: Option<&TrendLine>) -> String {
    match trend {
        Some(trend) => format!(
            "{} ({:+.2}/week over {} points)",
            trend.direction().label(),
            round2(trend.weekly_slope()),
            trend.point_count
        ),
        None => "not enough data yet".to_string(),
    }
}

fn describe_alert(alert: Option<&DecisionAlert>) -> String {
    match alert {
        Some(alert) => format!("{} (as of {})", alert.kind.label(), alert.triggered_at_date),
        None => "not enough data yet".to_string(),
    }
}

/// Students ordered so the ones needing attention come first: below-goal
/// alerts, then declining trends, then the rest.
pub fn attention_order(students: &[StudentProgress]) -> Vec<&StudentProgress> {
    let rank = |progress: &StudentProgress| {
        let below = matches!(
            progress.goal_alert.map(|alert| alert.kind),
            Some(AlertKind::BelowGoal)
        );
        let declining = progress.direction == Some(TrendDirection::Declining);
        match (below, declining) {
            (true, _) => 0,
            (false, true) => 1,
            _ => 2,
        }
    };

    let mut ordered: Vec<&StudentProgress> = students.iter().collect();
    ordered.sort_by_key(|progress| rank(*progress));
    ordered
}

pub fn build_report(scope: Option<&str>, range: &DateRange, analysis: &ProgressAnalysis) -> String {
    let mut output = String::new();
    let scope_label = scope.unwrap_or("all groups");
    let window = match (range.from, range.to) {
        (Some(from), Some(to)) => format!("{from} to {to}"),
        (Some(from), None) => format!("since {from}"),
        (None, Some(to)) => format!("through {to}"),
        (None, None) => "all dates".to_string(),
    };

    let _ = writeln!(output, "# Progress Monitoring Report");
    let _ = writeln!(
        output,
        "Measure `{}` for {} ({})",
        analysis.measure_type, scope_label, window
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Students");

    if analysis.students.is_empty() {
        let _ = writeln!(output, "No observations recorded for this window.");
    }

    for progress in attention_order(&analysis.students) {
        let _ = writeln!(output);
        let _ = writeln!(output, "### Student {}", progress.student_id);
        let latest = progress
            .latest
            .as_ref()
            .map(|obs| format!("{} on {}", obs.score, obs.date));
        let _ = writeln!(output, "- Latest score: {}", or_unknown(latest));
        let _ = writeln!(output, "- Trend: {}", describe_trend(progress.trend.as_ref()));

        let Some(goal) = &progress.goal else {
            let _ = writeln!(output, "- Goal: none recorded");
            continue;
        };
        let target = goal
            .goal_target_date
            .map_or_else(|| "no target date".to_string(), |d| d.to_string());
        let _ = writeln!(output, "- Goal: {} by {}", goal.goal_score, target);

        if let Some(projection) = progress.projection.map(|p| p.rounded()) {
            let _ = writeln!(
                output,
                "- Weeks to goal: {}",
                or_unknown(projection.weeks_to_goal)
            );
            let _ = writeln!(
                output,
                "- ROI: actual {} vs expected {} per week",
                or_unknown(projection.actual_roi),
                or_unknown(projection.expected_roi)
            );
            let on_track = projection
                .on_track
                .map(|on_track| if on_track { "yes" } else { "no" });
            let _ = writeln!(output, "- On track: {}", or_unknown(on_track));
        }

        let _ = writeln!(
            output,
            "- Decision rule (goal line): {}",
            describe_alert(progress.goal_alert.as_ref())
        );
        if let Some(alert) = &progress.aimline_alert {
            let _ = writeln!(
                output,
                "- Decision rule (aimline): {}",
                describe_alert(Some(alert))
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Group Trends");

    if analysis.group_trends.is_empty() {
        let _ = writeln!(output, "No groups with observations in this window.");
    } else {
        for (group_id, trend) in &analysis.group_trends {
            let _ = writeln!(output, "- Group {}: {}", group_id, describe_trend(trend.as_ref()));
        }
    }

    if !analysis.issues.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Data Issues");
        for issue in &analysis.issues {
            let _ = writeln!(output, "- {issue}");
        }
    }

    output
}
