use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Weekly slope above which a trend counts as improving (and below whose
/// negation it counts as declining).
pub const FLAT_BAND_PER_WEEK: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub student_id: Uuid,
    pub group_id: Uuid,
    pub date: NaiveDate,
    pub score: f64,
    pub measure_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalRecord {
    pub student_id: Uuid,
    pub group_id: Uuid,
    pub measure_type: String,
    pub benchmark_score: Option<f64>,
    pub benchmark_date: Option<NaiveDate>,
    pub goal_score: f64,
    pub goal_target_date: Option<NaiveDate>,
}

impl GoalRecord {
    /// Benchmark score and date, when both are recorded.
    pub fn benchmark_point(&self) -> Option<(NaiveDate, f64)> {
        match (self.benchmark_date, self.benchmark_score) {
            (Some(date), Some(score)) => Some((date, score)),
            _ => None,
        }
    }

    /// Score on the aimline at `date`, if the goal has both endpoints.
    pub fn aimline_value_at(&self, date: NaiveDate) -> Option<f64> {
        let (start, start_score) = self.benchmark_point()?;
        let end = self.goal_target_date?;
        let span = (end - start).num_days();
        if span <= 0 {
            return None;
        }
        let offset = (date - start).num_days() as f64;
        Some(start_score + (self.goal_score - start_score) * offset / span as f64)
    }
}

/// Inclusive date window applied to observations before aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

/// Date-ordered observations for one student (or one group when combined)
/// on a single measure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub id: Uuid,
    pub measure_type: String,
    pub observations: Vec<Observation>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Latest observation; ties on the same date resolve to the last one
    /// supplied.
    pub fn latest(&self) -> Option<&Observation> {
        self.observations.last()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Declining,
    Flat,
}

impl TrendDirection {
    pub fn from_weekly_slope(weekly_slope: f64) -> Self {
        if weekly_slope > FLAT_BAND_PER_WEEK {
            TrendDirection::Improving
        } else if weekly_slope < -FLAT_BAND_PER_WEEK {
            TrendDirection::Declining
        } else {
            TrendDirection::Flat
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TrendDirection::Improving => "improving",
            TrendDirection::Declining => "declining",
            TrendDirection::Flat => "flat",
        }
    }
}

/// Least-squares line in score-per-day units, with x measured in days from
/// `origin`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
    pub point_count: usize,
    pub origin: NaiveDate,
}

impl TrendLine {
    pub fn weekly_slope(&self) -> f64 {
        self.slope * 7.0
    }

    pub fn direction(&self) -> TrendDirection {
        TrendDirection::from_weekly_slope(self.weekly_slope())
    }

    pub fn value_at(&self, date: NaiveDate) -> f64 {
        self.intercept + self.slope * (date - self.origin).num_days() as f64
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Projection {
    pub weeks_to_goal: Option<i64>,
    pub actual_roi: Option<f64>,
    pub expected_roi: Option<f64>,
    pub on_track: Option<bool>,
}

impl Projection {
    pub fn rounded(&self) -> Projection {
        Projection {
            weeks_to_goal: self.weeks_to_goal,
            actual_roi: self.actual_roi.map(round2),
            expected_roi: self.expected_roi.map(round2),
            on_track: self.on_track,
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AlertKind {
    AboveGoal,
    BelowGoal,
    Variable,
}

impl AlertKind {
    pub fn label(&self) -> &'static str {
        match self {
            AlertKind::AboveGoal => "4+ points above goal, consider raising the goal",
            AlertKind::BelowGoal => "4+ points below goal, consider intensifying",
            AlertKind::Variable => "mixed recent points, continue and monitor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DecisionAlert {
    pub kind: AlertKind,
    pub run_length: usize,
    pub triggered_at_date: NaiveDate,
}
