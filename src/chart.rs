//! Chart geometry for progress-monitoring graphs.
//!
//! Produces scaled coordinates only: one path per series, plus goal lines,
//! benchmark points and aimlines, all sharing one pair of scales. Every
//! coordinate is clamped into `[0, width] x [0, height]`, with y growing
//! downwards as in SVG.

use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::config::ChartOptions;
use crate::error::{validate_goal, Result};
use crate::models::{GoalRecord, Series};

/// Fraction of the observed score range added above and below.
pub const Y_PADDING_RATIO: f64 = 0.1;
/// Padding used when every score is identical.
pub const MIN_Y_PADDING: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PathSpec {
    pub points: Vec<Point>,
}

impl PathSpec {
    /// SVG path data (`M x,y L x,y ...`) with two fixed decimals.
    pub fn to_svg_path(&self) -> String {
        let mut d = String::new();
        for (i, point) in self.points.iter().enumerate() {
            let command = if i == 0 { 'M' } else { 'L' };
            if i > 0 {
                d.push(' ');
            }
            let _ = write!(d, "{command}{:.2},{:.2}", point.x, point.y);
        }
        d
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalMarkerSpec {
    pub goal_score: f64,
    pub benchmark: Option<Point>,
    pub goal_line: Segment,
    pub aimline: Option<Segment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisTick {
    pub position: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartGeometry {
    pub width: f64,
    pub height: f64,
    pub x_domain: Vec<NaiveDate>,
    pub y_domain: Option<(f64, f64)>,
    pub x_ticks: Vec<AxisTick>,
    pub y_ticks: Vec<AxisTick>,
    pub series_paths: BTreeMap<Uuid, PathSpec>,
    pub goal_markers: BTreeMap<Uuid, GoalMarkerSpec>,
}

impl ChartGeometry {
    pub fn empty(options: &ChartOptions) -> Self {
        Self {
            width: options.width,
            height: options.height,
            x_domain: Vec::new(),
            y_domain: None,
            x_ticks: Vec::new(),
            y_ticks: Vec::new(),
            series_paths: BTreeMap::new(),
            goal_markers: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.series_paths.is_empty()
    }
}

/// Maps a value domain linearly onto a pixel range, clamping the result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn scale(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let t = if d1 == d0 { 0.5 } else { (value - d0) / (d1 - d0) };
        clamp_between(r0 + t * (r1 - r0), r0, r1)
    }
}

/// Maps calendar dates onto `[0, width]` by day offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub width: f64,
}

impl TimeScale {
    pub fn scale(&self, date: NaiveDate) -> f64 {
        let span = (self.end - self.start).num_days();
        if span <= 0 {
            return self.width / 2.0;
        }
        let offset = (date - self.start).num_days() as f64;
        clamp_between(offset / span as f64 * self.width, 0.0, self.width)
    }
}

fn clamp_between(value: f64, a: f64, b: f64) -> f64 {
    value.clamp(a.min(b), a.max(b))
}

/// Score bounds padded by 10% of the range (or 5 units for a flat range) and
/// widened to cover every benchmark and goal score.
pub fn y_domain(
    scores: impl IntoIterator<Item = f64>,
    goals: &[&GoalRecord],
) -> Option<(f64, f64)> {
    let (min, max) = scores
        .into_iter()
        .fold(None, |acc: Option<(f64, f64)>, score| match acc {
            None => Some((score, score)),
            Some((lo, hi)) => Some((lo.min(score), hi.max(score))),
        })?;

    let range = max - min;
    let padding = if range == 0.0 {
        MIN_Y_PADDING
    } else {
        range * Y_PADDING_RATIO
    };
    let mut lo = min - padding;
    let mut hi = max + padding;

    for goal in goals {
        let scores = std::iter::once(goal.goal_score).chain(goal.benchmark_score);
        for score in scores {
            lo = lo.min(score);
            hi = hi.max(score);
        }
    }

    Some((lo, hi))
}

fn nice_step(span: f64, count: usize) -> f64 {
    let raw = span / count as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let residual = raw / magnitude;
    let nice = if residual > 5.0 {
        10.0
    } else if residual > 2.0 {
        5.0
    } else if residual > 1.0 {
        2.0
    } else {
        1.0
    };
    nice * magnitude
}

pub fn y_ticks(domain: (f64, f64), scale: &LinearScale, count: usize) -> Vec<AxisTick> {
    let (lo, hi) = domain;
    let span = hi - lo;
    if count == 0 || span.is_nan() || span <= 0.0 {
        return Vec::new();
    }

    let step = nice_step(span, count);
    let decimals = if step >= 1.0 {
        0
    } else {
        (-step.log10().floor()) as usize
    };
    let first = (lo / step).ceil();
    let tolerance = step * 1e-9;

    let mut ticks = Vec::new();
    let mut i = 0.0;
    loop {
        let value = (first + i) * step;
        if value > hi + tolerance {
            break;
        }
        ticks.push(AxisTick {
            position: scale.scale(value),
            label: format!("{value:.decimals$}"),
        });
        i += 1.0;
    }
    ticks
}

/// Up to `count` dates from the axis, evenly strided. Both ends are kept
/// whenever `count` allows two or more ticks; a single tick marks the start.
pub fn x_ticks(axis: &[NaiveDate], scale: &TimeScale, count: usize) -> Vec<AxisTick> {
    if axis.is_empty() || count == 0 {
        return Vec::new();
    }

    let indices: Vec<usize> = if axis.len() <= count {
        (0..axis.len()).collect()
    } else if count == 1 {
        vec![0]
    } else {
        let mut picked: Vec<usize> = (0..count)
            .map(|i| i * (axis.len() - 1) / (count - 1))
            .collect();
        picked.dedup();
        picked
    };

    indices
        .into_iter()
        .map(|i| AxisTick {
            position: scale.scale(axis[i]),
            label: axis[i].format("%b %-d").to_string(),
        })
        .collect()
}

/// Builds chart geometry for the given series over a shared date axis.
///
/// Only goals whose student has a series are drawn; when a student has
/// several goals for the measure the last one wins.
pub fn build(
    series: &BTreeMap<Uuid, Series>,
    axis: &[NaiveDate],
    goals: &[&GoalRecord],
    options: &ChartOptions,
) -> Result<ChartGeometry> {
    options.validate()?;
    for goal in goals {
        validate_goal(goal)?;
    }

    let (Some(&axis_start), Some(&axis_end)) = (axis.first(), axis.last()) else {
        return Ok(ChartGeometry::empty(options));
    };
    if series.is_empty() {
        return Ok(ChartGeometry::empty(options));
    }

    let drawn: BTreeMap<Uuid, &GoalRecord> = goals
        .iter()
        .filter(|goal| series.contains_key(&goal.student_id))
        .map(|goal| (goal.student_id, *goal))
        .collect();
    let drawn_goals: Vec<&GoalRecord> = drawn.values().copied().collect();

    let scores = series
        .values()
        .flat_map(|s| s.observations.iter().map(|obs| obs.score));
    let Some(y_domain) = y_domain(scores, &drawn_goals) else {
        return Ok(ChartGeometry::empty(options));
    };

    let x = TimeScale {
        start: axis_start,
        end: axis_end,
        width: options.width,
    };
    let y = LinearScale {
        domain: y_domain,
        range: (options.height, 0.0),
    };
    let point = |date: NaiveDate, score: f64| Point {
        x: x.scale(date),
        y: y.scale(score),
    };

    let series_paths = series
        .iter()
        .map(|(id, s)| {
            let points = s
                .observations
                .iter()
                .map(|obs| point(obs.date, obs.score))
                .collect();
            (*id, PathSpec { points })
        })
        .collect();

    let goal_markers = drawn
        .iter()
        .map(|(id, goal)| {
            let benchmark = goal
                .benchmark_point()
                .map(|(date, score)| point(date, score));
            let line_start = goal.benchmark_date.unwrap_or(axis_start);
            let line_end = goal.goal_target_date.unwrap_or(axis_end);
            let goal_point = goal
                .goal_target_date
                .map(|date| point(date, goal.goal_score));
            let aimline = match (benchmark, goal_point) {
                (Some(start), Some(end)) => Some(Segment { start, end }),
                _ => None,
            };
            let marker = GoalMarkerSpec {
                goal_score: goal.goal_score,
                benchmark,
                goal_line: Segment {
                    start: point(line_start, goal.goal_score),
                    end: point(line_end, goal.goal_score),
                },
                aimline,
            };
            (*id, marker)
        })
        .collect();

    debug!(
        series = series.len(),
        goals = drawn.len(),
        ?y_domain,
        "built chart geometry"
    );
    Ok(ChartGeometry {
        width: options.width,
        height: options.height,
        x_domain: axis.to_vec(),
        y_domain: Some(y_domain),
        x_ticks: x_ticks(axis, &x, options.x_tick_count),
        y_ticks: y_ticks(y_domain, &y, options.y_tick_count),
        series_paths,
        goal_markers,
    })
}
