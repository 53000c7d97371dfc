//! Progress-monitoring analytics for intervention groups.
//!
//! Turns dated score observations and per-student goals into trend lines,
//! goal projections, decision-rule alerts and chart geometry. Every analytics
//! function is a pure function of its inputs; the record store (Postgres or
//! CSV files) only supplies arrays of records.

pub mod chart;
pub mod config;
pub mod csv_source;
pub mod db;
pub mod decision;
pub mod error;
pub mod memo;
pub mod models;
pub mod progress;
pub mod projection;
pub mod report;
pub mod series;
pub mod trend;

pub use error::{AnalyticsError, Result};
pub use progress::{analyze, AnalysisRequest, ProgressAnalysis, StudentProgress};
