use anyhow::Context;
use chrono::{Duration, NaiveDate};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::info;
use uuid::Uuid;

use crate::models::{DateRange, GoalRecord, Observation};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let group = Uuid::parse_str("0c22f1f1-9184-4fd4-9b21-28c68a6a89dc")?;
    let students = vec![
        // (id, weekly gain, starting score)
        (Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?, 2.5, 32.0),
        (Uuid::parse_str("d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2")?, 0.4, 28.0),
        (Uuid::parse_str("8e1b7c55-61f4-4c1f-9a3e-2b6f0f5d9c11")?, -0.8, 45.0),
    ];
    let benchmark_date = NaiveDate::from_ymd_opt(2026, 1, 12).context("invalid date")?;
    let target_date = NaiveDate::from_ymd_opt(2026, 5, 25).context("invalid date")?;

    for (student_id, gain, start) in students {
        for week in 0..8i64 {
            let date = benchmark_date + Duration::days(7 * (week + 1));
            // small alternating wobble so the series is not a perfect line
            let wobble = if week % 2 == 0 { 1.0 } else { -1.0 };
            sqlx::query(
                r#"
                INSERT INTO progress_monitoring.observations
                (id, student_id, group_id, observed_on, score, measure_type, source_key)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (source_key) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(student_id)
            .bind(group)
            .bind(date)
            .bind(start + gain * (week + 1) as f64 + wobble)
            .bind("orf")
            .bind(format!("seed-{student_id}-{week}"))
            .execute(pool)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO progress_monitoring.goals
            (student_id, group_id, measure_type, benchmark_score, benchmark_date, goal_score, goal_target_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (student_id, measure_type) DO UPDATE
            SET benchmark_score = EXCLUDED.benchmark_score,
                benchmark_date = EXCLUDED.benchmark_date,
                goal_score = EXCLUDED.goal_score,
                goal_target_date = EXCLUDED.goal_target_date
            "#,
        )
        .bind(student_id)
        .bind(group)
        .bind("orf")
        .bind(start)
        .bind(benchmark_date)
        .bind(start + 30.0)
        .bind(target_date)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Scope of a fetch: one measure, optionally one group or one student.
#[derive(Debug, Clone, Default)]
pub struct FetchScope {
    pub measure_type: String,
    pub group_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub range: DateRange,
}

pub async fn fetch_observations(
    pool: &PgPool,
    scope: &FetchScope,
) -> anyhow::Result<Vec<Observation>> {
    let mut query = QueryBuilder::<Postgres>::new(
        "SELECT student_id, group_id, observed_on, score, measure_type \
         FROM progress_monitoring.observations WHERE measure_type = ",
    );
    query.push_bind(scope.measure_type.clone());

    if let Some(group_id) = scope.group_id {
        query.push(" AND group_id = ").push_bind(group_id);
    }
    if let Some(student_id) = scope.student_id {
        query.push(" AND student_id = ").push_bind(student_id);
    }
    if let Some(from) = scope.range.from {
        query.push(" AND observed_on >= ").push_bind(from);
    }
    if let Some(to) = scope.range.to {
        query.push(" AND observed_on <= ").push_bind(to);
    }
    query.push(" ORDER BY observed_on, recorded_at");

    let rows = query.build().fetch_all(pool).await?;
    let mut observations = Vec::with_capacity(rows.len());

    for row in rows {
        observations.push(Observation {
            student_id: row.get("student_id"),
            group_id: row.get("group_id"),
            date: row.get("observed_on"),
            score: row.get("score"),
            measure_type: row.get("measure_type"),
        });
    }

    info!(count = observations.len(), "fetched observations");
    Ok(observations)
}

pub async fn fetch_goals(pool: &PgPool, scope: &FetchScope) -> anyhow::Result<Vec<GoalRecord>> {
    let mut query = QueryBuilder::<Postgres>::new(
        "SELECT student_id, group_id, measure_type, benchmark_score, benchmark_date, \
         goal_score, goal_target_date FROM progress_monitoring.goals WHERE measure_type = ",
    );
    query.push_bind(scope.measure_type.clone());

    if let Some(group_id) = scope.group_id {
        query.push(" AND group_id = ").push_bind(group_id);
    }
    if let Some(student_id) = scope.student_id {
        query.push(" AND student_id = ").push_bind(student_id);
    }

    let rows = query.build().fetch_all(pool).await?;
    let mut goals = Vec::with_capacity(rows.len());

    for row in rows {
        goals.push(GoalRecord {
            student_id: row.get("student_id"),
            group_id: row.get("group_id"),
            measure_type: row.get("measure_type"),
            benchmark_score: row.get("benchmark_score"),
            benchmark_date: row.get("benchmark_date"),
            goal_score: row.get("goal_score"),
            goal_target_date: row.get("goal_target_date"),
        });
    }

    Ok(goals)
}

/// Imports observation rows (and optionally goal rows) from CSV files.
/// Returns the number of new observations and upserted goals.
pub async fn import_csv(
    pool: &PgPool,
    observations_path: &std::path::Path,
    goals_path: Option<&std::path::Path>,
) -> anyhow::Result<(usize, usize)> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        student_id: Uuid,
        group_id: Uuid,
        date: NaiveDate,
        score: f64,
        measure_type: String,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(observations_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        if !row.score.is_finite() {
            anyhow::bail!("non-finite score for student {} on {}", row.student_id, row.date);
        }
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO progress_monitoring.observations
            (id, student_id, group_id, observed_on, score, measure_type, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(row.student_id)
        .bind(row.group_id)
        .bind(row.date)
        .bind(row.score)
        .bind(&row.measure_type)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    let mut upserted = 0usize;
    if let Some(path) = goals_path {
        for goal in crate::csv_source::load_goals(path)? {
            crate::error::validate_goal(&goal)?;
            sqlx::query(
                r#"
                INSERT INTO progress_monitoring.goals
                (student_id, group_id, measure_type, benchmark_score, benchmark_date, goal_score, goal_target_date)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (student_id, measure_type) DO UPDATE
                SET group_id = EXCLUDED.group_id,
                    benchmark_score = EXCLUDED.benchmark_score,
                    benchmark_date = EXCLUDED.benchmark_date,
                    goal_score = EXCLUDED.goal_score,
                    goal_target_date = EXCLUDED.goal_target_date
                "#,
            )
            .bind(goal.student_id)
            .bind(goal.group_id)
            .bind(&goal.measure_type)
            .bind(goal.benchmark_score)
            .bind(goal.benchmark_date)
            .bind(goal.goal_score)
            .bind(goal.goal_target_date)
            .execute(pool)
            .await?;
            upserted += 1;
        }
    }

    Ok((inserted, upserted))
}
