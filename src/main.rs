use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{ArgGroup, Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use progress_monitor::config::AppConfig;
use progress_monitor::csv_source;
use progress_monitor::db::{self, FetchScope};
use progress_monitor::models::{round2, DateRange};
use progress_monitor::report;
use progress_monitor::{analyze, AnalysisRequest};

#[derive(Parser)]
#[command(name = "progress-monitor")]
#[command(about = "Progress-monitoring analytics for intervention groups", long_about = None)]
struct Cli {
    /// Optional TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[command(group(
    ArgGroup::new("scope")
        .args(["group", "student"])
        .multiple(false)
))]
struct ScopeArgs {
    #[arg(long, default_value = "orf")]
    measure: String,
    #[arg(long)]
    group: Option<Uuid>,
    #[arg(long)]
    student: Option<Uuid>,
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
    /// Read observations from a CSV file instead of Postgres
    #[arg(long)]
    observations_csv: Option<PathBuf>,
    /// Read goals from a CSV file (only with --observations-csv)
    #[arg(long, requires = "observations_csv")]
    goals_csv: Option<PathBuf>,
}

impl ScopeArgs {
    fn range(&self) -> DateRange {
        DateRange {
            from: self.from,
            to: self.to,
        }
    }

    fn label(&self) -> Option<String> {
        self.group
            .map(|id| format!("group {id}"))
            .or_else(|| self.student.map(|id| format!("student {id}")))
    }

    fn fetch_scope(&self) -> FetchScope {
        FetchScope {
            measure_type: self.measure.clone(),
            group_id: self.group,
            student_id: self.student,
            range: self.range(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import observations (and optionally goals) from CSV files
    Import {
        #[arg(long)]
        observations: PathBuf,
        #[arg(long)]
        goals: Option<PathBuf>,
    },
    /// Print trend, projection and alerts per student
    Analyze {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, default_value = "progress-report.md")]
        out: PathBuf,
    },
    /// Write chart geometry as JSON
    Chart {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long)]
        width: Option<f64>,
        #[arg(long)]
        height: Option<f64>,
        #[arg(long, default_value = "chart.json")]
        out: PathBuf,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("progress_monitor={level},sqlx=warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn load_request(scope: &ScopeArgs, config: &AppConfig) -> anyhow::Result<AnalysisRequest> {
    let (mut observations, goals) = match &scope.observations_csv {
        Some(path) => {
            let observations = csv_source::load_observations(path)?;
            let goals = match &scope.goals_csv {
                Some(path) => csv_source::load_goals(path)?,
                None => Vec::new(),
            };
            (observations, goals)
        }
        None => {
            let pool = connect().await?;
            let fetch = scope.fetch_scope();
            let observations = db::fetch_observations(&pool, &fetch).await?;
            let goals = db::fetch_goals(&pool, &fetch).await?;
            (observations, goals)
        }
    };

    // CSV sources are unfiltered; apply the same scope the database query does
    observations.retain(|obs| {
        scope.group.map_or(true, |id| obs.group_id == id)
            && scope.student.map_or(true, |id| obs.student_id == id)
    });
    let goals = goals
        .into_iter()
        .filter(|goal| {
            scope.group.map_or(true, |id| goal.group_id == id)
                && scope.student.map_or(true, |id| goal.student_id == id)
        })
        .collect();

    Ok(AnalysisRequest {
        observations,
        goals,
        measure_type: scope.measure.clone(),
        range: scope.range(),
        chart: config.chart,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect().await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { observations, goals } => {
            let pool = connect().await?;
            let (inserted, upserted) =
                db::import_csv(&pool, &observations, goals.as_deref()).await?;
            println!(
                "Inserted {inserted} observations from {} and upserted {upserted} goals.",
                observations.display()
            );
        }
        Commands::Analyze { scope, limit } => {
            let request = load_request(&scope, &config).await?;
            let analysis = analyze(&request)?;

            if analysis.students.is_empty() {
                println!("No observations found for this window.");
                return Ok(());
            }

            println!("Progress for measure {}:", analysis.measure_type);
            let limit = limit.unwrap_or(config.report_limit);
            for progress in report::attention_order(&analysis.students).into_iter().take(limit) {
                let trend = progress.trend.map_or_else(
                    || "not enough data".to_string(),
                    |t| format!("{} {:+.2}/week", t.direction().label(), round2(t.weekly_slope())),
                );
                let weeks = progress
                    .projection
                    .and_then(|p| p.weeks_to_goal)
                    .map_or_else(|| "-".to_string(), |w| w.to_string());
                let alert = progress
                    .goal_alert
                    .map_or("-", |alert| alert.kind.label());
                println!(
                    "- {} ({} points) trend {}, weeks to goal {}, {}",
                    progress.student_id, progress.point_count, trend, weeks, alert
                );
            }
            for issue in &analysis.issues {
                println!("! {issue}");
            }
        }
        Commands::Report { scope, out } => {
            let request = load_request(&scope, &config).await?;
            let analysis = analyze(&request)?;
            let label = scope.label();
            let report = report::build_report(label.as_deref(), &request.range, &analysis);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Chart {
            scope,
            width,
            height,
            out,
        } => {
            let mut config = config;
            config.chart.width = width.unwrap_or(config.chart.width);
            config.chart.height = height.unwrap_or(config.chart.height);

            let request = load_request(&scope, &config).await?;
            let analysis = analyze(&request)?;
            let json = serde_json::to_string_pretty(&analysis.geometry)?;
            std::fs::write(&out, json)?;
            info!(series = analysis.geometry.series_paths.len(), "chart geometry written");
            println!("Chart geometry written to {}.", out.display());
        }
    }

    Ok(())
}
