use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod db;
mod export;
mod models;
mod risk;
mod roster;
mod trend;

use models::AttendanceRecord;

#[derive(Parser)]
#[command(name = "attendance-analytics")]
#[command(about = "Attendance analytics engine for EDUCARE TRACK", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import attendance records from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Compute the presence trend and today's tally for the dashboard
    Dashboard {
        #[arg(long, default_value_t = 7)]
        trend_days: i64,
        #[arg(long, default_value = "exports/dashboard_metrics.json")]
        out: PathBuf,
        #[arg(long, default_value = "exports/attendance_export.csv")]
        export_csv: PathBuf,
    },
    /// Rank students by unexcused absence rate
    Risk {
        #[arg(long, default_value_t = 30)]
        since_days: i64,
        #[arg(long, default_value_t = 15.0)]
        threshold: f64,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate a markdown report covering trend and risk
    Report {
        #[arg(long, default_value_t = 30)]
        since_days: i64,
        #[arg(long, default_value_t = 15.0)]
        threshold: f64,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to the school's Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} attendance records from {}.", csv.display());
        }
        Commands::Dashboard {
            trend_days,
            out,
            export_csv,
        } => {
            let today = Utc::now().date_naive();
            let start = trend::window_start(trend_days);
            let records = db::fetch_attendance(&pool, start, Some(today)).await?;

            let series = trend::compute_trend(&records, start, today)?;
            let today_counts = trend::tally_today(&records, today);

            let students = db::fetch_students(&pool, &referenced_student_ids(&records)).await?;
            let roster = roster::index_students(&students);

            let metrics = export::DashboardMetrics {
                generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                today,
                today_counts,
                trend: series,
            };

            write_output(&out, &serde_json::to_string_pretty(&metrics)?)?;
            println!("Wrote {}.", out.display());

            write_output(&export_csv, &export::attendance_csv(&records, &roster)?)?;
            println!("Wrote {}.", export_csv.display());
        }
        Commands::Risk {
            since_days,
            threshold,
            limit,
            out,
        } => {
            let since = risk::cutoff_date(since_days);
            let records = db::fetch_attendance(&pool, since, None).await?;

            if records.is_empty() {
                println!("No attendance records in this window.");
                return Ok(());
            }

            let students = db::fetch_students(&pool, &referenced_student_ids(&records)).await?;
            let roster = roster::index_students(&students);
            let rows = risk::score_absence_risk(&records, &roster, since, threshold);

            if rows.is_empty() {
                println!("No students above the risk threshold.");
                return Ok(());
            }

            println!("Students at chronic-absence risk:");
            for row in rows.iter().take(limit) {
                println!(
                    "- {} (grade {}) {:.1}% absent across {} tracked days",
                    export::display_name(row),
                    row.grade_level,
                    row.absence_rate,
                    row.total_sessions
                );
            }

            if let Some(out) = out {
                write_output(&out, &export::risk_csv(&rows)?)?;
                println!("Report written to {}.", out.display());
            }
        }
        Commands::Report {
            since_days,
            threshold,
            out,
        } => {
            let since = risk::cutoff_date(since_days);
            let today = Utc::now().date_naive();
            let records = db::fetch_attendance(&pool, since, None).await?;

            let series = trend::compute_trend(&records, since, today)?;
            let students = db::fetch_students(&pool, &referenced_student_ids(&records)).await?;
            let roster = roster::index_students(&students);
            let rows = risk::score_absence_risk(&records, &roster, since, threshold);

            let report = export::build_report(since, threshold, &records, &series, &rows);
            write_output(&out, &report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

/// Distinct student ids referenced by a batch of records, sorted for
/// deterministic query parameters.
fn referenced_student_ids(records: &[AttendanceRecord]) -> Vec<Uuid> {
    let ids: BTreeSet<Uuid> = records.iter().filter_map(|r| r.student_id).collect();
    ids.into_iter().collect()
}

fn write_output(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
