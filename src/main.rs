use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use student_performance::config::Settings;
use student_performance::{db, distribution, progress, rank, report, trend, ScoreSnapshot};

#[derive(Parser)]
#[command(name = "student-performance")]
#[command(about = "Exam rankings, trends and progress for Group Scholar classes", long_about = None)]
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
    /// Import score rows from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// List the exams of a class, oldest first
    Exams {
        #[arg(long)]
        class: String,
    },
    /// Rank a class on one exam, by total or by a single course
    Rank {
        #[arg(long)]
        exam: Uuid,
        #[arg(long)]
        course: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Rank a class by each student's overall average
    Leaderboard {
        #[arg(long)]
        class: String,
        #[arg(long)]
        json: bool,
    },
    /// Trend direction and stability for one student
    Trend {
        #[arg(long)]
        student: String,
        #[arg(long)]
        json: bool,
    },
    /// Score distribution for one exam
    Distribution {
        #[arg(long)]
        exam: Uuid,
        #[arg(long)]
        course: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Biggest gains and drops against the preceding exam
    Progress {
        #[arg(long)]
        exam: Uuid,
        #[arg(long)]
        course: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown class report
    Report {
        #[arg(long)]
        class: String,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn print_json<T: Serialize>(payload: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(payload)?);
    Ok(())
}

fn course_id(snapshot: &ScoreSnapshot, course: Option<&str>) -> anyhow::Result<Option<Uuid>> {
    course
        .map(|name| snapshot.course_by_name(name).map(|course| course.id))
        .transpose()
        .map_err(Into::into)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.database_url)
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
            let written = db::import_csv(&pool, &csv).await?;
            println!("Wrote {written} scores from {}.", csv.display());
        }
        Commands::Exams { class } => {
            let snapshot = db::fetch_snapshot(&pool).await?;
            let class = snapshot.class_by_name(&class)?;
            let exams = snapshot.class_exams(class.id);
            if exams.is_empty() {
                println!("No exams recorded for {}.", class.name);
            }
            for exam in exams {
                println!("- {} {} ({})", exam.exam_date, exam.name, exam.id);
            }
        }
        Commands::Rank {
            exam,
            course,
            limit,
            json,
        } => {
            let snapshot = db::fetch_snapshot(&pool).await?;
            let course_id = course_id(&snapshot, course.as_deref())?;
            let ranking = rank::rank_exam(&snapshot, exam, course_id)?;

            if json {
                return print_json(&ranking);
            }
            if ranking.is_empty() {
                println!("No scores recorded for this exam.");
                return Ok(());
            }

            println!("Exam ranking:");
            for entry in ranking.iter().take(limit) {
                let student = snapshot.student(entry.student_id)?;
                println!(
                    "{}/{} {} ({}) {:.2}",
                    entry.rank, entry.total_students, student.name, student.student_number, entry.value
                );
            }
        }
        Commands::Leaderboard { class, json } => {
            let snapshot = db::fetch_snapshot(&pool).await?;
            let class = snapshot.class_by_name(&class)?;
            let board = rank::class_leaderboard(&snapshot, class.id)?;

            if json {
                return print_json(&board);
            }
            for (position, entry) in board.iter().enumerate() {
                println!(
                    "{}. {} ({}) average {:.1}",
                    position + 1,
                    entry.name,
                    entry.student_number,
                    entry.average_score
                );
            }
        }
        Commands::Trend { student, json } => {
            let snapshot = db::fetch_snapshot(&pool).await?;
            let student = snapshot.student_by_number(&student)?;
            let trend = trend::student_trend_with(&snapshot, student.id, &settings.trend_policy)?;

            if json {
                return print_json(&trend);
            }
            println!("{} ({})", trend.student.name, trend.student.student_number);
            for exam in &trend.exams {
                println!(
                    "- {} {}: total {:.2}, average {:.2}, rank {}/{}",
                    exam.exam_date,
                    exam.exam_name,
                    exam.total_score,
                    exam.average_score,
                    exam.rank,
                    exam.total_students
                );
            }
            println!(
                "Trend {}, stability {} (variance {:.2}, std dev {:.2})",
                trend.trend.as_str(),
                trend.stability.map_or("n/a", |s| s.as_str()),
                trend.variance,
                trend.std_deviation
            );
        }
        Commands::Distribution { exam, course, json } => {
            let snapshot = db::fetch_snapshot(&pool).await?;
            let course_id = course_id(&snapshot, course.as_deref())?;
            let buckets = distribution::exam_distribution(&snapshot, exam, course_id)?;

            if json {
                return print_json(&buckets);
            }
            for bucket in buckets {
                println!("{:>8}: {}", bucket.range, bucket.count);
            }
        }
        Commands::Progress { exam, course, json } => {
            let snapshot = db::fetch_snapshot(&pool).await?;
            let course_id = course_id(&snapshot, course.as_deref())?;
            let report = progress::compare_progress(&snapshot, exam, course_id)?;

            if json {
                return print_json(&report);
            }
            if report.previous_exam_id.is_none() {
                println!("No earlier exam to compare against.");
                return Ok(());
            }
            println!("Most improved:");
            for entry in &report.improved {
                println!("- {} ({}) {:+.2}", entry.name, entry.student_number, entry.progress);
            }
            println!("Largest declines:");
            for entry in &report.declined {
                println!("- {} ({}) {:+.2}", entry.name, entry.student_number, entry.progress);
            }
        }
        Commands::Report { class, out } => {
            let snapshot = db::fetch_snapshot(&pool).await?;
            let class = snapshot.class_by_name(&class)?;
            let report = report::build_class_report(&snapshot, class.id, &settings.trend_policy)?;
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!(class = %class.name, "report generated");
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
