use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use rust_decimal::Decimal;
use std::fs;
use std::path::PathBuf;
use tabled::{Table, Tabled};

use peakform::coach;
use peakform::config::AppConfig;
use peakform::llm::OpenAiCompatibleClient;
use peakform::load;
use peakform::logging::{self, LogLevel};
use peakform::metrics;
use peakform::models::{NewSleepEntry, NewWorkout, WorkoutType};
use peakform::store::Database;

/// peakform - Endurance training log and metrics engine
///
/// Logs workouts and sleep, computes fitness/fatigue/form (CTL, ATL, TSB)
/// and a composite recovery score, and generates AI workout recommendations.
#[derive(Parser)]
#[command(name = "peakform")]
#[command(version = "0.1.0")]
#[command(about = "Endurance training log and metrics engine", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Overrides the database path
    #[arg(long, value_name = "FILE")]
    db: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register an athlete profile
    UserAdd {
        /// Display name
        #[arg(long)]
        name: String,

        /// Primary sport (running, cycling, triathlon, ...)
        #[arg(long)]
        sport: Option<String>,

        /// Experience level (beginner, intermediate, advanced)
        #[arg(long)]
        experience: Option<String>,

        /// Training goal (marathon, base fitness, ...)
        #[arg(long)]
        goal: Option<String>,
    },

    /// Log a workout; the training load is computed when --load is omitted
    LogWorkout {
        /// User id
        #[arg(long)]
        user: i64,

        /// Workout date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Workout type: easy, tempo, interval, long, race
        #[arg(long = "type", value_name = "TYPE")]
        workout_type: WorkoutType,

        /// Duration in minutes
        #[arg(long)]
        duration: Decimal,

        /// Distance in kilometers
        #[arg(long)]
        distance: Option<Decimal>,

        /// Average heart rate in bpm
        #[arg(long)]
        avg_hr: Option<u16>,

        /// Explicit training load score (computed if omitted)
        #[arg(long)]
        load: Option<Decimal>,
    },

    /// Log a night of sleep
    LogSleep {
        /// User id
        #[arg(long)]
        user: i64,

        /// Sleep date (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Hours slept
        #[arg(long)]
        hours: Decimal,

        /// Subjective quality score, 1-10
        #[arg(long)]
        quality: u8,
    },

    /// Display the training metrics bundle
    Metrics {
        /// User id
        #[arg(long)]
        user: i64,

        /// Compute metrics as of this date (default today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Emit the bundle as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Generate an AI workout recommendation
    Recommend {
        /// User id
        #[arg(long)]
        user: i64,

        /// Emit the recommendation as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(db_path) = cli.db {
        config.store.db_path = db_path;
    }
    if cli.verbose > 0 {
        config.logging.level = match cli.verbose {
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        };
    }
    logging::init_logging(&config.logging)?;

    if let Some(parent) = config.store.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create data directory: {}", parent.display())
            })?;
        }
    }
    let db = Database::open(&config.store.db_path).with_context(|| {
        format!("Failed to open database: {}", config.store.db_path.display())
    })?;

    let today = Utc::now().date_naive();

    match cli.command {
        Commands::UserAdd {
            name,
            sport,
            experience,
            goal,
        } => {
            let user_id = db.insert_user(
                &name,
                sport.as_deref(),
                experience.as_deref(),
                goal.as_deref(),
            )?;
            println!("{}", format!("✓ Registered user {user_id}: {name}").green());
        }

        Commands::LogWorkout {
            user,
            date,
            workout_type,
            duration,
            distance,
            avg_hr,
            load,
        } => {
            if duration < Decimal::ZERO {
                bail!("Duration must not be negative");
            }
            if load.is_some_and(|l| l < Decimal::ZERO) {
                bail!("Training load must not be negative");
            }

            let date = date.unwrap_or(today);
            let load_score =
                load.unwrap_or_else(|| load::training_load_score(duration, workout_type, avg_hr));

            db.insert_workout(&NewWorkout {
                user_id: user,
                date,
                workout_type,
                duration_minutes: duration,
                distance_km: distance,
                avg_hr,
                load_score: Some(load_score),
            })?;
            println!(
                "{}",
                format!("✓ Logged {workout_type} workout on {date} (load {load_score})").green()
            );
        }

        Commands::LogSleep {
            user,
            date,
            hours,
            quality,
        } => {
            if hours < Decimal::ZERO {
                bail!("Sleep hours must not be negative");
            }
            if !(1..=10).contains(&quality) {
                bail!("Quality score must be between 1 and 10");
            }

            let date = date.unwrap_or(today);
            db.insert_sleep(&NewSleepEntry {
                user_id: user,
                date,
                hours,
                quality_score: quality,
            })?;
            println!(
                "{}",
                format!("✓ Logged {hours}h sleep (quality {quality}) on {date}").green()
            );
        }

        Commands::Metrics { user, date, json } => {
            let as_of = date.unwrap_or(today);
            let bundle = metrics::get_training_metrics(&db, user, as_of)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&bundle)?);
            } else {
                println!(
                    "{}",
                    format!("Training metrics as of {as_of}").blue().bold()
                );
                println!("{}", Table::new(metric_rows(&bundle)));
            }
        }

        Commands::Recommend { user, json } => {
            let client = OpenAiCompatibleClient::from_settings(&config.model)
                .context("Cannot build model client")?;

            println!("{}", "Generating workout recommendation...".cyan());
            let output = coach::generate_recommendation(&db, &client, user, today)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                let rec = &output.recommendation;
                println!(
                    "{}",
                    format!(
                        "✓ {} - {} minutes ({} intensity)",
                        rec.workout_type, rec.duration_minutes, rec.intensity
                    )
                    .green()
                    .bold()
                );
                println!("\n{}", rec.description);
                println!("\n{} {}", "Why:".bold(), rec.reasoning);
                for warning in &rec.warnings {
                    println!("{} {}", "!".yellow().bold(), warning.yellow());
                }
                if !output.analysis.is_empty() {
                    println!("\n{}\n{}", "Coach analysis:".bold(), output.analysis);
                }
            }
        }
    }

    Ok(())
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Notes")]
    notes: String,
}

fn metric_rows(bundle: &metrics::TrainingMetrics) -> Vec<MetricRow> {
    vec![
        MetricRow {
            metric: "Fitness (CTL)".to_string(),
            value: bundle.fitness.ctl.to_string(),
            notes: bundle.fitness.description.clone(),
        },
        MetricRow {
            metric: "Fatigue (ATL)".to_string(),
            value: bundle.fatigue.atl.to_string(),
            notes: bundle.fatigue.description.clone(),
        },
        MetricRow {
            metric: "Form (TSB)".to_string(),
            value: bundle.form.tsb.to_string(),
            notes: bundle.form.status.clone(),
        },
        MetricRow {
            metric: "Recovery".to_string(),
            value: bundle.recovery.recovery_score.to_string(),
            notes: bundle.recovery.recommendation.clone(),
        },
        MetricRow {
            metric: "  Sleep component".to_string(),
            value: bundle.recovery.sleep_quality.to_string(),
            notes: String::new(),
        },
        MetricRow {
            metric: "  Stress component".to_string(),
            value: bundle.recovery.training_stress.to_string(),
            notes: String::new(),
        },
        MetricRow {
            metric: "Weekly load".to_string(),
            value: bundle.weekly_training_load.to_string(),
            notes: "Sum of the last 7 days".to_string(),
        },
    ]
}
