use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod community;
mod config;
mod db;
mod error;
mod ingest;
mod models;
mod report;
mod risk;
mod sentiment;
mod trends;

use crate::config::AnalysisConfig;
use crate::ingest::MoodSubmission;
use crate::models::{CommunityInsight, RiskAssessment, RiskLevel, TrendSummary};
use crate::risk::CrisisDetector;

#[derive(Parser)]
#[command(name = "mood-pulse")]
#[command(about = "Mood trend and crisis-risk analysis for anonymous check-ins", long_about = None)]
struct Cli {
    /// TOML file overriding analysis thresholds, keywords and texts
    #[arg(long, global = true, env = "MOOD_PULSE_CONFIG")]
    config: Option<PathBuf>,
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import mood entries from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Assess and store a single mood check-in
    Record {
        #[arg(long)]
        commitment: String,
        #[arg(long, allow_negative_numbers = true)]
        score: i32,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        triggers: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Assess crisis risk for a piece of text without storing it
    Assess {
        #[arg(long, allow_negative_numbers = true)]
        score: i32,
        #[arg(long, default_value = "")]
        text: String,
    },
    /// Analyze one user's mood trend
    Analyze {
        #[arg(long)]
        commitment: String,
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
    /// Aggregate anonymized community statistics
    Community {
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
    /// Generate a markdown trend report for one user
    Report {
        #[arg(long)]
        commitment: String,
        #[arg(long, default_value_t = 30)]
        days: i64,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mood_pulse=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AnalysisConfig::load(cli.config.as_deref())?;
    let detector = CrisisDetector::new(&config).context("failed to compile crisis keywords")?;

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect().await?;
            let inserted = db::seed(&pool, &detector).await?;
            println!("Seeded {inserted} mood entries.");
        }
        Commands::Import { csv } => {
            let pool = connect().await?;
            let inserted = db::import_csv(&pool, &detector, &csv).await?;
            println!("Inserted {inserted} mood entries from {}.", csv.display());
        }
        Commands::Record {
            commitment,
            score,
            description,
            triggers,
            notes,
        } => {
            let submission = MoodSubmission {
                score,
                description,
                triggers,
                notes,
            };
            let (entry, assessment) =
                ingest::prepare_entry(&detector, &commitment, submission, Utc::now(), None)?;
            let pool = connect().await?;
            db::insert_entry(&pool, &entry).await?;

            if cli.json {
                print_json(&assessment)?;
            } else {
                println!("Mood recorded.");
                print_assessment(&assessment);
            }
        }
        Commands::Assess { score, text } => {
            let assessment = detector.assess(&text, score)?;
            if cli.json {
                print_json(&assessment)?;
            } else {
                print_assessment(&assessment);
            }
        }
        Commands::Analyze { commitment, days } => {
            let until = Utc::now();
            let since = trends::window_start(until, days, &config.trend)?;
            let pool = connect().await?;
            let entries = db::fetch_entries(&pool, &commitment, since, until).await?;
            let summary = trends::analyze(&entries, days, &config.trend)?;

            if cli.json {
                print_json(&summary)?;
            } else {
                print_summary(&summary);
            }
        }
        Commands::Community { days } => {
            let until = Utc::now();
            let since = trends::window_start(until, days, &config.trend)?;
            let pool = connect().await?;
            let entries = db::fetch_all_entries(&pool, since, until).await?;
            let insight = community::aggregate(&entries, &config.community);

            if cli.json {
                print_json(&insight)?;
            } else {
                print_insight(&insight, days);
            }
        }
        Commands::Report {
            commitment,
            days,
            out,
        } => {
            let until = Utc::now();
            let since = trends::window_start(until, days, &config.trend)?;
            let pool = connect().await?;
            let entries = db::fetch_entries(&pool, &commitment, since, until).await?;
            let summary = trends::analyze(&entries, days, &config.trend)?;
            let everyone = db::fetch_all_entries(&pool, since, until).await?;
            let insight = community::aggregate(&everyone, &config.community);

            let report =
                report::build_report(&commitment, since, &summary, &entries, Some(&insight));
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
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

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_assessment(assessment: &RiskAssessment) {
    println!(
        "Risk level {} (score {:.3}), intervention needed: {}",
        assessment.risk_level,
        assessment.risk_score,
        if assessment.needs_intervention { "yes" } else { "no" }
    );
    if !assessment.matched_keywords.is_empty() {
        println!(
            "{} keyword matches, {} of them crisis language:",
            assessment.matched_keywords.len(),
            assessment.crisis_match_count()
        );
    }
    for keyword in &assessment.matched_keywords {
        println!("- matched '{}' ({})", keyword.phrase, keyword.category);
    }
    println!("Recommendations:");
    for recommendation in &assessment.recommendations {
        println!("- {recommendation}");
    }
    if assessment.risk_level == RiskLevel::High {
        println!("High risk detected. Please consider immediate professional support.");
        println!("Crisis resources:");
        for resource in &assessment.crisis_resources {
            println!("- {resource}");
        }
    }
}

fn print_summary(summary: &TrendSummary) {
    if !summary.sufficient_data {
        println!(
            "Only {} entries in the last {} days; log more entries for a trend.",
            summary.entries_count, summary.period_days
        );
    } else {
        println!(
            "{} entries over {} days: {} (slope {:+.2}), volatility {} (std dev {:.2})",
            summary.entries_count,
            summary.period_days,
            summary.direction.as_str(),
            summary.slope,
            summary.volatility_level.as_str(),
            summary.standard_deviation
        );
        if let Some(average) = summary.average_mood {
            println!("Average mood {average:.1}");
        }
        if let (Some(best), Some(worst)) =
            (summary.day_patterns.best_day, summary.day_patterns.worst_day)
        {
            println!("Best day {best}, hardest day {worst}");
        }
    }
    println!(
        "Risk {} (crisis rate {:.0}%, low mood rate {:.0}%)",
        summary.risk.level,
        summary.risk.crisis_rate * 100.0,
        summary.risk.low_mood_rate * 100.0
    );
    println!("Recommendations:");
    for recommendation in &summary.recommendations {
        println!("- {recommendation}");
    }
}

fn print_insight(insight: &CommunityInsight, days: i64) {
    if insight.total_entries == 0 {
        println!("No community entries in the last {days} days.");
        return;
    }

    let distribution = &insight.mood_distribution;
    println!(
        "{} entries from {} users in the last {} days",
        insight.total_entries, insight.active_user_count, days
    );
    if let Some(average) = insight.average_mood {
        println!("Average mood {average:.1}, crisis rate {:.1}%", insight.crisis_rate * 100.0);
    }
    println!(
        "Distribution: excellent {}, good {}, moderate {}, low {}, crisis {}",
        distribution.excellent,
        distribution.good,
        distribution.moderate,
        distribution.low,
        distribution.crisis
    );
    if !insight.sufficient_data {
        println!("Not enough entries for community insights yet.");
    }
    for text in &insight.insights {
        println!("- {text}");
    }
}
