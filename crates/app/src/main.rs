//! `study`: log what you studied and see which reviews are due.
//!
//! Subcommands:
//! - `log`: record a study session and schedule its reviews
//! - `today`: list the reviews due on a day
//! - `done`: count one completed review for a session
//! - `list`: print every stored session
//! - `insights`: streaks, daily activity and completion rate

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use services::{Clock, SchedulerConfig, SchedulerService, StoreConfig};
use study_core::insights::Insights;
use study_core::model::SessionId;
use study_core::schedule::SchedulePreset;
use study_core::time::{format_date, parse_date};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_STORE: &str = "study_schedule.csv";
const DEFAULT_LOG_FILTER: &str = "study=info,services=info,storage=info";

#[derive(Parser)]
#[command(name = "study")]
#[command(about = "Spaced-repetition study log", long_about = None)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true, env = "STUDY_CONFIG")]
    config: Option<PathBuf>,

    /// Session store: a CSV path, an `sqlite:` URL, or `memory`
    #[arg(long, global = true, env = "STUDY_STORE")]
    store: Option<String>,

    /// Spacing schedule preset
    #[arg(long, global = true, env = "STUDY_SCHEDULE")]
    schedule: Option<SchedulePreset>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a study session and schedule its reviews
    Log {
        /// What was studied
        topic: String,

        /// Study date (YYYY-MM-DD), defaults to today
        #[arg(long, value_parser = parse_day)]
        date: Option<NaiveDate>,
    },

    /// List the reviews due today
    Today {
        /// Day to check instead of today (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day)]
        date: Option<NaiveDate>,
    },

    /// Mark one review of a session as completed
    Done {
        /// Session id as shown by `today` or `list`
        #[arg(value_name = "SESSION_ID")]
        id: SessionId,
    },

    /// Print every stored session
    List,

    /// Show streaks, daily activity and completion rate
    Insights {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn parse_day(raw: &str) -> Result<NaiveDate, String> {
    parse_date(raw).map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// File config first, then flag/env overrides, then the working-directory default store.
fn resolve_config(cli: &Cli) -> Result<SchedulerConfig> {
    let mut config = match &cli.config {
        Some(path) => SchedulerConfig::load(path)?,
        None => SchedulerConfig::default(),
    };

    if let Some(preset) = cli.schedule {
        config.schedule.preset = preset;
        config.schedule.offsets = None;
    }

    if let Some(raw) = &cli.store {
        let Ok(store) = raw.parse::<StoreConfig>();
        config.store = Some(store);
    }

    if config.store.is_none() {
        config.store = Some(StoreConfig::Csv {
            path: PathBuf::from(DEFAULT_STORE),
        });
    }

    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;
    let service = SchedulerService::from_config(&config, Clock::default())
        .await
        .context("failed to open the study schedule")?;

    match cli.command {
        Commands::Log { topic, date } => {
            let date = date.unwrap_or_else(|| service.today());
            let session = service.log_session(&topic, date).await?;
            println!(
                "logged #{} {:?} on {}",
                session.id(),
                session.topic(),
                format_date(session.study_date())
            );
            if let Some(next) = session.review_dates().first() {
                println!(
                    "{} reviews scheduled ({}), first on {}",
                    session.review_count(),
                    service.policy().name(),
                    format_date(*next)
                );
            }
        }

        Commands::Today { date } => {
            let day = date.unwrap_or_else(|| service.today());
            let due = service.reviews_due_on(day).await?;
            if due.is_empty() {
                println!("no reviews due on {}", format_date(day));
            } else {
                println!("reviews due on {}:", format_date(day));
                for review in due {
                    println!(
                        "  #{} {} (review {}, {} completed)",
                        review.session_id,
                        review.topic,
                        review.review_number,
                        review.completed_reviews
                    );
                }
            }
        }

        Commands::Done { id } => {
            let session = service.mark_review_done(id).await?;
            println!(
                "#{} {}: {} of {} reviews completed",
                session.id(),
                session.topic(),
                session.completed_reviews(),
                session.review_count()
            );
        }

        Commands::List => {
            let today = service.today();
            let sessions = service.sessions().await?;
            if sessions.is_empty() {
                println!("no study sessions yet");
            }
            for session in sessions {
                let next = session
                    .next_review_after(today)
                    .map_or_else(|| "-".to_owned(), format_date);
                println!(
                    "#{} {} {} ({}/{} completed, next {})",
                    session.id(),
                    format_date(session.study_date()),
                    session.topic(),
                    session.completed_reviews(),
                    session.review_count(),
                    next
                );
            }
        }

        Commands::Insights { json } => {
            let insights = service.insights().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&insights)?);
            } else {
                print_insights(&insights);
            }
        }
    }

    Ok(())
}

fn print_insights(insights: &Insights) {
    println!("sessions:        {}", insights.total_sessions);
    println!(
        "reviews:         {} of {} completed ({:.1}%)",
        insights.total_completed, insights.total_scheduled, insights.completion_rate
    );
    println!("study streak:    {} days", insights.streaks.study_streak);
    println!("revision streak: {} days", insights.streaks.revision_streak);

    if !insights.topic_distribution.is_empty() {
        println!("topics:");
        for topic in &insights.topic_distribution {
            println!("  {:<24} {}", topic.topic, topic.sessions);
        }
    }

    if !insights.streaks.daily_study_counts.is_empty() {
        println!("daily activity:");
        for day in &insights.streaks.daily_study_counts {
            let revised = insights
                .streaks
                .daily_revision_counts
                .iter()
                .find(|r| r.date == day.date)
                .map_or(0, |r| r.count);
            println!(
                "  {}  studied {:<3} reviews completed {}",
                format_date(day.date),
                day.count,
                revised
            );
        }
    }
}
