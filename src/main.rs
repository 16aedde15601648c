use anyhow::{bail, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};

use astro_pulse::config::{EmbeddingConfig, PipelineConfig};
use astro_pulse::orchestrator::{
    categorize_step, leaderboard_step, rank_step, run_daily, score_step, summarize_step, validate_step,
};
use astro_pulse::rank::Period;

/// Astro Pulse - daily horoscope categorization, summaries, scores and rankings
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a JSON config file (defaults, then file, then ASTRO_PULSE_* env)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory holding daily_raw_<date>.json and all outputs
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Run date as YYYY-MM-DD (default: today in the configured timezone)
    #[arg(long, global = true)]
    date: Option<NaiveDate>,

    /// OpenAI-compatible embedding endpoint, e.g. http://localhost:8080/v1
    #[arg(long, global = true)]
    embedding_endpoint: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Full pipeline: categorize, summarize, score, rank and update history
    Run,
    /// Split general texts and fill the love/money/health fields
    Categorize,
    /// Build one deduplicated summary per sign and category
    Summarize,
    /// Score and rank a summarized (or categorized) document
    Score {
        /// Score the per-source categorized document instead of the summaries
        #[arg(long)]
        from_categorized: bool,
    },
    /// Merge the scored rankings of the run date into the history store
    Rank,
    /// Averaged rankings over a period ending at the run date
    Leaderboard {
        #[arg(short, long, value_enum, default_value_t = Period::Weekly)]
        period: Period,
    },
    /// Input quality report for the run date
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();

    info!("Starting astro_pulse");

    let args = Args::parse();

    // CLI flags win over file and environment
    let mut config = PipelineConfig::load(args.config.as_deref())?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if let Some(endpoint) = args.embedding_endpoint {
        match config.embedding.as_mut() {
            Some(emb) => emb.endpoint = endpoint,
            None => config.embedding = Some(EmbeddingConfig::new(endpoint)),
        }
    }
    config.validate()?;

    let tz = config.timezone()?;
    let now = Utc::now().with_timezone(&tz);
    let today = now.date_naive();
    let date = args.date.unwrap_or(today);

    info!(
        "Run configured - date={}, timezone={}, data_dir={}",
        date,
        config.timezone,
        config.data_dir.display()
    );
    debug!("Local time - current_time={}", now.format("%Y-%m-%d %H:%M:%S %Z"));

    match args.command {
        Command::Run => {
            let summary = run_daily(&config, date).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Categorize => {
            categorize_step(&config, date)?;
        }
        Command::Summarize => {
            summarize_step(&config, date).await?;
        }
        Command::Score { from_categorized } => {
            score_step(&config, date, from_categorized)?;
        }
        Command::Rank => {
            let days = rank_step(&config, date)?;
            info!("History updated - days={}", days);
        }
        Command::Leaderboard { period } => match leaderboard_step(&config, period, date)? {
            Some(board) => println!("{}", serde_json::to_string_pretty(&board)?),
            None => bail!("No rankings history in {}", config.data_dir.display()),
        },
        Command::Validate => {
            let report = validate_step(&config, date, today)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.passed() {
                bail!(
                    "Validation failed - errors={}, warnings={}",
                    report.errors().count(),
                    report.warnings().count()
                );
            }
        }
    }
    Ok(())
}
