use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::categorize::{CategorizeStats, Categorizer};
use crate::config::PipelineConfig;
use crate::embed::select_provider;
use crate::models::{decode_source_document, SkippedEntry, SourceDocument, SummaryDocument};
use crate::rank::{rank, DaySnapshot, HistoryStore, Leaderboard, Period, Rankings};
use crate::score::{input_from_sources, input_from_summary, ScoredDocument, ScoredMetadata, Scorer, ScoringInput};
use crate::similarity::SimilarityProvider;
use crate::summarize::{collect_pools, pool_texts, SummarizeOptions, SummarizeStats, Summarizer};
use crate::validate::{validate, ValidationReport};

pub const HISTORY_FILE: &str = "rankings_history.json";

fn ymd(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Where each document of a run lives under the data directory.
#[derive(Debug, Clone)]
pub struct RunPaths {
    dir: PathBuf,
    date: String,
}

impl RunPaths {
    pub fn new(dir: impl Into<PathBuf>, date: NaiveDate) -> Self {
        Self {
            dir: dir.into(),
            date: ymd(date),
        }
    }

    pub fn raw(&self) -> PathBuf {
        self.dir.join(format!("daily_raw_{}.json", self.date))
    }

    pub fn categorized(&self) -> PathBuf {
        self.dir.join(format!("processed_daily_raw_{}.json", self.date))
    }

    pub fn summarized(&self) -> PathBuf {
        self.dir.join(format!("summarized_processed_daily_raw_{}.json", self.date))
    }

    pub fn scored(&self) -> PathBuf {
        self.dir.join(format!("scored_processed_daily_raw_{}.json", self.date))
    }

    pub fn history(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }
}

pub fn write_json<P: AsRef<Path>, T: ?Sized + Serialize>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("Creating {}", parent.display()))?;
    }
    std::fs::write(path, serde_json::to_vec_pretty(value)?)
        .with_context(|| format!("Writing {}", path.display()))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path).with_context(|| format!("Reading {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("Parsing {}", path.display()))
}

/// Load a raw or categorized document. The file itself must be a JSON
/// object; sources and signs that do not decode are skipped and reported.
pub fn load_source_document(path: &Path) -> Result<(SourceDocument, Vec<SkippedEntry>)> {
    let top: BTreeMap<String, serde_json::Value> = load_json(path)?;
    let mut skipped = Vec::new();
    let mut raw = BTreeMap::new();
    for (source, value) in top {
        match value {
            serde_json::Value::Object(signs) => {
                raw.insert(source, signs.into_iter().collect::<BTreeMap<_, _>>());
            }
            _ => skipped.push(SkippedEntry {
                source,
                sign: "*".to_string(),
                reason: "expected an object of signs".to_string(),
            }),
        }
    }
    let (doc, more) = decode_source_document(raw);
    skipped.extend(more);
    for s in &skipped {
        warn!("Skipping entity - source={}, sign={}, reason={}", s.source, s.sign, s.reason);
    }
    if doc.is_empty() {
        bail!("No usable sources in {}", path.display());
    }
    Ok((doc, skipped))
}

pub fn score_and_rank(
    config: &PipelineConfig,
    provider: &dyn SimilarityProvider,
    input: &ScoringInput,
    date: NaiveDate,
    skipped: Vec<SkippedEntry>,
) -> Result<ScoredDocument> {
    let scorer = Scorer::new(provider, config.weights.clone(), config.cross_category_threshold);
    let scores = scorer.score_all(input);
    let rankings = rank(&scores);
    let tz = config.timezone()?;

    Ok(ScoredDocument {
        metadata: ScoredMetadata {
            date: ymd(date),
            total_burcs: scores.len(),
            scored_at: Utc::now().with_timezone(&tz).to_rfc3339(),
            skipped_entities: skipped,
        },
        scores,
        rankings,
    })
}

/// Merge one day of rankings into the history file. Returns the number of
/// days stored afterwards.
pub fn update_history(path: &Path, date: NaiveDate, rankings: &Rankings) -> Result<usize> {
    let mut history = HistoryStore::load(path)?;
    history.merge(date, DaySnapshot::from(rankings));
    history.save(path)?;
    Ok(history.len())
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub date: String,
    pub similarity: &'static str,
    pub categorize: CategorizeStats,
    pub summarize: SummarizeStats,
    pub signs_scored: usize,
    pub skipped_entities: usize,
    pub history_days: usize,
}

/// Full daily run: categorize, summarize, score, rank, then record the
/// day's rankings in the history store.
pub async fn run_daily(config: &PipelineConfig, date: NaiveDate) -> Result<RunSummary> {
    let pipeline_start = std::time::Instant::now();
    let paths = RunPaths::new(&config.data_dir, date);
    info!("Pipeline started - date={}, data_dir={}", ymd(date), config.data_dir.display());

    // 1) raw input
    let raw_path = paths.raw();
    let (raw, skipped) = load_source_document(&raw_path).map_err(|e| {
        error!("Cannot load raw input - path={}", raw_path.display());
        e
    })?;
    info!("Raw input loaded - sources={}, skipped={}", raw.len(), skipped.len());

    // 2) categorize
    let categorizer = Categorizer::new();
    let (categorized, cat_stats) = categorizer.categorize_document(&raw);
    write_json(paths.categorized(), &categorized)?;

    // 3) similarity strategy, chosen once for the run
    let pools = collect_pools(&categorized);
    let provider = select_provider(config.embedding.as_ref(), &pool_texts(&pools)).await;

    // 4) summarize
    let summarizer = Summarizer::new(provider.as_ref(), SummarizeOptions::from(config));
    let (summary, sum_stats) = summarizer.summarize_pools(&pools);
    write_json(paths.summarized(), &summary)?;

    // 5) score + rank
    let skipped_count = skipped.len();
    let scored = score_and_rank(config, provider.as_ref(), &input_from_summary(&summary), date, skipped)?;
    write_json(paths.scored(), &scored)?;

    // 6) history
    let history_days = update_history(&paths.history(), date, &scored.rankings)?;

    if let Some(top) = &scored.rankings.leaders.luckiest {
        info!("Leader - en_şanslı={}, score={:.1}", top.burc, top.score);
    }
    info!(
        "Pipeline completed successfully - total_duration={:.2}s, signs={}, skipped_entities={}, history_days={}",
        pipeline_start.elapsed().as_secs_f32(),
        scored.scores.len(),
        skipped_count,
        history_days
    );

    Ok(RunSummary {
        date: ymd(date),
        similarity: provider.name(),
        categorize: cat_stats,
        summarize: sum_stats,
        signs_scored: scored.scores.len(),
        skipped_entities: skipped_count,
        history_days,
    })
}

pub fn categorize_step(config: &PipelineConfig, date: NaiveDate) -> Result<CategorizeStats> {
    let paths = RunPaths::new(&config.data_dir, date);
    let (raw, _) = load_source_document(&paths.raw())?;
    let (categorized, stats) = Categorizer::new().categorize_document(&raw);
    write_json(paths.categorized(), &categorized)?;
    Ok(stats)
}

pub async fn summarize_step(config: &PipelineConfig, date: NaiveDate) -> Result<SummarizeStats> {
    let paths = RunPaths::new(&config.data_dir, date);
    let (categorized, _) = load_source_document(&paths.categorized())?;
    let pools = collect_pools(&categorized);
    let provider = select_provider(config.embedding.as_ref(), &pool_texts(&pools)).await;
    let (summary, stats) = Summarizer::new(provider.as_ref(), SummarizeOptions::from(config)).summarize_pools(&pools);
    write_json(paths.summarized(), &summary)?;
    Ok(stats)
}

/// Score the summarized document, or with `from_categorized` the per-source
/// categorized document merged per sign.
pub fn score_step(config: &PipelineConfig, date: NaiveDate, from_categorized: bool) -> Result<ScoredDocument> {
    let paths = RunPaths::new(&config.data_dir, date);
    let (input, skipped) = if from_categorized {
        let (doc, skipped) = load_source_document(&paths.categorized())?;
        (input_from_sources(&doc), skipped)
    } else {
        let summary: SummaryDocument = load_json(&paths.summarized())?;
        (input_from_summary(&summary), Vec::new())
    };
    let provider = crate::similarity::LexicalSimilarity;
    let scored = score_and_rank(config, &provider, &input, date, skipped)?;
    write_json(paths.scored(), &scored)?;
    Ok(scored)
}

pub fn rank_step(config: &PipelineConfig, date: NaiveDate) -> Result<usize> {
    let paths = RunPaths::new(&config.data_dir, date);
    let scored: ScoredDocument = load_json(&paths.scored())?;
    update_history(&paths.history(), date, &scored.rankings)
}

pub fn leaderboard_step(config: &PipelineConfig, period: Period, target: NaiveDate) -> Result<Option<Leaderboard>> {
    let path = config.data_dir.join(HISTORY_FILE);
    let history = HistoryStore::load(&path)?;
    let board = history.leaderboard(period, target);
    match &board {
        Some(b) => info!(
            "Leaderboard - period={}, start={}, end={}, days={}",
            b.period, b.start_date, b.end_date, b.days
        ),
        None => warn!("Leaderboard unavailable - history is empty, path={}", path.display()),
    }
    Ok(board)
}

/// Input quality report for a run date. The categorized document is used
/// when it exists.
pub fn validate_step(config: &PipelineConfig, date: NaiveDate, today: NaiveDate) -> Result<ValidationReport> {
    let paths = RunPaths::new(&config.data_dir, date);
    let (raw, _) = load_source_document(&paths.raw())?;
    let categorized = if paths.categorized().exists() {
        Some(load_source_document(&paths.categorized())?.0)
    } else {
        debug!("No categorized document yet - path={}", paths.categorized().display());
        None
    };
    Ok(validate(&raw, categorized.as_ref(), date, today))
}
