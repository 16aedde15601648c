use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

use crate::config::CompositeWeights;
use crate::lexicon;
use crate::models::{is_absent, Category, Sign, SkippedEntry, SourceDocument, SummaryDocument};
use crate::normalize::lower_tr;
use crate::rank::Rankings;
use crate::similarity::{has_category_keywords, resolve_cross_category, SimilarityProvider};

/// Points per occurrence of a category boost or category negative phrase.
pub const CATEGORY_BOOST: f64 = 5.0;

pub(crate) fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Negative,
    Neutral,
    Positive,
}

impl Tier {
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            Tier::Positive
        } else if score >= 40.0 {
            Tier::Neutral
        } else {
            Tier::Negative
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDetails {
    pub positive_count: usize,
    pub negative_count: usize,
    pub positive_score: f64,
    pub negative_score: f64,
    pub category_boost: f64,
    pub net_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: f64,
    pub sentiment: Tier,
    pub source_count: usize,
    pub details: ScoreDetails,
}

/// Weighted occurrence total of `terms` in `lower`: (occurrences, weighted sum).
fn weighted_hits(lower: &str, terms: &[(&str, f64)]) -> (usize, f64) {
    terms.iter().fold((0, 0.0), |(n, total), (term, weight)| {
        let c = lower.matches(term).count();
        (n + c, total + weight * c as f64)
    })
}

fn occurrences(lower: &str, phrases: &[&str]) -> usize {
    phrases.iter().map(|p| lower.matches(p).count()).sum()
}

/// Lexicon score of one text, no validity gate. `None` only for absent text.
pub fn sentiment(text: &str, cat: Category) -> Option<ScoreResult> {
    if is_absent(text) {
        return None;
    }
    let lower = lower_tr(text);
    let (positive_count, positive_score) = weighted_hits(&lower, lexicon::POSITIVE_WORDS);
    let (negative_count, negative_score) = weighted_hits(&lower, lexicon::NEGATIVE_WORDS);

    let category_boost = match lexicon::scoring_lexicons().get(&cat) {
        Some(lex) => {
            let up = occurrences(&lower, lex.positive_boost) as f64;
            let down = occurrences(&lower, lex.negative_words) as f64;
            CATEGORY_BOOST * (up - down)
        }
        None => 0.0,
    };

    let net_score = positive_score - negative_score + category_boost;
    let score = round1((50.0 + 2.5 * net_score).clamp(0.0, 100.0));

    Some(ScoreResult {
        score,
        sentiment: Tier::from_score(score),
        source_count: 1,
        details: ScoreDetails {
            positive_count,
            negative_count,
            positive_score: round2(positive_score),
            negative_score: round2(negative_score),
            category_boost: round2(category_boost),
            net_score: round2(net_score),
        },
    })
}

/// Score `text` for `cat`. Specific categories need at least one of their
/// own keywords.
pub fn score_text(text: &str, cat: Category) -> Option<ScoreResult> {
    if !has_category_keywords(text, cat) {
        return None;
    }
    sentiment(text, cat)
}

/// Per-sign scores as written to the scored document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityScores {
    pub genel: Option<ScoreResult>,
    #[serde(rename = "aşk")]
    pub ask: Option<ScoreResult>,
    pub para: Option<ScoreResult>,
    #[serde(rename = "sağlık")]
    pub saglik: Option<ScoreResult>,
    pub toplam: f64,
    pub issues: Vec<String>,
}

impl EntityScores {
    pub fn get(&self, cat: Category) -> Option<&ScoreResult> {
        match cat {
            Category::General => self.genel.as_ref(),
            Category::Love => self.ask.as_ref(),
            Category::Money => self.para.as_ref(),
            Category::Health => self.saglik.as_ref(),
        }
    }

    fn slot(&mut self, cat: Category) -> &mut Option<ScoreResult> {
        match cat {
            Category::General => &mut self.genel,
            Category::Love => &mut self.ask,
            Category::Money => &mut self.para,
            Category::Health => &mut self.saglik,
        }
    }
}

/// sign -> category -> text fragments to score together.
pub type ScoringInput = BTreeMap<Sign, BTreeMap<Category, Vec<String>>>;

/// One canonical text per sign and category.
/// Signs whose categories are all absent are left out.
pub fn input_from_summary(doc: &SummaryDocument) -> ScoringInput {
    doc.iter()
        .filter_map(|(sign, cats)| {
            let cats: BTreeMap<Category, Vec<String>> = cats
                .iter()
                .filter_map(|(cat, text)| {
                    let text = text.as_deref().filter(|t| !is_absent(t))?;
                    Some((*cat, vec![text.to_string()]))
                })
                .collect();
            (!cats.is_empty()).then_some((*sign, cats))
        })
        .collect()
}

/// Fragments of every source merged per sign, in source order.
pub fn input_from_sources(doc: &SourceDocument) -> ScoringInput {
    let mut input = ScoringInput::new();
    for signs in doc.values() {
        for (sign, texts) in signs {
            for cat in Category::ALL {
                let fragments = texts.fragments(cat);
                if fragments.is_empty() {
                    continue;
                }
                input
                    .entry(*sign)
                    .or_default()
                    .entry(cat)
                    .or_default()
                    .extend(fragments.into_iter().map(str::to_string));
            }
        }
    }
    input
}

pub fn composite(scores: &EntityScores, weights: &CompositeWeights) -> f64 {
    let (sum, total) = Category::ALL
        .iter()
        .filter_map(|&cat| scores.get(cat).map(|r| (r.score, weights.weight(cat))))
        .fold((0.0, 0.0), |(s, t), (score, w)| (s + score * w, t + w));
    if total > 0.0 {
        round1(sum / total)
    } else {
        0.0
    }
}

pub struct Scorer<'a> {
    provider: &'a dyn SimilarityProvider,
    weights: CompositeWeights,
    cross_category_threshold: f32,
}

impl<'a> Scorer<'a> {
    pub fn new(provider: &'a dyn SimilarityProvider, weights: CompositeWeights, cross_category_threshold: f32) -> Self {
        Self {
            provider,
            weights,
            cross_category_threshold,
        }
    }

    pub fn score_sign(&self, sign: Sign, cats: &BTreeMap<Category, Vec<String>>) -> EntityScores {
        let mut scores = EntityScores::default();

        let mut joined: HashMap<Category, String> = cats
            .iter()
            .filter(|(_, frags)| !frags.is_empty())
            .map(|(cat, frags)| (*cat, frags.join(" ")))
            .collect();
        scores.issues = resolve_cross_category(self.provider, sign.name(), self.cross_category_threshold, &mut joined);

        for cat in Category::ALL {
            let Some(text) = joined.get(&cat) else {
                continue;
            };
            if !has_category_keywords(text, cat) {
                let issue = format!("'{}' kategorisinde uygun keyword bulunamadı", cat);
                warn!("Validity gate failed - sign={}, {}", sign, issue);
                scores.issues.push(issue);
                continue;
            }
            if let Some(mut r) = sentiment(text, cat) {
                r.source_count = cats.get(&cat).map(Vec::len).unwrap_or(1);
                *scores.slot(cat) = Some(r);
            }
        }

        scores.toplam = composite(&scores, &self.weights);
        debug!(
            "Scored sign - sign={}, toplam={:.1}, issues={}",
            sign,
            scores.toplam,
            scores.issues.len()
        );
        scores
    }

    pub fn score_all(&self, input: &ScoringInput) -> BTreeMap<Sign, EntityScores> {
        let start = std::time::Instant::now();
        let scored: BTreeMap<Sign, EntityScores> = input
            .par_iter()
            .map(|(sign, cats)| (*sign, self.score_sign(*sign, cats)))
            .collect();

        let issues: usize = scored.values().map(|s| s.issues.len()).sum();
        info!(
            "Scoring completed - duration={:.2}s, signs={}, issues={}",
            start.elapsed().as_secs_f32(),
            scored.len(),
            issues
        );
        scored
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMetadata {
    pub date: String,
    pub total_burcs: usize,
    pub scored_at: String,
    #[serde(default)]
    pub skipped_entities: Vec<SkippedEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub metadata: ScoredMetadata,
    pub scores: BTreeMap<Sign, EntityScores>,
    pub rankings: Rankings,
}
