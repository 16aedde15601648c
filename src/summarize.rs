use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};
use xxhash_rust::xxh3::{xxh3_64, xxh3_64_with_seed};

use crate::config::PipelineConfig;
use crate::lexicon;
use crate::models::{Category, Sentence, Sign, SourceDocument, SummaryDocument};
use crate::normalize::{lower_tr, upper_tr};
use crate::similarity::{SimilarityProvider, SENTENCE_DEDUP_THRESHOLD};

static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));
static SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+\s+").expect("split pattern is valid"));
static LEADING_PUNCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[,;:\s]+").expect("punct pattern is valid"));
static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("word pattern is valid"));

static OPENER_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    lexicon::SOURCE_OPENERS
        .iter()
        .map(|p| Regex::new(&format!("(?i){}", p)).expect("opener pattern is valid"))
        .collect()
});

// Matched against the lowercased sentence body.
static PROPER_NOUN_RES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    lexicon::PROPER_NOUNS
        .iter()
        .map(|n| {
            let re = Regex::new(&format!(r"\b{}\b", regex::escape(&lower_tr(n))))
                .expect("proper noun pattern is valid");
            (re, *n)
        })
        .collect()
});

/// sign -> category -> candidate sentences across every source, in source order.
pub type CandidatePools = BTreeMap<Sign, BTreeMap<Category, Vec<Sentence>>>;

/// Collapse whitespace and strip boilerplate openers some sources prepend.
pub fn clean_text(text: &str) -> String {
    let mut out = WS_RE.replace_all(text, " ").into_owned();
    for re in OPENER_RES.iter() {
        out = re.replace_all(&out, "").into_owned();
    }
    out.trim().to_string()
}

pub fn split_candidates(text: &str) -> Vec<String> {
    SPLIT_RE
        .split(text)
        .map(|s| LEADING_PUNCT_RE.replace(s.trim(), "").trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn collect_pools(doc: &SourceDocument) -> CandidatePools {
    let mut pools = CandidatePools::new();
    for sign in Sign::ALL {
        let entry = pools.entry(sign).or_default();
        for cat in Category::ALL {
            let mut pool = Vec::new();
            for (source, signs) in doc {
                let Some(text) = signs.get(&sign).and_then(|t| t.text(cat)) else {
                    continue;
                };
                pool.extend(split_candidates(&clean_text(&text)).into_iter().map(|text| Sentence {
                    source: source.clone(),
                    text,
                }));
            }
            entry.insert(cat, pool);
        }
    }
    pools
}

/// Every distinct candidate sentence, for embedding prefetch.
pub fn pool_texts(pools: &CandidatePools) -> Vec<String> {
    let set: BTreeSet<&str> = pools
        .values()
        .flat_map(|cats| cats.values())
        .flatten()
        .map(|s| s.text.as_str())
        .collect();
    set.into_iter().map(str::to_string).collect()
}

/// First occurrence wins: a sentence is kept only while it stays below
/// `threshold` against everything kept before it.
pub fn deduplicate(p: &dyn SimilarityProvider, sentences: &[Sentence], threshold: f32) -> Vec<Sentence> {
    let mut kept: Vec<Sentence> = Vec::with_capacity(sentences.len());
    for s in sentences {
        if kept.iter().all(|k| p.similarity(&k.text, &s.text) < threshold) {
            kept.push(s.clone());
        }
    }
    kept
}

/// Keyword occurrence counts normalized by the pool maximum.
pub fn relevance(sentences: &[Sentence], cat: Category) -> Vec<f32> {
    let keywords = lexicon::relevance_keywords(cat);
    let raw: Vec<usize> = sentences
        .iter()
        .map(|s| {
            let lower = lower_tr(&s.text);
            keywords.iter().map(|k| lower.matches(k).count()).sum()
        })
        .collect();
    let max = raw.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return vec![0.0; raw.len()];
    }
    raw.iter().map(|&r| r as f32 / max as f32).collect()
}

/// Maximal marginal relevance. Returns indices in selection order; ties go
/// to the earlier sentence.
pub fn select_mmr(
    p: &dyn SimilarityProvider,
    sentences: &[Sentence],
    rel: &[f32],
    k: usize,
    lambda: f32,
) -> Vec<usize> {
    let mut selected: Vec<usize> = Vec::with_capacity(k);
    let mut remaining: Vec<usize> = (0..sentences.len()).collect();

    while selected.len() < k && !remaining.is_empty() {
        let mut best: Option<(usize, f32)> = None;
        for (pos, &i) in remaining.iter().enumerate() {
            let score = if selected.is_empty() {
                rel[i]
            } else {
                let max_sim = selected
                    .iter()
                    .map(|&j| p.similarity(&sentences[i].text, &sentences[j].text))
                    .fold(0.0f32, f32::max);
                lambda * rel[i] - (1.0 - lambda) * max_sim
            };
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((pos, score));
            }
        }
        let Some((pos, _)) = best else { break };
        selected.push(remaining.remove(pos));
    }
    selected
}

/// Stable relevance-ranked top-K.
pub fn select_top_k(rel: &[f32], k: usize) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..rel.len()).collect();
    idx.sort_by(|a, b| rel[*b].partial_cmp(&rel[*a]).unwrap_or(std::cmp::Ordering::Equal));
    idx.truncate(k);
    idx
}

/// Case-insensitive whole-word prefix strip.
fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let n = prefix.chars().count();
    if s.chars().count() < n {
        return None;
    }
    let end = s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len());
    if lower_tr(&s[..end]) != prefix {
        return None;
    }
    let rest = &s[end..];
    if rest.chars().next().is_some_and(|c| c.is_alphanumeric()) {
        return None;
    }
    Some(rest)
}

/// A sign name (singular, plural or slug) or a known reader address,
/// optionally followed by "burcu" and similar.
fn is_addressee(words: &str) -> bool {
    let words: Vec<String> = words.split_whitespace().map(lower_tr).collect();
    let [head, tail @ ..] = words.as_slice() else {
        return false;
    };
    if tail.len() > 1 || !tail.iter().all(|w| lexicon::VOCATIVE_ADDRESSEES.contains(&w.as_str())) {
        return false;
    }
    lexicon::VOCATIVE_ADDRESSEES.contains(&head.as_str())
        || head.parse::<Sign>().is_ok()
        || Sign::ALL.iter().any(|sign| {
            let name = lower_tr(sign.name());
            head.strip_prefix(name.as_str())
                .is_some_and(|rest| matches!(rest, "" | "lar" | "ler"))
        })
}

fn strip_vocative(s: &str) -> &str {
    for v in lexicon::VOCATIVE_OPENERS {
        let Some(rest) = strip_prefix_ci(s, v) else {
            continue;
        };
        if let Some(comma) = rest.find(',') {
            if is_addressee(&rest[..comma]) {
                return rest[comma + 1..].trim_start();
            }
        }
    }
    s
}

fn strip_discourse_markers(s: &str) -> &str {
    let mut rest = s.trim();
    for m in lexicon::DISCOURSE_MARKERS {
        if let Some(r) = strip_prefix_ci(rest, m) {
            rest = r.trim_start().trim_start_matches(',').trim_start();
        }
    }
    rest
}

fn capitalize_tr(s: &str) -> String {
    let lower = lower_tr(s);
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => upper_tr(&first.to_string()) + chars.as_str(),
        None => String::new(),
    }
}

/// Make one selected sentence stand on its own. `None` when nothing is left
/// after the openers are stripped.
pub fn format_sentence(s: &str) -> Option<String> {
    let body = strip_discourse_markers(strip_vocative(s.trim()));
    if body.is_empty() {
        return None;
    }
    let mut out = capitalize_tr(body);
    if !out.ends_with(['.', '!', '?']) {
        out.push('.');
    }
    for (re, noun) in PROPER_NOUN_RES.iter() {
        if re.is_match(&out) {
            out = re.replace_all(&out, *noun).into_owned();
        }
    }
    Some(out)
}

fn match_case(original: &str, replacement: &str) -> String {
    if original.chars().next().is_some_and(char::is_uppercase) {
        capitalize_tr(replacement)
    } else {
        replacement.to_string()
    }
}

/// Swap `floor(ratio * matches)` words that have curated synonyms. Which
/// words change, and what they become, is decided by hashes seeded with the
/// text itself.
pub fn substitute_synonyms(text: &str, ratio: f64) -> String {
    if ratio <= 0.0 {
        return text.to_string();
    }
    let seed = xxh3_64(text.as_bytes());
    let candidates: Vec<(usize, regex::Match, Vec<&'static str>)> = WORD_RE
        .find_iter(text)
        .enumerate()
        .filter_map(|(i, m)| lexicon::synonyms_of(&lower_tr(m.as_str())).map(|syn| (i, m, syn)))
        .filter(|(_, _, syn)| !syn.is_empty())
        .collect();

    let n = (ratio.min(1.0) * candidates.len() as f64).floor() as usize;
    if n == 0 {
        return text.to_string();
    }
    let mut ranked: Vec<(u64, usize)> = candidates
        .iter()
        .enumerate()
        .map(|(ci, (i, _, _))| (xxh3_64_with_seed(&(*i as u64).to_le_bytes(), seed), ci))
        .collect();
    ranked.sort_unstable();
    let chosen: BTreeSet<usize> = ranked.iter().take(n).map(|(_, ci)| *ci).collect();

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (ci, (_, m, syn)) in candidates.iter().enumerate() {
        if !chosen.contains(&ci) {
            continue;
        }
        let h = xxh3_64_with_seed(m.as_str().as_bytes(), seed);
        let pick = syn[(h % syn.len() as u64) as usize];
        out.push_str(&text[last..m.start()]);
        out.push_str(&match_case(m.as_str(), pick));
        last = m.end();
    }
    out.push_str(&text[last..]);
    out
}

#[derive(Debug, Clone)]
pub struct SummarizeOptions {
    pub dedup_threshold: f32,
    pub lambda: f32,
    pub max_general: usize,
    pub max_specific: usize,
    pub synonym_ratio: f64,
}

impl Default for SummarizeOptions {
    fn default() -> Self {
        Self {
            dedup_threshold: SENTENCE_DEDUP_THRESHOLD,
            lambda: 0.7,
            max_general: 4,
            max_specific: 3,
            synonym_ratio: 0.0,
        }
    }
}

impl From<&PipelineConfig> for SummarizeOptions {
    fn from(c: &PipelineConfig) -> Self {
        Self {
            dedup_threshold: c.sentence_dedup_threshold,
            lambda: c.mmr_lambda,
            max_general: c.max_general_sentences,
            max_specific: c.max_specific_sentences,
            synonym_ratio: c.synonym_ratio,
        }
    }
}

impl SummarizeOptions {
    pub fn max_sentences(&self, cat: Category) -> usize {
        if cat.is_general() {
            self.max_general
        } else {
            self.max_specific
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SummarizeStats {
    pub signs: usize,
    pub pool_sentences: usize,
    pub duplicates_removed: usize,
    pub summarized: BTreeMap<Category, usize>,
    pub null: BTreeMap<Category, usize>,
}

struct CategoryOutcome {
    summary: Option<String>,
    pool: usize,
    duplicates: usize,
}

pub struct Summarizer<'a> {
    provider: &'a dyn SimilarityProvider,
    options: SummarizeOptions,
}

impl<'a> Summarizer<'a> {
    pub fn new(provider: &'a dyn SimilarityProvider, options: SummarizeOptions) -> Self {
        Self { provider, options }
    }

    pub fn summarize(&self, pool: &[Sentence], cat: Category) -> Option<String> {
        self.summarize_counted(pool, cat).summary
    }

    fn summarize_counted(&self, pool: &[Sentence], cat: Category) -> CategoryOutcome {
        let mut outcome = CategoryOutcome {
            summary: None,
            pool: pool.len(),
            duplicates: 0,
        };
        if pool.is_empty() {
            return outcome;
        }
        let unique = deduplicate(self.provider, pool, self.options.dedup_threshold);
        outcome.duplicates = pool.len() - unique.len();

        let rel = relevance(&unique, cat);
        let k = self.options.max_sentences(cat);
        let picked = if self.provider.supports_diversity() {
            select_mmr(self.provider, &unique, &rel, k, self.options.lambda)
        } else {
            select_top_k(&rel, k)
        };

        let formatted: Vec<String> = picked.iter().filter_map(|&i| format_sentence(&unique[i].text)).collect();
        if formatted.is_empty() {
            return outcome;
        }
        let joined = formatted.join(" ");
        outcome.summary = Some(substitute_synonyms(&joined, self.options.synonym_ratio));
        outcome
    }

    pub fn summarize_pools(&self, pools: &CandidatePools) -> (SummaryDocument, SummarizeStats) {
        let start = std::time::Instant::now();
        info!(
            "Summarization starting - signs={}, provider={}",
            pools.len(),
            self.provider.name()
        );

        let per_sign: Vec<(Sign, Vec<(Category, CategoryOutcome)>)> = pools
            .par_iter()
            .map(|(sign, cats)| {
                let outcomes = Category::ALL
                    .iter()
                    .map(|&cat| {
                        let pool = cats.get(&cat).map(Vec::as_slice).unwrap_or(&[]);
                        (cat, self.summarize_counted(pool, cat))
                    })
                    .collect();
                (*sign, outcomes)
            })
            .collect();

        let mut doc = SummaryDocument::new();
        let mut stats = SummarizeStats {
            signs: per_sign.len(),
            ..Default::default()
        };
        for (sign, outcomes) in per_sign {
            let entry = doc.entry(sign).or_default();
            for (cat, o) in outcomes {
                stats.pool_sentences += o.pool;
                stats.duplicates_removed += o.duplicates;
                let bucket = if o.summary.is_some() {
                    &mut stats.summarized
                } else {
                    &mut stats.null
                };
                *bucket.entry(cat).or_default() += 1;
                entry.insert(cat, o.summary);
            }
        }

        for cat in Category::ALL {
            let done = stats.summarized.get(&cat).copied().unwrap_or(0);
            debug!(
                "Summarization category - category={}, summarized={}/{}",
                cat,
                done,
                stats.signs
            );
        }
        info!(
            "Summarization completed - duration={:.2}s, signs={}, pool_sentences={}, duplicates_removed={}",
            start.elapsed().as_secs_f32(),
            stats.signs,
            stats.pool_sentences,
            stats.duplicates_removed
        );
        (doc, stats)
    }

    pub fn summarize_document(&self, doc: &SourceDocument) -> (SummaryDocument, SummarizeStats) {
        self.summarize_pools(&collect_pools(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SignTexts;
    use crate::similarity::LexicalSimilarity;

    fn sent(text: &str) -> Sentence {
        Sentence {
            source: "test".to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn clean_text_strips_openers_and_whitespace() {
        let out = clean_text("Günlük burç yorumları Koç;   Bugün   güzel bir gün.");
        assert_eq!(out, "Bugün güzel bir gün.");
        assert_eq!(clean_text("Uzman Astrolog Merkür destek veriyor."), "Merkür destek veriyor.");
    }

    #[test]
    fn split_candidates_trims_leading_punctuation() {
        let out = split_candidates("Bugün harika. Yarın zor! , ayrıca dikkat");
        assert_eq!(out, vec!["Bugün harika", "Yarın zor", "ayrıca dikkat"]);
    }

    #[test]
    fn first_occurrence_wins() {
        let pool = vec![
            Sentence {
                source: "a".to_string(),
                text: "Aşk hayatınızda güzel gelişmeler var".to_string(),
            },
            Sentence {
                source: "b".to_string(),
                text: "aşk hayatınızda güzel gelişmeler var bugün".to_string(),
            },
            sent("Para konusunda dikkatli olun"),
        ];
        let kept = deduplicate(&LexicalSimilarity, &pool, 0.70);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].source, "a");
        assert_eq!(kept[1].text, "Para konusunda dikkatli olun");
    }

    #[test]
    fn relevance_is_normalized() {
        let pool = vec![sent("aşk ve partner"), sent("aşk"), sent("hava güzel")];
        let rel = relevance(&pool, Category::Love);
        assert_eq!(rel, vec![1.0, 0.5, 0.0]);
        assert_eq!(relevance(&pool, Category::General), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn top_k_is_stable_on_ties() {
        assert_eq!(select_top_k(&[0.0, 0.0, 0.0], 2), vec![0, 1]);
        assert_eq!(select_top_k(&[0.5, 1.0, 0.5], 2), vec![1, 0]);
    }

    struct PairSimilarity;

    impl SimilarityProvider for PairSimilarity {
        fn name(&self) -> &'static str {
            "pair"
        }

        fn similarity(&self, a: &str, b: &str) -> f32 {
            let twins = ["A", "B"];
            if a == b || (twins.contains(&a) && twins.contains(&b)) {
                1.0
            } else {
                0.0
            }
        }

        fn supports_diversity(&self) -> bool {
            true
        }
    }

    #[test]
    fn mmr_prefers_diverse_sentences() {
        let pool = vec![sent("A"), sent("B"), sent("C")];
        let rel = [1.0, 0.9, 0.6];
        assert_eq!(select_mmr(&PairSimilarity, &pool, &rel, 2, 0.7), vec![0, 2]);
        assert_eq!(select_top_k(&rel, 2), vec![0, 1]);
        assert_eq!(select_mmr(&PairSimilarity, &pool, &rel, 10, 0.7).len(), 3);
    }

    #[test]
    fn format_sentence_strips_openers() {
        assert_eq!(
            format_sentence("ayrıca, para konusunda şanslısınız").as_deref(),
            Some("Para konusunda şanslısınız.")
        );
        assert_eq!(
            format_sentence("Sevgili Koç, bugün enerjiniz yüksek").as_deref(),
            Some("Bugün enerjiniz yüksek.")
        );
        assert_eq!(
            format_sentence("Değerli okurlar, hafta sonu dinlenin").as_deref(),
            Some("Hafta sonu dinlenin.")
        );
        assert_eq!(
            format_sentence("canım Yaylar, yeni bir yola çıkıyorsunuz").as_deref(),
            Some("Yeni bir yola çıkıyorsunuz.")
        );
        assert_eq!(format_sentence("Ancak"), None);
        assert_eq!(
            format_sentence("Amaçlarınıza odaklanın!").as_deref(),
            Some("Amaçlarınıza odaklanın!")
        );
    }

    #[test]
    fn affectionate_words_that_are_not_addresses_survive() {
        assert_eq!(
            format_sentence("Sevgili adayınızla buluşacaksınız, heyecan dorukta").as_deref(),
            Some("Sevgili adayınızla buluşacaksınız, heyecan dorukta.")
        );
        assert_eq!(
            format_sentence("Değerli bir hediye, size mutluluk getirecek").as_deref(),
            Some("Değerli bir hediye, size mutluluk getirecek.")
        );
    }

    #[test]
    fn format_sentence_restores_proper_nouns() {
        assert_eq!(
            format_sentence("MERKÜR retrosu bitiyor, venüs destekliyor").as_deref(),
            Some("Merkür retrosu bitiyor, Venüs destekliyor.")
        );
        assert_eq!(
            format_sentence("ikizler burcu için İYİ bir gün").as_deref(),
            Some("İkizler burcu için iyi bir gün.")
        );
    }

    #[test]
    fn synonyms_are_reproducible() {
        let text = "Harika bir gün. Güzel haberler ve önemli bir fırsat var.";
        assert_eq!(substitute_synonyms(text, 0.0), text);
        let a = substitute_synonyms(text, 1.0);
        let b = substitute_synonyms(text, 1.0);
        assert_eq!(a, b);
        assert!(!a.contains("Harika"));
        assert!(!a.contains("fırsat"));
        assert!(a.starts_with("Muhteşem") || a.starts_with("Şahane"));
        assert!(a.ends_with("var."));
    }

    #[test]
    fn summary_is_bounded_and_skips_duplicates() {
        let pool = vec![
            sent("Aşk hayatınızda güzel gelişmeler var"),
            sent("aşk hayatınızda güzel gelişmeler var bugün"),
            sent("Partnerinizle romantik bir akşam sizi bekliyor"),
            sent("Kalp kırıklıkları geride kalıyor"),
            sent("Flört eden bekarlar için sürprizler yolda"),
            sent("Evlilik konusunda adım atabilirsiniz"),
        ];
        let s = Summarizer::new(&LexicalSimilarity, SummarizeOptions::default());
        let out = s.summarize(&pool, Category::Love).unwrap();
        assert!(out.matches('.').count() <= 3);
        assert!(!out.contains("var bugün"));

        assert_eq!(s.summarize(&[], Category::Love), None);
    }

    #[test]
    fn document_covers_every_sign_and_category() {
        let mut koc = SignTexts::default();
        koc.set_text(Category::General, "Bugün enerjiniz yüksek. Yeni başlangıçlar için uygun bir gün.".to_string());
        koc.set_text(Category::Love, "Partnerinizle güzel bir akşam geçireceksiniz.".to_string());
        let mut other = SignTexts::default();
        other.set_text(Category::General, "Bugün enerjiniz yüksek. Sakin kalmaya özen gösterin.".to_string());

        let mut doc = SourceDocument::new();
        doc.entry("site_a".to_string()).or_default().insert(Sign::Koc, koc);
        doc.entry("site_b".to_string()).or_default().insert(Sign::Koc, other);

        let s = Summarizer::new(&LexicalSimilarity, SummarizeOptions::default());
        let (summary, stats) = s.summarize_document(&doc);
        assert_eq!(summary.len(), 12);
        let koc = &summary[&Sign::Koc];
        let genel = koc[&Category::General].as_deref().unwrap();
        assert_eq!(genel.matches("enerjiniz").count(), 1);
        assert!(koc[&Category::Love].is_some());
        assert_eq!(koc[&Category::Money], None);
        assert_eq!(summary[&Sign::Balik][&Category::General], None);
        assert_eq!(stats.duplicates_removed, 1);
        assert_eq!(stats.summarized[&Category::General], 1);
        assert_eq!(stats.null[&Category::General], 11);
    }
}
