use std::collections::{BTreeSet, HashMap};
use tracing::warn;

use crate::lexicon;
use crate::models::Category;
use crate::normalize::{lower_tr, words};

/// Whole category texts at or above this are the same text.
pub const CROSS_CATEGORY_THRESHOLD: f32 = 0.95;
/// Sentences at or above this collapse into the first one seen.
pub const SENTENCE_DEDUP_THRESHOLD: f32 = 0.70;

/// Symmetric similarity in [0, 1] between two text spans.
pub trait SimilarityProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn similarity(&self, a: &str, b: &str) -> f32;

    /// Whether scores carry enough signal for diversity-aware selection.
    fn supports_diversity(&self) -> bool {
        false
    }
}

pub fn is_duplicate(p: &dyn SimilarityProvider, a: &str, b: &str, threshold: f32) -> bool {
    p.similarity(a, b) >= threshold
}

fn same_text(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    !a.is_empty() && lower_tr(a) == lower_tr(b)
}

fn token_set(s: &str) -> BTreeSet<String> {
    let stop = lexicon::stopwords();
    words(s).into_iter().filter(|w| !stop.contains(w)).collect()
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count() as f32;
    let union = a.union(b).count() as f32;
    if union == 0.0 { 0.0 } else { inter / union }
}

/// Word-set overlap after dropping stopwords.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalSimilarity;

impl SimilarityProvider for LexicalSimilarity {
    fn name(&self) -> &'static str {
        "lexical"
    }

    fn similarity(&self, a: &str, b: &str) -> f32 {
        if same_text(a, b) {
            return 1.0;
        }
        jaccard(&token_set(a), &token_set(b))
    }
}

pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut na, mut nb) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na.sqrt() * nb.sqrt())).clamp(0.0, 1.0)
}

/// Cosine similarity over vectors fetched ahead of time in one batch. Texts
/// that never got a vector are compared lexically.
pub struct EmbeddingSimilarity {
    vectors: HashMap<String, Vec<f32>>,
    fallback: LexicalSimilarity,
}

impl EmbeddingSimilarity {
    pub fn new(vectors: HashMap<String, Vec<f32>>) -> Self {
        Self {
            vectors,
            fallback: LexicalSimilarity,
        }
    }
}

impl SimilarityProvider for EmbeddingSimilarity {
    fn name(&self) -> &'static str {
        "embedding"
    }

    fn similarity(&self, a: &str, b: &str) -> f32 {
        if same_text(a, b) {
            return 1.0;
        }
        match (self.vectors.get(a.trim()), self.vectors.get(b.trim())) {
            (Some(va), Some(vb)) => cosine(va, vb),
            _ => self.fallback.similarity(a, b),
        }
    }

    fn supports_diversity(&self) -> bool {
        true
    }
}

/// Valid when a non-general text mentions at least one of its category's
/// scoring keywords.
pub fn has_category_keywords(text: &str, cat: Category) -> bool {
    if cat.is_general() {
        return true;
    }
    let Some(lex) = lexicon::scoring_lexicons().get(&cat) else {
        return false;
    };
    let lower = lower_tr(text);
    lex.keywords.iter().any(|k| lower.contains(k))
}

/// Collapse near-identical category texts of one sign before scoring.
/// General loses to any specific duplicate; between two specific ones, a
/// side without its own keywords is dropped. Returns the issues raised.
pub fn resolve_cross_category(
    p: &dyn SimilarityProvider,
    sign: &str,
    threshold: f32,
    texts: &mut HashMap<Category, String>,
) -> Vec<String> {
    let mut issues = Vec::new();
    for (i, &c1) in Category::ALL.iter().enumerate() {
        for &c2 in &Category::ALL[i + 1..] {
            let (Some(t1), Some(t2)) = (texts.get(&c1), texts.get(&c2)) else {
                continue;
            };
            let sim = p.similarity(t1, t2);
            if sim < threshold {
                continue;
            }
            let issue = format!(
                "'{}' ve '{}' kategorileri %{:.0} benzer (duplikasyon)",
                c1,
                c2,
                sim * 100.0
            );
            warn!("Duplicate category text - sign={}, {}", sign, issue);
            issues.push(issue);

            if c1.is_general() {
                texts.remove(&c1);
                break;
            }
            let drop2 = !has_category_keywords(t2, c2);
            let drop1 = !has_category_keywords(t1, c1);
            if drop2 {
                texts.remove(&c2);
                issues.push(format!("'{}' kategorisi keyword eksikliği nedeniyle kaldırıldı", c2));
            }
            if drop1 {
                texts.remove(&c1);
                issues.push(format!("'{}' kategorisi keyword eksikliği nedeniyle kaldırıldı", c1));
                break;
            }
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexical_is_symmetric_and_reflexive() {
        let p = LexicalSimilarity;
        let a = "Bugün aşk hayatınızda güzel gelişmeler var.";
        let b = "Aşk hayatınızda bugün sürprizler var.";
        assert_eq!(p.similarity(a, b), p.similarity(b, a));
        assert_eq!(p.similarity(a, a), 1.0);
        // Stopwords alone still compare equal to themselves.
        assert_eq!(p.similarity("ve bir", "ve bir"), 1.0);
        assert_eq!(p.similarity("", ""), 0.0);
    }

    #[test]
    fn lexical_ignores_stopwords_and_case() {
        let p = LexicalSimilarity;
        let s = p.similarity("Para ve kariyer", "para kariyer için");
        assert_eq!(s, 1.0);
        let s = p.similarity("para kariyer", "para sağlık");
        assert!((s - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_is_clamped() {
        assert_eq!(cosine(&[1.0, 0.0], &[-1.0, 0.0]), 0.0);
        assert!((cosine(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn embedding_falls_back_for_unknown_texts() {
        let mut v = HashMap::new();
        v.insert("a b".to_string(), vec![1.0, 0.0]);
        v.insert("c d".to_string(), vec![0.0, 1.0]);
        let p = EmbeddingSimilarity::new(v);
        assert_eq!(p.similarity("a b", "c d"), 0.0);
        assert_eq!(p.similarity("c d", "a b"), 0.0);
        assert_eq!(p.similarity("para kariyer", "para kariyer"), 1.0);
        assert!(p.supports_diversity());
    }

    #[test]
    fn duplicate_general_is_nulled_in_favor_of_specific() {
        let text = "Finansal açıdan harika bir gün, para kazanma fırsatları artıyor ve bütçe rahatlıyor.";
        let mut texts = HashMap::new();
        texts.insert(Category::General, text.to_string());
        texts.insert(Category::Money, text.to_string());
        let issues = resolve_cross_category(&LexicalSimilarity, "Koç", CROSS_CATEGORY_THRESHOLD, &mut texts);
        assert_eq!(issues.len(), 1);
        assert!(!texts.contains_key(&Category::General));
        assert!(texts.contains_key(&Category::Money));
    }

    #[test]
    fn duplicate_specific_without_keywords_is_dropped() {
        let text = "Para konusunda şanslı bir gün, bütçe planları tutuyor.";
        let mut texts = HashMap::new();
        texts.insert(Category::Love, text.to_string());
        texts.insert(Category::Money, text.to_string());
        let issues = resolve_cross_category(&LexicalSimilarity, "Boğa", CROSS_CATEGORY_THRESHOLD, &mut texts);
        assert_eq!(issues.len(), 2);
        assert!(!texts.contains_key(&Category::Love));
        assert!(texts.contains_key(&Category::Money));
    }

    #[test]
    fn distinct_texts_are_left_alone() {
        let mut texts = HashMap::new();
        texts.insert(Category::General, "Genel olarak sakin bir gün.".to_string());
        texts.insert(Category::Love, "Partnerinizle romantik anlar.".to_string());
        let issues = resolve_cross_category(&LexicalSimilarity, "Yay", CROSS_CATEGORY_THRESHOLD, &mut texts);
        assert!(issues.is_empty());
        assert_eq!(texts.len(), 2);
    }
}
