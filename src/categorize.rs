use once_cell::sync::Lazy;
use once_cell::unsync::OnceCell;
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::lexicon;
use crate::models::{Category, Sign, SignTexts, SourceDocument};
use crate::normalize::{lower_tr, words, KeywordSet, Normalizer};

/// Fragments of this many characters or fewer are noise, not sentences.
pub const MAX_NOISE_CHARS: usize = 10;

pub type CategorySet = BTreeSet<Category>;

static EMOJI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        "[",
        r"\x{1F600}-\x{1F64F}",
        r"\x{1F300}-\x{1F5FF}",
        r"\x{1F680}-\x{1F6FF}",
        r"\x{1F1E0}-\x{1F1FF}",
        r"\x{2700}-\x{27BF}",
        r"\x{1F900}-\x{1F9FF}",
        r"\x{2600}-\x{26FF}",
        r"\x{2B00}-\x{2BFF}",
        "]+"
    ))
    .expect("emoji pattern is valid")
});

pub fn remove_emojis(s: &str) -> String {
    EMOJI_RE.replace_all(s, "").to_string()
}

/// True when the terminator at `chars[end]` closes an abbreviation rather
/// than a sentence: `x.y.` style initials or a short capitalized token
/// such as `Dr.`.
fn is_abbreviation(chars: &[char], end: usize) -> bool {
    if end >= 3 {
        let (a, dot, b) = (chars[end - 3], chars[end - 2], chars[end - 1]);
        if is_word(a) && dot == '.' && is_word(b) {
            return true;
        }
    }
    if end >= 2 && chars[end] == '.' {
        let (a, b) = (chars[end - 2], chars[end - 1]);
        if a.is_ascii_uppercase() && b.is_ascii_lowercase() {
            return true;
        }
    }
    false
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Split `text` into sentences and report how many fragments were dropped
/// as noise: emoji-only pieces and those of at most [`MAX_NOISE_CHARS`]
/// characters.
pub fn split_counted(text: &str) -> (Vec<String>, usize) {
    if crate::models::is_absent(text) {
        return (vec![], 0);
    }
    let chars: Vec<char> = text.chars().collect();
    let mut pieces: Vec<String> = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;
    while i < chars.len() {
        let c = chars[i];
        let boundary = matches!(c, '.' | '?' | '!')
            && chars.get(i + 1).is_some_and(|n| n.is_whitespace())
            && !is_abbreviation(&chars, i);
        if boundary {
            pieces.push(chars[start..=i].iter().collect());
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            start = j;
            i = j;
            continue;
        }
        i += 1;
    }
    if start < chars.len() {
        pieces.push(chars[start..].iter().collect());
    }

    let mut kept = Vec::with_capacity(pieces.len());
    let mut discarded = 0usize;
    for p in pieces {
        let s = remove_emojis(p.trim());
        let s = s.trim();
        if s.chars().count() <= MAX_NOISE_CHARS {
            discarded += 1;
            continue;
        }
        kept.push(s.to_string());
    }
    (kept, discarded)
}

pub fn split_sentences(text: &str) -> Vec<String> {
    split_counted(text).0
}

/* ------------------------------ Rule chain -------------------------------- */

/// Per-sentence data shared by the rules; tokens and stems are only
/// computed if a rule asks for them.
pub struct SentenceContext<'a> {
    pub lower: String,
    raw: &'a str,
    tokens: OnceCell<Vec<String>>,
    stems: OnceCell<BTreeSet<String>>,
}

impl<'a> SentenceContext<'a> {
    fn new(raw: &'a str) -> Self {
        Self {
            lower: lower_tr(raw),
            raw,
            tokens: OnceCell::new(),
            stems: OnceCell::new(),
        }
    }

    pub fn tokens(&self) -> &[String] {
        self.tokens.get_or_init(|| words(self.raw))
    }

    pub fn stems(&self, normalizer: &Normalizer) -> &BTreeSet<String> {
        self.stems.get_or_init(|| normalizer.stem_tokens(self.tokens()))
    }
}

/// One link of the categorization chain. Returning `Some` ends the chain.
pub trait CategoryRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, ctx: &SentenceContext<'_>, normalizer: &Normalizer) -> Option<CategorySet>;
}

/// Curated idioms; the first category whose phrase appears wins alone.
pub struct PhraseOverride {
    phrases: Vec<(Category, Vec<String>)>,
}

impl PhraseOverride {
    pub fn from_lexicon() -> Self {
        let phrases = Category::SPECIFIC
            .iter()
            .map(|&c| {
                let ps = lexicon::categorizer_phrases(c).iter().map(|p| lower_tr(p)).collect();
                (c, ps)
            })
            .collect();
        Self { phrases }
    }
}

impl CategoryRule for PhraseOverride {
    fn name(&self) -> &'static str {
        "phrase_override"
    }

    fn apply(&self, ctx: &SentenceContext<'_>, _normalizer: &Normalizer) -> Option<CategorySet> {
        self.phrases
            .iter()
            .find(|(_, ps)| ps.iter().any(|p| ctx.lower.contains(p.as_str())))
            .map(|(c, _)| CategorySet::from([*c]))
    }
}

/// Keyword match on stems or inflected forms; always answers, possibly
/// with nothing.
pub struct KeywordMatch {
    keywords: BTreeMap<Category, KeywordSet>,
}

impl KeywordMatch {
    pub fn from_lexicon(normalizer: &Normalizer) -> Self {
        let keywords = Category::SPECIFIC
            .iter()
            .map(|&c| (c, normalizer.keyword_set(lexicon::categorizer_keywords(c))))
            .collect();
        Self { keywords }
    }
}

impl CategoryRule for KeywordMatch {
    fn name(&self) -> &'static str {
        "keyword_match"
    }

    fn apply(&self, ctx: &SentenceContext<'_>, normalizer: &Normalizer) -> Option<CategorySet> {
        let tokens = ctx.tokens();
        let stems = ctx.stems(normalizer);
        Some(
            self.keywords
                .iter()
                .filter(|(_, kw)| kw.matches(tokens, stems))
                .map(|(c, _)| *c)
                .collect(),
        )
    }
}

/* ------------------------------ Categorizer ------------------------------- */

#[derive(Debug, Clone, Default, Serialize)]
pub struct CategorizeStats {
    pub total_sources: usize,
    pub total_signs: usize,
    pub sentences: usize,
    pub unmatched_sentences: usize,
    pub discarded_fragments: usize,
    /// Signs (per source) that received text for each specific category.
    pub categorized: BTreeMap<Category, usize>,
}

impl CategorizeStats {
    fn absorb(&mut self, other: &SignOutcome) {
        self.total_signs += 1;
        self.sentences += other.sentences;
        self.unmatched_sentences += other.unmatched;
        self.discarded_fragments += other.discarded;
        for c in &other.filled {
            *self.categorized.entry(*c).or_default() += 1;
        }
    }
}

struct SignOutcome {
    texts: SignTexts,
    sentences: usize,
    unmatched: usize,
    discarded: usize,
    filled: Vec<Category>,
}

pub struct Categorizer {
    normalizer: Normalizer,
    rules: Vec<Box<dyn CategoryRule>>,
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Categorizer {
    /// Phrase overrides first, keyword matching as the fallback.
    pub fn new() -> Self {
        let normalizer = Normalizer::new();
        let keywords = KeywordMatch::from_lexicon(&normalizer);
        Self::with_rules(
            normalizer,
            vec![Box::new(PhraseOverride::from_lexicon()), Box::new(keywords)],
        )
    }

    pub fn with_rules(normalizer: Normalizer, rules: Vec<Box<dyn CategoryRule>>) -> Self {
        Self { normalizer, rules }
    }

    pub fn categorize(&self, sentence: &str) -> CategorySet {
        let ctx = SentenceContext::new(sentence);
        for rule in &self.rules {
            if let Some(set) = rule.apply(&ctx, &self.normalizer) {
                return set;
            }
        }
        CategorySet::new()
    }

    /// Split one sign's general text and route every sentence to the
    /// specific categories it matches. General text is left untouched, and a
    /// specific field is only overwritten when something matched.
    fn process_sign(&self, texts: &SignTexts) -> SignOutcome {
        let mut out = texts.clone();
        let Some(general) = texts.text(Category::General) else {
            return SignOutcome {
                texts: out,
                sentences: 0,
                unmatched: 0,
                discarded: 0,
                filled: vec![],
            };
        };

        let (sentences, discarded) = split_counted(&general);
        let mut buckets: BTreeMap<Category, Vec<&str>> = BTreeMap::new();
        let mut unmatched = 0usize;
        for s in &sentences {
            let cats = self.categorize(s);
            if cats.is_empty() {
                unmatched += 1;
            }
            for c in cats {
                buckets.entry(c).or_default().push(s.as_str());
            }
        }

        let mut filled = Vec::new();
        for (c, ss) in buckets {
            out.set_text(c, ss.join(" "));
            filled.push(c);
        }

        SignOutcome {
            texts: out,
            sentences: sentences.len(),
            unmatched,
            discarded,
            filled,
        }
    }

    pub fn categorize_document(&self, doc: &SourceDocument) -> (SourceDocument, CategorizeStats) {
        let start = std::time::Instant::now();
        let mut stats = CategorizeStats::default();
        let mut out = SourceDocument::new();

        for (source, signs) in doc {
            stats.total_sources += 1;
            let processed: Vec<(Sign, SignOutcome)> = signs
                .par_iter()
                .map(|(sign, texts)| (*sign, self.process_sign(texts)))
                .collect();

            let entry = out.entry(source.clone()).or_default();
            for (sign, outcome) in processed {
                stats.absorb(&outcome);
                entry.insert(sign, outcome.texts);
            }
            debug!("Categorized source - source={}, signs={}", source, signs.len());
        }

        info!(
            "Categorization completed - duration={:.2}s, sources={}, signs={}, sentences={}, unmatched={}, discarded={}",
            start.elapsed().as_secs_f32(),
            stats.total_sources,
            stats.total_signs,
            stats.sentences,
            stats.unmatched_sentences,
            stats.discarded_fragments
        );
        for c in Category::SPECIFIC {
            info!("Categorized - category={}, signs={}", c, stats.categorized.get(&c).copied().unwrap_or(0));
        }
        (out, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TextField;

    #[test]
    fn splits_on_terminal_punctuation() {
        let s = split_sentences("Bugün harika bir gün olacak. Aşk hayatınızda sürprizler var! Ne dersiniz?");
        assert_eq!(
            s,
            vec![
                "Bugün harika bir gün olacak.",
                "Aşk hayatınızda sürprizler var!",
                "Ne dersiniz?"
            ]
        );
    }

    #[test]
    fn abbreviations_do_not_split() {
        let s = split_sentences("Dr. Yılmaz bugün çok iyi haberler veriyor. Gün boyu enerjiniz yüksek.");
        assert_eq!(s.len(), 2);
        assert!(s[0].starts_with("Dr. Yılmaz"));

        let s = split_sentences("Uzmanlar bunu uzun süredir söylüyor. A.B.D. gibi kısaltmalar bölünmez.");
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn short_fragments_are_counted_not_kept() {
        let (s, discarded) = split_counted("Evet. Bugün güzel bir gün sizi bekliyor.");
        assert_eq!(s, vec!["Bugün güzel bir gün sizi bekliyor."]);
        assert_eq!(discarded, 1);
    }

    #[test]
    fn noise_includes_ten_char_and_emoji_only_pieces() {
        let (s, discarded) =
            split_counted("Güzel gün. Aşk var mı? 🍀✨. Bugün güzel bir gün sizi bekliyor. 🍀✨");
        assert_eq!(s, vec!["Aşk var mı?", "Bugün güzel bir gün sizi bekliyor."]);
        assert_eq!(discarded, 3);
    }

    #[test]
    fn absent_text_has_no_sentences() {
        assert!(split_sentences("null").is_empty());
        assert!(split_sentences("   ").is_empty());
    }

    #[test]
    fn emojis_are_stripped() {
        let s = split_sentences("Bugün şans sizden yana 🍀✨ olacak.");
        assert_eq!(s, vec!["Bugün şans sizden yana  olacak."]);
    }

    #[test]
    fn finance_sentence_is_money_only() {
        let c = Categorizer::new();
        let cats = c.categorize("Finansal durumunuzda önemli bir gelişme olacak.");
        assert_eq!(cats, CategorySet::from([Category::Money]));
    }

    #[test]
    fn health_and_money_in_one_sentence() {
        let c = Categorizer::new();
        let cats = c.categorize("Stres ve para konusunda kendinizi yormayın.");
        assert!(cats.contains(&Category::Health));
        assert!(cats.contains(&Category::Money));
        assert!(!cats.contains(&Category::Love));
    }

    #[test]
    fn phrase_override_is_exclusive() {
        let c = Categorizer::new();
        // "iş fırsatı" is a money idiom; "stres" alone would add health.
        let cats = c.categorize("Stres yapmayın, güzel bir iş fırsatı kapıda.");
        assert_eq!(cats, CategorySet::from([Category::Money]));
    }

    #[test]
    fn inflected_keywords_categorize() {
        let c = Categorizer::new();
        for (sentence, cat) in [
            ("Paranızı harcarken biraz daha tutumlu olun.", Category::Money),
            ("Yatırımlarınızı gözden geçirin.", Category::Money),
            ("Borcunuzu kapatmak için uygun bir gün.", Category::Money),
            ("Uykunuzu düzenlemeniz gerekecek.", Category::Health),
            ("Enerjiniz yüksek olacak bugün.", Category::Health),
            ("Sağlığınıza özen gösterin.", Category::Health),
            ("İlişkinizde yeni bir sayfa açılıyor.", Category::Love),
            ("Kalbinizin sesini dinleyin.", Category::Love),
            ("Partnerinizle vakit geçirin.", Category::Love),
        ] {
            assert!(c.categorize(sentence).contains(&cat), "{} -> {:?}", sentence, cat);
        }
    }

    #[test]
    fn categorization_is_deterministic() {
        let c = Categorizer::new();
        let s = "Partnerinizle birlikte spor yapmak size iyi gelecek.";
        let first = c.categorize(s);
        for _ in 0..5 {
            assert_eq!(c.categorize(s), first);
        }
    }

    fn one_sign_doc(general: &str) -> SourceDocument {
        let mut texts = SignTexts::default();
        texts.fields.insert(Category::General, Some(TextField::Text(general.into())));
        let mut signs = BTreeMap::new();
        signs.insert(Sign::Koc, texts);
        let mut doc = SourceDocument::new();
        doc.insert("site".into(), signs);
        doc
    }

    #[test]
    fn document_routes_sentences_in_order() {
        let c = Categorizer::new();
        let doc = one_sign_doc(
            "Finansal durumunuzda önemli bir gelişme olacak. Bugün hava çok güneşli görünüyor. Ek gelir kapıları aralanıyor.",
        );
        let (out, stats) = c.categorize_document(&doc);
        let koc = &out["site"][&Sign::Koc];
        assert_eq!(
            koc.text(Category::Money).as_deref(),
            Some("Finansal durumunuzda önemli bir gelişme olacak. Ek gelir kapıları aralanıyor.")
        );
        assert!(koc.text(Category::Love).is_none());
        assert_eq!(stats.sentences, 3);
        assert_eq!(stats.unmatched_sentences, 1);
        assert_eq!(stats.categorized.get(&Category::Money), Some(&1));
    }

    #[test]
    fn recategorizing_is_idempotent() {
        let c = Categorizer::new();
        let doc = one_sign_doc(
            "Stres ve para konusunda kendinizi yormayın. Duygusal bağ kurmak için güzel bir gün.",
        );
        let (once, _) = c.categorize_document(&doc);
        let (twice, _) = c.categorize_document(&once);
        assert_eq!(once, twice);
    }
}
