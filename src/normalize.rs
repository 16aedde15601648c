use rust_stemmers::{Algorithm, Stemmer};
use std::collections::BTreeSet;
use unicode_normalization::UnicodeNormalization;

use crate::lexicon;

/// Turkish-aware lowercasing: `I` -> `ı` and `İ` -> `i`, everything else
/// through the Unicode tables. Input is NFC-composed first so a decomposed
/// `İ` (I + U+0307) folds the same way as the precomposed one.
pub fn lower_tr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.nfc() {
        match c {
            'I' => out.push('ı'),
            'İ' => out.push('i'),
            _ => out.extend(c.to_lowercase()),
        }
    }
    out
}

/// Turkish-aware uppercasing, inverse of [`lower_tr`] for the dotted pair.
pub fn upper_tr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            'i' => out.push('İ'),
            'ı' => out.push('I'),
            _ => out.extend(c.to_uppercase()),
        }
    }
    out
}

/// Lowercased word tokens (letters and digits), in order.
pub fn words(s: &str) -> Vec<String> {
    lower_tr(s)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// Reduces words to their Snowball Turkish stems.
pub struct Normalizer {
    stemmer: Stemmer,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            stemmer: Stemmer::create(Algorithm::Turkish),
        }
    }

    pub fn stem(&self, word: &str) -> String {
        let w = lower_tr(word.trim());
        self.stemmer.stem(&w).into_owned()
    }

    /// Stems of already lowercased tokens.
    pub fn stem_tokens(&self, tokens: &[String]) -> BTreeSet<String> {
        tokens.iter().map(|w| self.stemmer.stem(w).into_owned()).collect()
    }

    /// Matcher for a keyword list, computed once per lexicon.
    pub fn keyword_set(&self, keywords: &[&str]) -> KeywordSet {
        let lowered: Vec<String> = keywords.iter().map(|k| lower_tr(k.trim())).collect();
        let mut stems: BTreeSet<String> = lowered.iter().map(|k| self.stem(k)).collect();
        stems.extend(lowered.iter().cloned());
        let bases = lowered
            .iter()
            .filter(|k| k.chars().count() >= MIN_INFLECTED_KEYWORD_CHARS)
            .flat_map(|k| std::iter::once(k.clone()).chain(softened(k)))
            .collect();
        KeywordSet { stems, bases }
    }
}

/// Keywords shorter than this only match through their stem; as prefixes
/// they would swallow unrelated words (`bel` in `belki`, `kas` in `kasım`).
pub const MIN_INFLECTED_KEYWORD_CHARS: usize = 4;

/// The stemmer trims bare keywords and their inflected forms to different
/// lengths (`para` -> `par`, `paranızı` -> `para`), so a keyword also
/// matches any token that is the keyword plus a chain of suffixes.
#[derive(Debug, Clone, Default)]
pub struct KeywordSet {
    stems: BTreeSet<String>,
    bases: Vec<String>,
}

impl KeywordSet {
    /// `tokens` lowercased, `stems` their stems.
    pub fn matches(&self, tokens: &[String], stems: &BTreeSet<String>) -> bool {
        !self.stems.is_disjoint(stems)
            || tokens
                .iter()
                .any(|t| self.bases.iter().any(|b| is_inflection_of(t, b)))
    }
}

/// Stem-final consonant softened before a vowel-initial suffix:
/// `kalp` -> `kalb`(iniz), `sağlık` -> `sağlığ`(ınız), `borç` -> `borc`(unuz).
fn softened(word: &str) -> Option<String> {
    let last = word.chars().last()?;
    let soft = match last {
        'p' => 'b',
        'ç' => 'c',
        't' => 'd',
        'k' => 'ğ',
        _ => return None,
    };
    let mut s = word[..word.len() - last.len_utf8()].to_string();
    s.push(soft);
    Some(s)
}

/// True when `rest` is empty or made up entirely of inflectional suffixes.
fn is_suffix_chain(rest: &str) -> bool {
    rest.is_empty()
        || lexicon::INFLECTION_SUFFIXES
            .iter()
            .any(|suf| rest.strip_prefix(suf).is_some_and(is_suffix_chain))
}

/// `token` is `base` itself or `base` followed by suffixes only.
pub fn is_inflection_of(token: &str, base: &str) -> bool {
    token.strip_prefix(base).is_some_and(is_suffix_chain)
}
