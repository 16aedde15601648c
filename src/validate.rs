use chrono::NaiveDate;
use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{error, info, warn};

use crate::lexicon::GENERIC_PATTERNS;
use crate::models::{Category, Sign, SourceDocument};
use crate::normalize::lower_tr;

/// General texts shorter than this are reported as missing content.
pub const MIN_GENERAL_CHARS: usize = 20;
/// A report with more warnings than this does not pass.
pub const MAX_WARNINGS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub check: &'static str,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub findings: Vec<Finding>,
    /// Share of (sign, specific category) pairs that received text, in percent.
    pub categorization_rate: Option<f64>,
}

impl ValidationReport {
    fn push(&mut self, check: &'static str, severity: Severity, message: String) {
        self.findings.push(Finding {
            check,
            severity,
            message,
        });
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Warning)
    }

    pub fn passed(&self) -> bool {
        self.errors().count() == 0 && self.warnings().count() <= MAX_WARNINGS
    }
}

fn preview(s: &str) -> String {
    let head: String = s.chars().take(60).collect();
    if head.len() < s.len() {
        format!("{}...", head)
    } else {
        head
    }
}

/// The same general text reused for several signs or sources.
pub fn check_duplicates(raw: &SourceDocument, report: &mut ValidationReport) {
    let mut seen: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (source, signs) in raw {
        for (sign, texts) in signs {
            if let Some(genel) = texts.text(Category::General) {
                seen.entry(genel.trim().to_string())
                    .or_default()
                    .push(format!("{}/{}", source, sign));
            }
        }
    }
    for (content, places) in seen.into_iter().filter(|(_, p)| p.len() > 1) {
        report.push(
            "duplicates",
            Severity::Warning,
            format!("Duplicate content in {} places ({}): {}", places.len(), places.join(", "), preview(&content)),
        );
    }
}

/// Placeholder or filler phrases left behind by a broken scraper. One
/// finding per sign at most.
pub fn check_generic(raw: &SourceDocument, report: &mut ValidationReport) {
    for (source, signs) in raw {
        for (sign, texts) in signs {
            let all = Category::ALL
                .iter()
                .filter_map(|c| texts.text(*c))
                .map(|t| lower_tr(&t))
                .join(" ");
            if let Some(pattern) = GENERIC_PATTERNS.iter().find(|p| all.contains(*p)) {
                report.push(
                    "generic",
                    Severity::Warning,
                    format!("Generic pattern {:?} - {}/{}", pattern, source, sign),
                );
            }
        }
    }
}

/// Signs whose general text is missing or too short, per source.
pub fn check_empty(raw: &SourceDocument, report: &mut ValidationReport) {
    for (source, signs) in raw {
        let empty = Sign::ALL
            .iter()
            .filter(|sign| {
                signs
                    .get(*sign)
                    .and_then(|t| t.text(Category::General))
                    .map_or(true, |g| g.trim().chars().count() < MIN_GENERAL_CHARS)
            })
            .count();
        if empty > 0 {
            report.push(
                "empty",
                Severity::Warning,
                format!("{}: {}/{} signs have missing or very short content", source, empty, Sign::ALL.len()),
            );
        }
    }
}

pub fn check_categorization(categorized: &SourceDocument, report: &mut ValidationReport) {
    let mut total = 0usize;
    let mut filled = 0usize;
    for signs in categorized.values() {
        for texts in signs.values() {
            total += 1;
            filled += Category::SPECIFIC.iter().filter(|c| texts.text(**c).is_some()).count();
        }
    }
    if total == 0 {
        report.push("categorization", Severity::Error, "No signs to categorize".to_string());
        return;
    }
    let rate = filled as f64 / (Category::SPECIFIC.len() * total) as f64 * 100.0;
    report.categorization_rate = Some(rate);
    if rate < 30.0 {
        report.push(
            "categorization",
            Severity::Error,
            format!("Categorization failed for most content ({:.1}%)", rate),
        );
    } else if rate < 60.0 {
        report.push(
            "categorization",
            Severity::Warning,
            format!("Categorization rate is low ({:.1}%)", rate),
        );
    }
}

pub fn check_freshness(data_date: NaiveDate, today: NaiveDate, report: &mut ValidationReport) {
    let days_old = (today - data_date).num_days();
    if days_old > 1 {
        report.push(
            "freshness",
            Severity::Warning,
            format!("Data is {} days old ({})", days_old, data_date),
        );
    }
}

/// Love, money and health carrying the very same text for one sign.
pub fn check_identical_categories(categorized: &SourceDocument, report: &mut ValidationReport) {
    for (source, signs) in categorized {
        for (sign, texts) in signs {
            let [a, m, h] = Category::SPECIFIC.map(|c| texts.text(c));
            if let (Some(a), Some(m), Some(h)) = (a, m, h) {
                if a == m && m == h {
                    report.push(
                        "identical_categories",
                        Severity::Warning,
                        format!("{}/{}: all categories carry the same text", source, sign),
                    );
                }
            }
        }
    }
}

/// Run every check. The categorized document is optional; without it the
/// categorization checks are skipped.
pub fn validate(
    raw: &SourceDocument,
    categorized: Option<&SourceDocument>,
    data_date: NaiveDate,
    today: NaiveDate,
) -> ValidationReport {
    let mut report = ValidationReport::default();
    check_duplicates(raw, &mut report);
    check_generic(raw, &mut report);
    check_empty(raw, &mut report);
    if let Some(cat) = categorized {
        check_categorization(cat, &mut report);
        check_identical_categories(cat, &mut report);
    }
    check_freshness(data_date, today, &mut report);

    for f in &report.findings {
        match f.severity {
            Severity::Error => error!("Validation error - check={}, {}", f.check, f.message),
            Severity::Warning => warn!("Validation warning - check={}, {}", f.check, f.message),
        }
    }
    info!(
        "Validation completed - errors={}, warnings={}, passed={}",
        report.errors().count(),
        report.warnings().count(),
        report.passed()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SignTexts;

    fn texts(pairs: &[(Category, &str)]) -> SignTexts {
        let mut t = SignTexts::default();
        for (c, s) in pairs {
            t.set_text(*c, s.to_string());
        }
        t
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn full_source(genel: impl Fn(Sign) -> String) -> BTreeMap<Sign, SignTexts> {
        Sign::ALL
            .iter()
            .map(|s| (*s, texts(&[(Category::General, &genel(*s))])))
            .collect()
    }

    #[test]
    fn clean_input_passes() {
        let mut raw = SourceDocument::new();
        raw.insert(
            "site".to_string(),
            full_source(|s| format!("{} için bugün yepyeni bir başlangıç var.", s)),
        );
        let r = validate(&raw, None, date("2025-05-01"), date("2025-05-01"));
        assert!(r.findings.is_empty(), "{:?}", r.findings);
        assert!(r.passed());
    }

    #[test]
    fn reused_and_generic_content_warns() {
        let mut raw = SourceDocument::new();
        raw.insert(
            "site".to_string(),
            full_source(|_| "Lorem ipsum dolor sit amet, consectetur.".to_string()),
        );
        let mut r = ValidationReport::default();
        check_duplicates(&raw, &mut r);
        assert_eq!(r.findings.len(), 1);
        assert!(r.findings[0].message.contains("12 places"));

        let mut r = ValidationReport::default();
        check_generic(&raw, &mut r);
        assert_eq!(r.findings.len(), 12);
    }

    #[test]
    fn short_and_missing_general_text_warns() {
        let mut signs = BTreeMap::new();
        signs.insert(Sign::Koc, texts(&[(Category::General, "Kısa.")]));
        let mut raw = SourceDocument::new();
        raw.insert("site".to_string(), signs);
        let mut r = ValidationReport::default();
        check_empty(&raw, &mut r);
        assert_eq!(r.findings.len(), 1);
        assert!(r.findings[0].message.contains("12/12"));
    }

    #[test]
    fn low_categorization_rate_is_an_error() {
        let mut signs = BTreeMap::new();
        signs.insert(Sign::Koc, texts(&[(Category::General, "Genel bir metin burada.")]));
        signs.insert(Sign::Boga, texts(&[(Category::Love, "Aşk güzel.")]));
        let mut doc = SourceDocument::new();
        doc.insert("site".to_string(), signs);

        let mut r = ValidationReport::default();
        check_categorization(&doc, &mut r);
        assert_eq!(r.errors().count(), 1);
        let rate = r.categorization_rate.unwrap();
        assert!((rate - 100.0 / 6.0).abs() < 1e-9);
        assert!(!r.passed());
    }

    #[test]
    fn identical_specific_texts_warn() {
        let same = "Her şey aynı.";
        let mut signs = BTreeMap::new();
        signs.insert(
            Sign::Aslan,
            texts(&[(Category::Love, same), (Category::Money, same), (Category::Health, same)]),
        );
        let mut doc = SourceDocument::new();
        doc.insert("site".to_string(), signs);
        let mut r = ValidationReport::default();
        check_identical_categories(&doc, &mut r);
        assert_eq!(r.warnings().count(), 1);
    }

    #[test]
    fn stale_data_warns_after_one_day() {
        let mut r = ValidationReport::default();
        check_freshness(date("2025-05-01"), date("2025-05-02"), &mut r);
        assert!(r.findings.is_empty());
        check_freshness(date("2025-05-01"), date("2025-05-04"), &mut r);
        assert_eq!(r.findings.len(), 1);
        assert!(r.findings[0].message.contains("3 days"));
    }

    #[test]
    fn too_many_warnings_fail() {
        let mut r = ValidationReport::default();
        for i in 0..=MAX_WARNINGS {
            r.push("test", Severity::Warning, format!("w{}", i));
        }
        assert!(!r.passed());
    }
}
