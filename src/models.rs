use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The twelve signs, in zodiac order. Serialized by Turkish display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sign {
    #[serde(rename = "Koç")]
    Koc,
    #[serde(rename = "Boğa")]
    Boga,
    #[serde(rename = "İkizler")]
    Ikizler,
    #[serde(rename = "Yengeç")]
    Yengec,
    #[serde(rename = "Aslan")]
    Aslan,
    #[serde(rename = "Başak")]
    Basak,
    #[serde(rename = "Terazi")]
    Terazi,
    #[serde(rename = "Akrep")]
    Akrep,
    #[serde(rename = "Yay")]
    Yay,
    #[serde(rename = "Oğlak")]
    Oglak,
    #[serde(rename = "Kova")]
    Kova,
    #[serde(rename = "Balık")]
    Balik,
}

impl Sign {
    pub const ALL: [Sign; 12] = [
        Sign::Koc,
        Sign::Boga,
        Sign::Ikizler,
        Sign::Yengec,
        Sign::Aslan,
        Sign::Basak,
        Sign::Terazi,
        Sign::Akrep,
        Sign::Yay,
        Sign::Oglak,
        Sign::Kova,
        Sign::Balik,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Sign::Koc => "Koç",
            Sign::Boga => "Boğa",
            Sign::Ikizler => "İkizler",
            Sign::Yengec => "Yengeç",
            Sign::Aslan => "Aslan",
            Sign::Basak => "Başak",
            Sign::Terazi => "Terazi",
            Sign::Akrep => "Akrep",
            Sign::Yay => "Yay",
            Sign::Oglak => "Oğlak",
            Sign::Kova => "Kova",
            Sign::Balik => "Balık",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Sign::Koc => "koc",
            Sign::Boga => "boga",
            Sign::Ikizler => "ikizler",
            Sign::Yengec => "yengec",
            Sign::Aslan => "aslan",
            Sign::Basak => "basak",
            Sign::Terazi => "terazi",
            Sign::Akrep => "akrep",
            Sign::Yay => "yay",
            Sign::Oglak => "oglak",
            Sign::Kova => "kova",
            Sign::Balik => "balik",
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            Sign::Koc => "♈",
            Sign::Boga => "♉",
            Sign::Ikizler => "♊",
            Sign::Yengec => "♋",
            Sign::Aslan => "♌",
            Sign::Basak => "♍",
            Sign::Terazi => "♎",
            Sign::Akrep => "♏",
            Sign::Yay => "♐",
            Sign::Oglak => "♑",
            Sign::Kova => "♒",
            Sign::Balik => "♓",
        }
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Sign {
    type Err = anyhow::Error;

    /// Accepts the Turkish display name or the ASCII slug.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Sign::ALL
            .iter()
            .copied()
            .find(|sign| sign.name() == s || sign.slug().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow!("unknown sign: {:?}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "genel")]
    General,
    #[serde(rename = "aşk")]
    Love,
    #[serde(rename = "para")]
    Money,
    #[serde(rename = "sağlık")]
    Health,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::General,
        Category::Love,
        Category::Money,
        Category::Health,
    ];

    pub const SPECIFIC: [Category; 3] = [Category::Love, Category::Money, Category::Health];

    /// Field key used in every on-disk document.
    pub fn key(self) -> &'static str {
        match self {
            Category::General => "genel",
            Category::Love => "aşk",
            Category::Money => "para",
            Category::Health => "sağlık",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Love => "love",
            Category::Money => "money",
            Category::Health => "health",
        }
    }

    pub fn is_general(self) -> bool {
        self == Category::General
    }

    pub fn from_key(key: &str) -> Option<Category> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.key() == key || c.slug() == key)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A category field as scrapers hand it over: one string, a list of
/// fragments, or nothing. The literal `"null"` counts as nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextField {
    Text(String),
    Fragments(Vec<Option<String>>),
}

pub fn is_absent(s: &str) -> bool {
    let t = s.trim();
    t.is_empty() || t == "null"
}

impl TextField {
    /// Present fragments, in order.
    pub fn texts(&self) -> Vec<&str> {
        match self {
            TextField::Text(s) => {
                if is_absent(s) {
                    vec![]
                } else {
                    vec![s.as_str()]
                }
            }
            TextField::Fragments(xs) => xs
                .iter()
                .flatten()
                .map(|s| s.as_str())
                .filter(|s| !is_absent(s))
                .collect(),
        }
    }

    pub fn joined(&self) -> Option<String> {
        let texts = self.texts();
        if texts.is_empty() {
            None
        } else {
            Some(texts.join(" "))
        }
    }
}

/// Category texts for one sign from one source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignTexts {
    pub fields: BTreeMap<Category, Option<TextField>>,
}

impl SignTexts {
    /// Lenient decode of one sign entry: unknown keys are ignored, a field of
    /// the wrong JSON type is an error for this entry only.
    pub fn from_value(value: serde_json::Value) -> Result<SignTexts> {
        let obj = match value {
            serde_json::Value::Object(obj) => obj,
            serde_json::Value::Null => return Ok(SignTexts::default()),
            other => return Err(anyhow!("expected an object, found {}", json_kind(&other))),
        };
        let mut fields = BTreeMap::new();
        for (key, v) in obj {
            let Some(cat) = Category::from_key(&key) else {
                continue;
            };
            let field: Option<TextField> = serde_json::from_value(v)
                .map_err(|e| anyhow!("field {:?}: {}", key, e))?;
            fields.insert(cat, field);
        }
        Ok(SignTexts { fields })
    }

    pub fn text(&self, cat: Category) -> Option<String> {
        self.fields.get(&cat).and_then(|f| f.as_ref()).and_then(TextField::joined)
    }

    pub fn fragments(&self, cat: Category) -> Vec<&str> {
        self.fields
            .get(&cat)
            .and_then(|f| f.as_ref())
            .map(TextField::texts)
            .unwrap_or_default()
    }

    pub fn set_text(&mut self, cat: Category, text: String) {
        self.fields.insert(cat, Some(TextField::Text(text)));
    }
}

fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Raw or categorized document: source -> sign -> category texts.
pub type SourceDocument = BTreeMap<String, BTreeMap<Sign, SignTexts>>;

/// Summarized document: sign -> category -> canonical text (absent as null).
pub type SummaryDocument = BTreeMap<Sign, BTreeMap<Category, Option<String>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub source: String,
    pub text: String,
}

/// A sign entry that could not be decoded. The run keeps going without it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub source: String,
    pub sign: String,
    pub reason: String,
}

/// Decode an untyped input document, isolating per-sign failures.
pub fn decode_source_document(
    raw: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
) -> (SourceDocument, Vec<SkippedEntry>) {
    let mut doc = SourceDocument::new();
    let mut skipped = Vec::new();
    for (source, signs) in raw {
        let entry = doc.entry(source.clone()).or_default();
        for (sign_name, value) in signs {
            let sign = match sign_name.parse::<Sign>() {
                Ok(s) => s,
                Err(e) => {
                    skipped.push(SkippedEntry {
                        source: source.clone(),
                        sign: sign_name,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            match SignTexts::from_value(value) {
                Ok(texts) => {
                    entry.insert(sign, texts);
                }
                Err(e) => skipped.push(SkippedEntry {
                    source: source.clone(),
                    sign: sign_name,
                    reason: e.to_string(),
                }),
            }
        }
    }
    (doc, skipped)
}
