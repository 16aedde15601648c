use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::models::Category;
use crate::similarity::{CROSS_CATEGORY_THRESHOLD, SENTENCE_DEDUP_THRESHOLD};

const ENV_PREFIX: &str = "ASTRO_PULSE_";

/// Composite fusion weights; renormalized over the categories present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeWeights {
    pub genel: f64,
    #[serde(rename = "aşk")]
    pub ask: f64,
    pub para: f64,
    #[serde(rename = "sağlık")]
    pub saglik: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            genel: 0.30,
            ask: 0.25,
            para: 0.25,
            saglik: 0.20,
        }
    }
}

impl CompositeWeights {
    pub fn weight(&self, cat: Category) -> f64 {
        match cat {
            Category::General => self.genel,
            Category::Love => self.ask,
            Category::Money => self.para,
            Category::Health => self.saglik,
        }
    }
}

/// OpenAI-compatible embedding service used for semantic similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub endpoint: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_embedding_batch")]
    pub batch_size: usize,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_batch() -> usize {
    64
}

fn default_embedding_timeout() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: default_embedding_model(),
            api_key: None,
            batch_size: default_embedding_batch(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the daily raw input and every document the
    /// pipeline writes.
    pub data_dir: PathBuf,
    pub timezone: String,
    pub sentence_dedup_threshold: f32,
    pub cross_category_threshold: f32,
    pub mmr_lambda: f32,
    pub max_general_sentences: usize,
    pub max_specific_sentences: usize,
    pub synonym_ratio: f64,
    pub weights: CompositeWeights,
    pub embedding: Option<EmbeddingConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            timezone: "Europe/Istanbul".to_string(),
            sentence_dedup_threshold: SENTENCE_DEDUP_THRESHOLD,
            cross_category_threshold: CROSS_CATEGORY_THRESHOLD,
            mmr_lambda: 0.7,
            max_general_sentences: 4,
            max_specific_sentences: 3,
            synonym_ratio: 0.0,
            weights: CompositeWeights::default(),
            embedding: None,
        }
    }
}

impl PipelineConfig {
    /// Defaults, then the optional JSON file, then `ASTRO_PULSE_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Reading config file {}", path.display()))?;
        let config: Self = serde_json::from_slice(&bytes)
            .with_context(|| format!("Parsing config file {}", path.display()))?;
        debug!("Loaded config file - path={}", path.display());
        Ok(config)
    }

    /// Override fields from a variable lookup. Values that do not parse are
    /// ignored with a warning.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(dir) = get("DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(tz) = get("TIMEZONE") {
            self.timezone = tz;
        }
        parse_into(get("DEDUP_THRESHOLD"), "DEDUP_THRESHOLD", &mut self.sentence_dedup_threshold);
        parse_into(
            get("CROSS_CATEGORY_THRESHOLD"),
            "CROSS_CATEGORY_THRESHOLD",
            &mut self.cross_category_threshold,
        );
        parse_into(get("MMR_LAMBDA"), "MMR_LAMBDA", &mut self.mmr_lambda);
        parse_into(get("MAX_GENERAL_SENTENCES"), "MAX_GENERAL_SENTENCES", &mut self.max_general_sentences);
        parse_into(get("MAX_SPECIFIC_SENTENCES"), "MAX_SPECIFIC_SENTENCES", &mut self.max_specific_sentences);
        parse_into(get("SYNONYM_RATIO"), "SYNONYM_RATIO", &mut self.synonym_ratio);

        if let Some(endpoint) = get("EMBEDDING_ENDPOINT") {
            if endpoint.trim().is_empty() {
                self.embedding = None;
            } else {
                let emb = self.embedding.get_or_insert_with(|| EmbeddingConfig::new(endpoint.clone()));
                emb.endpoint = endpoint;
            }
        }
        if let Some(emb) = self.embedding.as_mut() {
            if let Some(model) = get("EMBEDDING_MODEL") {
                emb.model = model;
            }
            if let Some(key) = get("EMBEDDING_API_KEY") {
                emb.api_key = Some(key);
            }
            parse_into(get("EMBEDDING_BATCH"), "EMBEDDING_BATCH", &mut emb.batch_size);
        }
    }

    pub fn timezone(&self) -> Result<chrono_tz::Tz> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|e| anyhow::anyhow!("Invalid timezone {:?}: {}", self.timezone, e))
    }

    pub fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("sentence_dedup_threshold", self.sentence_dedup_threshold),
            ("cross_category_threshold", self.cross_category_threshold),
            ("mmr_lambda", self.mmr_lambda),
        ] {
            if !(0.0..=1.0).contains(&v) {
                bail!("{} must be within [0, 1], got {}", name, v);
            }
        }
        if !(0.0..=1.0).contains(&self.synonym_ratio) {
            bail!("synonym_ratio must be within [0, 1], got {}", self.synonym_ratio);
        }
        if self.max_general_sentences == 0 || self.max_specific_sentences == 0 {
            bail!("Sentence limits must be greater than zero");
        }
        let w = &self.weights;
        if [w.genel, w.ask, w.para, w.saglik].iter().any(|x| *x < 0.0 || !x.is_finite()) {
            bail!("Composite weights must be finite and non-negative");
        }
        self.timezone()?;

        if let Some(emb) = &self.embedding {
            let url = url::Url::parse(&emb.endpoint)
                .with_context(|| format!("Invalid embedding endpoint {:?}", emb.endpoint))?;
            if !matches!(url.scheme(), "http" | "https") {
                bail!("Embedding endpoint must be http(s), got {}", url.scheme());
            }
            if emb.model.is_empty() {
                bail!("Embedding model cannot be empty");
            }
            if emb.batch_size == 0 {
                bail!("Embedding batch size must be greater than zero");
            }
        }
        Ok(())
    }
}

fn parse_into<T: std::str::FromStr>(raw: Option<String>, name: &str, slot: &mut T) {
    let Some(raw) = raw else { return };
    match raw.trim().parse::<T>() {
        Ok(v) => *slot = v,
        Err(_) => warn!("Ignoring unparsable {}{}={:?}", ENV_PREFIX, name, raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let c = PipelineConfig::default();
        c.validate().unwrap();
        assert_eq!(c.max_general_sentences, 4);
        assert_eq!(c.max_specific_sentences, 3);
        let sum: f64 = Category::ALL.iter().map(|c2| c.weights.weight(*c2)).sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn env_overrides_defaults() {
        let mut c = PipelineConfig::default();
        c.apply_env(lookup(&[
            ("ASTRO_PULSE_DATA_DIR", "/tmp/astro"),
            ("ASTRO_PULSE_MMR_LAMBDA", "0.5"),
            ("ASTRO_PULSE_SYNONYM_RATIO", "not-a-number"),
            ("ASTRO_PULSE_EMBEDDING_ENDPOINT", "http://localhost:8080/v1"),
            ("ASTRO_PULSE_EMBEDDING_BATCH", "16"),
        ]));
        assert_eq!(c.data_dir, PathBuf::from("/tmp/astro"));
        assert_eq!(c.mmr_lambda, 0.5);
        assert_eq!(c.synonym_ratio, 0.0);
        let emb = c.embedding.as_ref().unwrap();
        assert_eq!(emb.endpoint, "http://localhost:8080/v1");
        assert_eq!(emb.batch_size, 16);
        c.validate().unwrap();
    }

    #[test]
    fn file_values_are_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"mmr_lambda": 0.6, "weights": {"aşk": 0.4}}"#).unwrap();
        let c = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(c.mmr_lambda, 0.6);
        assert_eq!(c.weights.ask, 0.4);
        assert_eq!(c.weights.genel, 0.30);
        assert_eq!(c.max_general_sentences, 4);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut c = PipelineConfig::default();
        c.mmr_lambda = 1.5;
        assert!(c.validate().is_err());

        let mut c = PipelineConfig::default();
        c.embedding = Some(EmbeddingConfig::new("not a url"));
        assert!(c.validate().is_err());

        let mut c = PipelineConfig::default();
        c.timezone = "Mars/Olympus".to_string();
        assert!(c.validate().is_err());
    }
}
