use anyhow::{bail, Context, Result};
use itertools::Itertools;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::config::EmbeddingConfig;
use crate::similarity::{EmbeddingSimilarity, LexicalSimilarity, SimilarityProvider};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

/// One request for one batch of texts against an OpenAI-compatible
/// `/embeddings` endpoint. Vectors come back in input order.
async fn embed_batch(client: &Client, cfg: &EmbeddingConfig, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let url = format!("{}/embeddings", cfg.endpoint.trim_end_matches('/'));
    let start = std::time::Instant::now();

    let mut req = client.post(&url).json(&EmbeddingRequest {
        model: &cfg.model,
        input: texts,
    });
    if let Some(key) = &cfg.api_key {
        req = req.bearer_auth(key);
    }

    let resp = req
        .send()
        .await
        .with_context(|| format!("Request failed for {}", url))?
        .error_for_status()
        .with_context(|| format!("HTTP error for {}", url))?;

    let body: EmbeddingResponse = resp
        .json()
        .await
        .with_context(|| format!("Decoding JSON for {}", url))?;

    if body.data.len() != texts.len() {
        bail!(
            "Embedding count mismatch from {}: sent {}, received {}",
            url,
            texts.len(),
            body.data.len()
        );
    }

    let mut out = vec![Vec::new(); texts.len()];
    for item in body.data {
        if item.index >= out.len() {
            bail!("Embedding index {} out of range from {}", item.index, url);
        }
        out[item.index] = item.embedding;
    }

    debug!(
        "Embedding batch completed - duration={:.2}s, texts={}",
        start.elapsed().as_secs_f32(),
        texts.len()
    );
    Ok(out)
}

/// Fetch vectors for every distinct text. Batches are sent concurrently;
/// any failed batch fails the whole fetch.
pub async fn fetch_embeddings(cfg: &EmbeddingConfig, texts: &[String]) -> Result<HashMap<String, Vec<f32>>> {
    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
        .build()?;

    let unique: Vec<String> = texts
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .unique()
        .map(str::to_string)
        .collect();

    let batches: Vec<&[String]> = unique.chunks(cfg.batch_size.max(1)).collect();
    info!(
        "Embedding fetch starting - texts={}, batches={}, model={}",
        unique.len(),
        batches.len(),
        cfg.model
    );

    let tasks = batches.iter().map(|b| embed_batch(&client, cfg, b));
    let results = futures::future::join_all(tasks).await;

    let mut vectors = HashMap::with_capacity(unique.len());
    for (batch, result) in batches.iter().zip(results) {
        let vecs = result?;
        for (text, v) in batch.iter().zip(vecs) {
            vectors.insert(text.clone(), v);
        }
    }
    Ok(vectors)
}

/// Pick the similarity strategy for this run. Without an endpoint, or when
/// the service fails, the run continues on lexical similarity after a single
/// warning.
pub async fn select_provider(cfg: Option<&EmbeddingConfig>, texts: &[String]) -> Box<dyn SimilarityProvider> {
    let Some(cfg) = cfg else {
        debug!("No embedding endpoint configured - using lexical similarity");
        return Box::new(LexicalSimilarity);
    };
    match fetch_embeddings(cfg, texts).await {
        Ok(vectors) if !vectors.is_empty() => {
            info!("Embedding similarity enabled - vectors={}", vectors.len());
            Box::new(EmbeddingSimilarity::new(vectors))
        }
        Ok(_) => {
            warn!("Embedding service returned no vectors - falling back to lexical similarity");
            Box::new(LexicalSimilarity)
        }
        Err(e) => {
            warn!("Embedding service unavailable - falling back to lexical similarity: {:#}", e);
            Box::new(LexicalSimilarity)
        }
    }
}
