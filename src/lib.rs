//! Daily horoscope content analysis: sentence categorization, deduplicated
//! extractive summaries, lexicon sentiment scores and sign rankings.

pub mod categorize;
pub mod config;
pub mod embed;
pub mod lexicon;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod rank;
pub mod score;
pub mod similarity;
pub mod summarize;
pub mod validate;
