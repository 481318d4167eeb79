use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Quote {
    #[serde(rename = "Quote")]
    pub text: String,
    #[serde(rename = "Author", default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// Parse a JSON array of `{"Quote": ..., "Author": ...}` objects.
///
/// Entries with blank quote text are dropped.
pub fn parse_quotes(content: &str) -> Result<Vec<Quote>, QuoteError> {
    let quotes: Vec<Quote> = serde_json::from_str(content)?;
    let total = quotes.len();
    let quotes: Vec<Quote> = quotes
        .into_iter()
        .filter(|q| !q.text.trim().is_empty())
        .collect();

    if quotes.len() < total {
        warn!("Dropped {} blank quotes", total - quotes.len());
    }
    Ok(quotes)
}

pub fn load_quotes(path: &Path) -> Result<Vec<Quote>, QuoteError> {
    let quotes = parse_quotes(&std::fs::read_to_string(path)?)?;
    info!("Loaded {} quotes from {:?}", quotes.len(), path);
    Ok(quotes)
}

pub fn pick_random<'a, R: Rng + ?Sized>(quotes: &'a [Quote], rng: &mut R) -> Option<&'a Quote> {
    quotes.choose(rng)
}
