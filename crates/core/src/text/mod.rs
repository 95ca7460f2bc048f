//! Text processing utilities for tokenization and ranking

use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Common English stop words to filter out during tokenization
static STOP_WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();

/// Porter stemmer for English text
static STEMMER: OnceLock<Stemmer> = OnceLock::new();

fn get_stop_words() -> &'static HashSet<&'static str> {
    STOP_WORDS.get_or_init(|| {
        [
            "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into",
            "is", "it", "no", "not", "of", "on", "or", "such", "that", "the", "their", "then",
            "there", "these", "they", "this", "to", "was", "will", "with",
        ]
        .iter()
        .copied()
        .collect()
    })
}

fn get_stemmer() -> &'static Stemmer {
    STEMMER.get_or_init(|| Stemmer::create(Algorithm::English))
}

/// Simple word-based tokenizer splitting on non-alphanumeric characters with stop word removal
pub fn tokenize(text: &str) -> Vec<String> {
    let stop_words = get_stop_words();
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .filter(|s| !stop_words.contains(s))
        .map(|s| s.to_string())
        .collect()
}

/// Tokenize text with optional Porter stemming
///
/// When `stem` is true, applies Porter stemming to match words like "graph" and "graphs"
/// This improves similarity calculation for the similarity engine
pub fn tokenize_with_stemming(text: &str, stem: bool) -> Vec<String> {
    let tokens = tokenize(text);
    if !stem {
        return tokens;
    }

    let stemmer = get_stemmer();
    tokens.iter().map(|t| stemmer.stem(t).to_string()).collect()
}
