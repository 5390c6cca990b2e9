//! Local fallback summarizer
//!
//! Used whenever the generation provider fails or answers with something
//! unusable. Deterministic for a given input and configuration.

use crate::types::HeuristicConfig;
use dn_artifact::MachineRepresentation;
use indexmap::IndexMap;

/// Provider identifier reported for heuristic output
pub const HEURISTIC: &str = "heuristic";

/// First `summary_words` whitespace-separated tokens, rejoined with spaces
#[must_use]
pub fn summarize(text: &str, cfg: &HeuristicConfig) -> String {
    text.split_whitespace()
        .take(cfg.summary_words)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Most frequent content words, most frequent first
///
/// Tokens are split on whitespace, stripped of anything but ASCII letters and
/// digits and lowercased. Ties keep first-seen order.
#[must_use]
pub fn tags(text: &str, cfg: &HeuristicConfig) -> Vec<String> {
    let mut freq: IndexMap<String, usize> = IndexMap::new();
    for raw in text.split_whitespace() {
        let word: String = raw
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if word.len() < cfg.min_tag_len || cfg.stop_words.iter().any(|s| s == &word) {
            continue;
        }
        *freq.entry(word).or_default() += 1;
    }

    let mut ranked: Vec<(String, usize)> = freq.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
        .into_iter()
        .take(cfg.max_tags)
        .map(|(word, _)| word)
        .collect()
}

/// Fallback title: first heading, else the core text, whitespace collapsed
/// and cut to `max_len` characters
#[must_use]
pub fn title(mr: &MachineRepresentation, max_len: usize) -> String {
    let candidate = mr
        .headings()
        .next()
        .unwrap_or_else(|| mr.core_content_text.trim());
    let collapsed = candidate.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, max_len).to_string()
}

/// Prefix of at most `max` characters
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((at, _)) => &text[..at],
        None => text,
    }
}
