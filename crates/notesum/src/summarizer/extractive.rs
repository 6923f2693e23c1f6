//! Deterministic sentence-scoring summarizer.
//!
//! Sentences are scored by the average corpus frequency of their content
//! words. The best-scoring sentences are taken until the summary reaches
//! `min_length` words without exceeding `max_length`, then emitted in their
//! original order.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::{check_input, count_words, truncate_words, LengthConstraints, SummarizationEngine, SummarizeError};

static RE_SENTENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[^.!?]+(?:[.!?]+["')\]]*|$)"#).unwrap());
static RE_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\p{L}\p{N}']+").unwrap());

const STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "but", "by", "can", "could", "did", "do", "does", "for", "from", "had", "has", "have", "he",
    "her", "his", "how", "i", "if", "in", "into", "is", "it", "its", "may", "more", "most", "no",
    "not", "of", "on", "or", "our", "she", "so", "such", "than", "that", "the", "their", "them",
    "then", "there", "these", "they", "this", "those", "to", "was", "we", "were", "what", "when",
    "which", "who", "will", "with", "would", "you", "your",
];

/// Default input ceiling, in words.
pub const DEFAULT_INPUT_CEILING: usize = 20_000;

#[derive(Debug, Clone)]
pub struct ExtractiveSummarizer {
    input_ceiling: usize,
}

struct Sentence<'a> {
    index: usize,
    text: &'a str,
    words: usize,
    score: f64,
}

impl ExtractiveSummarizer {
    pub fn new(input_ceiling: usize) -> Self {
        Self { input_ceiling }
    }
}

impl Default for ExtractiveSummarizer {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_CEILING)
    }
}

impl SummarizationEngine for ExtractiveSummarizer {
    fn name(&self) -> &str {
        "extractive"
    }

    fn input_ceiling(&self) -> usize {
        self.input_ceiling
    }

    fn summarize(&self, text: &str, constraints: LengthConstraints) -> Result<String, SummarizeError> {
        check_input(text, constraints, self.input_ceiling)?;

        let sentences = score_sentences(text);
        if sentences.is_empty() {
            let trimmed = text.trim();
            return Ok(truncate_words(trimmed, constraints.max_length)
                .unwrap_or(trimmed)
                .to_string());
        }

        let mut ranked: Vec<&Sentence> = sentences.iter().collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.index.cmp(&b.index)));

        let mut chosen: Vec<&Sentence> = Vec::new();
        let mut total = 0usize;
        for sentence in &ranked {
            if !chosen.is_empty() && total >= constraints.min_length {
                break;
            }
            if total + sentence.words <= constraints.max_length {
                total += sentence.words;
                chosen.push(sentence);
            }
        }

        // Every sentence is longer than the budget: cut the best one.
        if chosen.is_empty() {
            let best = ranked[0].text;
            return Ok(truncate_words(best, constraints.max_length)
                .unwrap_or(best)
                .to_string());
        }

        chosen.sort_by_key(|s| s.index);
        Ok(chosen
            .iter()
            .map(|s| s.text)
            .collect::<Vec<_>>()
            .join(" "))
    }
}

fn content_tokens(sentence: &str) -> impl Iterator<Item = String> + '_ {
    RE_TOKEN
        .find_iter(sentence)
        .map(|m| m.as_str().to_lowercase())
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
}

fn score_sentences(text: &str) -> Vec<Sentence<'_>> {
    let raw: Vec<&str> = RE_SENTENCE
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .collect();

    let mut frequencies: HashMap<String, usize> = HashMap::new();
    for sentence in &raw {
        for token in content_tokens(sentence) {
            *frequencies.entry(token).or_insert(0) += 1;
        }
    }

    raw.into_iter()
        .enumerate()
        .map(|(index, text)| {
            let (sum, count) = content_tokens(text).fold((0usize, 0usize), |(sum, count), t| {
                (sum + frequencies.get(&t).copied().unwrap_or(0), count + 1)
            });
            let score = if count == 0 {
                0.0
            } else {
                sum as f64 / count as f64
            };
            Sentence {
                index,
                text,
                words: count_words(text),
                score,
            }
        })
        .collect()
}
