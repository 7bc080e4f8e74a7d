//! Keyword-based AI relevance filter.
//!
//! ASCII terms match as whole words, case-insensitively. Japanese terms match as
//! substrings since there are no word boundaries inside Japanese text.

use regex::RegexSet;
use tracing::info;

use crate::models::{FilteredItem, RawItem, Relevance};

pub const AI_TERMS: &[&str] = &[
    // General
    "artificial intelligence",
    "ai",
    "a.i.",
    "machine learning",
    "ml",
    "deep learning",
    "neural network",
    "neural networks",
    "neural net",
    "computer vision",
    // Models and vendors
    "gpt",
    "chatgpt",
    "llm",
    "llms",
    "large language model",
    "large language models",
    "language model",
    "foundation model",
    "claude",
    "gemini",
    "midjourney",
    "dall-e",
    "dalle",
    "stable diffusion",
    "openai",
    "anthropic",
    "deepmind",
    "meta ai",
    "mistral",
    "llama",
    "hugging face",
    // Development
    "prompt engineering",
    "fine-tune",
    "fine-tuned",
    "fine-tuning",
    "transformer",
    "transformers",
    "diffusion model",
    "gan",
    "gans",
    "generative",
    "genai",
    "nlp",
    "natural language processing",
    "embedding",
    "embeddings",
    "vector database",
    "semantic search",
    "retrieval-augmented",
    "reinforcement learning",
    "self-supervised",
    "transfer learning",
    "attention mechanism",
    "multimodal",
    "mlops",
    // Applications
    "ai agent",
    "ai agents",
    "ai assistant",
    "agentic",
    "copilot",
    "speech recognition",
    "face recognition",
    "voice assistant",
    "recommendation system",
    // Japanese
    "人工知能",
    "エーアイ",
    "機械学習",
    "ディープラーニング",
    "深層学習",
    "ニューラルネットワーク",
    "大規模言語モデル",
    "生成ai",
    "生成モデル",
    "ai開発",
    "aiモデル",
];

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Pattern for one term. Boundaries only go on ends that are word characters,
/// so "a.i." and "gpt-4"-style terms still match.
fn term_pattern(term: &str) -> String {
    let escaped = regex::escape(term);
    if !term.is_ascii() {
        return format!("(?i){}", escaped);
    }

    let start = if term.chars().next().is_some_and(is_word_char) {
        r"\b"
    } else {
        ""
    };
    let end = if term.chars().last().is_some_and(is_word_char) {
        r"\b"
    } else {
        ""
    };
    format!("(?i){}{}{}", start, escaped, end)
}

pub struct RelevanceFilter {
    min_score: i64,
    terms: Vec<String>,
    patterns: RegexSet,
}

impl RelevanceFilter {
    /// Filter with the built-in term list
    pub fn new(min_score: i64) -> Self {
        Self::with_terms(min_score, AI_TERMS)
            .expect("built-in AI terms are valid patterns once escaped")
    }

    pub fn with_terms(min_score: i64, terms: &[&str]) -> Result<Self, regex::Error> {
        let terms: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
        let patterns = RegexSet::new(terms.iter().map(|t| term_pattern(t)))?;

        Ok(Self {
            min_score,
            terms,
            patterns,
        })
    }

    /// Relevance of one item, or `None` when it is below the score floor or matches no term.
    pub fn assess(&self, item: &RawItem) -> Option<Relevance> {
        if item.score < self.min_score {
            return None;
        }

        let mut text = item.title.clone();
        if let Some(body) = &item.body {
            text.push('\n');
            text.push_str(body);
        }
        for tag in &item.tags {
            text.push('\n');
            text.push_str(tag);
        }

        let matched_terms: Vec<String> = self
            .patterns
            .matches(&text)
            .into_iter()
            .map(|index| self.terms[index].clone())
            .collect();

        if matched_terms.is_empty() {
            None
        } else {
            Some(Relevance {
                score: matched_terms.len(),
                matched_terms,
            })
        }
    }

    /// Keep the AI-relevant items, preserving their relative order.
    pub fn filter(&self, items: Vec<RawItem>) -> Vec<FilteredItem> {
        let total = items.len();
        let kept: Vec<FilteredItem> = items
            .into_iter()
            .filter_map(|item| {
                self.assess(&item)
                    .map(|relevance| FilteredItem { item, relevance })
            })
            .collect();

        info!(total, kept = kept.len(), "filtered items for AI relevance");
        kept
    }
}
