use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an item was collected from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    ProductHunt,
    HackerNews,
    SocialPost,
}

impl Source {
    pub fn label(&self) -> &'static str {
        match self {
            Source::ProductHunt => "Product Hunt",
            Source::HackerNews => "Hacker News",
            Source::SocialPost => "X (Twitter)",
        }
    }

    /// Short lowercase name, used for CSS classes and log fields
    pub fn slug(&self) -> &'static str {
        match self {
            Source::ProductHunt => "producthunt",
            Source::HackerNews => "hackernews",
            Source::SocialPost => "twitter",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A candidate item exactly as one fetcher produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    pub source: Source,
    pub title: String,
    pub body: Option<String>,
    pub url: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub comments_count: i64,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl RawItem {
    pub fn new(
        source: Source,
        title: impl Into<String>,
        url: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source,
            title: title.into(),
            body: None,
            url: url.into(),
            published_at,
            score: 0,
            comments_count: 0,
            author: None,
            tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relevance {
    /// Number of distinct AI terms found in the item
    pub score: usize,
    pub matched_terms: Vec<String>,
}

/// A raw item the relevance filter kept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredItem {
    pub item: RawItem,
    pub relevance: Relevance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Summary {
    Success(String),
    Failed(String),
}

impl Summary {
    pub fn text(&self) -> Option<&str> {
        match self {
            Summary::Success(text) => Some(text),
            Summary::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestEntry {
    pub item: FilteredItem,
    pub summary: Summary,
}

/// The digest a run produces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResult {
    pub language: String,
    pub text: String,
    pub entries: Vec<DigestEntry>,
    pub generated_at: DateTime<Utc>,
}

impl SummaryResult {
    pub const LANGUAGE: &'static str = "ja";

    pub fn new(text: String, entries: Vec<DigestEntry>) -> Self {
        Self {
            language: Self::LANGUAGE.to_string(),
            text,
            entries,
            generated_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(String::new(), Vec::new())
    }

    /// Filtered items in the order they were summarized
    pub fn source_items(&self) -> impl Iterator<Item = &FilteredItem> {
        self.entries.iter().map(|entry| &entry.item)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
