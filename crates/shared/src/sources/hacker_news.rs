use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::Fetcher;
use crate::error::{Error, Result};
use crate::models::{RawItem, Source};

pub const HACKER_NEWS_API: &str = "https://hacker-news.firebaseio.com/v0";

/// Item lookups in flight at once. Results keep their listing order.
const ITEM_CONCURRENCY: usize = 8;

#[derive(Debug, Deserialize)]
struct HnItem {
    #[serde(rename = "type")]
    kind: Option<String>,
    title: Option<String>,
    url: Option<String>,
    text: Option<String>,
    by: Option<String>,
    time: Option<i64>,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    descendants: i64,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    dead: bool,
}

impl HnItem {
    /// Only live stories that link somewhere become items
    fn into_raw_item(self) -> Option<RawItem> {
        if self.kind.as_deref() != Some("story") || self.deleted || self.dead {
            return None;
        }
        let url = self.url.filter(|u| !u.is_empty())?;
        let published_at = self
            .time
            .and_then(|t| DateTime::<Utc>::from_timestamp(t, 0))
            .unwrap_or_else(Utc::now);

        let mut item = RawItem::new(
            Source::HackerNews,
            self.title.unwrap_or_default(),
            url,
            published_at,
        );
        item.body = self
            .text
            .map(|html| html2text::from_read(html.as_bytes(), 100).trim().to_string())
            .filter(|text| !text.is_empty());
        item.score = self.score;
        item.comments_count = self.descendants;
        item.author = self.by;
        Some(item)
    }
}

/// Concatenate the two listings, drop repeats and keep at most `max_items`.
fn merge_story_ids(top: Vec<i64>, new: Vec<i64>, max_items: usize) -> Vec<i64> {
    let mut seen = HashSet::new();
    top.into_iter()
        .chain(new)
        .filter(|id| seen.insert(*id))
        .take(max_items)
        .collect()
}

pub struct HackerNewsClient {
    client: Client,
    base_url: String,
    max_items: usize,
}

impl HackerNewsClient {
    pub fn new(max_items: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: HACKER_NEWS_API.to_string(),
            max_items,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn story_ids(&self, listing: &str) -> Result<Vec<i64>> {
        let url = format!("{}/{}.json", self.base_url, listing);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::unavailable(Source::HackerNews, format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::unavailable(
                Source::HackerNews,
                format!("{} returned {}", url, status),
            ));
        }

        response
            .json::<Vec<i64>>()
            .await
            .map_err(|e| Error::unavailable(Source::HackerNews, format!("bad listing: {}", e)))
    }

    async fn item(&self, id: i64) -> Result<Option<HnItem>> {
        let url = format!("{}/item/{}.json", self.base_url, id);
        let response = self.client.get(&url).send().await?.error_for_status()?;

        // Missing items come back as a JSON `null`
        Ok(response.json::<Option<HnItem>>().await?)
    }
}

#[async_trait]
impl Fetcher for HackerNewsClient {
    fn source(&self) -> Source {
        Source::HackerNews
    }

    async fn fetch(&self) -> Result<Vec<RawItem>> {
        let top = self.story_ids("topstories").await?;
        let new = self.story_ids("newstories").await?;
        let ids = merge_story_ids(top, new, self.max_items);
        info!(count = ids.len(), "fetched Hacker News story ids");

        let results: Vec<(i64, Result<Option<HnItem>>)> = stream::iter(ids)
            .map(|id| async move { (id, self.item(id).await) })
            .buffered(ITEM_CONCURRENCY)
            .collect()
            .await;

        let mut items = Vec::new();
        for (id, result) in results {
            match result {
                Ok(Some(story)) => {
                    if let Some(item) = story.into_raw_item() {
                        items.push(item);
                    } else {
                        debug!(id, "skipping non-story or link-less item");
                    }
                }
                Ok(None) => debug!(id, "item not found"),
                Err(e) => warn!(id, error = %e, "failed to fetch Hacker News item"),
            }
        }

        Ok(items)
    }
}
