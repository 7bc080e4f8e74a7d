use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use super::{oauth, Fetcher};
use crate::config::TwitterCredentials;
use crate::error::{Error, Result};
use crate::models::{RawItem, Source};

pub const TWITTER_SEARCH_API: &str = "https://api.twitter.com/2/tweets/search/recent";

/// Recent search rejects queries longer than this
const MAX_QUERY_LEN: usize = 512;
const MAX_TITLE_CHARS: usize = 100;

const ENGLISH_KEYWORDS: &[&str] = &[
    "artificial intelligence",
    "#AI",
    "#artificialintelligence",
    "machine learning",
    "#ML",
    "#machinelearning",
    "deep learning",
    "#DL",
    "#deeplearning",
    "LLM",
    "#LLM",
    "GPT",
    "ChatGPT",
    "#GPT",
    "#ChatGPT",
    "Anthropic",
    "Claude",
    "#Claude",
    "Gemini",
    "#Gemini",
];

const JAPANESE_KEYWORDS: &[&str] = &["大規模言語モデル", "AI開発", "AIモデル", "#AI開発", "生成AI"];

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Tweet>,
    includes: Option<Includes>,
}

#[derive(Debug, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    text: String,
    created_at: Option<DateTime<Utc>>,
    author_id: Option<String>,
    public_metrics: Option<PublicMetrics>,
    entities: Option<Entities>,
}

#[derive(Debug, Default, Deserialize)]
struct PublicMetrics {
    #[serde(default)]
    like_count: i64,
    #[serde(default)]
    retweet_count: i64,
}

#[derive(Debug, Default, Deserialize)]
struct Entities {
    #[serde(default)]
    urls: Vec<UrlEntity>,
    #[serde(default)]
    mentions: Vec<Mention>,
    #[serde(default)]
    hashtags: Vec<Hashtag>,
}

#[derive(Debug, Deserialize)]
struct UrlEntity {
    url: String,
    expanded_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Mention {
    username: String,
}

#[derive(Debug, Deserialize)]
struct Hashtag {
    tag: String,
}

impl Tweet {
    fn into_raw_item(self, usernames: &HashMap<String, String>) -> RawItem {
        let entities = self.entities.unwrap_or_default();
        let metrics = self.public_metrics.unwrap_or_default();

        let url = entities
            .urls
            .iter()
            .find_map(|u| u.expanded_url.clone())
            .unwrap_or_else(|| format!("https://twitter.com/i/web/status/{}", self.id));

        let mut item = RawItem::new(
            Source::SocialPost,
            tweet_title(&self.text, &entities),
            url,
            self.created_at.unwrap_or_else(Utc::now),
        );
        item.body = Some(self.text);
        item.score = metrics.like_count;
        item.comments_count = metrics.retweet_count;
        item.author = self
            .author_id
            .and_then(|id| usernames.get(&id).cloned());
        item.tags = entities.hashtags.into_iter().map(|h| h.tag).collect();
        item
    }
}

/// Tweet text without t.co links or mentions, on one line, at most 100 characters.
fn tweet_title(text: &str, entities: &Entities) -> String {
    let mut title = text.to_string();
    for url in &entities.urls {
        title = title.replace(&url.url, "");
    }
    for mention in &entities.mentions {
        title = title.replace(&format!("@{}", mention.username), "");
    }

    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
    if title.chars().count() > MAX_TITLE_CHARS {
        let truncated: String = title.chars().take(MAX_TITLE_CHARS).collect();
        format!("{}...", truncated)
    } else {
        title
    }
}

fn quote_keyword(keyword: &str) -> String {
    if keyword.contains(' ') {
        format!("\"{}\"", keyword)
    } else {
        keyword.to_string()
    }
}

/// OR-join keywords into as few queries as fit the length limit, each ending with `suffix`.
fn build_queries(keywords: &[&str], suffix: &str) -> Vec<String> {
    let mut queries = Vec::new();
    let mut group: Vec<String> = Vec::new();

    let render = |group: &[String]| format!("({}) {}", group.join(" OR "), suffix);

    for keyword in keywords {
        group.push(quote_keyword(keyword));
        if group.len() > 1 && render(&group).len() > MAX_QUERY_LEN {
            let overflow = group.pop();
            queries.push(render(&group));
            group = overflow.into_iter().collect();
        }
    }
    if !group.is_empty() {
        queries.push(render(&group));
    }

    queries
}

/// English queries restricted to `lang:en`, then Japanese ones restricted to `lang:ja`.
fn search_queries() -> Vec<String> {
    let mut queries = build_queries(ENGLISH_KEYWORDS, "has:links -is:retweet lang:en");
    queries.extend(build_queries(
        JAPANESE_KEYWORDS,
        "has:links -is:retweet lang:ja",
    ));
    queries
}

/// Flatten search pages, keeping the first occurrence of each tweet id and each link.
fn collect_unique(responses: Vec<SearchResponse>) -> Vec<RawItem> {
    let mut seen_ids = HashSet::new();
    let mut seen_urls = HashSet::new();
    let mut items = Vec::new();

    for response in responses {
        let usernames: HashMap<String, String> = response
            .includes
            .map(|includes| {
                includes
                    .users
                    .into_iter()
                    .map(|user| (user.id, user.username))
                    .collect()
            })
            .unwrap_or_default();

        for tweet in response.data {
            if !seen_ids.insert(tweet.id.clone()) {
                continue;
            }
            let item = tweet.into_raw_item(&usernames);
            if seen_urls.insert(item.url.clone()) {
                items.push(item);
            }
        }
    }

    items
}

pub struct TwitterClient {
    client: Client,
    credentials: TwitterCredentials,
    endpoint: String,
    max_results: u32,
    query_pause: Duration,
}

impl TwitterClient {
    pub fn new(credentials: TwitterCredentials, max_results: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            credentials,
            endpoint: TWITTER_SEARCH_API.to_string(),
            max_results,
            // Recent search is rate limited per 15-minute window
            query_pause: Duration::from_secs(2),
        })
    }

    pub fn with_query_pause(mut self, pause: Duration) -> Self {
        self.query_pause = pause;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn search(&self, query: &str) -> Result<SearchResponse> {
        let max_results = self.max_results.to_string();
        let url = Url::parse_with_params(
            &self.endpoint,
            &[
                ("query", query),
                ("max_results", max_results.as_str()),
                ("tweet.fields", "created_at,public_metrics,entities,author_id"),
                ("expansions", "author_id"),
                ("user.fields", "username"),
            ],
        )
        .map_err(|e| Error::unavailable(Source::SocialPost, format!("bad endpoint: {}", e)))?;

        let authorization = oauth::authorization_header(&self.credentials, "GET", &url);

        let response = self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(Error::unavailable(
                Source::SocialPost,
                format!("search returned {} - {}", status, error_text),
            ));
        }

        Ok(response.json::<SearchResponse>().await?)
    }
}

#[async_trait]
impl Fetcher for TwitterClient {
    fn source(&self) -> Source {
        Source::SocialPost
    }

    async fn fetch(&self) -> Result<Vec<RawItem>> {
        let queries = search_queries();
        let mut responses = Vec::new();
        let mut last_error = None;

        for (index, query) in queries.iter().enumerate() {
            if index > 0 && !self.query_pause.is_zero() {
                tokio::time::sleep(self.query_pause).await;
            }
            match self.search(query).await {
                Ok(response) => {
                    info!(query = %query, count = response.data.len(), "searched X");
                    responses.push(response);
                }
                Err(e) => {
                    warn!(query = %query, error = %e, "X search failed");
                    last_error = Some(e);
                }
            }
        }

        if responses.is_empty() {
            let message = last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no search queries".to_string());
            return Err(Error::unavailable(Source::SocialPost, message));
        }

        Ok(collect_unique(responses))
    }
}
