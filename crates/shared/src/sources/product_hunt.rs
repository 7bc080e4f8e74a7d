use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

use super::Fetcher;
use crate::error::{Error, Result};
use crate::models::{RawItem, Source};

pub const PRODUCT_HUNT_API: &str = "https://api.producthunt.com/v2/api/graphql";

const PER_PAGE: u32 = 50;
const MAX_PAGES: usize = 10;

const POSTS_QUERY: &str = r#"query AiNewsPosts($postedAfter: DateTime!, $first: Int!, $after: String) {
  posts(order: NEWEST, postedAfter: $postedAfter, first: $first, after: $after) {
    pageInfo { hasNextPage endCursor }
    edges {
      node {
        name
        tagline
        description
        url
        createdAt
        votesCount
        commentsCount
        user { name }
        topics(first: 10) { edges { node { name } } }
      }
    }
  }
}"#;

#[derive(Serialize)]
struct GraphQlRequest {
    query: &'static str,
    variables: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<PostsData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct PostsData {
    posts: Connection<Post>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection<T> {
    #[serde(default)]
    page_info: Option<PageInfo>,
    edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Post {
    name: String,
    tagline: Option<String>,
    description: Option<String>,
    url: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    votes_count: i64,
    #[serde(default)]
    comments_count: i64,
    user: Option<Maker>,
    topics: Option<Connection<Topic>>,
}

#[derive(Debug, Deserialize)]
struct Maker {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Topic {
    name: String,
}

impl Post {
    fn into_raw_item(self) -> RawItem {
        let body: Vec<String> = [self.tagline, self.description]
            .into_iter()
            .flatten()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .collect();

        let mut item = RawItem::new(Source::ProductHunt, self.name, self.url, self.created_at);
        item.body = if body.is_empty() {
            None
        } else {
            Some(body.join("\n"))
        };
        item.score = self.votes_count;
        item.comments_count = self.comments_count;
        item.author = self.user.and_then(|user| user.name);
        item.tags = self
            .topics
            .map(|topics| topics.edges.into_iter().map(|edge| edge.node.name).collect())
            .unwrap_or_default();
        item
    }
}

/// Map one GraphQL page to items plus the cursor of the next page, if any.
fn parse_page(response: GraphQlResponse) -> Result<(Vec<RawItem>, Option<String>)> {
    if !response.errors.is_empty() {
        let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
        return Err(Error::unavailable(Source::ProductHunt, messages.join("; ")));
    }

    let posts = response
        .data
        .ok_or_else(|| Error::unavailable(Source::ProductHunt, "response has no data"))?
        .posts;

    let next_cursor = posts
        .page_info
        .filter(|info| info.has_next_page)
        .and_then(|info| info.end_cursor);

    let items = posts
        .edges
        .into_iter()
        .map(|edge| edge.node.into_raw_item())
        .collect();

    Ok((items, next_cursor))
}

pub struct ProductHuntClient {
    client: Client,
    api_token: String,
    endpoint: String,
    days_back: i64,
    page_pause: Duration,
}

impl ProductHuntClient {
    pub fn new(api_token: String, days_back: i64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_token,
            endpoint: PRODUCT_HUNT_API.to_string(),
            days_back,
            page_pause: Duration::from_millis(500),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_page_pause(mut self, pause: Duration) -> Self {
        self.page_pause = pause;
        self
    }

    /// Start of the lookback window, or `None` when `days_back` is not a usable span
    fn posted_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.days_back <= 0 {
            return None;
        }
        TimeDelta::try_days(self.days_back).and_then(|window| now.checked_sub_signed(window))
    }

    async fn fetch_page(
        &self,
        posted_after: DateTime<Utc>,
        after: Option<&str>,
    ) -> Result<GraphQlResponse> {
        let request = GraphQlRequest {
            query: POSTS_QUERY,
            variables: json!({
                "postedAfter": posted_after.to_rfc3339(),
                "first": PER_PAGE,
                "after": after,
            }),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::unavailable(Source::ProductHunt, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(Error::unavailable(
                Source::ProductHunt,
                format!("API returned {} - {}", status, error_text),
            ));
        }

        response
            .json::<GraphQlResponse>()
            .await
            .map_err(|e| Error::unavailable(Source::ProductHunt, format!("bad response: {}", e)))
    }
}

#[async_trait]
impl Fetcher for ProductHuntClient {
    fn source(&self) -> Source {
        Source::ProductHunt
    }

    async fn fetch(&self) -> Result<Vec<RawItem>> {
        let posted_after = self.posted_after(Utc::now()).ok_or_else(|| {
            Error::InvalidConfiguration {
                var: "PRODUCT_HUNT_DAYS_BACK".to_string(),
                value: self.days_back.to_string(),
            }
        })?;
        let mut all_posts = Vec::new();
        let mut cursor: Option<String> = None;

        for page in 0..MAX_PAGES {
            let response = self.fetch_page(posted_after, cursor.as_deref()).await?;
            let (items, next) = parse_page(response)?;
            debug!(page, count = items.len(), "fetched Product Hunt page");
            all_posts.extend(items);

            match next {
                Some(next) => cursor = Some(next),
                None => break,
            }

            if !self.page_pause.is_zero() {
                tokio::time::sleep(self.page_pause).await;
            }
        }

        info!(
            count = all_posts.len(),
            days = self.days_back,
            "fetched Product Hunt posts"
        );
        Ok(all_posts)
    }
}
