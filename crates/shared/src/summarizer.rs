use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{DigestEntry, FilteredItem, Summary, SummaryResult};

/// Longest article body sent to the model, in bytes
const MAX_CONTENT_BYTES: usize = 4000;

const SYSTEM_PROMPT: &str =
    "あなたはAI技術に関するニュースを日本語で簡潔に要約するアシスタントです。";

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Produce the Japanese digest for `items`, keeping their order
    async fn summarize(&self, items: &[FilteredItem]) -> Result<SummaryResult>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Cut `content` to at most `max_bytes`, backing off to a UTF-8 boundary.
fn truncate_content(content: &str, max_bytes: usize) -> &str {
    if content.len() <= max_bytes {
        return content;
    }
    let mut end = max_bytes;
    while end > 0 && !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}

fn build_prompt(item: &FilteredItem) -> String {
    let content = item
        .item
        .body
        .as_deref()
        .map(|body| truncate_content(body, MAX_CONTENT_BYTES))
        .filter(|body| !body.trim().is_empty())
        .unwrap_or("（本文なし）");

    format!(
        "以下のAI技術に関するニュースを日本語で200文字程度に要約してください。\n\
        最も重要なポイントを含め、要約の本文だけを出力してください。\n\n\
        タイトル: {}\n\
        ソース: {}\n\
        内容: {}",
        item.item.title,
        item.item.source.label(),
        content
    )
}

fn completion_text(response: ChatResponse) -> Result<String> {
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(Error::SummarizationFailed(
            "model returned an empty completion".to_string(),
        ));
    }
    Ok(text)
}

/// Render the digest body: one numbered block per entry.
pub fn compose_digest_text(entries: &[DigestEntry]) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let item = &entry.item.item;
            format!(
                "[{}] {}\nソース: {}\n{}\nURL: {}\n",
                index + 1,
                item.title,
                item.source.label(),
                entry.summary.text().unwrap_or("要約なし"),
                item.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Turn per-item outcomes into the run's result. Fails only when there was
/// something to summarize and every item failed.
pub fn assemble(entries: Vec<DigestEntry>) -> Result<SummaryResult> {
    if !entries.is_empty()
        && entries
            .iter()
            .all(|entry| matches!(entry.summary, Summary::Failed(_)))
    {
        let reason = match &entries[0].summary {
            Summary::Failed(reason) => reason.clone(),
            Summary::Success(_) => String::new(),
        };
        return Err(Error::SummarizationFailed(format!(
            "all {} items failed, first error: {}",
            entries.len(),
            reason
        )));
    }

    let text = compose_digest_text(&entries);
    Ok(SummaryResult::new(text, entries))
}

pub struct OpenAiSummarizer {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    pause: Duration,
}

impl OpenAiSummarizer {
    pub fn new(api_key: String, model: String, base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            // Spread requests out to stay under rate limits
            pause: Duration::from_secs(1),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.openai_api_key.clone(),
            config.openai_model.clone(),
            config.openai_base_url.clone(),
        )
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    async fn summarize_item(&self, item: &FilteredItem) -> Result<String> {
        let prompt = build_prompt(item);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: &prompt,
                },
            ],
            max_tokens: 300,
            temperature: 0.3,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::SummarizationFailed(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(Error::SummarizationFailed(format!(
                "OpenAI API error: {} - {}",
                status, error_text
            )));
        }

        let chat_response = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| Error::SummarizationFailed(format!("bad response: {}", e)))?;

        completion_text(chat_response)
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, items: &[FilteredItem]) -> Result<SummaryResult> {
        if items.is_empty() {
            info!("nothing to summarize");
            return Ok(SummaryResult::empty());
        }

        let mut entries = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            if index > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }

            debug!(index, total = items.len(), title = %item.item.title, "summarizing");
            let summary = match self.summarize_item(item).await {
                Ok(text) => Summary::Success(text),
                Err(e) => {
                    warn!(url = %item.item.url, error = %e, "failed to summarize item");
                    Summary::Failed(e.to_string())
                }
            };

            entries.push(DigestEntry {
                item: item.clone(),
                summary,
            });
        }

        let result = assemble(entries)?;
        info!(
            items = result.entries.len(),
            model = %self.model,
            "summarized items in Japanese"
        );
        Ok(result)
    }
}
