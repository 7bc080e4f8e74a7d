use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;

use shared::summarizer::assemble;
use shared::{
    run_batch, Config, DigestEntry, DigestWriter, Error, Fetcher, FilteredItem, Pipeline,
    RawItem, RelevanceFilter, Result, Source, Summarizer, Summary, SummaryResult,
};

// ==================== Stubs ====================

struct StubFetcher {
    source: Source,
    outcome: std::result::Result<Vec<RawItem>, String>,
    calls: Arc<AtomicUsize>,
}

impl StubFetcher {
    fn ok(source: Source, items: Vec<RawItem>) -> Self {
        Self {
            source,
            outcome: Ok(items),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing(source: Source, message: &str) -> Self {
        Self {
            source,
            outcome: Err(message.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    fn source(&self) -> Source {
        self.source
    }

    async fn fetch(&self) -> Result<Vec<RawItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Ok(items) => Ok(items.clone()),
            Err(message) => Err(Error::unavailable(self.source, message.clone())),
        }
    }
}

/// Summarizes every item as "要約: <title>"
struct EchoSummarizer;

#[async_trait]
impl Summarizer for EchoSummarizer {
    async fn summarize(&self, items: &[FilteredItem]) -> Result<SummaryResult> {
        let entries = items
            .iter()
            .map(|item| DigestEntry {
                item: item.clone(),
                summary: Summary::Success(format!("要約: {}", item.item.title)),
            })
            .collect();
        assemble(entries)
    }
}

/// Fails every item, like a revoked API key would
struct RejectingSummarizer;

#[async_trait]
impl Summarizer for RejectingSummarizer {
    async fn summarize(&self, items: &[FilteredItem]) -> Result<SummaryResult> {
        let entries = items
            .iter()
            .map(|item| DigestEntry {
                item: item.clone(),
                summary: Summary::Failed("401 Unauthorized".to_string()),
            })
            .collect();
        assemble(entries)
    }
}

fn raw(source: Source, title: &str, body: Option<&str>, score: i64) -> RawItem {
    let mut item = RawItem::new(
        source,
        title,
        format!("https://example.com/{}", title.to_lowercase().replace(' ', "-")),
        Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap(),
    );
    item.body = body.map(str::to_string);
    item.score = score;
    item
}

fn pipeline(fetchers: Vec<StubFetcher>, summarizer: Box<dyn Summarizer>) -> Pipeline {
    let fetchers = fetchers
        .into_iter()
        .map(|f| Box::new(f) as Box<dyn Fetcher>)
        .collect();
    Pipeline::new(fetchers, RelevanceFilter::new(5), summarizer)
}

fn titles(result: &SummaryResult) -> Vec<&str> {
    result
        .source_items()
        .map(|f| f.item.title.as_str())
        .collect()
}

// ==================== End-to-End Tests ====================

#[tokio::test]
async fn test_digest_covers_ai_items_from_every_source() {
    let pipeline = pipeline(
        vec![
            StubFetcher::ok(
                Source::ProductHunt,
                vec![
                    raw(Source::ProductHunt, "PromptPal", Some("An AI writing copilot"), 120),
                    raw(Source::ProductHunt, "Plant Diary", Some("Track your houseplants"), 80),
                ],
            ),
            StubFetcher::ok(
                Source::HackerNews,
                vec![raw(Source::HackerNews, "Show HN: A tiny LLM in Rust", None, 240)],
            ),
            StubFetcher::ok(Source::SocialPost, vec![]),
        ],
        Box::new(EchoSummarizer),
    );

    let report = pipeline.run().await.unwrap();

    assert_eq!(report.total_collected(), 3);
    assert_eq!(report.filtered, 2);
    assert!(report.failures.is_empty());

    let digest = &report.summary;
    assert_eq!(digest.language, "ja");
    assert_eq!(titles(digest), vec!["PromptPal", "Show HN: A tiny LLM in Rust"]);
    assert!(digest.text.contains("PromptPal"));
    assert!(digest.text.contains("Show HN: A tiny LLM in Rust"));
    assert!(digest.text.contains("要約: PromptPal"));
    assert!(!digest.text.contains("Plant Diary"));
}

#[tokio::test]
async fn test_low_score_items_dropped_before_summarizing() {
    let pipeline = pipeline(
        vec![StubFetcher::ok(
            Source::HackerNews,
            vec![
                raw(Source::HackerNews, "Machine learning notes", None, 2),
                raw(Source::HackerNews, "Machine learning at scale", None, 50),
            ],
        )],
        Box::new(EchoSummarizer),
    );

    let report = pipeline.run().await.unwrap();
    assert_eq!(titles(&report.summary), vec!["Machine learning at scale"]);
}

// ==================== Source Failure Tests ====================

#[tokio::test]
async fn test_failing_source_is_skipped() {
    let pipeline = pipeline(
        vec![
            StubFetcher::failing(Source::ProductHunt, "401 Unauthorized"),
            StubFetcher::ok(
                Source::HackerNews,
                vec![raw(Source::HackerNews, "OpenAI releases new model", None, 90)],
            ),
        ],
        Box::new(EchoSummarizer),
    );

    let report = pipeline.run().await.unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].source, Source::ProductHunt);
    assert!(report.failures[0].message.contains("401 Unauthorized"));
    assert_eq!(titles(&report.summary), vec!["OpenAI releases new model"]);
}

#[tokio::test]
async fn test_every_source_failing_fails_the_run() {
    let pipeline = pipeline(
        vec![
            StubFetcher::failing(Source::ProductHunt, "timeout"),
            StubFetcher::failing(Source::HackerNews, "connection refused"),
        ],
        Box::new(EchoSummarizer),
    );

    match pipeline.run().await {
        Err(Error::ServiceUnavailable { service, message }) => {
            assert_eq!(service, Source::ProductHunt);
            assert!(message.contains("timeout"));
            assert!(message.contains("connection refused"));
        }
        other => panic!("expected ServiceUnavailable, got {:?}", other.map(|r| r.filtered)),
    }
}

// ==================== Summarizer Tests ====================

#[tokio::test]
async fn test_nothing_relevant_gives_empty_digest() {
    let pipeline = pipeline(
        vec![StubFetcher::ok(
            Source::HackerNews,
            vec![raw(Source::HackerNews, "Gardening in small spaces", None, 300)],
        )],
        Box::new(EchoSummarizer),
    );

    let report = pipeline.run().await.unwrap();
    assert_eq!(report.filtered, 0);
    assert!(report.summary.is_empty());
    assert!(report.summary.text.is_empty());
}

#[tokio::test]
async fn test_summarizer_failure_fails_the_run() {
    let pipeline = pipeline(
        vec![StubFetcher::ok(
            Source::HackerNews,
            vec![raw(Source::HackerNews, "Claude gets a new feature", None, 40)],
        )],
        Box::new(RejectingSummarizer),
    );

    let result = pipeline.run().await;
    assert!(matches!(result, Err(Error::SummarizationFailed(_))));
}

// ==================== Batch Runner Tests ====================

#[tokio::test]
async fn test_missing_openai_key_fails_before_any_fetch() {
    let built = AtomicBool::new(false);
    let calls = Arc::new(AtomicUsize::new(0));

    let result = run_batch(
        || Config::from_lookup(|_| None),
        |_| {
            built.store(true, Ordering::SeqCst);
            let mut fetcher = StubFetcher::ok(Source::HackerNews, vec![]);
            fetcher.calls = Arc::clone(&calls);
            Ok(pipeline(vec![fetcher], Box::new(EchoSummarizer)))
        },
    )
    .await;

    match result {
        Err(Error::ConfigurationMissing { var }) => assert_eq!(var, "OPENAI_API_KEY"),
        Err(other) => panic!("expected ConfigurationMissing, got {}", other),
        Ok(_) => panic!("expected ConfigurationMissing, got a report"),
    }
    assert!(!built.load(Ordering::SeqCst));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_batch_run_writes_all_output_formats() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("digest");
    let out_value = out.to_string_lossy().to_string();

    let (config, report) = run_batch(
        || {
            Config::from_lookup(|key| match key {
                "OPENAI_API_KEY" => Some("sk-test".to_string()),
                "AI_NEWS_OUTPUT_DIR" => Some(out_value.clone()),
                _ => None,
            })
        },
        |_| {
            Ok(pipeline(
                vec![StubFetcher::ok(
                    Source::SocialPost,
                    vec![raw(
                        Source::SocialPost,
                        "生成AIの新しいベンチマーク",
                        Some("生成AIの評価方法について"),
                        12,
                    )],
                )],
                Box::new(EchoSummarizer),
            ))
        },
    )
    .await
    .unwrap();

    assert_eq!(config.output_dir, out);

    let paths = DigestWriter::new(&config.output_dir)
        .write_all(&report.summary)
        .unwrap();
    assert_eq!(paths.len(), 4);

    let csv_path = paths
        .iter()
        .find(|p| p.extension().is_some_and(|e| e == "csv"))
        .unwrap();
    let csv = std::fs::read_to_string(csv_path).unwrap();
    assert!(csv.starts_with("title,url,source,score,published_at,summary_ja\n"));
    assert!(csv.contains("生成AIの新しいベンチマーク"));
    assert!(csv.contains("X (Twitter)"));

    let json_path = paths
        .iter()
        .find(|p| p.extension().is_some_and(|e| e == "json"))
        .unwrap();
    let saved: SummaryResult =
        serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
    assert_eq!(saved.entries, report.summary.entries);
}
