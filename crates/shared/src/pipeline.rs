use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::filter::RelevanceFilter;
use crate::models::{RawItem, Source, SummaryResult};
use crate::sources::{build_fetchers, Fetcher};
use crate::summarizer::{OpenAiSummarizer, Summarizer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceCount {
    pub source: Source,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub source: Source,
    pub message: String,
}

/// What one run collected, dropped and produced
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub collected: Vec<SourceCount>,
    pub failures: Vec<SourceFailure>,
    pub filtered: usize,
    pub summary: SummaryResult,
}

impl RunReport {
    pub fn total_collected(&self) -> usize {
        self.collected.iter().map(|c| c.count).sum()
    }
}

/// Fetchers, filter and summarizer, run once in that order
pub struct Pipeline {
    fetchers: Vec<Box<dyn Fetcher>>,
    filter: RelevanceFilter,
    summarizer: Box<dyn Summarizer>,
}

impl Pipeline {
    pub fn new(
        fetchers: Vec<Box<dyn Fetcher>>,
        filter: RelevanceFilter,
        summarizer: Box<dyn Summarizer>,
    ) -> Self {
        Self {
            fetchers,
            filter,
            summarizer,
        }
    }

    /// Real network clients for everything the config enables
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            build_fetchers(config)?,
            RelevanceFilter::new(config.min_score),
            Box::new(OpenAiSummarizer::from_config(config)?),
        ))
    }

    /// Run every fetcher in order. A failing source is recorded and skipped;
    /// the run only fails here when every source failed.
    async fn collect(&self) -> Result<(Vec<RawItem>, Vec<SourceCount>, Vec<SourceFailure>)> {
        let mut items = Vec::new();
        let mut collected = Vec::new();
        let mut failures = Vec::new();

        for fetcher in &self.fetchers {
            let source = fetcher.source();
            match fetcher.fetch().await {
                Ok(fetched) => {
                    info!(source = %source, count = fetched.len(), "collected items");
                    collected.push(SourceCount {
                        source,
                        count: fetched.len(),
                    });
                    items.extend(fetched);
                }
                Err(e) => {
                    warn!(source = %source, error = %e, "source failed, continuing without it");
                    failures.push(SourceFailure {
                        source,
                        message: e.to_string(),
                    });
                }
            }
        }

        if collected.is_empty() && !failures.is_empty() {
            let details: Vec<String> = failures
                .iter()
                .map(|f| format!("{}: {}", f.source, f.message))
                .collect();
            return Err(Error::unavailable(
                failures[0].source,
                format!("every source failed ({})", details.join("; ")),
            ));
        }

        Ok((items, collected, failures))
    }

    pub async fn run(&self) -> Result<RunReport> {
        let (items, collected, failures) = self.collect().await?;
        info!(total = items.len(), "collected items from all sources");

        let relevant = self.filter.filter(items);
        let filtered = relevant.len();

        let summary = self.summarizer.summarize(&relevant).await?;

        Ok(RunReport {
            collected,
            failures,
            filtered,
            summary,
        })
    }
}

/// Load the config, build the pipeline from it and run it once.
///
/// Configuration problems surface before `build` is called, so no fetcher is
/// constructed or contacted on a bad config.
pub async fn run_batch<L, B>(load: L, build: B) -> Result<(Config, RunReport)>
where
    L: FnOnce() -> Result<Config>,
    B: FnOnce(&Config) -> Result<Pipeline>,
{
    let config = load()?;
    let pipeline = build(&config)?;
    let report = pipeline.run().await?;
    Ok((config, report))
}
