// Public modules
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod sources;
pub mod summarizer;

#[cfg(test)]
mod stub_server;

// Re-export commonly used types
pub use config::{Config, TwitterCredentials};
pub use error::{Error, Result};
pub use filter::RelevanceFilter;
pub use models::{DigestEntry, FilteredItem, RawItem, Relevance, Source, Summary, SummaryResult};
pub use output::DigestWriter;
pub use pipeline::{run_batch, Pipeline, RunReport, SourceCount, SourceFailure};
pub use sources::{build_fetchers, Fetcher};
pub use summarizer::{OpenAiSummarizer, Summarizer};
