use async_trait::async_trait;
use tracing::warn;

use crate::config::Config;
use crate::error::Result;
use crate::models::{RawItem, Source};

pub mod hacker_news;
pub mod oauth;
pub mod product_hunt;
pub mod twitter;

pub use hacker_news::HackerNewsClient;
pub use product_hunt::ProductHuntClient;
pub use twitter::TwitterClient;

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Which service this fetcher reads from
    fn source(&self) -> Source;

    /// Query the service once and return its items in service order
    async fn fetch(&self) -> Result<Vec<RawItem>>;
}

/// Build the fetchers the config enables, in run order: Product Hunt, Hacker News, X.
pub fn build_fetchers(config: &Config) -> Result<Vec<Box<dyn Fetcher>>> {
    let mut fetchers: Vec<Box<dyn Fetcher>> = Vec::new();

    match &config.product_hunt_api_key {
        Some(token) => fetchers.push(Box::new(ProductHuntClient::new(
            token.clone(),
            config.product_hunt_days_back,
        )?)),
        None => warn!("PRODUCT_HUNT_API_KEY not set, skipping Product Hunt"),
    }

    fetchers.push(Box::new(HackerNewsClient::new(config.hn_max_items)?));

    match &config.twitter {
        Some(credentials) => fetchers.push(Box::new(TwitterClient::new(
            credentials.clone(),
            config.twitter_max_results,
        )?)),
        None => warn!("X credentials not set, skipping X (Twitter)"),
    }

    Ok(fetchers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Config {
        Config::from_lookup(|key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
        .unwrap()
    }

    #[test]
    fn test_only_hacker_news_without_source_credentials() {
        let fetchers = build_fetchers(&config(&[("OPENAI_API_KEY", "sk")])).unwrap();
        let sources: Vec<Source> = fetchers.iter().map(|f| f.source()).collect();
        assert_eq!(sources, vec![Source::HackerNews]);
    }

    #[test]
    fn test_all_sources_in_run_order() {
        let fetchers = build_fetchers(&config(&[
            ("OPENAI_API_KEY", "sk"),
            ("PRODUCT_HUNT_API_KEY", "ph"),
            ("TWITTER_API_KEY", "ck"),
            ("TWITTER_API_SECRET", "cs"),
            ("TWITTER_ACCESS_TOKEN", "at"),
            ("TWITTER_ACCESS_SECRET", "as"),
        ]))
        .unwrap();
        let sources: Vec<Source> = fetchers.iter().map(|f| f.source()).collect();
        assert_eq!(
            sources,
            vec![Source::ProductHunt, Source::HackerNews, Source::SocialPost]
        );
    }
}
