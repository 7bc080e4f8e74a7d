use std::env;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Error, Result};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MIN_SCORE: i64 = 5;
pub const DEFAULT_HN_MAX_ITEMS: usize = 100;
pub const DEFAULT_PRODUCT_HUNT_DAYS_BACK: i64 = 7;
/// Accepted `PRODUCT_HUNT_DAYS_BACK` window, in days
pub const PRODUCT_HUNT_DAYS_BACK_RANGE: RangeInclusive<i64> = 1..=365;
pub const DEFAULT_TWITTER_MAX_RESULTS: u32 = 100;
pub const DEFAULT_OUTPUT_DIR: &str = "output";

const TWITTER_VARS: [&str; 4] = [
    "TWITTER_API_KEY",
    "TWITTER_API_SECRET",
    "TWITTER_ACCESS_TOKEN",
    "TWITTER_ACCESS_SECRET",
];

/// OAuth 1.0a user-context credentials for the X API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwitterCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_secret: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    /// `None` disables the Product Hunt fetcher
    pub product_hunt_api_key: Option<String>,
    /// `None` disables the X fetcher
    pub twitter: Option<TwitterCredentials>,
    pub min_score: i64,
    pub hn_max_items: usize,
    pub product_hunt_days_back: i64,
    pub twitter_max_results: u32,
    pub output_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key/value lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let openai_api_key = get("OPENAI_API_KEY").ok_or_else(|| Error::ConfigurationMissing {
            var: "OPENAI_API_KEY".to_string(),
        })?;

        let twitter = match TWITTER_VARS.map(|var| get(var)) {
            [None, None, None, None] => None,
            [api_key, api_secret, access_token, access_secret] => {
                let require = |value: Option<String>, var: &str| {
                    value.ok_or_else(|| Error::ConfigurationMissing {
                        var: var.to_string(),
                    })
                };
                Some(TwitterCredentials {
                    api_key: require(api_key, TWITTER_VARS[0])?,
                    api_secret: require(api_secret, TWITTER_VARS[1])?,
                    access_token: require(access_token, TWITTER_VARS[2])?,
                    access_secret: require(access_secret, TWITTER_VARS[3])?,
                })
            }
        };

        let twitter_max_results: u32 =
            parse_or(&get, "TWITTER_MAX_RESULTS", DEFAULT_TWITTER_MAX_RESULTS)?;

        Ok(Self {
            openai_api_key,
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            product_hunt_api_key: get("PRODUCT_HUNT_API_KEY"),
            twitter,
            min_score: parse_or(&get, "AI_NEWS_MIN_SCORE", DEFAULT_MIN_SCORE)?,
            hn_max_items: parse_or(&get, "HN_MAX_ITEMS", DEFAULT_HN_MAX_ITEMS)?,
            product_hunt_days_back: parse_in_range(
                &get,
                "PRODUCT_HUNT_DAYS_BACK",
                DEFAULT_PRODUCT_HUNT_DAYS_BACK,
                PRODUCT_HUNT_DAYS_BACK_RANGE,
            )?,
            // The recent search endpoint accepts 10..=100
            twitter_max_results: twitter_max_results.clamp(10, 100),
            output_dir: get("AI_NEWS_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        })
    }

    fn try_load_dotenv() {
        // Variables already present in the environment are never overridden.

        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/ai-news-digest/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("ai-news-digest").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }
    }
}

fn parse_or<T, G>(get: &G, var: &str, default: T) -> Result<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| Error::InvalidConfiguration {
                var: var.to_string(),
                value,
            }),
        None => Ok(default),
    }
}

fn parse_in_range<T, G>(get: &G, var: &str, default: T, range: RangeInclusive<T>) -> Result<T>
where
    T: FromStr + PartialOrd + ToString,
    G: Fn(&str) -> Option<String>,
{
    let value = parse_or(get, var, default)?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(Error::InvalidConfiguration {
            var: var.to_string(),
            value: value.to_string(),
        })
    }
}
