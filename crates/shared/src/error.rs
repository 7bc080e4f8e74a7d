use thiserror::Error;

use crate::models::Source;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{var} not found. Set it as an environment variable or add it to ~/.config/ai-news-digest/.env")]
    ConfigurationMissing { var: String },

    #[error("Invalid value for {var}: {value:?}")]
    InvalidConfiguration { var: String, value: String },

    #[error("{service} unavailable: {message}")]
    ServiceUnavailable { service: Source, message: String },

    #[error("Summarization failed: {0}")]
    SummarizationFailed(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn unavailable(service: Source, message: impl Into<String>) -> Self {
        Error::ServiceUnavailable {
            service,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
