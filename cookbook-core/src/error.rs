use thiserror::Error;

use crate::llm::LlmError;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL host not allowed: {0}")]
    HostNotAllowed(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Response too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Page has no readable content")]
    EmptyContent,

    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),

    #[error("The AI returned an invalid data format. Please try again.")]
    InvalidJson(String),

    #[error("Extracted recipe is missing {0}")]
    MissingField(&'static str),
}
