use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Domain not allowed: {0}")]
    ForbiddenDomain(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Challenge unsolved: {0}")]
    ChallengeUnsolved(String),

    #[error("Render timed out after {0:?}")]
    RenderTimeout(Duration),

    #[error("Render failure: {0}")]
    RenderFailure(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Errors caused by the caller's input. Only these leave the pipeline as errors;
    /// everything else is absorbed into "try the next tier" or an empty result.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Error::InvalidRequest(_) | Error::ForbiddenDomain(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
