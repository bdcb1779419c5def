use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure of the external completion capability.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    #[error("provider response had no text content")]
    EmptyResponse,

    #[error("missing API key: set {0}")]
    MissingApiKey(&'static str),
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        CompletionError::Transport(err.to_string())
    }
}

/// Every repair strategy failed on a model response.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("response contained no JSON object")]
    NoJson,

    #[error("response could not be repaired into JSON")]
    Unrecoverable,
}

/// One generation call failed; the generator decides whether to retry or fall back.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Crate-level error for the few operations that can fail outright.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("unknown completion provider: {0}")]
    UnknownProvider(String),
}

pub type Result<T> = std::result::Result<T, Error>;
