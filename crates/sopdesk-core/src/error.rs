use std::fmt::Display;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Embedding provider failed: {0}")]
    Provider(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Unparseable generator output: {0}")]
    Parse(#[from] ParseError),

    #[error("Storage failed: {0}")]
    Storage(String),

    #[error("Unreadable document: {0}")]
    Decode(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl Error {
    pub fn provider<E: Display>(err: E) -> Self {
        Error::Provider(err.to_string())
    }

    pub fn generation<E: Display>(err: E) -> Self {
        Error::Generation(err.to_string())
    }

    pub fn storage<E: Display>(err: E) -> Self {
        Error::Storage(err.to_string())
    }

    /// Short stable label for reports and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidConfig(_) => "invalid_config",
            Error::NotFound(_) => "not_found",
            Error::Provider(_) => "provider",
            Error::Generation(_) => "generation",
            Error::Parse(_) => "parse",
            Error::Storage(_) => "storage",
            Error::Decode(_) => "decode",
            Error::Cancelled(_) => "cancelled",
        }
    }
}

/// Ways a generator reply can fail to yield the structured answer we asked for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no JSON object found in output")]
    NoObject,

    #[error("unbalanced braces in output")]
    Unbalanced,

    #[error("invalid JSON: {0}")]
    Json(String),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("unknown coverage type: {0}")]
    UnknownCoverageType(String),

    #[error("unknown sentiment label: {0}")]
    UnknownSentiment(String),
}

pub type Result<T> = std::result::Result<T, Error>;
