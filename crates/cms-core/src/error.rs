//! Unified Error Model
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CmsError {
    #[error("FETCH/{0}")]
    Fetch(#[from] FetchError),

    #[error("CONFIG/{0}")]
    Config(String),

    #[error("IO/{0}")]
    Io(#[from] std::io::Error),
}

/// Failure reported by the data-fetch layer. Clonable so a cached failure
/// can be handed to every reader unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FetchError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("http {status}: {message}")]
    Http { status: u16, message: String },

    #[error("transport: {0}")]
    Transport(String),

    #[error("decode: {0}")]
    Decode(String),
}

impl FetchError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::NotFound(_) | FetchError::Decode(_) => false,
            FetchError::Http { status, .. } => *status >= 500,
            FetchError::Transport(_) => true,
        }
    }
}
