use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by the fetch layer. Clone so a single failure can be
/// handed to every caller coalesced onto the same in-flight request.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("AniList HTTP error (status {status}): {message}")]
    Http { status: u16, message: String },

    #[error("AniList request failed: {0}")]
    Transport(#[from] Arc<reqwest::Error>),

    #[error("Failed to decode AniList response: {0}")]
    Decode(String),

    #[error("AniList GraphQL error: {0}")]
    GraphQl(String),

    #[error("No media found for id {0}")]
    NotFound(i32),

    #[error("Request was cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(Arc::new(err))
    }
}
